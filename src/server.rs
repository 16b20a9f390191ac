// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Unix domain socket front end for the broker.
//
// Each connection is served on its own thread. Requests are single lines
// (at most `cmd_buf_size` bytes are kept, the rest of an overlong line is
// discarded); every request gets exactly one reply line:
//
//   ok ...                 command accepted (see `Reply`'s Display)
//   msg <sender> <text>    answer to `/read`
//   err <Kind> <errno>     command rejected
//
// The caller identity is resolved once per connection by a `PeerIdentity`.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::broker::Broker;
use crate::directory::ProcessId;
use crate::error::MqError;

/// Request line asking for the next queued message.
pub const READ_REQUEST: &[u8] = b"/read";

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// Resolves the identity of the process at the other end of a connection.
pub trait PeerIdentity: Send + Sync {
    fn identify(&self, stream: &UnixStream) -> io::Result<ProcessId>;

    /// Whether an identity dies with its connection. The server then
    /// unregisters it on disconnect, since no later connection can ever
    /// present it again.
    fn release_on_disconnect(&self) -> bool {
        false
    }
}

/// Identity from the kernel's peer credentials (`SO_PEERCRED`): the pid of
/// the connecting process. Several connections from one process share it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeerCredentials;

impl PeerIdentity for PeerCredentials {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn identify(&self, stream: &UnixStream) -> io::Result<ProcessId> {
        use std::os::unix::io::AsRawFd;

        let mut cred = libc::ucred { pid: 0, uid: 0, gid: 0 };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                stream.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                &mut cred as *mut libc::ucred as *mut libc::c_void,
                &mut len,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ProcessId(cred.pid as u64))
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn identify(&self, _stream: &UnixStream) -> io::Result<ProcessId> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "peer credentials are not available on this platform",
        ))
    }
}

/// A fresh identity for every connection, counting up from 1.
#[derive(Debug)]
pub struct ConnectionIds {
    next: AtomicU64,
}

impl Default for ConnectionIds {
    fn default() -> Self {
        Self { next: AtomicU64::new(1) }
    }
}

impl PeerIdentity for ConnectionIds {
    fn identify(&self, _stream: &UnixStream) -> io::Result<ProcessId> {
        Ok(ProcessId(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    fn release_on_disconnect(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Request handling
// ---------------------------------------------------------------------------

fn err_line(e: &MqError) -> String {
    format!("err {} {}", e.kind_name(), e.errno())
}

/// Produce the reply line (without newline) for one request from `pid`.
pub fn handle_request(broker: &Broker, pid: ProcessId, line: &[u8]) -> String {
    if line == READ_REQUEST {
        return match broker.receive(pid) {
            Ok(msg) => format!("msg {} {}", msg.sender(), msg.text()),
            Err(e) => err_line(&e),
        };
    }
    match broker.dispatch(pid, line) {
        Ok(reply) => reply.to_string(),
        Err(e) => err_line(&e),
    }
}

/// Read one `\n`-terminated request into `out`, keeping at most `max` bytes.
/// Returns `false` at end of stream with nothing read.
fn read_request<R: BufRead>(reader: &mut R, max: usize, out: &mut Vec<u8>) -> io::Result<bool> {
    out.clear();
    let mut seen = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(seen);
        }
        seen = true;
        let newline = available.iter().position(|&b| b == b'\n');
        let chunk = &available[..newline.unwrap_or(available.len())];
        let room = max.saturating_sub(out.len());
        out.extend_from_slice(&chunk[..chunk.len().min(room)]);
        let used = newline.map_or(available.len(), |i| i + 1);
        reader.consume(used);
        if newline.is_some() {
            if out.last() == Some(&b'\r') {
                out.pop();
            }
            return Ok(true);
        }
    }
}

/// Drop the entry of a connection-scoped identity whose connection closed.
fn release(broker: &Broker, pid: ProcessId) {
    match broker.directory().unregister(pid) {
        Ok(freed) => {
            log::info!("pid {pid} disconnected while registered, {freed} messages freed")
        }
        Err(MqError::NotRegistered) => {}
        Err(e) => log::warn!("pid {pid}: release on disconnect failed: {e}"),
    }
}

fn serve_connection(broker: &Broker, pid: ProcessId, stream: UnixStream) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let max = broker.config().cmd_buf_size;
    let mut line = Vec::with_capacity(max);
    while read_request(&mut reader, max, &mut line)? {
        let mut reply = handle_request(broker, pid, &line);
        reply.push('\n');
        writer.write_all(reply.as_bytes())?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Stops a running [`Server`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    path: PathBuf,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if !self.stop.swap(true, Ordering::AcqRel) {
            // Wake the blocking accept() so the loop observes the flag.
            let _ = UnixStream::connect(&self.path);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Listening socket bound to a broker.
pub struct Server {
    listener: UnixListener,
    path: PathBuf,
    broker: Arc<Broker>,
    identity: Arc<dyn PeerIdentity>,
    stop: Arc<AtomicBool>,
    peers: Arc<Mutex<HashMap<u64, UnixStream>>>,
}

impl Server {
    /// Bind `path`, replacing a stale socket file left by a previous run.
    pub fn bind(
        path: impl AsRef<Path>,
        broker: Arc<Broker>,
        identity: Arc<dyn PeerIdentity>,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() && UnixStream::connect(&path).is_err() {
            std::fs::remove_file(&path)?;
        }
        let listener = UnixListener::bind(&path)?;
        log::info!("listening on {}", path.display());
        Ok(Self {
            listener,
            path,
            broker,
            identity,
            stop: Arc::new(AtomicBool::new(false)),
            peers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
            path: self.path.clone(),
        }
    }

    /// Accept and serve connections until shut down, then close every open
    /// connection, drain the broker and remove the socket file.
    pub fn run(self) -> io::Result<()> {
        let mut workers = Vec::new();
        let mut serial = 0u64;
        for stream in self.listener.incoming() {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    continue;
                }
            };
            let pid = match self.identity.identify(&stream) {
                Ok(pid) => pid,
                Err(e) => {
                    log::warn!("could not identify peer: {e}");
                    continue;
                }
            };
            serial += 1;
            let conn = serial;
            self.peers.lock().insert(conn, stream.try_clone()?);

            let broker = Arc::clone(&self.broker);
            let peers = Arc::clone(&self.peers);
            let release_on_disconnect = self.identity.release_on_disconnect();
            let handle = thread::Builder::new()
                .name(format!("mq-conn-{pid}"))
                .spawn(move || {
                    log::debug!("pid {pid} connected");
                    if let Err(e) = serve_connection(&broker, pid, stream) {
                        log::warn!("pid {pid}: connection error: {e}");
                    }
                    if release_on_disconnect {
                        release(&broker, pid);
                    }
                    peers.lock().remove(&conn);
                    log::debug!("pid {pid} disconnected");
                })?;
            workers.push(handle);
            workers.retain(|w| !w.is_finished());
        }

        for (_, peer) in self.peers.lock().drain() {
            let _ = peer.shutdown(Shutdown::Both);
        }
        for w in workers {
            let _ = w.join();
        }
        self.broker.shutdown();
        let _ = std::fs::remove_file(&self.path);
        log::info!("server on {} stopped", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn overlong_request_is_clipped_and_rest_discarded() {
        let mut input = Cursor::new(b"/all abcdefghij\n/unr\n".to_vec());
        let mut line = Vec::new();
        assert!(read_request(&mut input, 8, &mut line).unwrap());
        assert_eq!(line, b"/all abc");
        assert!(read_request(&mut input, 8, &mut line).unwrap());
        assert_eq!(line, b"/unr");
        assert!(!read_request(&mut input, 8, &mut line).unwrap());
    }

    #[test]
    fn crlf_and_unterminated_last_line() {
        let mut input = Cursor::new(b"/read\r\n/unr".to_vec());
        let mut line = Vec::new();
        assert!(read_request(&mut input, 64, &mut line).unwrap());
        assert_eq!(line, READ_REQUEST);
        assert!(read_request(&mut input, 64, &mut line).unwrap());
        assert_eq!(line, b"/unr");
    }
}
