// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Client side of the socket protocol: send one request line, read one
// reply line.

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Prompt listing the commands the interactive client understands.
pub fn help() -> &'static str {
    "Commands:\n\
     \x20 /reg <name>        register this process\n\
     \x20 /unr               unregister (extra arguments ignored)\n\
     \x20 /msg <dest> <msg>  send a message\n\
     \x20 /all <msg>         send a message to everyone else\n\
     \x20 /read              read the next queued message\n\
     \x20 /exit              quit"
}

/// Collapse every whitespace run into one space and trim both ends.
pub fn normalize_line(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A decoded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `ok ...`: the words after `ok`.
    Ok(String),
    /// `msg <sender> <text>`.
    Message { sender: String, text: String },
    /// `err <Kind> <errno>`.
    Err { kind: String, errno: i32 },
}

impl Response {
    /// Decode a reply line. Returns `None` for anything the server never sends.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == "ok" {
            return Some(Response::Ok(String::new()));
        }
        if let Some(rest) = line.strip_prefix("ok ") {
            return Some(Response::Ok(rest.to_owned()));
        }
        if let Some(rest) = line.strip_prefix("msg ") {
            let (sender, text) = rest.split_once(' ').unwrap_or((rest, ""));
            return Some(Response::Message {
                sender: sender.to_owned(),
                text: text.to_owned(),
            });
        }
        let rest = line.strip_prefix("err ")?;
        let (kind, errno) = rest.split_once(' ')?;
        Some(Response::Err {
            kind: kind.to_owned(),
            errno: errno.parse().ok()?,
        })
    }
}

/// A connection to a running broker daemon.
pub struct Client {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Client {
    pub fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        let writer = UnixStream::connect(path)?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Self { reader, writer })
    }

    /// Send one request and return the raw reply line (newline stripped).
    pub fn request(&mut self, line: &str) -> io::Result<String> {
        if line.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "request must be a single line",
            ));
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "broker closed the connection",
            ));
        }
        while reply.ends_with(['\n', '\r']) {
            reply.pop();
        }
        Ok(reply)
    }

    /// Send one request and decode the reply.
    pub fn call(&mut self, line: &str) -> io::Result<Response> {
        let raw = self.request(line)?;
        Response::parse(&raw).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("unexpected reply: {raw}"))
        })
    }
}
