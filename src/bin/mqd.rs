// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broker daemon.
//
// Usage: mqd [--socket PATH] [--config FILE] [--max-processes N] ...
//
// Limits are layered: defaults, then the TOML file, then `MQ_*` environment
// variables, then command line flags. SIGINT, SIGTERM and SIGHUP stop the
// server, drain every mailbox and remove the socket file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use libmq::{BrokerConfig, DEFAULT_SOCKET_PATH};

#[derive(Parser, Debug)]
#[command(name = "mqd", version, about = "In-memory message broker daemon")]
struct Args {
    /// Unix socket to listen on.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// TOML file with broker limits.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_processes: Option<usize>,

    #[arg(long)]
    queue_len: Option<usize>,

    #[arg(long)]
    cmd_buf_size: Option<usize>,

    #[arg(long)]
    name_size: Option<usize>,

    /// Give every connection its own identity instead of the peer's pid.
    #[arg(long)]
    per_connection: bool,
}

impl Args {
    fn broker_config(&self) -> libmq::Result<BrokerConfig> {
        let mut config = match &self.config {
            Some(path) => BrokerConfig::load(path)?,
            None => BrokerConfig::default(),
        };
        config.apply_env()?;
        if let Some(v) = self.max_processes {
            config.max_processes = v;
        }
        if let Some(v) = self.queue_len {
            config.queue_len = v;
        }
        if let Some(v) = self.cmd_buf_size {
            config.cmd_buf_size = v;
        }
        if let Some(v) = self.name_size {
            config.name_size = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(unix)]
fn run(args: Args) -> libmq::Result<()> {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use libmq::{Broker, ConnectionIds, PeerCredentials, PeerIdentity, Server};

    let config = args.broker_config()?;
    log::info!(
        "limits: max_processes={} queue_len={} cmd_buf_size={} name_size={}",
        config.max_processes,
        config.queue_len,
        config.cmd_buf_size,
        config.name_size
    );

    let broker = Arc::new(Broker::new(config)?);
    let identity: Arc<dyn PeerIdentity> = if args.per_connection {
        Arc::new(ConnectionIds::default())
    } else {
        Arc::new(PeerCredentials)
    };
    let server = Server::bind(&args.socket, Arc::clone(&broker), identity)?;

    let handle = server.shutdown_handle();
    signals::install();
    thread::Builder::new()
        .name("mq-signal".into())
        .spawn(move || {
            while !signals::raised() && !handle.is_shutdown() {
                thread::sleep(Duration::from_millis(100));
            }
            log::info!("stopping");
            handle.shutdown();
        })?;

    server.run()?;
    let stats = broker.stats();
    log::info!("exited with {} registered, {} queued", stats.registered, stats.queued);
    Ok(())
}

#[cfg(not(unix))]
fn run(_args: Args) -> libmq::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mqd needs Unix domain sockets",
    )
    .into())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("mqd: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(unix)]
mod signals {
    use std::sync::atomic::{AtomicBool, Ordering};

    static RAISED: AtomicBool = AtomicBool::new(false);

    extern "C" fn handler(_: libc::c_int) {
        RAISED.store(true, Ordering::Release);
    }

    pub fn install() {
        unsafe {
            libc::signal(libc::SIGINT, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGHUP, handler as *const () as libc::sighandler_t);
        }
    }

    pub fn raised() -> bool {
        RAISED.load(Ordering::Acquire)
    }
}
