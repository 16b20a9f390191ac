// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Interactive client for mqd.
//
// Usage: mq [--socket PATH]   (run several instances in separate terminals)
//
// Each line typed is sent to the broker as one command. `/read` fetches the
// next queued message, `/exit` quits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use libmq::DEFAULT_SOCKET_PATH;

#[derive(Parser, Debug)]
#[command(name = "mq", version, about = "Interactive client for the mqd broker")]
struct Args {
    /// Unix socket the broker listens on.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,
}

#[cfg(unix)]
fn run(args: Args) -> std::io::Result<()> {
    use std::io::{self, BufRead, Write};

    use libmq::client::{help, normalize_line};
    use libmq::{Client, Response};

    const EXIT: &str = "/exit";

    let mut client = Client::connect(&args.socket)?;
    println!("{}", help());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = normalize_line(&line?);
        if line.is_empty() {
            continue;
        }
        if line == EXIT {
            break;
        }
        match client.call(&line)? {
            Response::Ok(detail) if detail.is_empty() => println!("ok"),
            Response::Ok(detail) => println!("ok: {detail}"),
            Response::Message { sender, text } => println!("[{sender}] {text}"),
            Response::Err { kind, errno } => println!("error: {kind} (errno {errno})"),
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn run(_args: Args) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mq needs Unix domain sockets",
    ))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mq: {e}");
            ExitCode::FAILURE
        }
    }
}
