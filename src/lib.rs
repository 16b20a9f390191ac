// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// In-memory inter-process message broker.
// Processes register under a name, send point-to-point (`/msg`) or
// broadcast (`/all`) messages and poll their own bounded mailbox.
// The socket front end stands in for the `/dev/mq` character device.

/// Socket path `mqd` listens on and `mq` connects to by default.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mq.sock";

pub mod error;
pub use error::{MqError, Result};

pub mod config;
pub use config::BrokerConfig;

mod spin_lock;
pub use spin_lock::{SpinGuard, SpinMutex};

mod message;
pub use message::Message;

pub mod queue;
pub use queue::{MessageQueue, QueueState};

pub mod directory;
pub use directory::{Directory, ProcessEntry, ProcessId};

pub mod command;
pub use command::Command;

mod broker;
pub use broker::{Broker, BrokerStats, Reply};

#[cfg(unix)]
pub mod server;
#[cfg(unix)]
pub use server::{ConnectionIds, PeerCredentials, PeerIdentity, Server, ShutdownHandle};

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub use client::{Client, Response};
