// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Command dispatcher. Holds no per-call state: every call parses one buffer
// tagged with the caller's identity, validates it and applies it to the
// directory and the affected mailboxes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::command::Command;
use crate::config::BrokerConfig;
use crate::directory::{Directory, ProcessId};
use crate::error::{MqError, Result};
use crate::message::Message;

/// Successful outcome of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Registered { name: String },
    /// `freed` counts messages that were still queued for the caller.
    Unregistered { freed: usize },
    /// `evicted` is set when the destination's oldest message was overwritten.
    Sent { evicted: bool },
    Broadcast { delivered: usize },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Registered { name } => write!(f, "ok registered {name}"),
            Reply::Unregistered { freed } => write!(f, "ok unregistered {freed}"),
            Reply::Sent { evicted: false } => f.write_str("ok sent"),
            Reply::Sent { evicted: true } => f.write_str("ok sent evicted"),
            Reply::Broadcast { delivered } => write!(f, "ok all {delivered}"),
        }
    }
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerStats {
    pub registered: usize,
    pub max_processes: usize,
    pub queued: usize,
}

/// The message broker: a directory of processes plus the command protocol.
///
/// Construct one per deployment and share it (e.g. behind an `Arc`) between
/// transport threads. [`shutdown`](Broker::shutdown) drains every entry; it
/// also runs on drop if it was never called.
pub struct Broker {
    config: BrokerConfig,
    directory: Directory,
    shut_down: AtomicBool,
}

impl Broker {
    /// Validate `config` and create an empty broker.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        let directory = Directory::new(config.max_processes, config.queue_len);
        log::info!(
            "broker ready: max_processes={} queue_len={} cmd_buf_size={}",
            config.max_processes,
            config.queue_len,
            config.cmd_buf_size
        );
        Ok(Self {
            config,
            directory,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Parse and execute one command buffer on behalf of `pid`.
    pub fn dispatch(&self, pid: ProcessId, buf: &[u8]) -> Result<Reply> {
        let cmd = Command::parse(buf, &self.config).map_err(|e| {
            log::warn!("pid {pid}: rejected command: {e}");
            e
        })?;
        self.execute(pid, cmd)
    }

    /// Execute an already parsed command on behalf of `pid`.
    ///
    /// # Errors
    /// `ShutDown` once [`shutdown`](Broker::shutdown) has run, otherwise the
    /// command's own failure.
    pub fn execute(&self, pid: ProcessId, cmd: Command) -> Result<Reply> {
        let verb = cmd.verb();
        if self.is_shut_down() {
            log::warn!("pid {pid}: /{verb} after shutdown");
            return Err(MqError::ShutDown);
        }
        let result = match cmd {
            Command::Register { name } => self
                .directory
                .register(pid, &name)
                .map(|_| Reply::Registered { name }),
            Command::Unregister => self
                .directory
                .unregister(pid)
                .map(|freed| Reply::Unregistered { freed }),
            Command::Send { dest, text } => self.send(pid, &dest, &text),
            Command::Broadcast { text } => self.broadcast(pid, &text),
        };
        if let Err(e) = &result {
            log::warn!("pid {pid}: /{verb} failed: {e}");
        }
        result
    }

    fn send(&self, pid: ProcessId, dest: &str, text: &[u8]) -> Result<Reply> {
        let origin = self
            .directory
            .lookup_by_id(pid)
            .ok_or(MqError::CallerNotRegistered)?;
        if dest.is_empty() {
            return Err(MqError::MalformedCommand("empty destination"));
        }
        if text.is_empty() {
            return Err(MqError::MalformedCommand("empty message text"));
        }
        let target = self
            .directory
            .lookup_by_name(dest)
            .ok_or_else(|| MqError::DestinationNotFound(dest.to_owned()))?;

        let msg = Message::new(text, origin.name())?;
        let evicted = target.deliver(msg)?;
        log::debug!("message from \"{}\" queued for \"{dest}\"", origin.name());
        Ok(Reply::Sent { evicted })
    }

    fn broadcast(&self, pid: ProcessId, text: &[u8]) -> Result<Reply> {
        let origin = self
            .directory
            .lookup_by_id(pid)
            .ok_or(MqError::CallerNotRegistered)?;
        if text.is_empty() {
            return Err(MqError::MalformedCommand("empty message text"));
        }

        let mut delivered = 0;
        for entry in self.directory.enumerate() {
            if entry.pid() == pid {
                continue;
            }
            let outcome = Message::new(text, origin.name()).and_then(|m| entry.deliver(m));
            match outcome {
                Ok(_) => delivered += 1,
                Err(e) => log::warn!(
                    "/all from \"{}\": skipping \"{}\": {e}",
                    origin.name(),
                    entry.name()
                ),
            }
        }
        log::info!("/all from \"{}\" delivered to {delivered} processes", origin.name());
        Ok(Reply::Broadcast { delivered })
    }

    /// Take the oldest message queued for `pid`.
    ///
    /// # Errors
    /// `NotRegistered` if `pid` has no entry, `QueueEmpty` if nothing is queued.
    pub fn receive(&self, pid: ProcessId) -> Result<Message> {
        let entry = self.directory.lookup_by_id(pid).ok_or_else(|| {
            log::warn!("read: pid {pid} not registered");
            MqError::NotRegistered
        })?;
        entry.take_message()
    }

    /// Copy the oldest queued payload into `buf`, returning the byte count.
    /// A payload longer than `buf` is truncated and still consumed.
    pub fn receive_into(&self, pid: ProcessId, buf: &mut [u8]) -> Result<usize> {
        let payload = self.receive(pid)?.into_payload();
        let n = buf.len().min(payload.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(n)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BrokerStats {
        let entries = self.directory.enumerate();
        BrokerStats {
            registered: entries.len(),
            max_processes: self.directory.capacity(),
            queued: entries.iter().map(|e| e.pending()).sum(),
        }
    }

    /// Orderly teardown: unregister every process and free all queued
    /// messages. Returns how many processes were removed. Every later
    /// command fails with `ShutDown`.
    pub fn shutdown(&self) -> usize {
        self.shut_down.store(true, Ordering::Release);
        let removed = self.directory.drain();
        log::info!("broker shut down, {removed} processes removed");
        removed
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.config)
            .field("directory", &self.directory)
            .finish()
    }
}
