// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the broker. Every kind maps onto the errno the
// character-device front end used to return, so transports can keep
// reporting numeric codes to callers that expect them.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MqError>;

/// Errors produced by the directory, the queues and the command dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum MqError {
    /// The caller's identity already owns an entry.
    #[error("process is already registered")]
    AlreadyRegisteredById,
    /// Another process already registered this name.
    #[error("name \"{0}\" is already registered")]
    AlreadyRegisteredByName(String),
    /// Both the identity and the requested name are taken.
    #[error("process is already registered and name \"{0}\" is taken")]
    AlreadyRegisteredByIdAndName(String),
    /// The directory holds the configured maximum number of entries.
    #[error("directory full ({0} processes registered)")]
    CapacityExceeded(usize),
    /// `/unr` or a read from a process with no entry.
    #[error("process is not registered")]
    NotRegistered,
    /// `/msg` or `/all` from a process with no entry.
    #[error("sender is not registered")]
    CallerNotRegistered,
    /// No entry carries the destination name.
    #[error("destination \"{0}\" not found")]
    DestinationNotFound(String),
    /// The command matched a known prefix but its arguments are unusable.
    #[error("malformed command: {0}")]
    MalformedCommand(&'static str),
    /// The buffer did not start with a recognised command.
    #[error("unknown command")]
    UnknownCommand,
    /// Read attempted on an empty mailbox.
    #[error("no message queued")]
    QueueEmpty,
    /// The broker has been shut down and accepts no further commands.
    #[error("broker is shut down")]
    ShutDown,
    /// A message payload or sender tag could not be allocated.
    #[error("out of memory while building a message")]
    AllocationFailure,
    /// A configured limit lies outside its permitted range.
    #[error("invalid {field} ({value}); allowed range {min}..={max}")]
    InvalidConfig {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
    /// An override variable does not hold a number.
    #[error("environment variable {0} has non-numeric value \"{1}\"")]
    InvalidEnv(&'static str, String),
    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MqError {
    /// The errno the device driver returned for this condition.
    pub fn errno(&self) -> i32 {
        match self {
            MqError::AlreadyRegisteredById
            | MqError::AlreadyRegisteredByName(_)
            | MqError::AlreadyRegisteredByIdAndName(_) => libc::EEXIST,
            MqError::CapacityExceeded(_)
            | MqError::NotRegistered
            | MqError::DestinationNotFound(_) => libc::ENOENT,
            MqError::CallerNotRegistered => libc::EACCES,
            MqError::MalformedCommand(_)
            | MqError::UnknownCommand
            | MqError::InvalidConfig { .. }
            | MqError::InvalidEnv(..)
            | MqError::Config(_) => libc::EINVAL,
            MqError::QueueEmpty => libc::EAGAIN,
            MqError::AllocationFailure => libc::ENOMEM,
            MqError::ShutDown => libc::ENODEV,
            MqError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Stable token naming the error kind on the wire.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MqError::AlreadyRegisteredById => "AlreadyRegisteredById",
            MqError::AlreadyRegisteredByName(_) => "AlreadyRegisteredByName",
            MqError::AlreadyRegisteredByIdAndName(_) => "AlreadyRegisteredByIdAndName",
            MqError::CapacityExceeded(_) => "CapacityExceeded",
            MqError::NotRegistered => "NotRegistered",
            MqError::CallerNotRegistered => "CallerNotRegistered",
            MqError::DestinationNotFound(_) => "DestinationNotFound",
            MqError::MalformedCommand(_) => "MalformedCommand",
            MqError::UnknownCommand => "UnknownCommand",
            MqError::QueueEmpty => "QueueEmpty",
            MqError::AllocationFailure => "AllocationFailure",
            MqError::ShutDown => "ShutDown",
            MqError::InvalidConfig { .. } => "InvalidConfig",
            MqError::InvalidEnv(..) => "InvalidEnv",
            MqError::Config(_) => "Config",
            MqError::Io(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_matches_device_codes() {
        assert_eq!(MqError::AlreadyRegisteredById.errno(), libc::EEXIST);
        assert_eq!(MqError::CallerNotRegistered.errno(), libc::EACCES);
        assert_eq!(MqError::QueueEmpty.errno(), libc::EAGAIN);
        assert_eq!(MqError::UnknownCommand.errno(), libc::EINVAL);
        assert_eq!(MqError::AllocationFailure.errno(), libc::ENOMEM);
    }

    #[test]
    fn kind_names_have_no_spaces() {
        let kinds = [
            MqError::DestinationNotFound("bob".into()),
            MqError::MalformedCommand("empty text"),
            MqError::CapacityExceeded(8),
        ];
        for k in &kinds {
            assert!(!k.kind_name().contains(' '));
        }
    }
}
