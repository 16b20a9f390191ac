// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// A queued message: owned payload bytes plus the sender's name.
// Every message is built from fresh copies, so no two mailbox slots ever
// share storage (a broadcast builds one message per recipient).

use crate::error::{MqError, Result};

/// Copy `src` into a new allocation, reporting OOM instead of aborting.
pub(crate) fn try_copy(src: &[u8]) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(src.len())
        .map_err(|_| MqError::AllocationFailure)?;
    v.extend_from_slice(src);
    Ok(v)
}

/// An owned message sitting in (at most) one mailbox slot.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    payload: Vec<u8>,
    sender: String,
}

impl Message {
    /// Build a message from copies of `payload` and `sender`.
    ///
    /// # Errors
    /// `MalformedCommand` for an empty payload, `AllocationFailure` if
    /// either copy cannot be allocated.
    pub fn new(payload: &[u8], sender: &str) -> Result<Self> {
        if payload.is_empty() {
            return Err(MqError::MalformedCommand("empty message text"));
        }
        let payload = try_copy(payload)?;
        let sender = String::from_utf8(try_copy(sender.as_bytes())?)
            .map_err(|_| MqError::MalformedCommand("sender name is not UTF-8"))?;
        Ok(Self { payload, sender })
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Name of the registered process that sent this message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Always false for a message built through [`Message::new`].
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Consume into the payload bytes.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("sender", &self.sender)
            .field("len", &self.payload.len())
            .finish()
    }
}
