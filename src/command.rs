// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Text command protocol.
//
//   /reg <name>            register the caller under <name>
//   /unr                   unregister the caller (trailing tokens ignored)
//   /msg <dest> <text...>  queue <text> for <dest>
//   /all <text...>         queue <text> for every other registered process
//
// The buffer is clipped to `cmd_buf_size - 1` bytes and cut at the first
// NUL. Names are clipped to `name_size - 1` bytes. Text fields are the
// remainder of the buffer, verbatim.

use crate::config::BrokerConfig;
use crate::directory::truncate_name;
use crate::error::{MqError, Result};

pub const CMD_REGISTER: &[u8] = b"/reg ";
pub const CMD_UNREGISTER: &[u8] = b"/unr";
pub const CMD_MESSAGE: &[u8] = b"/msg ";
pub const CMD_ALL: &[u8] = b"/all ";

/// A parsed command. Emptiness of `/msg` and `/all` arguments is checked by
/// the dispatcher, after the caller has been identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { name: String },
    Unregister,
    Send { dest: String, text: Vec<u8> },
    Broadcast { text: Vec<u8> },
}

impl Command {
    /// Parse one command buffer.
    ///
    /// # Errors
    /// `UnknownCommand` if no prefix matches; `MalformedCommand` for an
    /// empty `/reg` name or a name that is not UTF-8.
    pub fn parse(buf: &[u8], config: &BrokerConfig) -> Result<Self> {
        let buf = clip(buf, config.cmd_buf_size);
        let limit = config.name_limit();

        if let Some(rest) = buf.strip_prefix(CMD_REGISTER) {
            let (token, _) = first_token(rest);
            let name = truncate_name(utf8(token)?, limit);
            if name.is_empty() {
                return Err(MqError::MalformedCommand("empty process name"));
            }
            return Ok(Command::Register { name: name.to_owned() });
        }
        if let Some(rest) = buf.strip_prefix(CMD_MESSAGE) {
            let (token, after) = first_token(rest);
            let dest = truncate_name(utf8(token)?, limit).to_owned();
            let text = skip_delimiter(after).to_vec();
            return Ok(Command::Send { dest, text });
        }
        if buf.starts_with(CMD_UNREGISTER) {
            return Ok(Command::Unregister);
        }
        if let Some(rest) = buf.strip_prefix(CMD_ALL) {
            return Ok(Command::Broadcast { text: rest.to_vec() });
        }
        Err(MqError::UnknownCommand)
    }

    /// Short verb used in log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Register { .. } => "reg",
            Command::Unregister => "unr",
            Command::Send { .. } => "msg",
            Command::Broadcast { .. } => "all",
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clip(buf: &[u8], cmd_buf_size: usize) -> &[u8] {
    let buf = &buf[..buf.len().min(cmd_buf_size.saturating_sub(1))];
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

/// Split off the first whitespace-delimited token, skipping leading
/// whitespace. Returns `(token, rest)` where `rest` starts at the delimiter.
fn first_token(buf: &[u8]) -> (&[u8], &[u8]) {
    let start = buf
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(buf.len());
    let buf = &buf[start..];
    let end = buf
        .iter()
        .position(u8::is_ascii_whitespace)
        .unwrap_or(buf.len());
    buf.split_at(end)
}

fn skip_delimiter(buf: &[u8]) -> &[u8] {
    match buf.first() {
        Some(b) if b.is_ascii_whitespace() => &buf[1..],
        _ => buf,
    }
}

fn utf8(token: &[u8]) -> Result<&str> {
    std::str::from_utf8(token).map_err(|_| MqError::MalformedCommand("name is not UTF-8"))
}
