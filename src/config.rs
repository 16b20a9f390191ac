// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broker limits. Values come from defaults, an optional TOML file, `MQ_*`
// environment variables and command line flags, later sources winning.
// `validate` enforces the same ranges the device driver checked at load time.

use std::path::Path;

use serde::Deserialize;

use crate::error::{MqError, Result};

pub const MAX_PROCESSES_RANGE: (usize, usize) = (1, 20);
pub const QUEUE_LEN_RANGE: (usize, usize) = (3, 20);
pub const CMD_BUF_SIZE_RANGE: (usize, usize) = (16, 4096);
pub const NAME_SIZE_RANGE: (usize, usize) = (2, 64);

pub const ENV_MAX_PROCESSES: &str = "MQ_MAX_PROCESSES";
pub const ENV_QUEUE_LEN: &str = "MQ_QUEUE_LEN";
pub const ENV_CMD_BUF_SIZE: &str = "MQ_CMD_BUF_SIZE";

/// Limits applied by a [`Broker`](crate::Broker).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// Maximum number of concurrently registered processes.
    pub max_processes: usize,
    /// Mailbox capacity per process.
    pub queue_len: usize,
    /// Largest command buffer accepted, including the terminator.
    pub cmd_buf_size: usize,
    /// Name field size including the terminator; names keep `name_size - 1` bytes.
    pub name_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_processes: 8,
            queue_len: 8,
            cmd_buf_size: 256,
            name_size: 9,
        }
    }
}

fn check(field: &'static str, value: usize, (min, max): (usize, usize)) -> Result<()> {
    if value < min || value > max {
        return Err(MqError::InvalidConfig { field, value, min, max });
    }
    Ok(())
}

impl BrokerConfig {
    /// Reject limits outside their permitted ranges.
    pub fn validate(&self) -> Result<()> {
        check("max_processes", self.max_processes, MAX_PROCESSES_RANGE)?;
        check("queue_len", self.queue_len, QUEUE_LEN_RANGE)?;
        check("cmd_buf_size", self.cmd_buf_size, CMD_BUF_SIZE_RANGE)?;
        check("name_size", self.name_size, NAME_SIZE_RANGE)?;
        Ok(())
    }

    /// Longest name kept after truncation, in bytes.
    pub fn name_limit(&self) -> usize {
        self.name_size.saturating_sub(1)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply `MQ_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&'static str, &mut usize); 3] = [
            (ENV_MAX_PROCESSES, &mut self.max_processes),
            (ENV_QUEUE_LEN, &mut self.queue_len),
            (ENV_CMD_BUF_SIZE, &mut self.cmd_buf_size),
        ];
        for (key, slot) in fields {
            if let Some(raw) = lookup(key) {
                *slot = raw
                    .trim()
                    .parse()
                    .map_err(|_| MqError::InvalidEnv(key, raw.clone()))?;
            }
        }
        Ok(())
    }
}
