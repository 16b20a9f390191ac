// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broker limits: ranges, TOML files and environment overrides.

use std::collections::HashMap;
use std::io::Write;

use libmq::{BrokerConfig, MqError};

#[test]
fn defaults_are_valid() {
    let cfg = BrokerConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.name_limit(), 8);
}

#[test]
fn range_bounds() {
    let ok = [
        BrokerConfig { max_processes: 1, ..Default::default() },
        BrokerConfig { max_processes: 20, ..Default::default() },
        BrokerConfig { queue_len: 3, ..Default::default() },
        BrokerConfig { queue_len: 20, ..Default::default() },
    ];
    for cfg in &ok {
        cfg.validate().unwrap();
    }

    let bad = [
        (BrokerConfig { max_processes: 0, ..Default::default() }, "max_processes"),
        (BrokerConfig { max_processes: 21, ..Default::default() }, "max_processes"),
        (BrokerConfig { queue_len: 2, ..Default::default() }, "queue_len"),
        (BrokerConfig { queue_len: 21, ..Default::default() }, "queue_len"),
        (BrokerConfig { cmd_buf_size: 8, ..Default::default() }, "cmd_buf_size"),
        (BrokerConfig { name_size: 1, ..Default::default() }, "name_size"),
    ];
    for (cfg, want) in bad {
        match cfg.validate() {
            Err(MqError::InvalidConfig { field, .. }) => assert_eq!(field, want),
            other => panic!("{want}: expected InvalidConfig, got {other:?}"),
        }
    }
}

#[test]
fn toml_overrides_only_given_keys() {
    let cfg = BrokerConfig::from_toml_str("queue_len = 12\nmax_processes = 3\n").unwrap();
    assert_eq!(cfg.queue_len, 12);
    assert_eq!(cfg.max_processes, 3);
    assert_eq!(cfg.cmd_buf_size, BrokerConfig::default().cmd_buf_size);
}

#[test]
fn toml_rejects_unknown_keys() {
    assert!(matches!(
        BrokerConfig::from_toml_str("queue_length = 4"),
        Err(MqError::Config(_))
    ));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name_size = 16").unwrap();
    let cfg = BrokerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.name_size, 16);
    assert_eq!(cfg.name_limit(), 15);
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        BrokerConfig::load(dir.path().join("absent.toml")),
        Err(MqError::Io(_))
    ));
}

#[test]
fn env_overrides() {
    let env: HashMap<&str, &str> = [("MQ_QUEUE_LEN", " 5 "), ("MQ_MAX_PROCESSES", "2")].into();
    let mut cfg = BrokerConfig::default();
    cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.queue_len, 5);
    assert_eq!(cfg.max_processes, 2);
    assert_eq!(cfg.cmd_buf_size, 256);
}

#[test]
fn env_rejects_garbage() {
    let mut cfg = BrokerConfig::default();
    let err = cfg
        .apply_env_from(|k| (k == "MQ_CMD_BUF_SIZE").then(|| "lots".to_string()))
        .unwrap_err();
    assert!(matches!(err, MqError::InvalidEnv("MQ_CMD_BUF_SIZE", ref v) if v == "lots"));
}
