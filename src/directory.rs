// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Directory of registered processes.
//
// Entries live in a slab arena. Traversal order is an explicit list of live
// slab keys (insertion at the tail), with hash indices by identity and by
// name. The whole table sits behind one directory-wide lock; each entry's
// mailbox has its own spin lock. The directory lock may be held while one
// entry lock is taken, entry locks never nest.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use slab::Slab;

use crate::error::{MqError, Result};
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::spin_lock::SpinMutex;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque caller identity supplied by the transport (a process id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u64);

impl From<u32> for ProcessId {
    fn from(v: u32) -> Self {
        Self(u64::from(v))
    }
}

impl From<u64> for ProcessId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cut `raw` to at most `limit` bytes without splitting a UTF-8 sequence.
pub fn truncate_name(raw: &str, limit: usize) -> &str {
    if raw.len() <= limit {
        return raw;
    }
    let mut end = limit;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

// ---------------------------------------------------------------------------
// ProcessEntry
// ---------------------------------------------------------------------------

/// A registered process: identity, unique name and its mailbox.
///
/// A mailbox of `None` marks an entry that has been unlinked from the
/// directory and whose queued messages were freed. References obtained from
/// a lookup before the removal see a retired entry and refuse deliveries.
pub struct ProcessEntry {
    pid: ProcessId,
    name: String,
    registered_at: Instant,
    mailbox: SpinMutex<Option<MessageQueue>>,
}

impl ProcessEntry {
    fn new(pid: ProcessId, name: String, queue_capacity: usize) -> Self {
        Self {
            pid,
            name,
            registered_at: Instant::now(),
            mailbox: SpinMutex::new(Some(MessageQueue::new(queue_capacity))),
        }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Enqueue `msg` under this entry's lock. Returns `true` if the oldest
    /// queued message was evicted to make room.
    ///
    /// # Errors
    /// `DestinationNotFound` if the entry was unregistered meanwhile.
    pub fn deliver(&self, msg: Message) -> Result<bool> {
        let mut mailbox = self.mailbox.lock();
        let queue = mailbox
            .as_mut()
            .ok_or_else(|| MqError::DestinationNotFound(self.name.clone()))?;
        let evicted = queue.enqueue(msg);
        drop(mailbox);
        if evicted {
            log::warn!("mailbox of \"{}\" full, oldest message overwritten", self.name);
        }
        Ok(evicted)
    }

    /// Dequeue the oldest message under this entry's lock.
    ///
    /// # Errors
    /// `QueueEmpty` if nothing is queued, `NotRegistered` on a retired entry.
    pub fn take_message(&self) -> Result<Message> {
        let mut mailbox = self.mailbox.lock();
        mailbox.as_mut().ok_or(MqError::NotRegistered)?.dequeue()
    }

    /// Number of messages waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.lock().as_ref().map_or(0, MessageQueue::len)
    }

    /// Whether the entry has been unregistered.
    pub fn is_retired(&self) -> bool {
        self.mailbox.lock().is_none()
    }

    /// Run `f` against the mailbox while holding the entry lock.
    pub fn with_queue<R>(&self, f: impl FnOnce(&MessageQueue) -> R) -> Option<R> {
        self.mailbox.lock().as_ref().map(f)
    }

    /// Detach and free the mailbox. Returns how many messages were freed.
    fn retire(&self) -> usize {
        let queue = self.mailbox.lock().take();
        queue.map_or(0, |mut q| q.clear())
    }
}

impl fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Table {
    entries: Slab<Arc<ProcessEntry>>,
    order: Vec<usize>,
    by_id: HashMap<ProcessId, usize>,
    by_name: HashMap<String, usize>,
}

impl Table {
    fn check_invariants(&self) {
        debug_assert_eq!(self.order.len(), self.entries.len());
        debug_assert_eq!(self.by_id.len(), self.entries.len());
        debug_assert_eq!(self.by_name.len(), self.entries.len());
    }

    fn get(&self, key: usize) -> Option<Arc<ProcessEntry>> {
        self.entries.get(key).map(Arc::clone)
    }
}

/// All registered processes, searchable by identity or by name.
pub struct Directory {
    table: Mutex<Table>,
    max_entries: usize,
    queue_capacity: usize,
}

impl Directory {
    /// Create an empty directory holding at most `max_entries` processes,
    /// each with a mailbox of `queue_capacity` slots (at least one; zero
    /// asserts in debug builds).
    pub fn new(max_entries: usize, queue_capacity: usize) -> Self {
        debug_assert!(queue_capacity > 0, "mailbox capacity must be non-zero");
        Self {
            table: Mutex::new(Table::default()),
            max_entries,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Configured maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn len(&self) -> usize {
        self.table.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `pid` under `name`.
    ///
    /// Uniqueness checks and the insertion happen under one directory lock.
    ///
    /// # Errors
    /// `AlreadyRegisteredByIdAndName`, `AlreadyRegisteredById`,
    /// `AlreadyRegisteredByName`, `CapacityExceeded`, or `MalformedCommand`
    /// for an empty name.
    pub fn register(&self, pid: ProcessId, name: &str) -> Result<Arc<ProcessEntry>> {
        if name.is_empty() {
            return Err(MqError::MalformedCommand("empty process name"));
        }
        let mut table = self.table.lock();
        let id_taken = table.by_id.contains_key(&pid);
        let name_taken = table.by_name.contains_key(name);
        match (id_taken, name_taken) {
            (true, true) => return Err(MqError::AlreadyRegisteredByIdAndName(name.to_owned())),
            (true, false) => return Err(MqError::AlreadyRegisteredById),
            (false, true) => return Err(MqError::AlreadyRegisteredByName(name.to_owned())),
            (false, false) => {}
        }
        if table.order.len() >= self.max_entries {
            log::warn!("directory full, process {pid} not registered");
            return Err(MqError::CapacityExceeded(table.order.len()));
        }

        let entry = Arc::new(ProcessEntry::new(pid, name.to_owned(), self.queue_capacity));
        let key = table.entries.insert(Arc::clone(&entry));
        table.order.push(key);
        table.by_id.insert(pid, key);
        table.by_name.insert(name.to_owned(), key);
        table.check_invariants();
        drop(table);

        log::info!("registered pid={pid} name=\"{name}\"");
        Ok(entry)
    }

    /// Remove `pid` and free every message still queued for it.
    /// Returns the number of messages freed.
    ///
    /// The entry is unlinked before its mailbox is freed, so no lookup can
    /// return a half-destroyed entry.
    ///
    /// # Errors
    /// `NotRegistered` if `pid` has no entry.
    pub fn unregister(&self, pid: ProcessId) -> Result<usize> {
        let entry = {
            let mut table = self.table.lock();
            let key = table.by_id.remove(&pid).ok_or(MqError::NotRegistered)?;
            let entry = table.entries.remove(key);
            table.by_name.remove(entry.name());
            table.order.retain(|&k| k != key);
            table.check_invariants();
            entry
        };
        let freed = entry.retire();
        log::info!(
            "unregistered pid={pid} name=\"{}\" after {:?} ({freed} queued messages freed)",
            entry.name(),
            entry.registered_at().elapsed()
        );
        Ok(freed)
    }

    pub fn lookup_by_id(&self, pid: ProcessId) -> Option<Arc<ProcessEntry>> {
        let table = self.table.lock();
        table.by_id.get(&pid).and_then(|&k| table.get(k))
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<ProcessEntry>> {
        let table = self.table.lock();
        table.by_name.get(name).and_then(|&k| table.get(k))
    }

    /// Snapshot of every entry in traversal order.
    pub fn enumerate(&self) -> Vec<Arc<ProcessEntry>> {
        let table = self.table.lock();
        table.order.iter().filter_map(|&k| table.get(k)).collect()
    }

    /// Registered names in traversal order.
    pub fn names(&self) -> Vec<String> {
        self.enumerate().iter().map(|e| e.name().to_owned()).collect()
    }

    /// Unregister every entry. Returns how many were removed.
    pub fn drain(&self) -> usize {
        let mut removed = 0;
        loop {
            let head = {
                let table = self.table.lock();
                table.order.first().map(|&k| table.entries[k].pid())
            };
            let Some(pid) = head else { break };
            if self.unregister(pid).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}
