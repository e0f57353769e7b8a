//! Durable key-value storage backends.
//!
//! RULE: Only store.rs talks to the database.
//! The persistence adapter reads and writes opaque strings by key;
//! it never executes SQL directly.

use crate::error::{MilestoneError, MilestoneResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

/// String-keyed durable storage, the engine's equivalent of a
/// browser's local storage.
pub trait StateStorage {
    fn get(&self, key: &str) -> MilestoneResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> MilestoneResult<()>;
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`. URI paths such as
    /// `file:state?mode=memory&cache=shared` are accepted.
    pub fn open(path: &str) -> MilestoneResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open a private in-memory database (used in tests).
    pub fn in_memory() -> MilestoneResult<Self> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> MilestoneResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_kv_store.sql"))?;
        Ok(())
    }
}

impl StateStorage for SqliteStorage {
    fn get(&self, key: &str) -> MilestoneResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> MilestoneResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-process storage. Clones share the same map, so a test can keep a
/// handle after giving one to the engine and reopen against it later.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries:   Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<Cell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full quota would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    /// Write a raw entry directly, bypassing the engine.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl StateStorage for MemoryStorage {
    fn get(&self, key: &str) -> MilestoneResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> MilestoneResult<()> {
        if self.read_only.get() {
            return Err(MilestoneError::StorageUnavailable {
                reason: format!("quota exceeded writing '{key}'"),
            });
        }
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
