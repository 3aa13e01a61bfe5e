//! Opaque handle registry
//!
//! Hosts never see pointers. Every live database, connection and prepared
//! statement is addressed by a 64-bit handle laid out as:
//!
//! ```text
//!  63      56 55            32 31              0
//! +----------+----------------+----------------+
//! | kind tag |   generation   |   slot index   |
//! +----------+----------------+----------------+
//! ```
//!
//! The kind tag is never zero, so 0 is never a valid handle. A slot's
//! generation is bumped every time it is freed, which turns a stale handle
//! into a lookup miss instead of a use-after-free. A handle of the wrong
//! kind misses on the tag.
//!
//! Handles remember their parent. Removing a database removes its
//! connections and removing a connection removes its statements.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::engine::{Connection, Database, PreparedStatement};
use crate::error::{BridgeError, HandleKind, Result};

const TAG_SHIFT: u32 = 56;
const GENERATION_SHIFT: u32 = 32;
const GENERATION_MASK: u64 = 0x00ff_ffff;
const INDEX_MASK: u64 = 0xffff_ffff;

/// Raw handle value as seen by hosts
pub type RawHandle = u64;

/// Decoded form of a raw handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandleParts {
    tag: u64,
    generation: u32,
    index: u32,
}

impl HandleParts {
    fn encode(self) -> RawHandle {
        (self.tag << TAG_SHIFT)
            | ((u64::from(self.generation) & GENERATION_MASK) << GENERATION_SHIFT)
            | u64::from(self.index)
    }

    fn decode(raw: RawHandle) -> Self {
        Self {
            tag: raw >> TAG_SHIFT,
            generation: ((raw >> GENERATION_SHIFT) & GENERATION_MASK) as u32,
            index: (raw & INDEX_MASK) as u32,
        }
    }
}

/// Kind encoded in a raw handle, if the tag is known
pub fn kind_of(raw: RawHandle) -> Option<HandleKind> {
    let tag = raw >> TAG_SHIFT;
    [HandleKind::Database, HandleKind::Connection, HandleKind::Statement]
        .into_iter()
        .find(|kind| kind.tag() == tag)
}

struct Slot<T> {
    generation: u32,
    live: Option<Live<T>>,
}

struct Live<T> {
    resource: Arc<Mutex<T>>,
    parent: Option<RawHandle>,
}

/// Generational slot map for one resource kind
pub struct HandleTable<T> {
    kind: HandleKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> HandleTable<T> {
    /// Empty table issuing handles of `kind`
    pub fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when nothing is live
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn insert(&mut self, resource: T, parent: Option<RawHandle>) -> RawHandle {
        let live = Live {
            resource: Arc::new(Mutex::new(resource)),
            parent,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].live = Some(live);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: Some(live),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.live += 1;
        HandleParts {
            tag: self.kind.tag(),
            generation: self.slots[index as usize].generation,
            index,
        }
        .encode()
    }

    fn find(&self, raw: RawHandle) -> Option<&Live<T>> {
        let parts = HandleParts::decode(raw);
        if parts.tag != self.kind.tag() {
            return None;
        }
        let slot = self.slots.get(parts.index as usize)?;
        if slot.generation != parts.generation {
            return None;
        }
        slot.live.as_ref()
    }

    /// Shared reference to the resource behind `raw`
    pub fn get(&self, raw: RawHandle) -> Result<Arc<Mutex<T>>> {
        self.find(raw)
            .map(|live| Arc::clone(&live.resource))
            .ok_or(BridgeError::InvalidHandle(self.kind))
    }

    /// Whether `raw` refers to a live entry of this table
    pub fn contains(&self, raw: RawHandle) -> bool {
        self.find(raw).is_some()
    }

    fn remove(&mut self, raw: RawHandle) -> Option<Live<T>> {
        self.find(raw)?;
        let index = HandleParts::decode(raw).index;
        let slot = &mut self.slots[index as usize];
        let live = slot.live.take()?;
        slot.generation = (slot.generation + 1) & GENERATION_MASK as u32;
        self.free.push(index);
        self.live -= 1;
        Some(live)
    }
}

/// A resource taken out of the registry
///
/// Dropping it releases the engine object, so callers hold on to it until
/// the registry lock is released.
pub enum Removed {
    /// Closed database
    Database(Arc<Mutex<Database>>),
    /// Closed connection
    Connection(Arc<Mutex<Connection>>),
    /// Destroyed statement
    Statement(Arc<Mutex<PreparedStatement>>),
}

/// All live handles of a process
pub struct Registry {
    databases: HandleTable<Database>,
    connections: HandleTable<Connection>,
    statements: HandleTable<PreparedStatement>,
    children: FxHashMap<RawHandle, Vec<RawHandle>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            databases: HandleTable::new(HandleKind::Database),
            connections: HandleTable::new(HandleKind::Connection),
            statements: HandleTable::new(HandleKind::Statement),
            children: FxHashMap::default(),
        }
    }

    fn adopt(&mut self, parent: RawHandle, child: RawHandle) {
        self.children.entry(parent).or_default().push(child);
    }

    /// Register an open database
    pub fn insert_database(&mut self, db: Database) -> RawHandle {
        self.databases.insert(db, None)
    }

    /// Register a connection derived from database `parent`
    pub fn insert_connection(&mut self, parent: RawHandle, conn: Connection) -> Result<RawHandle> {
        if !self.databases.contains(parent) {
            return Err(BridgeError::InvalidHandle(HandleKind::Database));
        }
        let handle = self.connections.insert(conn, Some(parent));
        self.adopt(parent, handle);
        Ok(handle)
    }

    /// Register a statement prepared on connection `parent`
    pub fn insert_statement(
        &mut self,
        parent: RawHandle,
        stmt: PreparedStatement,
    ) -> Result<RawHandle> {
        if !self.connections.contains(parent) {
            return Err(BridgeError::InvalidHandle(HandleKind::Connection));
        }
        let handle = self.statements.insert(stmt, Some(parent));
        self.adopt(parent, handle);
        Ok(handle)
    }

    /// Look up a database
    pub fn database(&self, raw: RawHandle) -> Result<Arc<Mutex<Database>>> {
        self.databases.get(raw)
    }

    /// Look up a connection
    pub fn connection(&self, raw: RawHandle) -> Result<Arc<Mutex<Connection>>> {
        self.connections.get(raw)
    }

    /// Look up a prepared statement
    pub fn statement(&self, raw: RawHandle) -> Result<Arc<Mutex<PreparedStatement>>> {
        self.statements.get(raw)
    }

    /// Live (databases, connections, statements)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.databases.len(),
            self.connections.len(),
            self.statements.len(),
        )
    }

    /// Remove `raw` and everything derived from it
    ///
    /// Unknown, stale and zero handles remove nothing. Children come first
    /// in the returned list so they can be released before their parent.
    pub fn remove(&mut self, raw: RawHandle) -> Vec<Removed> {
        let mut removed = Vec::new();
        self.remove_into(raw, &mut removed);
        if !removed.is_empty() {
            debug!(handle = raw, released = removed.len(), "handles released");
        }
        removed
    }

    fn remove_into(&mut self, raw: RawHandle, removed: &mut Vec<Removed>) {
        let (entry, parent) = match kind_of(raw) {
            Some(HandleKind::Database) => match self.databases.remove(raw) {
                Some(live) => (Removed::Database(live.resource), live.parent),
                None => return,
            },
            Some(HandleKind::Connection) => match self.connections.remove(raw) {
                Some(live) => (Removed::Connection(live.resource), live.parent),
                None => return,
            },
            Some(HandleKind::Statement) => match self.statements.remove(raw) {
                Some(live) => (Removed::Statement(live.resource), live.parent),
                None => return,
            },
            None => return,
        };

        for child in self.children.remove(&raw).unwrap_or_default() {
            self.remove_into(child, removed);
        }
        if let Some(siblings) = parent.and_then(|p| self.children.get_mut(&p)) {
            siblings.retain(|&h| h != raw);
        }
        removed.push(entry);
    }
}
