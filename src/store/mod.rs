//! store — упорядоченный keyset-интерфейс над узлами леса.
//!
//! Ядро пагинации знает о хранилище только через `OrderedStore`:
//! - get(id)            — точечный поиск;
//! - seek(query)        — узлы с заданным родителем (или корни), строго после ключа,
//!                        в порядке (created_at, id), не больше limit;
//! - count()            — общее число узлов;
//! - insert(content, parent) — новый узел.
//!
//! Реализации:
//! - memory.rs  — MemStore: арена по id + упорядоченный индекс (parent, created_at, id).
//! - journal.rs — JournalStore: MemStore + CRC-журнал на диске (replay при открытии).
//! - lock.rs    — advisory lock единственного писателя журнала.

pub mod journal;
pub mod lock;
pub mod memory;

use anyhow::Result;
use std::fmt;

use crate::node::{Node, NodeKey};

pub use journal::JournalStore;
pub use memory::MemStore;

/// Which sibling group a seek scans.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParentFilter {
    /// `parent_id IS NULL`
    Root,
    /// `parent_id = X`
    ChildOf(String),
}

impl ParentFilter {
    pub fn of(parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(p) => Self::ChildOf(p.to_string()),
            None => Self::Root,
        }
    }

    pub fn as_parent_id(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::ChildOf(p) => Some(p.as_str()),
        }
    }
}

/// Ordered seek: nodes of one sibling group strictly after `after`, ascending by
/// (created_at, id), at most `limit` rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeekQuery {
    pub parent: ParentFilter,
    pub after: Option<NodeKey>,
    pub limit: usize,
}

impl SeekQuery {
    pub fn roots() -> Self {
        Self {
            parent: ParentFilter::Root,
            after: None,
            limit: 1,
        }
    }

    pub fn children_of(parent_id: &str) -> Self {
        Self {
            parent: ParentFilter::ChildOf(parent_id.to_string()),
            after: None,
            limit: 1,
        }
    }

    /// Next siblings: same parent, strictly after `key`.
    pub fn siblings_of(parent_id: Option<&str>, key: NodeKey) -> Self {
        Self {
            parent: ParentFilter::of(parent_id),
            after: Some(key),
            limit: 1,
        }
    }

    pub fn after(mut self, key: Option<NodeKey>) -> Self {
        self.after = key;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = n;
        self
    }
}

/// Ordered, seek-after query surface over nodes.
pub trait OrderedStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Node>>;
    fn seek(&self, query: &SeekQuery) -> Result<Vec<Node>>;
    fn count(&self) -> Result<u64>;
    fn insert(&self, content: &str, parent_id: Option<&str>) -> Result<Node>;
}

/// Insert refused: `parent_id` does not name an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownParent(pub String);

impl fmt::Display for UnknownParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parent {} does not exist", self.0)
    }
}

impl std::error::Error for UnknownParent {}
