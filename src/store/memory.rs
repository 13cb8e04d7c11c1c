//! store/memory — MemStore: арена узлов + упорядоченный индекс.
//!
//! - nodes: id -> Node (точечный get).
//! - index: BTreeSet<(parent_id, created_at, id)>; seek — range-скан строго после ключа
//!   внутри одной группы братьев. Корни (parent_id = None) образуют отдельную группу.
//!
//! Дерево никогда не материализуется: обход опирается только на get/seek.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::metrics::record_insert;
use crate::node::{new_node_id, now_millis, Node};

use super::{OrderedStore, SeekQuery, UnknownParent};

type IndexKey = (Option<String>, DateTime<Utc>, String);

#[derive(Debug, Default)]
struct Inner {
    nodes: HashMap<String, Node>,
    index: BTreeSet<IndexKey>,
}

impl Inner {
    fn put(&mut self, node: Node) {
        if let Some(old) = self.nodes.remove(&node.id) {
            self.index
                .remove(&(old.parent_id.clone(), old.created_at, old.id.clone()));
        }
        self.index
            .insert((node.parent_id.clone(), node.created_at, node.id.clone()));
        self.nodes.insert(node.id.clone(), node);
    }
}

/// In-memory ordered store. Cheap to share behind `Arc`.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from fully-formed nodes (no parent checks).
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let store = Self::new();
        if let Ok(mut g) = store.inner.write() {
            for n in nodes {
                g.put(n);
            }
        }
        store
    }

    /// Insert a fully-formed node as-is (journal replay, fixtures).
    /// Referential integrity is NOT checked here.
    pub fn restore(&self, node: Node) -> Result<()> {
        self.write()?.put(node);
        Ok(())
    }

    /// Check a prospective insert and build the node without storing it.
    pub(crate) fn prepare(&self, content: &str, parent_id: Option<&str>) -> Result<Node> {
        if let Some(p) = parent_id {
            if !self.read()?.nodes.contains_key(p) {
                return Err(UnknownParent(p.to_string()).into());
            }
        }
        Ok(Node {
            id: new_node_id(),
            content: content.to_string(),
            parent_id: parent_id.map(str::to_string),
            created_at: now_millis(),
        })
    }

    pub fn len(&self) -> usize {
        self.read().map(|g| g.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of roots (диагностика для status).
    pub fn root_count(&self) -> usize {
        self.read()
            .map(|g| g.index.iter().take_while(|k| k.0.is_none()).count())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("mem store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("mem store lock poisoned"))
    }
}

impl OrderedStore for MemStore {
    fn get(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    fn seek(&self, query: &SeekQuery) -> Result<Vec<Node>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let group: Option<String> = query.parent.as_parent_id().map(str::to_string);
        let lower: Bound<IndexKey> = match &query.after {
            Some(k) => Bound::Excluded((group.clone(), k.created_at, k.id.clone())),
            None => Bound::Included((group.clone(), DateTime::<Utc>::MIN_UTC, String::new())),
        };

        let g = self.read()?;
        let mut out = Vec::with_capacity(query.limit.min(64));
        for (parent, _, id) in g.index.range((lower, Bound::Unbounded)) {
            if *parent != group || out.len() >= query.limit {
                break;
            }
            if let Some(n) = g.nodes.get(id) {
                out.push(n.clone());
            }
        }
        Ok(out)
    }

    fn count(&self) -> Result<u64> {
        Ok(self.read()?.nodes.len() as u64)
    }

    fn insert(&self, content: &str, parent_id: Option<&str>) -> Result<Node> {
        let node = self.prepare(content, parent_id)?;
        self.write()?.put(node.clone());
        record_insert();
        Ok(node)
    }
}
