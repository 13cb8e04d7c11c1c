//! paginate — три стратегии курсорной пагинации леса.
//!
//! - flat.rs — "корень, его прямые ответы, следующий корень, …" (двухфазный автомат);
//! - tree.rs — только корни, к каждому жадно подвешены ответы до заданной глубины;
//! - dfs.rs  — pre-order обход всего леса через функцию-преемника find_next.
//!
//! Все стратегии работают через PageContext: явный хэндл хранилища, trace-хук,
//! бюджет запросов (дедлайн/флаг отмены) и политику целостности. Состояние между
//! запросами живёт только в курсоре — ядро не держит никакого разделяемого состояния.

pub mod dfs;
pub mod flat;
pub mod tree;

use anyhow::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::WalkConfig;
use crate::metrics::{record_count, record_lookup, record_query_cancelled, record_seek};
use crate::node::Node;
use crate::store::{OrderedStore, SeekQuery};
use crate::trace::{NoTrace, TraceEvent, TraceHook};

pub use crate::config::IntegrityPolicy;

/// Предвыделение под страницу: limit приходит снаружи и может быть сколь угодно большим.
pub(crate) const PAGE_PREALLOC: usize = 64;

/// One page of results plus the token for the following page (None at end of data).
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------- errors ----------------

/// A node's `parent_id` did not resolve during DFS ascent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParent {
    pub child: String,
    pub parent: String,
}

impl fmt::Display for MissingParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parent {} of node {} not found during ascent",
            self.parent, self.child
        )
    }
}

impl std::error::Error for MissingParent {}

/// A store query was refused by the page's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancelled {
    DeadlineExceeded,
    Requested,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineExceeded => f.write_str("query deadline exceeded"),
            Self::Requested => f.write_str("query cancelled"),
        }
    }
}

impl std::error::Error for Cancelled {}

// ---------------- budget ----------------

/// Deadline and/or cancel flag checked before every store query.
#[derive(Clone, Debug, Default)]
pub struct QueryBudget {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl QueryBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.deadline = Some(Instant::now() + d);
        self
    }

    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Shared flag; storing `true` cancels every following query.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn check(&self) -> Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                record_query_cancelled();
                return Err(Cancelled::Requested.into());
            }
        }
        if let Some(at) = self.deadline {
            if Instant::now() >= at {
                record_query_cancelled();
                return Err(Cancelled::DeadlineExceeded.into());
            }
        }
        Ok(())
    }
}

// ---------------- context ----------------

/// Everything a paginator needs for one page request.
pub struct PageContext<'a> {
    store: &'a dyn OrderedStore,
    trace: &'a dyn TraceHook,
    budget: QueryBudget,
    integrity: IntegrityPolicy,
}

impl<'a> PageContext<'a> {
    pub fn new(store: &'a dyn OrderedStore) -> Self {
        Self {
            store,
            trace: &NoTrace,
            budget: QueryBudget::unlimited(),
            integrity: IntegrityPolicy::default(),
        }
    }

    /// Integrity policy and per-page deadline from config.
    pub fn configured(mut self, cfg: &WalkConfig) -> Self {
        self.integrity = cfg.integrity;
        if let Some(ms) = cfg.query_timeout_ms {
            self.budget = self.budget.with_timeout(Duration::from_millis(ms));
        }
        self
    }

    pub fn with_trace(mut self, trace: &'a dyn TraceHook) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_budget(mut self, budget: QueryBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_integrity(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity = policy;
        self
    }

    pub fn integrity(&self) -> IntegrityPolicy {
        self.integrity
    }

    pub fn store(&self) -> &'a dyn OrderedStore {
        self.store
    }

    pub(crate) fn seek(&self, q: &SeekQuery) -> Result<Vec<Node>> {
        self.budget.check()?;
        let rows = self.store.seek(q)?;
        record_seek(rows.len());
        Ok(rows)
    }

    /// First row of a seek.
    pub(crate) fn seek_first(&self, q: SeekQuery) -> Result<Option<Node>> {
        Ok(self.seek(&q.limit(1))?.into_iter().next())
    }

    pub(crate) fn get(&self, id: &str) -> Result<Option<Node>> {
        self.budget.check()?;
        record_lookup();
        self.store.get(id)
    }

    pub fn count(&self) -> Result<u64> {
        self.budget.check()?;
        record_count();
        self.store.count()
    }

    #[inline]
    pub(crate) fn emit(&self, ev: TraceEvent) {
        self.trace.on_event(&ev);
    }
}

/// Paginators never hand back the token they were given.
pub(crate) fn forward_only(next: Option<String>, input: &Option<String>) -> Option<String> {
    next.filter(|t| Some(t) != input.as_ref())
}
