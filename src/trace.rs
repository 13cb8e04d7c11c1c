//! Trace hooks for the paginators.
//!
//! Хуки только наблюдают: они получают событие по ссылке и ничего не возвращают,
//! поэтому на ветвление обхода повлиять не могут. По умолчанию — NoTrace.

use std::sync::{Arc, Mutex};

/// A step taken by one of the paginators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    /// Flat pager resumed replies of a parent.
    ReplyScan { parent: String, fetched: usize },
    /// Flat/tree pager consumed a root.
    Root { id: String },
    /// Replies of `parent` are exhausted; back to roots.
    ParentDone { parent: String },
    /// DFS descended into the first child.
    Descend { from: String, to: String },
    /// DFS moved to the next sibling (of self or an ancestor).
    Sibling { from: String, to: String },
    /// DFS climbed from a node to its parent.
    Ascend { from: String, to: String },
    /// DFS moved to the next root (or started the walk).
    NextRoot { to: String },
    /// DFS found no successor.
    Exhausted,
    /// A parent reference did not resolve during ascent.
    MissingParent { child: String, parent: String },
    /// Page assembled.
    PageDone { items: usize, has_next: bool },
}

pub trait TraceHook: Send + Sync {
    fn on_event(&self, ev: &TraceEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrace;

impl TraceHook for NoTrace {
    #[inline]
    fn on_event(&self, _ev: &TraceEvent) {}
}

/// Forwards events to `log` at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceHook for LogTrace {
    fn on_event(&self, ev: &TraceEvent) {
        log::trace!("[walk] {:?}", ev);
    }
}

/// Collects events in memory (tests, debugging tools).
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl TraceHook for Recorder {
    fn on_event(&self, ev: &TraceEvent) {
        if let Ok(mut g) = self.events.lock() {
            g.push(ev.clone());
        }
    }
}
