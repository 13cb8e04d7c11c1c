//! Lightweight global metrics for ThreadWalk.
//!
//! Потокобезопасные атомарные счётчики:
//! - store (seek / point lookup / count / insert)
//! - пагинаторы (страницы, выданные элементы)
//! - курсоры (отброшенные токены)
//! - DFS (нарушения ссылочной целостности)
//! - бюджеты запросов (отмены/таймауты)
//!
//! `render_prometheus()` отдаёт текстовую экспозицию для /metrics.

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Store -----
static STORE_SEEKS: AtomicU64 = AtomicU64::new(0);
static STORE_SEEK_ROWS: AtomicU64 = AtomicU64::new(0);
static STORE_LOOKUPS: AtomicU64 = AtomicU64::new(0);
static STORE_COUNTS: AtomicU64 = AtomicU64::new(0);
static NODES_INSERTED: AtomicU64 = AtomicU64::new(0);

// ----- Pages -----
static PAGES_FLAT: AtomicU64 = AtomicU64::new(0);
static PAGES_TREE: AtomicU64 = AtomicU64::new(0);
static PAGES_DFS: AtomicU64 = AtomicU64::new(0);
static ITEMS_SERVED: AtomicU64 = AtomicU64::new(0);

// ----- Cursors / DFS / budget -----
static CURSOR_REJECTED: AtomicU64 = AtomicU64::new(0);
static INTEGRITY_VIOLATIONS: AtomicU64 = AtomicU64::new(0);
static QUERIES_CANCELLED: AtomicU64 = AtomicU64::new(0);

/// Which paginator produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Flat,
    Tree,
    Dfs,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub store_seeks: u64,
    pub store_seek_rows: u64,
    pub store_lookups: u64,
    pub store_counts: u64,
    pub nodes_inserted: u64,

    pub pages_flat: u64,
    pub pages_tree: u64,
    pub pages_dfs: u64,
    pub items_served: u64,

    pub cursor_rejected: u64,
    pub integrity_violations: u64,
    pub queries_cancelled: u64,
}

impl MetricsSnapshot {
    pub fn pages_total(&self) -> u64 {
        self.pages_flat + self.pages_tree + self.pages_dfs
    }

    /// Average rows returned per seek.
    pub fn avg_seek_rows(&self) -> f64 {
        if self.store_seeks == 0 {
            0.0
        } else {
            self.store_seek_rows as f64 / self.store_seeks as f64
        }
    }
}

// ----- Recorders (store) -----
pub fn record_seek(rows: usize) {
    STORE_SEEKS.fetch_add(1, Ordering::Relaxed);
    STORE_SEEK_ROWS.fetch_add(rows as u64, Ordering::Relaxed);
}

pub fn record_lookup() {
    STORE_LOOKUPS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_count() {
    STORE_COUNTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_insert() {
    NODES_INSERTED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (pages) -----
pub fn record_page(kind: PageKind, items: usize) {
    let c = match kind {
        PageKind::Flat => &PAGES_FLAT,
        PageKind::Tree => &PAGES_TREE,
        PageKind::Dfs => &PAGES_DFS,
    };
    c.fetch_add(1, Ordering::Relaxed);
    ITEMS_SERVED.fetch_add(items as u64, Ordering::Relaxed);
}

// ----- Recorders (misc) -----
pub fn record_cursor_rejected() {
    CURSOR_REJECTED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_integrity_violation() {
    INTEGRITY_VIOLATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_query_cancelled() {
    QUERIES_CANCELLED.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of all counters.
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        store_seeks: STORE_SEEKS.load(Ordering::Relaxed),
        store_seek_rows: STORE_SEEK_ROWS.load(Ordering::Relaxed),
        store_lookups: STORE_LOOKUPS.load(Ordering::Relaxed),
        store_counts: STORE_COUNTS.load(Ordering::Relaxed),
        nodes_inserted: NODES_INSERTED.load(Ordering::Relaxed),

        pages_flat: PAGES_FLAT.load(Ordering::Relaxed),
        pages_tree: PAGES_TREE.load(Ordering::Relaxed),
        pages_dfs: PAGES_DFS.load(Ordering::Relaxed),
        items_served: ITEMS_SERVED.load(Ordering::Relaxed),

        cursor_rejected: CURSOR_REJECTED.load(Ordering::Relaxed),
        integrity_violations: INTEGRITY_VIOLATIONS.load(Ordering::Relaxed),
        queries_cancelled: QUERIES_CANCELLED.load(Ordering::Relaxed),
    }
}

/// Reset all counters (useful in tests/benchmarks).
pub fn reset() {
    for c in [
        &STORE_SEEKS,
        &STORE_SEEK_ROWS,
        &STORE_LOOKUPS,
        &STORE_COUNTS,
        &NODES_INSERTED,
        &PAGES_FLAT,
        &PAGES_TREE,
        &PAGES_DFS,
        &ITEMS_SERVED,
        &CURSOR_REJECTED,
        &INTEGRITY_VIOLATIONS,
        &QUERIES_CANCELLED,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}

fn metric(out: &mut String, name: &str, kind: &str, help: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("# HELP threadwalk_{} {}\n", name, help));
    out.push_str(&format!("# TYPE threadwalk_{} {}\n", name, kind));
    out.push_str(&format!("threadwalk_{} {}\n", name, value));
}

/// Prometheus text exposition (version 0.0.4).
pub fn render_prometheus(total_nodes: Option<u64>) -> String {
    let m = snapshot();
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP threadwalk_build_info Build info.\n");
    out.push_str("# TYPE threadwalk_build_info gauge\n");
    out.push_str(&format!("threadwalk_build_info{{version=\"{}\"}} 1\n", ver));

    // --- store ---
    metric(&mut out, "store_seeks_total", "counter", "Ordered seek queries issued.", m.store_seeks);
    metric(
        &mut out,
        "store_seek_rows_total",
        "counter",
        "Rows returned by seek queries.",
        m.store_seek_rows,
    );
    metric(
        &mut out,
        "store_seek_rows_avg",
        "gauge",
        "Average rows per seek.",
        format!("{:.2}", m.avg_seek_rows()),
    );
    metric(&mut out, "store_lookups_total", "counter", "Point lookups by id.", m.store_lookups);
    metric(&mut out, "store_counts_total", "counter", "Total-count queries.", m.store_counts);
    metric(
        &mut out,
        "nodes_inserted_total",
        "counter",
        "Nodes inserted since start.",
        m.nodes_inserted,
    );

    // --- pages ---
    out.push_str("# HELP threadwalk_pages_total Pages served per paginator.\n");
    out.push_str("# TYPE threadwalk_pages_total counter\n");
    out.push_str(&format!("threadwalk_pages_total{{kind=\"flat\"}} {}\n", m.pages_flat));
    out.push_str(&format!("threadwalk_pages_total{{kind=\"tree\"}} {}\n", m.pages_tree));
    out.push_str(&format!("threadwalk_pages_total{{kind=\"dfs\"}} {}\n", m.pages_dfs));
    metric(
        &mut out,
        "items_served_total",
        "counter",
        "Items returned across all pages.",
        m.items_served,
    );

    // --- misc ---
    metric(
        &mut out,
        "cursor_rejected_total",
        "counter",
        "Cursor tokens that failed to decode.",
        m.cursor_rejected,
    );
    metric(
        &mut out,
        "integrity_violations_total",
        "counter",
        "Missing parents met during DFS ascent.",
        m.integrity_violations,
    );
    metric(
        &mut out,
        "queries_cancelled_total",
        "counter",
        "Queries refused by an expired or cancelled budget.",
        m.queries_cancelled,
    );

    if let Some(n) = total_nodes {
        metric(&mut out, "nodes", "gauge", "Nodes in the store.", n);
    }

    out
}
