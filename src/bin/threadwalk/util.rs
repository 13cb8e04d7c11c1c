use anyhow::Result;
use std::path::Path;

use ThreadWalk::config::WalkConfig;
use ThreadWalk::node::{format_ts, Node};
use ThreadWalk::store::JournalStore;

/// Writable journal with fsync taken from config.
pub fn open_rw(path: &Path, cfg: &WalkConfig) -> Result<JournalStore> {
    JournalStore::open(path, cfg.journal_fsync)
}

/// One-line human rendering of a node; `indent` levels of two spaces.
pub fn node_line(n: &Node, indent: usize) -> String {
    format!(
        "{:width$}{} {} {}",
        "",
        format_ts(&n.created_at),
        n.id,
        one_line(&n.content),
        width = indent * 2
    )
}

pub fn one_line(s: &str) -> String {
    const MAX: usize = 80;
    let flat: String = s.chars().map(|c| if c.is_control() { ' ' } else { c }).collect();
    if flat.chars().count() > MAX {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{}…", cut)
    } else {
        flat
    }
}
