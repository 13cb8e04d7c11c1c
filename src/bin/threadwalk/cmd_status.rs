use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;

use ThreadWalk::metrics;
use ThreadWalk::paginate::dfs::Walk;
use ThreadWalk::paginate::PageContext;
use ThreadWalk::store::journal::journal_path;
use ThreadWalk::store::{JournalStore, OrderedStore};

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let store = JournalStore::open_ro(&path)?;
    let jpath = journal_path(&path);
    let journal_bytes = std::fs::metadata(&jpath).map(|m| m.len()).unwrap_or(0);

    let total = store.count()?;
    let roots = store.mem().root_count() as u64;

    // Полный pre-order обход: всё, что не достижимо от корней, — сироты
    let ctx = PageContext::new(&store);
    let mut reachable: u64 = 0;
    for n in Walk::new(&ctx) {
        n?;
        reachable += 1;
    }
    let unreachable = total.saturating_sub(reachable);

    let m = metrics::snapshot();

    if json {
        println!(
            "{}",
            json!({
                "path": path.display().to_string(),
                "journal": {
                    "file": jpath.display().to_string(),
                    "bytes": journal_bytes,
                },
                "nodes": {
                    "total": total,
                    "roots": roots,
                    "replies": total.saturating_sub(roots),
                    "reachable": reachable,
                    "unreachable": unreachable,
                },
                "walk": {
                    "seeks": m.store_seeks,
                    "lookups": m.store_lookups,
                    "integrity_violations": m.integrity_violations,
                },
            })
        );
        return Ok(());
    }

    println!("ThreadWalk status at {}", store.root().display());
    println!("  journal: {} ({} bytes)", jpath.display(), journal_bytes);
    println!(
        "  nodes:   {} total, {} roots, {} replies",
        total,
        roots,
        total.saturating_sub(roots)
    );
    println!("  walk:    {} reachable, {} unreachable", reachable, unreachable);
    println!(
        "  cost:    {} seeks (avg {:.2} rows), {} lookups",
        m.store_seeks,
        m.avg_seek_rows(),
        m.store_lookups
    );
    if m.integrity_violations > 0 {
        println!("  WARNING: {} missing parent reference(s)", m.integrity_violations);
    }
    Ok(())
}
