use anyhow::Result;
use chrono::{TimeZone, Utc};

use ThreadWalk::metrics;
use ThreadWalk::node::Node;
use ThreadWalk::paginate::{dfs, flat, PageContext};
use ThreadWalk::store::{MemStore, OrderedStore};

fn n(id: &str, parent: Option<&str>, ms: i64) -> Node {
    Node {
        id: id.to_string(),
        content: id.to_string(),
        parent_id: parent.map(str::to_string),
        created_at: Utc.timestamp_millis_opt(ms).unwrap(),
    }
}

/// Один тест на бинарь: счётчики глобальные, reset() безопасен.
#[test]
fn dfs_cost_and_page_counters() -> Result<()> {
    metrics::reset();

    let store = MemStore::from_nodes(vec![
        n("r1", None, 1),
        n("a", Some("r1"), 2),
        n("r2", None, 3),
    ]);
    let ctx = PageContext::new(&store);

    let p = dfs::page(&ctx, None, 10)?;
    assert_eq!(p.len(), 3);

    let m = metrics::snapshot();
    // r1: seek roots; a: first child; r2: child? sibling? next root; конец: child? next root?
    assert_eq!(m.store_seeks, 7);
    assert_eq!(m.store_seek_rows, 3);
    assert_eq!(m.store_lookups, 1);
    assert_eq!(m.pages_dfs, 1);
    assert_eq!(m.pages_total(), 1);
    assert_eq!(m.items_served, 3);
    assert_eq!(m.cursor_rejected, 0);

    // мусорный курсор считается, но не ломает страницу
    let p = flat::page(&ctx, Some("@@@"), 1)?;
    assert_eq!(p.items[0].id, "r1");
    let m = metrics::snapshot();
    assert_eq!(m.cursor_rejected, 2); // decode + canonical
    assert_eq!(m.pages_flat, 1);

    store.insert("new", None)?;
    let m = metrics::snapshot();
    assert_eq!(m.nodes_inserted, 1);

    let text = metrics::render_prometheus(Some(store.count()?));
    assert!(text.contains("threadwalk_pages_total{kind=\"dfs\"} 1\n"));
    assert!(text.contains("threadwalk_nodes 4\n"));
    assert!(text.contains("threadwalk_store_lookups_total 1\n"));
    Ok(())
}
