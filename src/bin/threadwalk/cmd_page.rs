use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;

use ThreadWalk::config::WalkConfig;
use ThreadWalk::paginate::tree::Thread;
use ThreadWalk::paginate::{dfs, flat, tree, PageContext};
use ThreadWalk::store::JournalStore;
use ThreadWalk::trace::LogTrace;

use crate::cli::Mode;
use crate::util::node_line;

pub fn exec(
    path: PathBuf,
    mode: Mode,
    cursor: Option<String>,
    limit: Option<String>,
    json: bool,
) -> Result<()> {
    let cfg = WalkConfig::from_env();
    // RO: можно читать рядом с работающим serve
    let store = JournalStore::open_ro(&path)?;
    let ctx = PageContext::new(&store)
        .configured(&cfg)
        .with_trace(&LogTrace);
    let limit = cfg.resolve_limit(limit.as_deref());
    let token = cursor.as_deref().filter(|s| !s.is_empty());

    match mode {
        Mode::Flat | Mode::Dfs => {
            let page = if mode == Mode::Flat {
                flat::page(&ctx, token, limit)?
            } else {
                dfs::page(&ctx, token, limit)?
            };
            if json {
                let n = page.len();
                println!(
                    "{}",
                    json!({
                        "comments": page.items,
                        "nextCursor": page.next_cursor,
                        "totalItemsInPage": n,
                    })
                );
            } else {
                for n in &page.items {
                    let indent = if n.is_root() { 0 } else { 1 };
                    println!("{}", node_line(n, indent));
                }
                print_next(page.next_cursor.as_deref());
            }
        }
        Mode::Tree => {
            let page = tree::page(&ctx, token, limit, cfg.tree_depth)?;
            if json {
                println!(
                    "{}",
                    json!({
                        "comments": page.items,
                        "nextCursor": page.next_cursor,
                    })
                );
            } else {
                for t in &page.items {
                    print_thread(t, 0);
                }
                print_next(page.next_cursor.as_deref());
            }
        }
    }
    Ok(())
}

fn print_thread(t: &Thread, depth: usize) {
    let line = node_line(&t.node, depth);
    match &t.count {
        Some(c) => println!("{}  [{} replies]", line, c.replies),
        None => println!("{}", line),
    }
    if let Some(rs) = &t.replies {
        for r in rs {
            print_thread(r, depth + 1);
        }
    }
}

fn print_next(next: Option<&str>) {
    match next {
        Some(c) => println!("next: {}", c),
        None => println!("next: (end)"),
    }
}
