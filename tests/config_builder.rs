use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use ThreadWalk::config::{ConfigBuilder, IntegrityPolicy, WalkConfig};
use ThreadWalk::paginate::{dfs, PageContext};
use ThreadWalk::store::{JournalStore, OrderedStore};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("twtest-builder-{prefix}-{pid}-{t}-{id}"))
}

#[test]
fn defaults_are_stable() {
    let cfg = ConfigBuilder::from_default().build();
    assert_eq!(cfg.default_limit, 10);
    assert_eq!(cfg.max_limit, 50);
    assert_eq!(cfg.tree_depth, 2);
    assert_eq!(cfg.integrity, IntegrityPolicy::EndTraversal);
    assert_eq!(cfg.query_timeout_ms, None);
    assert!(!cfg.journal_fsync);
    assert_eq!(cfg.http_workers, 4);
    let s = cfg.to_string();
    assert!(s.contains("integrity: end"), "{}", s);
}

#[test]
fn limit_resolution() {
    let cfg = WalkConfig::default().with_default_limit(10).with_max_limit(50);
    assert_eq!(cfg.resolve_limit(None), 10);
    assert_eq!(cfg.resolve_limit(Some("")), 10);
    assert_eq!(cfg.resolve_limit(Some("x1")), 10);
    assert_eq!(cfg.resolve_limit(Some("0")), 10);
    assert_eq!(cfg.resolve_limit(Some("-5")), 10);
    assert_eq!(cfg.resolve_limit(Some(" 7 ")), 7);
    assert_eq!(cfg.resolve_limit(Some("50")), 50);
    assert_eq!(cfg.resolve_limit(Some("51")), 50);
    // ведущее целое, как parseInt: хвост отбрасывается, огромное упирается в max
    assert_eq!(cfg.resolve_limit(Some("10.5")), 10);
    assert_eq!(cfg.resolve_limit(Some("12abc")), 12);
    assert_eq!(cfg.resolve_limit(Some("+3")), 3);
    assert_eq!(cfg.resolve_limit(Some(".5")), 10);
    assert_eq!(cfg.resolve_limit(Some("99999999999999999999")), 50);

    // default больше max — всё равно не выше max
    let odd = WalkConfig::default().with_default_limit(80).with_max_limit(20);
    assert_eq!(odd.resolve_limit(None), 20);
}

#[test]
fn integrity_policy_parsing() {
    assert_eq!("end".parse::<IntegrityPolicy>(), Ok(IntegrityPolicy::EndTraversal));
    assert_eq!("FAIL".parse::<IntegrityPolicy>(), Ok(IntegrityPolicy::Fail));
    assert_eq!(" strict ".parse::<IntegrityPolicy>(), Ok(IntegrityPolicy::Fail));
    assert!("sometimes".parse::<IntegrityPolicy>().is_err());
}

#[test]
fn env_overrides_then_builder_wins() {
    // единственный тест, трогающий TW_* в этом бинаре
    std::env::set_var("TW_MAX_LIMIT", "25");
    std::env::set_var("TW_INTEGRITY", "fail");
    std::env::set_var("TW_QUERY_TIMEOUT_MS", "0");
    std::env::set_var("TW_JOURNAL_FSYNC", "yes");

    let from_env = ConfigBuilder::new().build();
    assert_eq!(from_env.max_limit, 25);
    assert_eq!(from_env.integrity, IntegrityPolicy::Fail);
    assert_eq!(from_env.query_timeout_ms, None);
    assert!(from_env.journal_fsync);

    let overridden = ConfigBuilder::new()
        .max_limit(40)
        .integrity(IntegrityPolicy::EndTraversal)
        .http_workers(0)
        .build();
    assert_eq!(overridden.max_limit, 40);
    assert_eq!(overridden.integrity, IntegrityPolicy::EndTraversal);
    assert_eq!(overridden.http_workers, 1);

    for k in ["TW_MAX_LIMIT", "TW_INTEGRITY", "TW_QUERY_TIMEOUT_MS", "TW_JOURNAL_FSYNC"] {
        std::env::remove_var(k);
    }
}

#[test]
fn configured_context_uses_integrity_policy() -> Result<()> {
    let root = unique_root("ctx");
    let store = JournalStore::open(&root, false)?;
    let r = store.insert("r", None)?;
    store.insert("a", Some(&r.id))?;

    let cfg = ConfigBuilder::from_default()
        .integrity(IntegrityPolicy::Fail)
        .query_timeout_ms(Some(60_000))
        .build();
    let ctx = PageContext::new(&store).configured(&cfg);
    assert_eq!(ctx.integrity(), IntegrityPolicy::Fail);
    let p = dfs::page(&ctx, None, cfg.default_limit)?;
    assert_eq!(p.len(), 2);
    assert_eq!(p.next_cursor, None);

    drop(store);
    std::fs::remove_dir_all(&root)?;
    Ok(())
}
