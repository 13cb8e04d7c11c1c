use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use ThreadWalk::paginate::{dfs, PageContext};
use ThreadWalk::store::journal::{
    journal_path, write_record, JOURNAL_HDR_SIZE, JOURNAL_MAGIC, JOURNAL_REC_HDR_SIZE,
};
use ThreadWalk::store::lock::LOCK_FILE;
use ThreadWalk::store::{JournalStore, OrderedStore, UnknownParent};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("twtest-journal-{prefix}-{pid}-{t}-{id}"))
}

#[test]
fn reopen_replays_everything() -> Result<()> {
    let root = unique_root("replay");
    let (r, a, b) = {
        let s = JournalStore::open(&root, true)?;
        let r = s.insert("root", None)?;
        let a = s.insert("reply a", Some(&r.id))?;
        let b = s.insert("reply to a", Some(&a.id))?;
        assert_eq!(s.count()?, 3);
        (r, a, b)
    };
    assert!(root.join(LOCK_FILE).exists());

    let s = JournalStore::open(&root, false)?;
    assert_eq!(s.count()?, 3);
    assert_eq!(s.get(&b.id)?, Some(b.clone()));
    assert_eq!(s.get(&a.id)?.and_then(|n| n.parent_id), Some(r.id.clone()));

    let ctx = PageContext::new(&s);
    let p = dfs::page(&ctx, None, 10)?;
    assert_eq!(
        p.items.iter().map(|n| n.id.clone()).collect::<Vec<_>>(),
        vec![r.id, a.id, b.id]
    );
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn unknown_parent_is_rejected_and_not_journaled() -> Result<()> {
    let root = unique_root("unknown-parent");
    {
        let s = JournalStore::open(&root, false)?;
        let err = s.insert("orphan", Some("nope")).unwrap_err();
        assert!(err.downcast_ref::<UnknownParent>().is_some());
        s.insert("ok", None)?;
    }
    let len = fs::metadata(journal_path(&root))?.len();
    let s = JournalStore::open(&root, false)?;
    assert_eq!(s.count()?, 1);
    assert_eq!(fs::metadata(journal_path(&root))?.len(), len);
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn torn_tail_is_truncated_on_open() -> Result<()> {
    let root = unique_root("torn");
    {
        let s = JournalStore::open(&root, false)?;
        s.insert("one", None)?;
        s.insert("two", None)?;
    }
    let path = journal_path(&root);
    let good_len = fs::metadata(&path)?.len();

    // Недописанная запись: заголовок обещает 100 байт, есть только 3
    {
        let mut f = OpenOptions::new().append(true).open(&path)?;
        let mut hdr = [0u8; JOURNAL_REC_HDR_SIZE];
        hdr[0] = 100;
        f.write_all(&hdr)?;
        f.write_all(b"{\"i")?;
        f.sync_all()?;
    }
    assert!(fs::metadata(&path)?.len() > good_len);

    // RO-открытие видит всё целое, но файл не трогает
    {
        let ro = JournalStore::open_ro(&root)?;
        assert!(ro.is_readonly());
        assert_eq!(ro.count()?, 2);
        assert!(fs::metadata(&path)?.len() > good_len);
    }

    let s = JournalStore::open(&root, false)?;
    assert_eq!(s.count()?, 2);
    assert_eq!(fs::metadata(&path)?.len(), good_len);

    // После обрезки новые записи ложатся ровно за последней целой
    s.insert("three", None)?;
    drop(s);
    let s = JournalStore::open(&root, false)?;
    assert_eq!(s.count()?, 3);
    drop(s);
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn crc_mismatch_mid_file_is_corruption() -> Result<()> {
    let root = unique_root("crc");
    {
        let s = JournalStore::open(&root, false)?;
        s.insert("first", None)?;
        s.insert("second", None)?;
    }
    let path = journal_path(&root);
    {
        // Портим байт payload первой записи
        let mut f = OpenOptions::new().read(true).write(true).open(&path)?;
        let pos = JOURNAL_HDR_SIZE + JOURNAL_REC_HDR_SIZE as u64 + 2;
        f.seek(SeekFrom::Start(pos))?;
        f.write_all(b"X")?;
        f.sync_all()?;
    }
    let err = match JournalStore::open(&root, false) {
        Ok(_) => panic!("corrupted journal must not open"),
        Err(e) => e,
    };
    assert!(format!("{:#}", err).contains("crc mismatch"), "got: {:#}", err);
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn bad_magic_is_rejected() -> Result<()> {
    let root = unique_root("magic");
    fs::create_dir_all(&root)?;
    fs::write(journal_path(&root), b"NOTAJRNL")?;
    assert!(JournalStore::open_ro(&root).is_err());

    // Правильная магия + запись, собранная вручную, читается
    let mut buf = JOURNAL_MAGIC.to_vec();
    let node = r#"{"id":"x","comment":"hand-made","parentId":null,"createdAt":"2024-01-01T00:00:00.000Z"}"#;
    write_record(&mut buf, node.as_bytes())?;
    fs::write(journal_path(&root), &buf)?;
    let s = JournalStore::open_ro(&root)?;
    assert_eq!(s.get("x")?.map(|n| n.content), Some("hand-made".to_string()));
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn second_writer_is_locked_out() -> Result<()> {
    let root = unique_root("lock");
    let first = JournalStore::open(&root, false)?;
    assert!(JournalStore::open(&root, false).is_err());

    // читатели не блокируются
    let ro = JournalStore::open_ro(&root)?;
    assert!(ro.insert("nope", None).is_err());

    drop(first);
    let again = JournalStore::open(&root, false)?;
    again.insert("after unlock", None)?;
    drop(again);
    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn stray_bytes_after_last_record_do_not_poison_next_insert() -> Result<()> {
    let root = unique_root("stray");
    let path = journal_path(&root);
    {
        let s = JournalStore::open(&root, false)?;
        s.insert("one", None)?;
        let good_len = fs::metadata(&path)?.len();

        // Недописанная запись за последней целой (как после сбоя write посреди insert):
        // длиннее следующей записи, чтобы её не перекрыло целиком
        {
            let mut f = OpenOptions::new().append(true).open(&path)?;
            f.write_all(&[0xFFu8; 4096])?;
            f.sync_all()?;
        }

        s.insert("two", None)?;
        assert!(fs::metadata(&path)?.len() < good_len + 4096);
    }

    let s = JournalStore::open(&root, false)?;
    assert_eq!(s.count()?, 2);
    let ctx = PageContext::new(&s);
    let p = dfs::page(&ctx, None, 10)?;
    let mut got: Vec<&str> = p.items.iter().map(|n| n.content.as_str()).collect();
    got.sort();
    assert_eq!(got, ["one", "two"]);
    drop(s);
    fs::remove_dir_all(&root)?;
    Ok(())
}
