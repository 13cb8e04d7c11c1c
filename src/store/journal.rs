//! store/journal — JournalStore: MemStore поверх append-only журнала на диске.
//!
//! Формат <root>/comments.journal:
//!   [magic "TWJRNL01" 8 B]
//!   далее записи: [len u32 LE][crc32 u32 LE][payload = JSON Node, len байт]
//!
//! Поведение:
//! - open(): берёт writer-lock (<root>/LOCK), проигрывает журнал в MemStore.
//!   Частичный хвост (запись не уместилась в файл) — лёгкий EOF: файл обрезается до
//!   последней целой записи. CRC mismatch посреди файла — ошибка (порча данных).
//! - open_ro(): только replay, без lock и без обрезки хвоста; insert запрещён.
//! - insert(): сначала запись в журнал (+fsync, если включён), затем индекс в памяти.
//!   Запись идёт строго с конца последней целой записи; при ошибке write/fsync файл
//!   откатывается к этой границе, так что недописанный хвост не остаётся посреди журнала.

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher as Crc32;
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::metrics::record_insert;
use crate::node::Node;

use super::lock::{try_acquire_writer_lock, LockGuard};
use super::{MemStore, OrderedStore, SeekQuery};

pub const JOURNAL_FILE: &str = "comments.journal";
pub const JOURNAL_MAGIC: &[u8; 8] = b"TWJRNL01";
pub const JOURNAL_HDR_SIZE: u64 = 8;
pub const JOURNAL_REC_HDR_SIZE: usize = 8;

/// Upper bound for a single record payload (защита от мусорной длины).
pub const JOURNAL_MAX_RECORD: u32 = 16 * 1024 * 1024;

pub struct JournalStore {
    root: PathBuf,
    mem: MemStore,
    // None => read-only
    file: Option<Mutex<Tail>>,
    fsync: bool,
    _lock: Option<LockGuard>,
}

/// Writable end of the journal: file handle + offset right after the last good record.
struct Tail {
    f: File,
    end: u64,
}

impl Tail {
    fn append(&mut self, payload: &[u8], fsync: bool) -> Result<()> {
        let pos = self.end;
        match append_at(&mut self.f, pos, payload, fsync) {
            Ok(end) => {
                self.end = end;
                Ok(())
            }
            Err(e) => {
                if let Err(re) = self.f.set_len(pos) {
                    warn!("journal rollback to {} failed: {}", pos, re);
                }
                Err(e)
            }
        }
    }
}

/// Result of a journal replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: u64,
    /// Bytes of torn tail dropped (0 if the file ended cleanly).
    pub torn_tail_bytes: u64,
}

impl JournalStore {
    /// Open (or create) a writable journal under `root`.
    pub fn open(root: &Path, fsync: bool) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("create journal dir {}", root.display()))?;
        let lock = try_acquire_writer_lock(root)?;

        let path = journal_path(root);
        let mut f = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("open journal {}", path.display()))?;

        if f.metadata()?.len() == 0 {
            f.write_all(JOURNAL_MAGIC)?;
            f.sync_all()?;
        }

        let mem = MemStore::new();
        let stats = replay_into(&mut f, &mem)?;
        if stats.torn_tail_bytes > 0 {
            let good = f.metadata()?.len() - stats.torn_tail_bytes;
            warn!(
                "journal {}: dropping torn tail of {} bytes",
                path.display(),
                stats.torn_tail_bytes
            );
            f.set_len(good)?;
            f.sync_all()?;
        }
        let end = f.seek(SeekFrom::End(0))?;
        info!(
            "journal {} opened: {} records (writer lock {})",
            path.display(),
            stats.records,
            lock.path().display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            mem,
            file: Some(Mutex::new(Tail { f, end })),
            fsync,
            _lock: Some(lock),
        })
    }

    /// Open an existing journal read-only (no lock, no tail repair).
    pub fn open_ro(root: &Path) -> Result<Self> {
        let path = journal_path(root);
        let mut f = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("open journal {}", path.display()))?;
        let mem = MemStore::new();
        replay_into(&mut f, &mem)?;
        Ok(Self {
            root: root.to_path_buf(),
            mem,
            file: None,
            fsync: false,
            _lock: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_readonly(&self) -> bool {
        self.file.is_none()
    }

    /// In-memory view (diagnostics).
    pub fn mem(&self) -> &MemStore {
        &self.mem
    }
}

impl OrderedStore for JournalStore {
    fn get(&self, id: &str) -> Result<Option<Node>> {
        self.mem.get(id)
    }

    fn seek(&self, query: &SeekQuery) -> Result<Vec<Node>> {
        self.mem.seek(query)
    }

    fn count(&self) -> Result<u64> {
        self.mem.count()
    }

    fn insert(&self, content: &str, parent_id: Option<&str>) -> Result<Node> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| anyhow!("journal is opened read-only"))?;
        let node = self.mem.prepare(content, parent_id)?;
        let payload = serde_json::to_vec(&node).context("serialize node")?;
        {
            let mut tail = file
                .lock()
                .map_err(|_| anyhow!("journal file lock poisoned"))?;
            tail.append(&payload, self.fsync)?;
        }
        self.mem.restore(node.clone())?;
        record_insert();
        Ok(node)
    }
}

pub fn journal_path(root: &Path) -> PathBuf {
    root.join(JOURNAL_FILE)
}

fn crc_of(payload: &[u8]) -> u32 {
    let mut h = Crc32::new();
    h.update(payload);
    h.finalize()
}

// Чужие байты за `pos` (недописанная запись) отрезаются до записи.
fn append_at(f: &mut File, pos: u64, payload: &[u8], fsync: bool) -> Result<u64> {
    let len = f.metadata()?.len();
    if len != pos {
        warn!(
            "journal: dropping {} stray bytes past offset {}",
            len.saturating_sub(pos),
            pos
        );
        f.set_len(pos)?;
    }
    f.seek(SeekFrom::Start(pos))?;
    write_record(f, payload)?;
    if fsync {
        f.sync_data()?;
    }
    Ok(f.stream_position()?)
}

/// Write one framed record at the current position.
pub fn write_record<W: Write>(w: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > JOURNAL_MAX_RECORD as usize {
        return Err(anyhow!(
            "journal record too large: {} bytes (max {})",
            payload.len(),
            JOURNAL_MAX_RECORD
        ));
    }
    let mut hdr = [0u8; JOURNAL_REC_HDR_SIZE];
    LittleEndian::write_u32(&mut hdr[0..4], payload.len() as u32);
    LittleEndian::write_u32(&mut hdr[4..8], crc_of(payload));
    w.write_all(&hdr)?;
    w.write_all(payload)?;
    Ok(())
}

/// Read the record at `pos`.
/// - Ok(Some((payload, next_pos))) — целая запись с верным CRC;
/// - Ok(None) — конец файла или частичный хвост;
/// - Err — CRC mismatch / мусорная длина / I/O.
pub fn read_record(f: &mut File, pos: u64, file_len: u64) -> Result<Option<(Vec<u8>, u64)>> {
    if pos + JOURNAL_REC_HDR_SIZE as u64 > file_len {
        return Ok(None);
    }
    f.seek(SeekFrom::Start(pos))?;
    let mut hdr = [0u8; JOURNAL_REC_HDR_SIZE];
    f.read_exact(&mut hdr)?;
    let len = LittleEndian::read_u32(&hdr[0..4]);
    let crc_expected = LittleEndian::read_u32(&hdr[4..8]);
    if len > JOURNAL_MAX_RECORD {
        return Err(anyhow!("journal record at {} has bogus length {}", pos, len));
    }
    let end = pos + JOURNAL_REC_HDR_SIZE as u64 + len as u64;
    if end > file_len {
        return Ok(None);
    }
    let mut payload = vec![0u8; len as usize];
    f.read_exact(&mut payload)?;
    let crc_actual = crc_of(&payload);
    if crc_actual != crc_expected {
        return Err(anyhow!(
            "journal record at {}: crc mismatch (expected {:08x}, got {:08x})",
            pos,
            crc_expected,
            crc_actual
        ));
    }
    Ok(Some((payload, end)))
}

fn replay_into(f: &mut File, mem: &MemStore) -> Result<ReplayStats> {
    let file_len = f.metadata()?.len();
    if file_len < JOURNAL_HDR_SIZE {
        return Err(anyhow!("journal too short ({} bytes)", file_len));
    }
    f.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 8];
    f.read_exact(&mut magic)?;
    if &magic != JOURNAL_MAGIC {
        return Err(anyhow!("bad journal magic"));
    }

    let mut stats = ReplayStats::default();
    let mut pos = JOURNAL_HDR_SIZE;
    while let Some((payload, next)) = read_record(f, pos, file_len)? {
        let node: Node = serde_json::from_slice(&payload)
            .with_context(|| format!("journal record at {}: bad node json", pos))?;
        mem.restore(node)?;
        stats.records += 1;
        pos = next;
    }
    stats.torn_tail_bytes = file_len - pos;
    Ok(stats)
}
