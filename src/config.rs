//! Centralized configuration and builder for ThreadWalk.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - WalkConfig::from_env() reads TW_* variables on top of the defaults.
//! - ConfigBuilder for code/CLI overrides.
//!
//! Defaults:
//! - default_limit = 10, max_limit = 50 (page size for the HTTP endpoints)
//! - tree_depth = 2 (levels of replies attached to each root by the hierarchical pager)
//! - integrity = end (missing parent during DFS ascent ends the walk)
//! - query_timeout_ms = none, journal_fsync = false, http_workers = 4

use std::fmt;
use std::str::FromStr;

/// What the DFS walker does when a parent reference does not resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IntegrityPolicy {
    /// Log it and treat the forest as exhausted.
    #[default]
    EndTraversal,
    /// Fail the page with a `MissingParent` error.
    Fail,
}

impl FromStr for IntegrityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "end" | "end-traversal" | "lenient" => Ok(Self::EndTraversal),
            "fail" | "error" | "strict" => Ok(Self::Fail),
            other => Err(format!("unknown integrity policy '{}' (expected end|fail)", other)),
        }
    }
}

impl fmt::Display for IntegrityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndTraversal => f.write_str("end"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug)]
pub struct WalkConfig {
    /// Page size used when the request carries no usable `limit`.
    /// Env: TW_DEFAULT_LIMIT (default 10)
    pub default_limit: usize,

    /// Upper clamp for `limit`.
    /// Env: TW_MAX_LIMIT (default 50)
    pub max_limit: usize,

    /// Reply levels attached under each root by the hierarchical pager.
    /// Env: TW_TREE_DEPTH (default 2)
    pub tree_depth: usize,

    /// Missing-parent handling in the DFS walker.
    /// Env: TW_INTEGRITY = end|fail (default end)
    pub integrity: IntegrityPolicy,

    /// Per-page deadline for store queries, in milliseconds.
    /// Env: TW_QUERY_TIMEOUT_MS (default none)
    pub query_timeout_ms: Option<u64>,

    /// fsync the journal after every insert.
    /// Env: TW_JOURNAL_FSYNC (default false; "1|true|on|yes" => true)
    pub journal_fsync: bool,

    /// Worker threads serving HTTP requests.
    /// Env: TW_HTTP_WORKERS (default 4)
    pub http_workers: usize,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            tree_depth: 2,
            integrity: IntegrityPolicy::EndTraversal,
            query_timeout_ms: None,
            journal_fsync: false,
            http_workers: 4,
        }
    }
}

// Целое в начале строки; слишком длинное насыщается.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (neg, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    let n = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if neg { -n } else { n })
}

fn env_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl WalkConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TW_DEFAULT_LIMIT") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.default_limit = n;
                }
            }
        }
        if let Ok(v) = std::env::var("TW_MAX_LIMIT") {
            if let Ok(n) = v.trim().parse::<usize>() {
                if n > 0 {
                    cfg.max_limit = n;
                }
            }
        }
        if let Ok(v) = std::env::var("TW_TREE_DEPTH") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.tree_depth = n;
            }
        }
        if let Ok(v) = std::env::var("TW_INTEGRITY") {
            match v.parse::<IntegrityPolicy>() {
                Ok(p) => cfg.integrity = p,
                Err(e) => log::warn!("TW_INTEGRITY ignored: {}", e),
            }
        }
        if let Ok(v) = std::env::var("TW_QUERY_TIMEOUT_MS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.query_timeout_ms = if n == 0 { None } else { Some(n) };
            }
        }
        if let Ok(v) = std::env::var("TW_JOURNAL_FSYNC") {
            cfg.journal_fsync = env_flag(&v);
        }
        if let Ok(v) = std::env::var("TW_HTTP_WORKERS") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.http_workers = n.max(1);
            }
        }

        cfg
    }

    /// Resolve a raw `limit` query value: the leading integer is taken ("10.5" → 10,
    /// "12abc" → 12); non-numeric or <= 0 → default; then clamp to max.
    pub fn resolve_limit(&self, raw: Option<&str>) -> usize {
        let max = self.max_limit.max(1);
        let parsed = raw
            .and_then(leading_int)
            .filter(|n| *n > 0)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX));
        parsed.unwrap_or(self.default_limit).clamp(1, max)
    }

    pub fn with_default_limit(mut self, n: usize) -> Self {
        self.default_limit = n.max(1);
        self
    }

    pub fn with_max_limit(mut self, n: usize) -> Self {
        self.max_limit = n.max(1);
        self
    }

    pub fn with_tree_depth(mut self, depth: usize) -> Self {
        self.tree_depth = depth;
        self
    }

    pub fn with_integrity(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity = policy;
        self
    }

    pub fn with_query_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.query_timeout_ms = ms;
        self
    }

    pub fn with_journal_fsync(mut self, on: bool) -> Self {
        self.journal_fsync = on;
        self
    }

    pub fn with_http_workers(mut self, n: usize) -> Self {
        self.http_workers = n.max(1);
        self
    }
}

impl fmt::Display for WalkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WalkConfig {{ \
             default_limit: {}, \
             max_limit: {}, \
             tree_depth: {}, \
             integrity: {}, \
             query_timeout_ms: {}, \
             journal_fsync: {}, \
             http_workers: {} \
             }}",
            self.default_limit,
            self.max_limit,
            self.tree_depth,
            self.integrity,
            self.query_timeout_ms
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.journal_fsync,
            self.http_workers,
        )
    }
}

/// Builder that produces a WalkConfig.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    cfg: WalkConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: WalkConfig::from_env(),
        }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: WalkConfig::default(),
        }
    }

    pub fn default_limit(mut self, n: usize) -> Self {
        self.cfg = self.cfg.with_default_limit(n);
        self
    }

    pub fn max_limit(mut self, n: usize) -> Self {
        self.cfg = self.cfg.with_max_limit(n);
        self
    }

    pub fn tree_depth(mut self, depth: usize) -> Self {
        self.cfg.tree_depth = depth;
        self
    }

    pub fn integrity(mut self, policy: IntegrityPolicy) -> Self {
        self.cfg.integrity = policy;
        self
    }

    pub fn query_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.cfg.query_timeout_ms = ms;
        self
    }

    pub fn journal_fsync(mut self, on: bool) -> Self {
        self.cfg.journal_fsync = on;
        self
    }

    pub fn http_workers(mut self, n: usize) -> Self {
        self.cfg = self.cfg.with_http_workers(n);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> WalkConfig {
        self.cfg
    }
}
