//! http/handlers — маршрутизация и JSON-ответы, без привязки к сокету.
//!
//! `route(app, method, url, body)` → `Reply`; serve-цикл только переносит Reply в
//! tiny_http::Response. Так же его вызывают тесты.

use anyhow::Result;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::metrics;
use crate::paginate::{dfs, flat, tree, PageContext};
use crate::store::UnknownParent;
use crate::trace::LogTrace;

use super::query::{split_target, Query};
use super::App;

pub const CT_JSON: &str = "application/json";
pub const CT_TEXT: &str = "text/plain; charset=utf-8";
pub const CT_PROM: &str = "text/plain; version=0.0.4";

const FETCH_FAILED: &str = "Failed to fetch comments.";

/// Transport-independent response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, v: serde_json::Value) -> Self {
        Self {
            status,
            content_type: CT_JSON,
            body: v.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: CT_TEXT,
            body: body.to_string(),
        }
    }

    fn error(status: u16, msg: &str) -> Self {
        Self::json(status, json!({ "error": msg }))
    }

    /// Parsed JSON body (tests).
    pub fn json_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    comment: String,
    #[serde(rename = "parentId", default)]
    parent_id: Option<String>,
}

pub fn route(app: &App, method: &str, url: &str, body: &[u8]) -> Reply {
    let (path, qs) = split_target(url);
    let q = Query::parse(qs);

    match (method, path) {
        ("GET", "/") | ("GET", "/health") => Reply::text(200, "OK\n"),
        ("POST", "/create") => create(app, body),
        ("GET", "/comments") => fetch("flat", || comments(app, &q)),
        ("GET", "/comment-with-replies") | ("GET", "/comment-with-replis") => {
            fetch("tree", || with_replies(app, &q))
        }
        ("GET", "/dfs") => fetch("dfs", || dfs_page(app, &q)),
        ("GET", "/metrics") => Reply {
            status: 200,
            content_type: CT_PROM,
            body: metrics::render_prometheus(app.store().count().ok()),
        },
        _ => Reply::text(404, "not found\n"),
    }
}

fn fetch<F>(what: &str, f: F) -> Reply
where
    F: FnOnce() -> Result<serde_json::Value>,
{
    match f() {
        Ok(v) => Reply::json(200, v),
        Err(e) => {
            error!("{} page failed: {:#}", what, e);
            Reply::error(500, FETCH_FAILED)
        }
    }
}

fn create(app: &App, body: &[u8]) -> Reply {
    let req: CreateBody = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            warn!("create: bad request body: {}", e);
            return Reply::error(400, &format!("invalid request body: {}", e));
        }
    };
    let parent = req.parent_id.as_deref().filter(|p| !p.is_empty());
    match app.store().insert(&req.comment, parent) {
        Ok(node) => {
            info!("created comment {} (parent {:?})", node.id, node.parent_id);
            Reply::json(200, json!({ "comment": node }))
        }
        Err(e) if e.downcast_ref::<UnknownParent>().is_some() => {
            warn!("create: {}", e);
            Reply::error(400, &e.to_string())
        }
        Err(e) => {
            error!("create failed: {:#}", e);
            Reply::error(500, "Failed to create comment.")
        }
    }
}

fn context(app: &App) -> PageContext<'_> {
    PageContext::new(app.store())
        .configured(app.config())
        .with_trace(&LogTrace)
}

fn comments(app: &App, q: &Query) -> Result<serde_json::Value> {
    let limit = app.config().resolve_limit(q.non_empty("limit"));
    let ctx = context(app);
    let page = flat::page(&ctx, q.non_empty("cursor"), limit)?;
    let total = ctx.count()?;
    let n = page.len();
    Ok(json!({
        "comments": page.items,
        "nextCursor": page.next_cursor,
        "totalItemsInPage": n,
        "totalComments": total,
    }))
}

fn with_replies(app: &App, q: &Query) -> Result<serde_json::Value> {
    let limit = app.config().resolve_limit(q.non_empty("limit"));
    let ctx = context(app);
    let page = tree::page(&ctx, q.non_empty("cursor"), limit, app.config().tree_depth)?;
    Ok(json!({
        "comments": page.items,
        "nextCursor": page.next_cursor,
    }))
}

fn dfs_page(app: &App, q: &Query) -> Result<serde_json::Value> {
    let limit = app.config().resolve_limit(q.non_empty("limit"));
    let ctx = context(app);
    let page = dfs::page(&ctx, q.non_empty("cursor"), limit)?;
    let n = page.len();
    Ok(json!({
        "comments": page.items,
        "nextCursor": page.next_cursor,
        "totalItemsInPage": n,
    }))
}
