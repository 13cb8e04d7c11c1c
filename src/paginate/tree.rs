//! paginate/tree — пагинация только по корням; к каждому корню жадно подвешиваются
//! ответы до глубины `depth` (по умолчанию 2: ответы и ответы на ответы).
//!
//! - Корни: limit+1 строк строго после (last_parent_created_at, last_parent_id);
//!   лишняя строка означает, что есть следующая страница.
//! - Каждый раскрытый уровень несёт `_count.replies` (число прямых ответов);
//!   самый глубокий уровень — голые узлы без `replies`/`_count`.
//! - Ширина уровня не ограничивается: дети читаются keyset-пачками до конца.

use anyhow::Result;
use log::debug;
use serde::Serialize;

use crate::cursor::{self, TreeCursor};
use crate::metrics::{record_page, PageKind};
use crate::node::Node;
use crate::store::SeekQuery;
use crate::trace::TraceEvent;

use super::{forward_only, Page, PageContext};

/// Batch size for reading one sibling group.
pub const CHILD_BATCH: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyCount {
    pub replies: u64,
}

/// A node with its descendants attached to a fixed depth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Thread {
    #[serde(flatten)]
    pub node: Node,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Thread>>,
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<ReplyCount>,
}

impl Thread {
    pub fn leaf(node: Node) -> Self {
        Self {
            node,
            replies: None,
            count: None,
        }
    }

    /// Nodes of this thread in pre-order (self first).
    pub fn flatten(&self) -> Vec<&Node> {
        let mut out = vec![&self.node];
        if let Some(rs) = &self.replies {
            for r in rs {
                out.extend(r.flatten());
            }
        }
        out
    }
}

/// All direct children of `parent_id`, ordered by (created_at, id).
pub fn children(ctx: &PageContext<'_>, parent_id: &str) -> Result<Vec<Node>> {
    let mut out: Vec<Node> = Vec::new();
    loop {
        let q = SeekQuery::children_of(parent_id)
            .after(out.last().map(Node::key))
            .limit(CHILD_BATCH);
        let batch = ctx.seek(&q)?;
        let n = batch.len();
        out.extend(batch);
        if n < CHILD_BATCH {
            return Ok(out);
        }
    }
}

/// Attach descendants of `node` down to `depth` levels.
pub fn attach(ctx: &PageContext<'_>, node: Node, depth: usize) -> Result<Thread> {
    if depth == 0 {
        return Ok(Thread::leaf(node));
    }
    let kids = children(ctx, &node.id)?;
    let count = ReplyCount {
        replies: kids.len() as u64,
    };
    let mut replies = Vec::with_capacity(kids.len());
    for kid in kids {
        replies.push(attach(ctx, kid, depth - 1)?);
    }
    Ok(Thread {
        node,
        replies: Some(replies),
        count: Some(count),
    })
}

/// One page of roots, each with `depth` levels of replies. A limit of 0 is treated as 1.
pub fn page(
    ctx: &PageContext<'_>,
    token: Option<&str>,
    limit: usize,
    depth: usize,
) -> Result<Page<Thread>> {
    let limit = limit.max(1);
    let input = cursor::canonical::<TreeCursor>(token);
    let state: TreeCursor = cursor::decode(token);

    let q = SeekQuery::roots()
        .after(state.last_parent_key())
        .limit(limit.saturating_add(1));
    let mut roots = ctx.seek(&q)?;
    let has_more = roots.len() > limit;
    roots.truncate(limit);
    debug!(
        "tree: {} roots (has_more={}) after {:?}",
        roots.len(),
        has_more,
        state.last_parent_id
    );

    let next = match roots.last() {
        Some(last) if has_more => forward_only(cursor::encode(&TreeCursor::after(last)), &input),
        _ => None,
    };

    let mut items = Vec::with_capacity(roots.len());
    for root in roots {
        ctx.emit(TraceEvent::Root {
            id: root.id.clone(),
        });
        items.push(attach(ctx, root, depth)?);
    }

    record_page(PageKind::Tree, items.len());
    ctx.emit(TraceEvent::PageDone {
        items: items.len(),
        has_next: next.is_some(),
    });
    Ok(Page {
        items,
        next_cursor: next,
    })
}
