//! paginate/flat — плоская лента: root₁, прямые ответы root₁, root₂, …
//!
//! Двухфазный автомат над FlatCursor:
//! - ParentMode (current_parent_id = None): ищем следующий корень строго после
//!   (last_parent_created_at, last_parent_id). Нашли — отдаём его и входим в ReplyMode.
//! - ReplyMode: ответы current_parent_id строго после (last_reply_*), берём remaining+1,
//!   чтобы понять, есть ли ещё. Меньше запрошенного — ответы родителя исчерпаны,
//!   возвращаемся в ParentMode в том же проходе.
//!
//! Внуки (ответы на ответы) в ленту не попадают.
//!
//! `step` — чистый переход (state, remaining) -> (state', items, more); `page` только
//! крутит его до заполнения страницы.

use anyhow::Result;
use log::debug;

use crate::cursor::{self, FlatCursor};
use crate::metrics::{record_page, PageKind};
use crate::node::Node;
use crate::store::SeekQuery;
use crate::trace::TraceEvent;

use super::{forward_only, Page, PageContext, PAGE_PREALLOC};

/// What a transition learned about the rest of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum More {
    /// The extra reply row was fetched: more replies of the current parent remain.
    Confirmed,
    /// No further root: the forest is exhausted.
    Exhausted,
    /// Not known without another query.
    Unknown,
}

/// Result of one transition of the flat automaton.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatStep {
    pub state: FlatCursor,
    pub items: Vec<Node>,
    pub more: More,
}

impl FlatStep {
    /// The page must stop after this step.
    pub fn done(&self) -> bool {
        self.more != More::Unknown
    }
}

/// One transition. `remaining` is the free space left on the page (>= 1).
pub fn step(ctx: &PageContext<'_>, mut state: FlatCursor, remaining: usize) -> Result<FlatStep> {
    let remaining = remaining.max(1);

    if let Some(parent) = state.current_parent_id.clone() {
        // ReplyMode
        let q = SeekQuery::children_of(&parent)
            .after(state.last_reply_key())
            .limit(remaining.saturating_add(1));
        let mut fetched = ctx.seek(&q)?;
        ctx.emit(TraceEvent::ReplyScan {
            parent: parent.clone(),
            fetched: fetched.len(),
        });

        let has_more = fetched.len() > remaining;
        fetched.truncate(remaining);
        if let Some(last) = fetched.last() {
            state.mark_reply(last);
        }

        if has_more {
            debug!("flat: page filled inside replies of {}", parent);
            return Ok(FlatStep {
                state,
                items: fetched,
                more: More::Confirmed,
            });
        }

        debug!("flat: replies of {} exhausted", parent);
        ctx.emit(TraceEvent::ParentDone { parent });
        state.leave_parent();
        return Ok(FlatStep {
            state,
            items: fetched,
            more: More::Unknown,
        });
    }

    // ParentMode
    let q = SeekQuery::roots().after(state.last_parent_key());
    match ctx.seek_first(q)? {
        None => {
            debug!("flat: no more roots");
            Ok(FlatStep {
                state,
                items: Vec::new(),
                more: More::Exhausted,
            })
        }
        Some(root) => {
            ctx.emit(TraceEvent::Root {
                id: root.id.clone(),
            });
            state.enter_parent(&root);
            Ok(FlatStep {
                state,
                items: vec![root],
                more: More::Unknown,
            })
        }
    }
}

/// Is anything left after `state`? Used when a page fills before the stream says so.
pub fn probe(ctx: &PageContext<'_>, state: &FlatCursor) -> Result<bool> {
    if let Some(parent) = &state.current_parent_id {
        let q = SeekQuery::children_of(parent).after(state.last_reply_key());
        if ctx.seek_first(q)?.is_some() {
            return Ok(true);
        }
    }
    let q = SeekQuery::roots().after(state.last_parent_key());
    Ok(ctx.seek_first(q)?.is_some())
}

/// Assemble one page of the flat stream. A limit of 0 is treated as 1.
pub fn page(ctx: &PageContext<'_>, token: Option<&str>, limit: usize) -> Result<Page<Node>> {
    let limit = limit.max(1);
    let input = cursor::canonical::<FlatCursor>(token);
    let mut state: FlatCursor = cursor::decode(token);
    let mut items: Vec<Node> = Vec::with_capacity(limit.min(PAGE_PREALLOC));
    let mut more = More::Unknown;

    while items.len() < limit {
        let st = step(ctx, state, limit - items.len())?;
        state = st.state;
        more = st.more;
        items.extend(st.items);
        if more != More::Unknown {
            break;
        }
    }

    let has_more = match more {
        More::Confirmed => true,
        More::Exhausted => false,
        More::Unknown => probe(ctx, &state)?,
    };

    let next = if has_more {
        forward_only(cursor::encode(&state), &input)
    } else {
        None
    };

    record_page(PageKind::Flat, items.len());
    ctx.emit(TraceEvent::PageDone {
        items: items.len(),
        has_next: next.is_some(),
    });
    Ok(Page {
        items,
        next_cursor: next,
    })
}
