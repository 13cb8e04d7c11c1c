//! paginate/dfs — pre-order обход всего леса без материализации дерева.
//!
//! find_next(previous) вычисляет единственного преемника в pre-order только точечными
//! get и упорядоченными seek:
//! 1. previous = None → первый корень.
//! 2. Спуск: первый ребёнок previous.
//! 3. Подъём: следующий брат текущего узла; нет — переходим к родителю (get по id)
//!    и повторяем, пока не упрёмся в корень.
//! 4. Следующий корень после найденного корня; нет — лес пройден (None).
//!
//! Если parent_id не резолвится при подъёме — нарушение ссылочной целостности:
//! по политике IntegrityPolicy либо конец обхода, либо ошибка MissingParent.
//!
//! Страница: find_next до limit раз; курсор — тройка последнего выданного узла.
//! None от find_next — единственный сигнал конца (без lookahead).

use anyhow::Result;
use log::{debug, error};

use crate::config::IntegrityPolicy;
use crate::cursor::{self, DfsCursor, WalkPoint};
use crate::metrics::{record_integrity_violation, record_page, PageKind};
use crate::node::Node;
use crate::store::SeekQuery;
use crate::trace::TraceEvent;

use super::{forward_only, MissingParent, Page, PageContext, PAGE_PREALLOC};

/// Pre-order successor of `previous` (None → first root).
pub fn find_next(ctx: &PageContext<'_>, previous: Option<&WalkPoint>) -> Result<Option<Node>> {
    let prev = match previous {
        None => {
            let first = ctx.seek_first(SeekQuery::roots())?;
            match &first {
                Some(n) => ctx.emit(TraceEvent::NextRoot { to: n.id.clone() }),
                None => ctx.emit(TraceEvent::Exhausted),
            }
            return Ok(first);
        }
        Some(p) => p,
    };

    // Спуск
    if let Some(child) = ctx.seek_first(SeekQuery::children_of(&prev.id))? {
        ctx.emit(TraceEvent::Descend {
            from: prev.id.clone(),
            to: child.id.clone(),
        });
        return Ok(Some(child));
    }

    // Подъём
    let mut at = prev.clone();
    while let Some(parent_id) = at.parent_id.clone() {
        let siblings = SeekQuery::siblings_of(Some(parent_id.as_str()), at.key());
        if let Some(sib) = ctx.seek_first(siblings)? {
            ctx.emit(TraceEvent::Sibling {
                from: at.id.clone(),
                to: sib.id.clone(),
            });
            return Ok(Some(sib));
        }

        match ctx.get(&parent_id)? {
            Some(parent) => {
                ctx.emit(TraceEvent::Ascend {
                    from: at.id.clone(),
                    to: parent.id.clone(),
                });
                at = WalkPoint::of(&parent);
            }
            None => return missing_parent(ctx, &at.id, &parent_id),
        }
    }

    // Следующий корень
    let next_root = ctx.seek_first(SeekQuery::roots().after(Some(at.key())))?;
    match &next_root {
        Some(n) => ctx.emit(TraceEvent::NextRoot { to: n.id.clone() }),
        None => ctx.emit(TraceEvent::Exhausted),
    }
    Ok(next_root)
}

fn missing_parent(ctx: &PageContext<'_>, child: &str, parent: &str) -> Result<Option<Node>> {
    record_integrity_violation();
    ctx.emit(TraceEvent::MissingParent {
        child: child.to_string(),
        parent: parent.to_string(),
    });
    match ctx.integrity() {
        IntegrityPolicy::EndTraversal => {
            error!(
                "dfs: parent {} of {} not found during ascent; ending traversal",
                parent, child
            );
            Ok(None)
        }
        IntegrityPolicy::Fail => Err(MissingParent {
            child: child.to_string(),
            parent: parent.to_string(),
        }
        .into()),
    }
}

/// One page of the pre-order stream. A limit of 0 is treated as 1.
pub fn page(ctx: &PageContext<'_>, token: Option<&str>, limit: usize) -> Result<Page<Node>> {
    let limit = limit.max(1);
    let input = cursor::canonical::<DfsCursor>(token);
    let mut last: Option<WalkPoint> = cursor::decode::<DfsCursor>(token).resume_point();
    match &last {
        Some(p) => debug!("dfs: resuming after {}", p.id),
        None => debug!("dfs: starting from the first root"),
    }

    let mut items: Vec<Node> = Vec::with_capacity(limit.min(PAGE_PREALLOC));
    let mut exhausted = false;
    while items.len() < limit {
        match find_next(ctx, last.as_ref())? {
            Some(n) => {
                last = Some(WalkPoint::of(&n));
                items.push(n);
            }
            None => {
                exhausted = true;
                break;
            }
        }
    }

    let next = if exhausted {
        None
    } else {
        forward_only(
            last.as_ref().and_then(|p| cursor::encode(&DfsCursor::at(p))),
            &input,
        )
    };

    record_page(PageKind::Dfs, items.len());
    ctx.emit(TraceEvent::PageDone {
        items: items.len(),
        has_next: next.is_some(),
    });
    Ok(Page {
        items,
        next_cursor: next,
    })
}

/// Lazy pre-order iterator over the whole forest.
pub struct Walk<'c, 'a> {
    ctx: &'c PageContext<'a>,
    last: Option<WalkPoint>,
    done: bool,
}

impl<'c, 'a> Walk<'c, 'a> {
    pub fn new(ctx: &'c PageContext<'a>) -> Self {
        Self {
            ctx,
            last: None,
            done: false,
        }
    }

    /// Continue after a given point instead of the beginning.
    pub fn after(ctx: &'c PageContext<'a>, point: WalkPoint) -> Self {
        Self {
            ctx,
            last: Some(point),
            done: false,
        }
    }
}

impl Iterator for Walk<'_, '_> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match find_next(self.ctx, self.last.as_ref()) {
            Ok(Some(n)) => {
                self.last = Some(WalkPoint::of(&n));
                Some(Ok(n))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
