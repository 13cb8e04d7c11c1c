//! cursor/state — три формы состояния пагинации.
//!
//! Все поля nullable; None-поля при кодировании выбрасываются. На декодировании
//! каждое поле применяется к default-состоянию по отдельности (merge_field):
//! неизвестные ключи и поля неправильного типа молча игнорируются.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::node::{Node, NodeKey};

/// Pagination state carried inside an opaque token.
pub trait CursorState: Serialize + Default + Clone + PartialEq + std::fmt::Debug {
    /// Apply one decoded field. Unknown keys and ill-typed values are ignored.
    fn merge_field(&mut self, key: &str, value: &Value);
}

// ---------------- Flat ----------------

/// Flat pager state. `current_parent_id` set ⇔ ReplyMode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ts_opt::serialize")]
    pub last_parent_created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reply_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ts_opt::serialize")]
    pub last_reply_created_at: Option<DateTime<Utc>>,
}

impl FlatCursor {
    /// Key of the last consumed root, if both halves are present.
    pub fn last_parent_key(&self) -> Option<NodeKey> {
        pair(&self.last_parent_id, &self.last_parent_created_at)
    }

    /// Key of the last consumed reply of the current parent.
    pub fn last_reply_key(&self) -> Option<NodeKey> {
        pair(&self.last_reply_id, &self.last_reply_created_at)
    }

    #[inline]
    pub fn in_reply_mode(&self) -> bool {
        self.current_parent_id.is_some()
    }

    /// Enter ReplyMode for a freshly consumed root.
    pub fn enter_parent(&mut self, root: &Node) {
        self.last_parent_id = Some(root.id.clone());
        self.last_parent_created_at = Some(root.created_at);
        self.current_parent_id = Some(root.id.clone());
        self.last_reply_id = None;
        self.last_reply_created_at = None;
    }

    pub fn mark_reply(&mut self, reply: &Node) {
        self.last_reply_id = Some(reply.id.clone());
        self.last_reply_created_at = Some(reply.created_at);
    }

    /// Back to ParentMode: the current parent's replies are exhausted.
    pub fn leave_parent(&mut self) {
        self.current_parent_id = None;
        self.last_reply_id = None;
        self.last_reply_created_at = None;
    }
}

impl CursorState for FlatCursor {
    fn merge_field(&mut self, key: &str, value: &Value) {
        match key {
            "lastParentId" => merge_str(&mut self.last_parent_id, value),
            "lastParentCreatedAt" => merge_ts(&mut self.last_parent_created_at, value),
            "currentParentId" => merge_str(&mut self.current_parent_id, value),
            "lastReplyId" => merge_str(&mut self.last_reply_id, value),
            "lastReplyCreatedAt" => merge_ts(&mut self.last_reply_created_at, value),
            _ => {}
        }
    }
}

// ---------------- Hierarchical ----------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ts_opt::serialize")]
    pub last_parent_created_at: Option<DateTime<Utc>>,
}

impl TreeCursor {
    pub fn after(root: &Node) -> Self {
        Self {
            last_parent_id: Some(root.id.clone()),
            last_parent_created_at: Some(root.created_at),
        }
    }

    pub fn last_parent_key(&self) -> Option<NodeKey> {
        pair(&self.last_parent_id, &self.last_parent_created_at)
    }
}

impl CursorState for TreeCursor {
    fn merge_field(&mut self, key: &str, value: &Value) {
        match key {
            "lastParentId" => merge_str(&mut self.last_parent_id, value),
            "lastParentCreatedAt" => merge_ts(&mut self.last_parent_created_at, value),
            _ => {}
        }
    }
}

// ---------------- DFS ----------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DfsCursor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ts_opt::serialize")]
    pub last_created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_parent_id: Option<String>,
}

/// Position in the pre-order walk: the last node handed out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkPoint {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
}

impl WalkPoint {
    pub fn of(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            created_at: node.created_at,
            parent_id: node.parent_id.clone(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.created_at, self.id.clone())
    }
}

impl DfsCursor {
    pub fn at(point: &WalkPoint) -> Self {
        Self {
            last_id: Some(point.id.clone()),
            last_created_at: Some(point.created_at),
            last_parent_id: point.parent_id.clone(),
        }
    }

    /// Resume point. A missing `last_parent_id` means the node was a root,
    /// so only id and timestamp are required.
    pub fn resume_point(&self) -> Option<WalkPoint> {
        match (&self.last_id, &self.last_created_at) {
            (Some(id), Some(ts)) => Some(WalkPoint {
                id: id.clone(),
                created_at: *ts,
                parent_id: self.last_parent_id.clone(),
            }),
            _ => None,
        }
    }
}

impl CursorState for DfsCursor {
    fn merge_field(&mut self, key: &str, value: &Value) {
        match key {
            "lastId" => merge_str(&mut self.last_id, value),
            "lastCreatedAt" => merge_ts(&mut self.last_created_at, value),
            "lastParentId" => merge_str(&mut self.last_parent_id, value),
            _ => {}
        }
    }
}

// ---------------- helpers ----------------

fn pair(id: &Option<String>, ts: &Option<DateTime<Utc>>) -> Option<NodeKey> {
    match (id, ts) {
        (Some(id), Some(ts)) => Some(NodeKey::new(*ts, id.clone())),
        _ => None,
    }
}

fn merge_str(slot: &mut Option<String>, value: &Value) {
    if let Value::String(s) = value {
        *slot = Some(s.clone());
    }
}

fn merge_ts(slot: &mut Option<DateTime<Utc>>, value: &Value) {
    if let Value::String(s) = value {
        if let Some(ts) = ts_opt::parse(s) {
            *slot = Some(ts);
        }
    }
}

/// Timestamps inside tokens keep full precision (AutoSi), so decode(encode(s)) == s.
mod ts_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => s.serialize_none(),
        }
    }

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        crate::node::parse_ts(s)
    }
}
