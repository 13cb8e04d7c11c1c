//! node — элемент леса комментариев и его ключ сортировки.
//!
//! Порядок везде один: (created_at, id) по возрастанию. id — строка (UUIDv4),
//! сравнивается лексикографически и служит tie-breaker'ом при равных метках времени.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single comment. `parent_id == None` marks a root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "comment")]
    pub content: String,
    pub parent_id: Option<String>,
    #[serde(with = "millis_rfc3339")]
    pub created_at: DateTime<Utc>,
}

impl Node {
    #[inline]
    pub fn key(&self) -> NodeKey {
        NodeKey {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Seek key: strict total order over all nodes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl NodeKey {
    pub fn new<S: Into<String>>(created_at: DateTime<Utc>, id: S) -> Self {
        Self {
            created_at,
            id: id.into(),
        }
    }
}

/// Fresh node id.
pub fn new_node_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time truncated to millisecond precision, so it survives a cursor round-trip.
pub fn now_millis() -> DateTime<Utc> {
    let ms = Utc::now().timestamp_millis();
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

/// RFC 3339 with milliseconds and `Z` (как toISOString()).
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into UTC. None on any malformed input.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) mod millis_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_ts(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_ts(&raw).ok_or_else(|| D::Error::custom(format!("bad timestamp '{}'", raw)))
    }
}
