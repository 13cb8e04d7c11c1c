//! cursor — обратимое и толерантное кодирование состояния пагинации в opaque-токен.
//!
//! Формат токена: base64 (URL-safe, без паддинга) поверх JSON-объекта с camelCase-полями.
//! - encode: None-поля выбрасываются; пустой объект → None ("курсор не нужен").
//! - decode: пустой/отсутствующий/битый токен → default-состояние, никогда не ошибка.
//!   Поля мёржатся на default по одному (см. CursorState::merge_field).
//! - Для совместимости декодер принимает и стандартный алфавит base64 с паддингом,
//!   в том числе с '+', превратившимися в пробелы при разборе query string.

pub mod state;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use log::debug;
use serde_json::Value;

use crate::metrics::record_cursor_rejected;

pub use state::{CursorState, DfsCursor, FlatCursor, TreeCursor, WalkPoint};

/// Encode a state into an opaque token. `None` when every field is empty.
pub fn encode<C: CursorState>(state: &C) -> Option<String> {
    // Порядок полей — порядок объявления в структуре.
    let json = match serde_json::to_string(state) {
        Ok(s) => s,
        Err(e) => {
            debug!("cursor encode failed: {}", e);
            return None;
        }
    };
    if json == "{}" {
        return None;
    }
    Some(URL_SAFE_NO_PAD.encode(json.as_bytes()))
}

/// Decode a token. Never fails: anything unusable yields `C::default()`.
pub fn decode<C: CursorState>(token: Option<&str>) -> C {
    let mut state = C::default();
    let raw = match token {
        Some(t) if !t.trim().is_empty() => t,
        _ => return state,
    };

    let bytes = match decode_b64(raw) {
        Some(b) => b,
        None => {
            reject(raw, "not base64");
            return state;
        }
    };
    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(_) => {
            reject(raw, "not json");
            return state;
        }
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter() {
                state.merge_field(k, v);
            }
        }
        _ => reject(raw, "not an object"),
    }
    state
}

/// Re-encode a token through its decoded state (canonical form for comparisons).
pub fn canonical<C: CursorState>(token: Option<&str>) -> Option<String> {
    encode(&decode::<C>(token))
}

fn decode_b64(raw: &str) -> Option<Vec<u8>> {
    let attempt = |s: &str| {
        URL_SAFE_NO_PAD
            .decode(s)
            .or_else(|_| STANDARD.decode(s))
            .or_else(|_| URL_SAFE.decode(s))
            .or_else(|_| STANDARD_NO_PAD.decode(s))
            .ok()
    };
    attempt(raw.trim()).or_else(|| {
        // '+' стандартного алфавита без экранирования в query string приходит пробелом
        let restored = raw
            .trim_matches(|c: char| c.is_whitespace() && c != ' ')
            .replace(' ', "+");
        attempt(&restored)
    })
}

fn reject(raw: &str, why: &str) {
    record_cursor_rejected();
    debug!("cursor token ignored ({}): {:.64}", why, raw);
}
