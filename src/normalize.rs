//! Coercion of loosely typed server payloads into the canonical poll model.
//!
//! Nothing outside this module reads raw `serde_json::Value` payload shapes. Every
//! function here is total: missing, null or mistyped fields fall back to a default.
//! A poll without a usable positive id is rejected as a whole.

use std::collections::BTreeMap;

use serde::de;
use serde_json::Value;

use crate::models::poll::{OptionId, Poll, PollId, PollOption};
use crate::models::websocket::{
    Inbound, PushEvent, WsMessage, LIKE_UPDATE, PONG_FRAME, POLL_CREATED, VOTE_UPDATE,
};

fn field<'a>(raw: &'a Value, key: &str) -> &'a Value {
    raw.get(key).unwrap_or(&Value::Null)
}

fn finite(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Numeric coercion; `fallback` when missing, null or not a finite number.
pub fn to_number(value: &Value, fallback: f64) -> f64 {
    finite(value).unwrap_or(fallback)
}

/// Non-negative integer coercion. Negative inputs clamp to zero.
pub fn to_count(value: &Value) -> u64 {
    to_number(value, 0.0).max(0.0).trunc() as u64
}

/// A positive integer id, or `None`.
pub fn to_id(value: &Value) -> Option<u64> {
    finite(value)
        .filter(|n| *n >= 1.0 && n.fract() == 0.0)
        .map(|n| n as u64)
}

/// Only the literal `true` is true. `"true"` and `1` are not.
pub fn to_bool(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

pub fn to_string(value: &Value, fallback: &str) -> String {
    value.as_str().unwrap_or(fallback).to_string()
}

fn to_optional_string(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn normalize_option(raw: &Value, poll_id: PollId) -> PollOption {
    if !raw.is_object() {
        return PollOption {
            id: 0,
            poll_id,
            text: String::new(),
            vote_count: 0,
        };
    }

    PollOption {
        id: to_count(field(raw, "id")),
        poll_id: to_id(field(raw, "poll_id")).unwrap_or(poll_id),
        text: to_string(field(raw, "text"), ""),
        vote_count: to_count(field(raw, "vote_count")),
    }
}

/// Positive, de-duplicated option ids in first-seen order.
pub fn normalize_user_votes(raw: &Value) -> Vec<OptionId> {
    let mut votes: Vec<OptionId> = Vec::new();
    if let Value::Array(items) = raw {
        for id in items.iter().filter_map(to_id) {
            if !votes.contains(&id) {
                votes.push(id);
            }
        }
    }
    votes
}

pub fn normalize_poll(raw: &Value) -> Option<Poll> {
    if !raw.is_object() {
        return None;
    }
    let id = to_id(field(raw, "id"))?;

    let options = match field(raw, "options") {
        Value::Array(items) => items.iter().map(|o| normalize_option(o, id)).collect(),
        _ => Vec::new(),
    };

    let allow_multiple_votes = to_bool(field(raw, "allow_multiple_votes"));
    let user_has_voted = to_bool(field(raw, "user_has_voted"));
    let mut user_voted_options = if user_has_voted {
        normalize_user_votes(field(raw, "user_voted_options"))
    } else {
        Vec::new()
    };
    if !allow_multiple_votes && user_voted_options.len() > 1 {
        user_voted_options.drain(..user_voted_options.len() - 1);
    }

    Some(Poll {
        id,
        title: to_string(field(raw, "title"), ""),
        description: to_optional_string(field(raw, "description")),
        creator_id: to_count(field(raw, "creator_id")),
        creator_username: to_string(field(raw, "creator_username"), ""),
        is_active: !matches!(field(raw, "is_active"), Value::Bool(false)),
        allow_multiple_votes,
        created_at: field(raw, "created_at")
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        options,
        total_votes: to_count(field(raw, "total_votes")),
        total_likes: to_count(field(raw, "total_likes")),
        user_has_voted,
        user_has_liked: to_bool(field(raw, "user_has_liked")),
        user_voted_options,
    })
}

/// Normalizes a poll list response, dropping entries without a usable id.
pub fn normalize_polls(raw: &Value) -> Vec<Poll> {
    match raw {
        Value::Array(items) => items.iter().filter_map(normalize_poll).collect(),
        _ => Vec::new(),
    }
}

/// Option-id to count mapping of a `vote_update`. Entries whose key or value is not
/// a number are dropped; a null count reads as zero.
pub fn normalize_vote_counts(raw: &Value) -> BTreeMap<OptionId, u64> {
    let Value::Object(entries) = raw else {
        return BTreeMap::new();
    };

    entries
        .iter()
        .filter_map(|(key, value)| {
            let option_id = key
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|k| k.is_finite() && *k >= 0.0 && k.fract() == 0.0)?;
            let count = match value {
                Value::Null => 0.0,
                other => finite(other)?,
            };
            Some((option_id as OptionId, count.max(0.0).trunc() as u64))
        })
        .collect()
}

/// Decodes one inbound text frame.
///
/// Returns `Err` when the frame is not valid JSON or not a JSON object; everything
/// else that cannot be applied comes back as [`Inbound::Ignored`].
pub fn parse_frame(text: &str) -> Result<Inbound, serde_json::Error> {
    if text == PONG_FRAME {
        return Ok(Inbound::Pong);
    }

    let raw: Value = serde_json::from_str(text)?;
    if !raw.is_object() {
        return Err(de::Error::custom("push frame is not a JSON object"));
    }
    let message: WsMessage = serde_json::from_value(raw)?;
    let Some(msg_type) = message.msg_type.as_ref().and_then(Value::as_str) else {
        return Ok(Inbound::Ignored("message without type".to_string()));
    };
    let data = &message.data;

    let inbound = match msg_type {
        VOTE_UPDATE => match to_id(field(data, "poll_id")) {
            Some(poll_id) => Inbound::Push(PushEvent::VoteUpdate {
                poll_id,
                vote_counts: normalize_vote_counts(field(data, "vote_counts")),
            }),
            None => Inbound::Ignored("vote_update without a valid poll_id".to_string()),
        },
        LIKE_UPDATE => match to_id(field(data, "poll_id")) {
            Some(poll_id) => Inbound::Push(PushEvent::LikeUpdate {
                poll_id,
                total_likes: to_count(field(data, "total_likes")),
            }),
            None => Inbound::Ignored("like_update without a valid poll_id".to_string()),
        },
        POLL_CREATED => match normalize_poll(data) {
            Some(poll) => Inbound::Push(PushEvent::PollCreated(poll)),
            None => Inbound::Ignored("poll_created without a usable poll".to_string()),
        },
        other => Inbound::Ignored(format!("unhandled message type: {other}")),
    };
    Ok(inbound)
}
