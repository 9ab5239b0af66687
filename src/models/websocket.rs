use std::collections::BTreeMap;

use serde::Deserialize;

use super::poll::{OptionId, Poll, PollId};

/// Liveness probe sent as a bare text frame, never JSON.
pub const PING_FRAME: &str = "ping";
/// Server reply to [`PING_FRAME`]; dropped without parsing.
pub const PONG_FRAME: &str = "pong";

pub const VOTE_UPDATE: &str = "vote_update";
pub const LIKE_UPDATE: &str = "like_update";
pub const POLL_CREATED: &str = "poll_created";

/// Outer shape of every JSON push frame. `data` stays untyped until it crosses
/// the normalization boundary.
#[derive(Deserialize, Debug)]
pub struct WsMessage {
    #[serde(rename = "type", default)]
    pub msg_type: Option<serde_json::Value>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Complete tally snapshot for one poll.
    VoteUpdate {
        poll_id: PollId,
        vote_counts: BTreeMap<OptionId, u64>,
    },
    LikeUpdate {
        poll_id: PollId,
        total_likes: u64,
    },
    PollCreated(Poll),
}

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Pong,
    Push(PushEvent),
    /// Well-formed JSON the client does not act on; carries the reason for logging.
    Ignored(String),
}
