//! The client-side poll collection and its mutation protocol.
//!
//! `PollsState` owns every poll the client knows about plus the focused poll shown in
//! detail view. The focused poll is a separate copy; every mutation that matches its id
//! is applied to both so they never drift. Vote, tally and like mutations commute, so
//! a push that overtakes the response to the viewer's own request converges to the same
//! state as one that arrives after it.

use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::models::poll::{OptionId, Poll, PollId};
use crate::models::websocket::PushEvent;
use crate::normalize::{normalize_poll, normalize_polls};

#[derive(Debug, Default, Clone)]
pub struct PollsState {
    polls: Vec<Poll>,
    current: Option<Poll>,
    loading: bool,
    error: Option<String>,
}

impl PollsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls in display order, most recently created first.
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn current(&self) -> Option<&Poll> {
        self.current.as_ref()
    }

    pub fn get(&self, poll_id: PollId) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Records a failed request. Poll data is left as it was.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn for_each_match(&mut self, poll_id: PollId, mut apply: impl FnMut(&mut Poll)) {
        if let Some(poll) = self.polls.iter_mut().find(|p| p.id == poll_id) {
            apply(poll);
        }
        if let Some(current) = self.current.as_mut().filter(|p| p.id == poll_id) {
            apply(current);
        }
    }

    /// Replaces the whole collection with a list fetch result, keeping server order.
    ///
    /// The focused poll is refreshed when the new list contains it and left as-is
    /// otherwise.
    pub fn replace_all(&mut self, polls: Vec<Poll>) {
        if let Some(current) = self.current.as_mut() {
            if let Some(fresh) = polls.iter().find(|p| p.id == current.id) {
                *current = fresh.clone();
            }
        }
        self.polls = polls;
        self.loading = false;
        self.error = None;
    }

    /// [`Self::replace_all`] over a raw list payload.
    pub fn load_polls(&mut self, raw: &Value) {
        self.replace_all(normalize_polls(raw));
    }

    /// Focuses a freshly fetched poll and replaces its list entry in place, if any.
    pub fn replace_one(&mut self, poll: Poll) {
        if let Some(slot) = self.polls.iter_mut().find(|p| p.id == poll.id) {
            *slot = poll.clone();
        }
        self.current = Some(poll);
    }

    /// [`Self::replace_one`] over a raw payload. Returns the poll id, or `None` when
    /// the payload was rejected and nothing changed.
    pub fn load_poll(&mut self, raw: &Value) -> Option<PollId> {
        let poll = normalize_poll(raw)?;
        let id = poll.id;
        self.replace_one(poll);
        Some(id)
    }

    /// Inserts `poll` at the front, evicting any stale entry with the same id. The
    /// focused poll is refreshed only if it already is this poll.
    pub fn add_new_poll(&mut self, poll: Poll) {
        self.polls.retain(|p| p.id != poll.id);
        if let Some(current) = self.current.as_mut().filter(|p| p.id == poll.id) {
            *current = poll.clone();
        }
        self.polls.insert(0, poll);
    }

    /// Applies the server's response to the viewer's own create request: inserted at
    /// the front like [`Self::add_new_poll`] and focused.
    pub fn insert_created(&mut self, poll: Poll) {
        self.add_new_poll(poll.clone());
        self.current = Some(poll);
        self.error = None;
    }

    /// [`Self::insert_created`] over a raw payload.
    pub fn load_created(&mut self, raw: &Value) -> Option<PollId> {
        let poll = normalize_poll(raw)?;
        let id = poll.id;
        self.insert_created(poll);
        Some(id)
    }

    /// Records an acknowledged vote. Tallies are untouched; they change only through
    /// [`Self::apply_vote_counts`].
    pub fn apply_vote(&mut self, poll_id: PollId, option_id: OptionId) {
        self.for_each_match(poll_id, |poll| {
            poll.user_has_voted = true;
            if poll.allow_multiple_votes {
                if !poll.user_voted_options.contains(&option_id) {
                    poll.user_voted_options.push(option_id);
                }
            } else {
                poll.user_voted_options = vec![option_id];
            }
        });
    }

    /// Overwrites every option's count from a tally snapshot. Options missing from the
    /// snapshot read as zero; `total_votes` is the snapshot's sum.
    pub fn apply_vote_counts(&mut self, poll_id: PollId, vote_counts: &BTreeMap<OptionId, u64>) {
        let total_votes: u64 = vote_counts.values().sum();
        self.for_each_match(poll_id, |poll| {
            for option in poll.options.iter_mut() {
                option.vote_count = vote_counts.get(&option.id).copied().unwrap_or(0);
            }
            poll.total_votes = total_votes;
        });
    }

    /// Authoritative like count from the server.
    pub fn set_total_likes(&mut self, poll_id: PollId, total_likes: u64) {
        self.for_each_match(poll_id, |poll| poll.total_likes = total_likes);
    }

    /// Records an acknowledged like or unlike.
    ///
    /// The flag flips immediately. The counter moves by one only with `adjust_count`,
    /// which callers set when no push channel is open to deliver the real count.
    pub fn apply_like_toggle(&mut self, poll_id: PollId, liked: bool, adjust_count: bool) {
        self.for_each_match(poll_id, |poll| {
            if adjust_count {
                poll.total_likes = if liked {
                    poll.total_likes.saturating_add(1)
                } else {
                    poll.total_likes.saturating_sub(1)
                };
            }
            poll.user_has_liked = liked;
        });
    }

    pub fn apply_push(&mut self, event: &PushEvent) {
        match event {
            PushEvent::VoteUpdate {
                poll_id,
                vote_counts,
            } => {
                debug!("Applying tally for poll {}", poll_id);
                self.apply_vote_counts(*poll_id, vote_counts);
            }
            PushEvent::LikeUpdate {
                poll_id,
                total_likes,
            } => {
                debug!("Applying like count {} for poll {}", total_likes, poll_id);
                self.set_total_likes(*poll_id, *total_likes);
            }
            PushEvent::PollCreated(poll) => {
                debug!("Adding pushed poll {}", poll.id);
                self.add_new_poll(poll.clone());
            }
        }
    }
}
