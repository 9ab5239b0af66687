use serde::{Deserialize, Serialize};

pub type PollId = u64;
pub type OptionId = u64;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PollOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
    pub vote_count: u64,
}

/// Canonical client-side poll. Only built by [`crate::normalize`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: u64,
    pub creator_username: String,
    pub is_active: bool,
    pub allow_multiple_votes: bool,
    pub created_at: String,
    pub options: Vec<PollOption>,
    pub total_votes: u64,
    pub total_likes: u64,
    pub user_has_voted: bool,
    pub user_has_liked: bool,
    /// Option ids the viewer picked. Unique, insertion ordered.
    pub user_voted_options: Vec<OptionId>,
}

impl Poll {
    pub fn option(&self, option_id: OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn has_voted_for(&self, option_id: OptionId) -> bool {
        self.user_voted_options.contains(&option_id)
    }

    /// Whether the viewer may still vote for `option_id`.
    ///
    /// Closed polls reject every vote. Multiple-choice polls accept any option the
    /// viewer has not picked yet; single-choice polls accept a vote only until the
    /// viewer has voted once.
    pub fn can_vote_option(&self, option_id: OptionId) -> bool {
        if !self.is_active || self.option(option_id).is_none() {
            return false;
        }
        if self.allow_multiple_votes {
            !self.has_voted_for(option_id)
        } else {
            !self.user_has_voted
        }
    }

    /// Share of `total_votes` held by `option_id`, rounded to a whole percent.
    pub fn percentage(&self, option_id: OptionId) -> u64 {
        if self.total_votes == 0 {
            return 0;
        }
        let count = self.option(option_id).map_or(0, |o| o.vote_count);
        ((count as f64 / self.total_votes as f64) * 100.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(allow_multiple_votes: bool) -> Poll {
        Poll {
            id: 1,
            title: "Lunch".to_string(),
            description: None,
            creator_id: 7,
            creator_username: "ann".to_string(),
            is_active: true,
            allow_multiple_votes,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            options: vec![
                PollOption { id: 10, poll_id: 1, text: "Soup".to_string(), vote_count: 1 },
                PollOption { id: 11, poll_id: 1, text: "Salad".to_string(), vote_count: 2 },
            ],
            total_votes: 3,
            total_likes: 0,
            user_has_voted: false,
            user_has_liked: false,
            user_voted_options: vec![],
        }
    }

    #[test]
    fn single_choice_poll_locks_after_first_vote() {
        let mut p = poll(false);
        assert!(p.can_vote_option(10));
        p.user_has_voted = true;
        p.user_voted_options = vec![10];
        assert!(!p.can_vote_option(11));
    }

    #[test]
    fn multiple_choice_poll_only_locks_picked_options() {
        let mut p = poll(true);
        p.user_has_voted = true;
        p.user_voted_options = vec![10];
        assert!(!p.can_vote_option(10));
        assert!(p.can_vote_option(11));
    }

    #[test]
    fn closed_poll_and_unknown_option_reject_votes() {
        let mut p = poll(true);
        assert!(!p.can_vote_option(99));
        p.is_active = false;
        assert!(!p.can_vote_option(10));
    }

    #[test]
    fn percentage_rounds_and_handles_empty_tally() {
        let mut p = poll(false);
        assert_eq!(p.percentage(10), 33);
        assert_eq!(p.percentage(11), 67);
        p.total_votes = 0;
        assert_eq!(p.percentage(10), 0);
    }
}
