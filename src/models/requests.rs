use serde::{Deserialize, Serialize};

use super::poll::OptionId;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_OPTION_LEN: usize = 100;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CreatePollRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: Vec<String>,
    pub allow_multiple_votes: bool,
}

impl CreatePollRequest {
    /// Trims the form input and checks it, returning the body to send.
    ///
    /// Blank options are dropped before counting; an empty description is omitted.
    pub fn validated(
        title: &str,
        description: Option<&str>,
        options: &[String],
        allow_multiple_votes: bool,
    ) -> Result<Self, String> {
        let title = title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(format!("Title must be at most {MAX_TITLE_LEN} characters"));
        }

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(format!("Description must be at most {MAX_DESCRIPTION_LEN} characters"));
        }

        let options: Vec<String> = options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if options.len() < MIN_OPTIONS {
            return Err(format!("At least {MIN_OPTIONS} options are required"));
        }
        if options.len() > MAX_OPTIONS {
            return Err(format!("Maximum {MAX_OPTIONS} options allowed"));
        }
        if options.iter().any(|o| o.chars().count() > MAX_OPTION_LEN) {
            return Err(format!("Options must be at most {MAX_OPTION_LEN} characters"));
        }

        Ok(Self {
            title: title.to_string(),
            description,
            options,
            allow_multiple_votes,
        })
    }
}

#[derive(Serialize, Debug)]
pub struct VoteRequest {
    pub option_id: OptionId,
}

/// Error body the server returns on failed requests.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
