//! # Abstract Submissions
//!
//! Public call-for-papers form and the moderator review step.

use crate::primitives::{MAX_ABSTRACT_WORDS, MAX_AUTHORS, MAX_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::registration::Review;
use crate::validation;
use crate::{ConfError, SubmissionId, Timestamp};
use serde::{Deserialize, Serialize};

/// Review state of an abstract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Abstract as entered in the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAbstract {
    pub title: String,
    pub authors: Vec<String>,
    pub presenter_email: String,
    pub track: String,
    pub body: String,
}

/// A stored abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractSubmission {
    pub id: SubmissionId,
    pub title: String,
    pub authors: Vec<String>,
    pub presenter_email: String,
    pub track: String,
    pub body: String,
    pub status: SubmissionStatus,
    pub submitted_at: Timestamp,
    pub review: Option<Review>,
}

impl AbstractSubmission {
    /// Same presenter and same title, ignoring case and surrounding space.
    #[must_use]
    pub fn duplicates(&self, other: &NewAbstract) -> bool {
        self.presenter_email == other.presenter_email
            && self.title.to_lowercase() == other.title.trim().to_lowercase()
    }
}

/// Number of whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

impl NewAbstract {
    /// Trim and check every field.
    pub fn normalized(&self) -> Result<Self, ConfError> {
        let title = validation::required_text("title", &self.title, MAX_TITLE_LENGTH)?;
        if self.authors.is_empty() {
            return Err(ConfError::validation("at least one author is required"));
        }
        if self.authors.len() > MAX_AUTHORS {
            return Err(ConfError::validation(format!(
                "at most {MAX_AUTHORS} authors are allowed"
            )));
        }
        let authors = self
            .authors
            .iter()
            .map(|a| validation::required_text("author", a, MAX_NAME_LENGTH))
            .collect::<Result<Vec<_>, _>>()?;
        let presenter_email = validation::email(&self.presenter_email)?;
        let track = validation::required_text("track", &self.track, MAX_TITLE_LENGTH)?;

        let body = self.body.trim().to_string();
        let words = word_count(&body);
        if words == 0 {
            return Err(ConfError::validation("abstract body is required"));
        }
        if words > MAX_ABSTRACT_WORDS {
            return Err(ConfError::validation(format!(
                "abstract has {words} words, limit is {MAX_ABSTRACT_WORDS}"
            )));
        }

        Ok(Self {
            title,
            authors,
            presenter_email,
            track,
            body,
        })
    }
}
