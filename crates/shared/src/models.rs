use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A congressional bill as stored in the `bills` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bill {
    pub id: i64,
    /// Stable identifier used in URLs, e.g. "hr-3076-119".
    pub slug: String,
    pub congress: i32,
    pub bill_type: String,
    pub number: i32,
    pub title: String,
    pub latest_action: Option<String>,
    pub latest_action_date: Option<String>,
    pub source_url: String,
    pub summary_overview: Option<String>,
    pub summary_points: Vec<String>,
    pub tweeted: bool,
    pub tweet_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting (or refreshing) a bill row.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub slug: String,
    pub congress: i32,
    pub bill_type: String,
    pub number: i32,
    pub title: String,
    pub latest_action: Option<String>,
    pub latest_action_date: Option<String>,
    pub source_url: String,
    pub summary_overview: Option<String>,
    pub summary_points: Vec<String>,
}

/// A user's position on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Yes,
    No,
    Unsure,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Yes => "yes",
            VoteType::No => "no",
            VoteType::Unsure => "unsure",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vote counts for one bill.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VoteTally {
    pub yes: i64,
    pub no: i64,
    pub unsure: i64,
}

impl VoteTally {
    pub fn total(&self) -> i64 {
        self.yes + self.no + self.unsure
    }

    /// Whole-number percentage for one option; 0 when nobody has voted.
    pub fn percent(&self, vote: VoteType) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let count = match vote {
            VoteType::Yes => self.yes,
            VoteType::No => self.no,
            VoteType::Unsure => self.unsure,
        };
        ((count as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Outcome of summarizing a bill with Claude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillSummary {
    Success {
        overview: String,
        points: Vec<String>,
    },
    Insufficient,
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_type_strings_match_db_values() {
        assert_eq!(VoteType::Yes.as_str(), "yes");
        assert_eq!(VoteType::No.as_str(), "no");
        assert_eq!(VoteType::Unsure.as_str(), "unsure");
        assert_eq!(VoteType::No.to_string(), "no");
    }

    #[test]
    fn test_vote_type_serde_lowercase() {
        let vote: VoteType = serde_json::from_str("\"unsure\"").unwrap();
        assert_eq!(vote, VoteType::Unsure);
        assert_eq!(serde_json::to_string(&VoteType::Yes).unwrap(), "\"yes\"");
    }

    #[test]
    fn test_vote_type_serde_rejects_unknown() {
        assert!(serde_json::from_str::<VoteType>("\"maybe\"").is_err());
        assert!(serde_json::from_str::<VoteType>("\"YES\"").is_err());
        assert!(serde_json::from_str::<VoteType>("\"\"").is_err());
    }

    #[test]
    fn test_tally_percent_empty() {
        let tally = VoteTally::default();
        assert_eq!(tally.percent(VoteType::Yes), 0);
    }

    #[test]
    fn test_tally_percent_rounds() {
        let tally = VoteTally {
            yes: 2,
            no: 1,
            unsure: 0,
        };
        assert_eq!(tally.percent(VoteType::Yes), 67);
        assert_eq!(tally.percent(VoteType::No), 33);
        assert_eq!(tally.total(), 3);
    }
}
