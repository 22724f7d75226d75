// Public modules
pub mod config;
pub mod congress;
pub mod db;
pub mod models;
pub mod resilience;
pub mod summarizer;
pub mod twitter;

// Re-export commonly used types
pub use config::{Config, TwitterKeys, WebConfig};
pub use congress::{BillListing, CongressClient};
pub use db::{Store, StoreError};
pub use models::{Bill, BillSummary, NewBill, VoteTally, VoteType};
pub use resilience::{BreakerState, CircuitBreaker};
pub use summarizer::BillSummarizer;
pub use twitter::{compose_tweet, TwitterClient};
