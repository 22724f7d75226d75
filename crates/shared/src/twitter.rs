use anyhow::{Context, Result};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::config::TwitterKeys;
use crate::models::Bill;

const TWEET_ENDPOINT: &str = "https://api.twitter.com/2/tweets";

// Twitter counts any URL as 23 characters after t.co wrapping
const LINK_LENGTH: usize = 23;
const TWEET_BUDGET: usize = 280;

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

pub struct TwitterClient {
    client: Client,
    keys: TwitterKeys,
}

impl TwitterClient {
    pub fn new(keys: TwitterKeys) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, keys })
    }

    /// Post a tweet; returns the public status URL.
    pub async fn post_tweet(&self, text: &str) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().timestamp().to_string();
        let authorization = self.authorization_header("POST", TWEET_ENDPOINT, &nonce, &timestamp)?;

        let response = self
            .client
            .post(TWEET_ENDPOINT)
            .header("Authorization", authorization)
            .json(&TweetRequest { text })
            .send()
            .await
            .context("Failed to send tweet request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Twitter API returned error: {} - {}", status, error_text);
        }

        let posted = response
            .json::<TweetResponse>()
            .await
            .context("Failed to parse Twitter API response")?;

        Ok(format!(
            "https://twitter.com/i/web/status/{}",
            posted.data.id
        ))
    }

    /// Build the OAuth 1.0a `Authorization` header for a JSON-body request.
    /// Only the oauth_* parameters enter the signature base string.
    fn authorization_header(
        &self,
        method: &str,
        url: &str,
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        // Must stay lexicographically sorted by parameter name
        let params = [
            ("oauth_consumer_key", self.keys.api_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.keys.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let param_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method,
            percent_encode(url),
            percent_encode(&param_string)
        );

        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.keys.api_secret),
            percent_encode(&self.keys.access_secret)
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes())
            .context("Failed to initialize HMAC")?;
        mac.update(base_string.as_bytes());
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let mut header = String::from("OAuth ");
        for (i, (k, v)) in params.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            header.push_str(&format!("{}=\"{}\"", percent_encode(k), percent_encode(v)));
        }
        header.push_str(&format!(
            ", oauth_signature=\"{}\"",
            percent_encode(&signature)
        ));

        Ok(header)
    }
}

fn percent_encode(s: &str) -> String {
    // RFC 3986 encoding, which is what OAuth 1.0a requires
    urlencoding::encode(s).into_owned()
}

/// Compose the digest tweet for a bill, staying inside the 280-char budget.
pub fn compose_tweet(bill: &Bill, site_base_url: &str) -> String {
    let link = format!("{}/b/{}", site_base_url.trim_end_matches('/'), bill.slug);

    let lead_point = bill
        .summary_points
        .first()
        .cloned()
        .or_else(|| bill.summary_overview.clone())
        .unwrap_or_default();

    let prefix = "\u{1F4DC} New in Congress: ";
    let suffix = "\n\n\u{1F5F3} What do you think? Vote: ";

    // The link counts at t.co length no matter how long it really is
    let fixed = prefix.chars().count()
        + 1 // newline after title
        + suffix.chars().count()
        + LINK_LENGTH;

    // Whatever the fixed parts leave is split between title and lead point:
    // the title gets at most 120 chars so a verbose bill still leaves room
    // for the point, and the point gets the remainder. Both are truncated,
    // so the counted total never exceeds fixed + body_budget = 280.
    let body_budget = TWEET_BUDGET.saturating_sub(fixed);
    let title = truncate_chars(&bill.title, body_budget.min(120));
    let lead = truncate_chars(&lead_point, body_budget - title.chars().count());

    format!("{}{}\n{}{}{}", prefix, title, lead, suffix, link)
}

/// Truncate to at most `max` chars, appending an ellipsis when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let cut: String = s.chars().take(max - 1).collect();
    format!("{}\u{2026}", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_bill(title: &str, points: Vec<&str>) -> Bill {
        Bill {
            id: 1,
            slug: "hr-3076-119".to_string(),
            congress: 119,
            bill_type: "HR".to_string(),
            number: 3076,
            title: title.to_string(),
            latest_action: None,
            latest_action_date: None,
            source_url: "https://www.congress.gov/bill/119th-congress/house-bill/3076"
                .to_string(),
            summary_overview: Some("An overview.".to_string()),
            summary_points: points.into_iter().map(String::from).collect(),
            tweeted: false,
            tweet_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compose_tweet_contains_link_and_point() {
        let bill = sample_bill("Postal Service Reform Act", vec!["Fixes mail delivery"]);
        let tweet = compose_tweet(&bill, "https://teencivics.org/");
        assert!(tweet.contains("Postal Service Reform Act"));
        assert!(tweet.contains("Fixes mail delivery"));
        assert!(tweet.contains("https://teencivics.org/b/hr-3076-119"));
    }

    #[test]
    fn test_compose_tweet_respects_budget() {
        let long_title = "A".repeat(500);
        let bill = sample_bill(&long_title, vec!["Short point"]);
        let tweet = compose_tweet(&bill, "https://teencivics.org");

        // Count the link at t.co length, like Twitter does
        let link = "https://teencivics.org/b/hr-3076-119";
        let counted = tweet.chars().count() - link.chars().count() + LINK_LENGTH;
        assert!(counted <= TWEET_BUDGET, "tweet counted at {} chars", counted);
        assert!(tweet.contains('\u{2026}'));
    }

    #[test]
    fn test_compose_tweet_budget_with_long_point() {
        // A single rambling summary point must not blow the budget either
        let long_point = "young people gain new protections under this measure ".repeat(8);
        let bill = sample_bill(
            "Student Loan Interest Relief and Transparency Act",
            vec![long_point.trim()],
        );
        let tweet = compose_tweet(&bill, "https://teencivics.org");

        let link = "https://teencivics.org/b/hr-3076-119";
        let counted = tweet.chars().count() - link.chars().count() + LINK_LENGTH;
        assert!(counted <= TWEET_BUDGET, "tweet counted at {} chars", counted);
        assert!(tweet.contains("young people gain"));
    }

    #[test]
    fn test_compose_tweet_budget_long_title_and_point() {
        let long_point = "a".repeat(400);
        let long_title = "B".repeat(400);
        let bill = sample_bill(&long_title, vec![long_point.as_str()]);
        let tweet = compose_tweet(&bill, "https://teencivics.org");

        let link = "https://teencivics.org/b/hr-3076-119";
        let counted = tweet.chars().count() - link.chars().count() + LINK_LENGTH;
        assert!(counted <= TWEET_BUDGET, "tweet counted at {} chars", counted);
    }

    #[test]
    fn test_compose_tweet_falls_back_to_overview() {
        let bill = sample_bill("Some Bill", vec![]);
        let tweet = compose_tweet(&bill, "https://teencivics.org");
        assert!(tweet.contains("An overview."));
    }

    #[test]
    fn test_truncate_chars_boundary() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        let cut = truncate_chars("héllo wörld", 6);
        assert!(cut.chars().count() <= 6);
        assert!(cut.ends_with('\u{2026}'));
    }

    #[test]
    fn test_percent_encode_rfc3986() {
        assert_eq!(percent_encode("a b&c"), "a%20b%26c");
        assert_eq!(percent_encode("~safe-chars_."), "~safe-chars_.");
    }

    #[test]
    fn test_authorization_header_shape() {
        let client = TwitterClient::new(TwitterKeys {
            api_key: "ck".to_string(),
            api_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_secret: "as".to_string(),
        })
        .unwrap();

        let header = client
            .authorization_header("POST", TWEET_ENDPOINT, "abc123", "1700000000")
            .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(header.contains("oauth_version=\"1.0\""));
    }
}
