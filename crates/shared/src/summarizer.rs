use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::models::BillSummary;

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

pub struct BillSummarizer {
    client: Client,
    api_key: String,
    semaphore: Arc<Semaphore>,
}

impl BillSummarizer {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        // Low concurrency to stay inside the API token-per-minute budget
        let semaphore = Arc::new(Semaphore::new(2));

        Ok(Self {
            client,
            api_key,
            semaphore,
        })
    }

    pub async fn summarize_bill(&self, title: &str, text: &str) -> Result<BillSummary> {
        let _permit = self.semaphore.acquire().await?;

        for attempt in 0..5 {
            match self.try_summarize(title, text).await {
                Ok(summary) => {
                    // Small delay after a successful request to spread load
                    tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
                    return Ok(summary);
                }
                Err(e) => {
                    let error_msg = e.to_string();
                    let is_rate_limit = error_msg.contains("rate_limit");

                    if attempt == 4 {
                        warn!("Failed to summarize bill: {}", e);
                        return Ok(BillSummary::Failed(e.to_string()));
                    }

                    // Longer backoff for rate limits
                    let backoff = if is_rate_limit {
                        std::time::Duration::from_secs(15 * (attempt + 1) as u64)
                    } else {
                        std::time::Duration::from_millis(1000 * (2_u64.pow(attempt as u32)))
                    };

                    if is_rate_limit {
                        warn!("Rate limit hit, waiting {:?} before retry...", backoff);
                    }

                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Ok(BillSummary::Failed("Max retries reached".to_string()))
    }

    async fn try_summarize(&self, title: &str, text: &str) -> Result<BillSummary> {
        // Truncate bill text to 10000 chars, respecting UTF-8 boundaries
        let truncated = if text.len() > 10000 {
            let mut end = 10000;
            while end > 0 && !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[..end]
        } else {
            text
        };

        let prompt = format!(
            r#"You are explaining a congressional bill to high-school students. Write a plain-language digest of the bill below.

RULES:
1. Start with a single line: OVERVIEW: followed by one sentence (under 30 words) saying what the bill does
2. Then list 3 to 5 bullet points using dashes (-), each under 20 words
3. Each point must describe a concrete effect of the bill, especially effects on young people where they exist
4. Use ONLY the bill text provided - no outside knowledge, no opinions
5. No jargon: prefer everyday words over legal or legislative terms
6. If the text is too short or vague to summarize, respond with exactly: "Insufficient content for summary"

Bill title: {}

Bill text:
{}

Format your response as:
OVERVIEW: one plain-language sentence
- First key point
- Second key point
- Third key point"#,
            title, truncated
        );

        let request = ClaudeRequest {
            model: "claude-3-5-haiku-20241022".to_string(),
            max_tokens: 512,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Claude API error: {}", error_text);
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .context("Failed to parse Claude API response")?;

        let reply = claude_response
            .content
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or("");

        if reply.contains("Insufficient content for summary") {
            return Ok(BillSummary::Insufficient);
        }

        let (overview, points) = parse_digest(reply);

        match overview {
            Some(overview) if (3..=5).contains(&points.len()) => {
                Ok(BillSummary::Success { overview, points })
            }
            Some(_) => Ok(BillSummary::Failed(format!(
                "Expected 3-5 bullet points, got {}",
                points.len()
            ))),
            None => Ok(BillSummary::Failed("Missing OVERVIEW line".to_string())),
        }
    }
}

/// Split a model reply into the overview sentence and bullet points.
fn parse_digest(text: &str) -> (Option<String>, Vec<String>) {
    let mut overview = None;
    let mut points = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("OVERVIEW:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                overview = Some(rest.to_string());
            }
            continue;
        }

        if trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with('•') {
            let stripped = trimmed[1..].trim();
            if !stripped.is_empty() {
                points.push(stripped.to_string());
            }
            continue;
        }

        // Some replies number the points instead
        if let Some(stripped) = trimmed.strip_prefix(|c: char| c.is_numeric()) {
            let stripped =
                stripped.trim_start_matches(|c: char| c == '.' || c == ')' || c.is_whitespace());
            if !stripped.is_empty() {
                points.push(stripped.to_string());
            }
        }
    }

    (overview, points)
}
