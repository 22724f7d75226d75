use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const API_BASE: &str = "https://api.congress.gov/v3";

/// One entry from the bill list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillListing {
    pub congress: i32,
    #[serde(rename = "type")]
    pub bill_type: String,
    pub number: String,
    pub title: String,
    #[serde(default)]
    pub latest_action: Option<LatestAction>,
    #[serde(default)]
    pub update_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAction {
    #[serde(default)]
    pub action_date: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl BillListing {
    /// URL-safe identifier, e.g. "hr-3076-119".
    pub fn slug(&self) -> String {
        format!(
            "{}-{}-{}",
            self.bill_type.to_lowercase(),
            self.number,
            self.congress
        )
    }

    /// Human-facing congress.gov page for this bill.
    pub fn source_url(&self) -> String {
        let chamber = match self.bill_type.to_lowercase().as_str() {
            "s" | "sres" | "sjres" | "sconres" => "senate-bill",
            _ => "house-bill",
        };
        format!(
            "https://www.congress.gov/bill/{}th-congress/{}/{}",
            self.congress, chamber, self.number
        )
    }
}

#[derive(Debug, Deserialize)]
struct BillListResponse {
    #[serde(default)]
    bills: Vec<BillListing>,
}

#[derive(Debug, Deserialize)]
struct SummariesResponse {
    #[serde(default)]
    summaries: Vec<BillTextSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillTextSummary {
    #[serde(default)]
    update_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub struct CongressClient {
    client: Client,
    api_key: String,
}

impl CongressClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("TeenCivics/1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_key })
    }

    /// Fetch the most recently updated bills, newest first.
    pub async fn fetch_recent_bills(&self, limit: usize) -> Result<Vec<BillListing>> {
        let mut all_bills = Vec::new();
        let per_page = limit.min(250);
        let mut offset = 0;

        loop {
            let url = format!(
                "{}/bill?format=json&sort=updateDate+desc&limit={}&offset={}&api_key={}",
                API_BASE, per_page, offset, self.api_key
            );

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("Failed to fetch bill list from Congress.gov")?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unknown error"));
                anyhow::bail!("Congress.gov API returned error: {} - {}", status, error_text);
            }

            let list = response
                .json::<BillListResponse>()
                .await
                .context("Failed to parse Congress.gov bill list")?;

            if list.bills.is_empty() {
                break;
            }

            all_bills.extend(list.bills);

            if all_bills.len() >= limit {
                all_bills.truncate(limit);
                break;
            }

            offset += per_page;

            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        Ok(all_bills)
    }

    /// Fetch the latest CRS summary text for a bill, stripped of markup.
    /// Returns `None` when no summary has been published yet.
    pub async fn fetch_bill_summary_text(&self, bill: &BillListing) -> Result<Option<String>> {
        let url = format!(
            "{}/bill/{}/{}/{}/summaries?format=json&api_key={}",
            API_BASE,
            bill.congress,
            bill.bill_type.to_lowercase(),
            bill.number,
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch bill summaries from Congress.gov")?;

        let status = response.status();
        // Bills without a summaries sub-resource return 404
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Congress.gov API returned error: {} - {}", status, error_text);
        }

        let summaries = response
            .json::<SummariesResponse>()
            .await
            .context("Failed to parse Congress.gov summaries response")?;

        let mut entries = summaries.summaries;
        entries.sort_by(|a, b| b.update_date.cmp(&a.update_date));

        let latest = entries.into_iter().find_map(|s| s.text);

        Ok(latest.map(|html| strip_markup(&html)))
    }
}

/// CRS summaries arrive as HTML fragments; reduce them to plain text.
fn strip_markup(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 200)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(bill_type: &str, number: &str, congress: i32) -> BillListing {
        BillListing {
            congress,
            bill_type: bill_type.to_string(),
            number: number.to_string(),
            title: "A test bill".to_string(),
            latest_action: None,
            update_date: None,
        }
    }

    #[test]
    fn test_slug_format() {
        assert_eq!(listing("HR", "3076", 119).slug(), "hr-3076-119");
        assert_eq!(listing("S", "5", 118).slug(), "s-5-118");
    }

    #[test]
    fn test_source_url_chamber() {
        assert!(listing("HR", "3076", 119)
            .source_url()
            .contains("house-bill/3076"));
        assert!(listing("S", "5", 118).source_url().contains("senate-bill/5"));
    }

    #[test]
    fn test_parse_bill_list() {
        let body = r#"{
            "bills": [
                {
                    "congress": 119,
                    "type": "HR",
                    "number": "3076",
                    "title": "Postal Service Reform Act",
                    "latestAction": {
                        "actionDate": "2026-08-20",
                        "text": "Referred to committee."
                    },
                    "updateDate": "2026-08-21"
                }
            ],
            "pagination": { "count": 1 }
        }"#;

        let parsed: BillListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.bills.len(), 1);
        let bill = &parsed.bills[0];
        assert_eq!(bill.bill_type, "HR");
        assert_eq!(bill.number, "3076");
        assert_eq!(
            bill.latest_action.as_ref().unwrap().text.as_deref(),
            Some("Referred to committee.")
        );
    }

    #[test]
    fn test_parse_summaries_missing_fields() {
        let body = r#"{ "summaries": [ { "actionDate": "2026-08-01" } ] }"#;
        let parsed: SummariesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.summaries.len(), 1);
        assert!(parsed.summaries[0].text.is_none());
    }

    #[test]
    fn test_strip_markup() {
        let text = strip_markup("<p>This bill does <b>things</b>.</p>");
        assert!(text.contains("This bill does"));
        assert!(!text.contains("<p>"));
    }
}
