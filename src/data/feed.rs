//! HTTP JSON feed of compensation records.
//!
//! The feed answers `GET <url>` with either a bare JSON array of records or an
//! object wrapping them as `{"records": [...]}`. Entries that do not parse, or
//! that carry a negative or non-finite compensation, are skipped.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::data::PopulationSource;
use crate::domain::CompensationRecord;
use crate::error::{Error, Result};

pub const FEED_URL_VAR: &str = "COHERENCE_FEED_URL";
pub const FEED_TOKEN_VAR: &str = "COHERENCE_FEED_TOKEN";

#[derive(Debug, Clone)]
pub struct FeedSource {
    client: Client,
    url: String,
    token: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    /// URL from `COHERENCE_FEED_URL`, optional bearer token from
    /// `COHERENCE_FEED_TOKEN`. A `.env` file is honoured.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = std::env::var(FEED_URL_VAR)
            .map_err(|_| Error::Config(format!("Missing {FEED_URL_VAR} in environment (.env).")))?;
        let token = std::env::var(FEED_TOKEN_VAR).ok().filter(|t| !t.is_empty());
        Self::new(url, token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Bare(Vec<serde_json::Value>),
    Wrapped { records: Vec<serde_json::Value> },
}

#[async_trait]
impl PopulationSource for FeedSource {
    async fn list_all_compensation_records(&self) -> Result<Vec<CompensationRecord>> {
        let mut req = self.client.get(&self.url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Source(format!("Feed request failed with status {}.", resp.status())));
        }

        let body: FeedBody = resp
            .json()
            .await
            .map_err(|e| Error::Source(format!("Failed to parse feed response: {e}")))?;
        let (records, skipped) = parse_entries(body);
        if skipped > 0 {
            warn!(skipped, "Skipped malformed feed entries");
        }
        debug!(records = records.len(), "Fetched population feed");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("feed {}", self.url)
    }
}

fn parse_entries(body: FeedBody) -> (Vec<CompensationRecord>, usize) {
    let entries = match body {
        FeedBody::Bare(v) | FeedBody::Wrapped { records: v } => v,
    };
    let total = entries.len();
    let records: Vec<CompensationRecord> = entries
        .into_iter()
        .filter_map(|v| serde_json::from_value::<CompensationRecord>(v).ok())
        .filter(|r| r.compensation.is_finite() && r.compensation >= 0.0)
        .collect();
    let skipped = total - records.len();
    (records, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_wrapped_bodies() {
        let bare: FeedBody = serde_json::from_str(
            r#"[{"location":"Paris","total_xp":3,"compensation":52000},{"compensation":"n/a"}]"#,
        )
        .unwrap();
        let (records, skipped) = parse_entries(bare);
        assert_eq!(records, vec![CompensationRecord::new("Paris", Some(3.0), 52_000.0)]);
        assert_eq!(skipped, 1);

        let wrapped: FeedBody =
            serde_json::from_str(r#"{"records":[{"location":"Lyon","compensation":41000},{"compensation":-1}]}"#)
                .unwrap();
        let (records, skipped) = parse_entries(wrapped);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].years_xp, None);
        assert_eq!(skipped, 1);
    }
}
