use crate::sentiment::TextScraper;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Post titles from Reddit's public search API
///
/// Reddit requires a descriptive User-Agent; deployments set it via
/// configuration (`PULSE_REDDIT_USER_AGENT`). No OAuth is needed for
/// public search.
pub struct RedditScraper {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    limit: usize,
}

impl RedditScraper {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self::with_base_url(user_agent, "https://www.reddit.com")
    }

    pub fn with_base_url(user_agent: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            limit: 25,
        }
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/search.json", self.base_url);
        let limit = self.limit.to_string();
        let body: Value = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(&[("q", query), ("sort", "new"), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let titles: Vec<String> = body
            .pointer("/data/children")
            .and_then(Value::as_array)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|child| child.pointer("/data/title"))
                    .filter_map(Value::as_str)
                    .map(|title| title.to_string())
                    .collect()
            })
            .unwrap_or_default();

        debug!(query = %query, titles = titles.len(), "searched reddit");
        Ok(titles)
    }
}

#[async_trait]
impl TextScraper for RedditScraper {
    async fn scrape_targets(
        &self,
        symbols: &[String],
    ) -> anyhow::Result<HashMap<String, Vec<String>>> {
        let mut result = HashMap::new();
        for symbol in symbols {
            match self.search(symbol).await {
                Ok(titles) if !titles.is_empty() => {
                    result.insert(symbol.clone(), titles);
                }
                Ok(_) => debug!(symbol = %symbol, "no posts found"),
                // One failing query must not sink the whole cycle.
                Err(err) => warn!(symbol = %symbol, error = %err, "reddit search failed"),
            }
        }
        Ok(result)
    }
}
