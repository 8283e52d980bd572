//! Origin Module
//!
//! Builds cache strategies that fetch JSON resources from an upstream HTTP
//! origin with reqwest.

use serde_json::Value;
use tracing::warn;

use crate::cache::Strategy;

// == Origin ==
/// The authoritative source behind the served cache.
#[derive(Debug, Clone)]
pub struct Origin {
    client: reqwest::Client,
    base_url: String,
}

impl Origin {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL the resource `id` is fetched from.
    pub fn url_for(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id.trim_start_matches('/'))
    }

    // == Strategy ==
    /// Fetches `id` as a JSON body. A `null` body fails validation so an
    /// origin that has nothing to say never overwrites cached data.
    pub fn strategy(&self, id: &str) -> Strategy<Value> {
        let client = self.client.clone();
        let url = self.url_for(id);

        Strategy::with_parser(
            id,
            move || fetch_body(client.clone(), url.clone()),
            |body: String| Ok(serde_json::from_str::<Value>(&body)?),
        )
        .validate(|value| !value.is_null())
        .on_error(|err| warn!("Origin request failed: {}", err))
    }
}

async fn fetch_body(client: reqwest::Client, url: String) -> anyhow::Result<String> {
    let response = client.get(&url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_cleanly() {
        let origin = Origin::new("http://origin.local/api/");
        assert_eq!(origin.base_url(), "http://origin.local/api");
        assert_eq!(origin.url_for("posts/1"), "http://origin.local/api/posts/1");
        assert_eq!(origin.url_for("/posts/1"), "http://origin.local/api/posts/1");
    }

    #[test]
    fn test_strategy_keeps_id() {
        let origin = Origin::new("http://origin.local");
        assert_eq!(origin.strategy("post-1").id(), "post-1");
    }
}
