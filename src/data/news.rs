//! News collaborator.
//! The pipeline only depends on the `NewsFeed` port; the concrete client
//! pulls the Google News RSS search feed for a ticker. A failure here is
//! absorbed to an empty news list at the orchestrator, never fatal.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

use super::{NewsItem, PipelineError, PipelineResult};

/// Port for fetching an ordered batch of raw news items.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn fetch_news(&self, ticker: &str, max_items: usize) -> PipelineResult<Vec<NewsItem>>;
}

/// Google News RSS search client
pub struct GoogleNewsClient {
    http_client: reqwest::Client,
    timeout_seconds: u64,
}

impl GoogleNewsClient {
    const SOURCE_NAME: &'static str = "Google News";

    pub fn new(timeout_seconds: u64) -> PipelineResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("stockwatch/0.1.0")
            .build()
            .map_err(PipelineError::Fetch)?;

        Ok(Self {
            http_client,
            timeout_seconds,
        })
    }

    fn feed_url(ticker: &str) -> String {
        format!(
            "https://news.google.com/rss/search?q={}+stock&hl=en-US&gl=US&ceid=US:en",
            urlencoding::encode(ticker)
        )
    }

    /// Extract `(title, link)` pairs from the RSS body, in feed order.
    /// A minimal tag scan keeps this a thin I/O wrapper.
    fn parse_feed(body: &str, max_items: usize) -> Vec<NewsItem> {
        let mut items = Vec::new();
        let mut rest = body;

        while items.len() < max_items {
            let Some(start) = rest.find("<item>") else {
                break;
            };
            let Some(end) = rest[start..].find("</item>") else {
                break;
            };
            let item_xml = &rest[start + "<item>".len()..start + end];
            rest = &rest[start + end + "</item>".len()..];

            let title = extract_tag(item_xml, "title");
            let link = extract_tag(item_xml, "link");
            if let (Some(title), Some(link)) = (title, link) {
                if !title.is_empty() {
                    items.push(NewsItem {
                        title,
                        link,
                        source: Self::SOURCE_NAME.to_string(),
                    });
                }
            }
        }

        items
    }
}

/// Pull the text content of the first `<tag>..</tag>` pair, unwrapping
/// CDATA and decoding the basic XML entities.
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let raw = xml[start..end].trim();

    let inner = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw);

    // `&amp;` must decode last or escaped entities double-decode
    Some(
        inner
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
            .trim()
            .to_string(),
    )
}

#[async_trait]
impl NewsFeed for GoogleNewsClient {
    async fn fetch_news(&self, ticker: &str, max_items: usize) -> PipelineResult<Vec<NewsItem>> {
        info!(ticker, max_items, "Fetching news");

        let url = Self::feed_url(ticker);
        let response = timeout(
            Duration::from_secs(self.timeout_seconds),
            self.http_client.get(&url).send(),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            seconds: self.timeout_seconds,
        })??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::api_error(status, message));
        }

        let body = response.text().await?;
        let items = Self::parse_feed(&body, max_items);
        info!(ticker, count = items.len(), "Fetched news items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Search results</title>
<item><title>AMD stock surges on earnings</title><link>https://example.com/a</link></item>
<item><title><![CDATA[Chipmaker faces lawsuit &amp; probe]]></title><link>https://example.com/b</link></item>
<item><title>Third headline</title><link>https://example.com/c</link></item>
</channel></rss>"#;

    #[test]
    fn test_parse_feed_preserves_order_and_caps() {
        let items = GoogleNewsClient::parse_feed(FEED, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "AMD stock surges on earnings");
        assert_eq!(items[0].link, "https://example.com/a");
        assert_eq!(items[0].source, "Google News");
    }

    #[test]
    fn test_parse_feed_unwraps_cdata_and_entities() {
        let items = GoogleNewsClient::parse_feed(FEED, 5);
        assert_eq!(items[1].title, "Chipmaker faces lawsuit & probe");
    }

    #[test]
    fn test_parse_feed_handles_empty_body() {
        assert!(GoogleNewsClient::parse_feed("<rss></rss>", 5).is_empty());
    }

    #[test]
    fn test_extract_tag_does_not_double_decode_escaped_entities() {
        let xml = "<title>a &amp;lt; b &amp;amp; c</title>";
        assert_eq!(extract_tag(xml, "title").as_deref(), Some("a &lt; b &amp; c"));
    }
}
