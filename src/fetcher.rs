use std::collections::HashMap;
use std::time::Duration;

use feed_rs::model::Entry;
use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

use crate::config::{Config, FeedConfig};

const USER_AGENT: &str = "RssDigest/1.0 (Static Feed Digest)";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to parse feed from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: parser::ParseFeedError,
    },
}

/// Date strings as they appear in the document, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDates {
    pub published: Option<String>,
    pub updated: Option<String>,
}

/// A fetched and parsed feed document.
#[derive(Debug)]
pub struct RawFeed {
    pub title: Option<String>,
    pub entries: Vec<Entry>,
    /// Raw dates keyed by the decoded text of the item link (RSS) or entry id (Atom)
    pub raw_dates: HashMap<String, RawDates>,
}

impl RawFeed {
    pub fn raw_dates_for(&self, entry: &Entry) -> Option<&RawDates> {
        entry
            .links
            .first()
            .and_then(|l| self.raw_dates.get(l.href.trim()))
            .or_else(|| self.raw_dates.get(entry.id.trim()))
    }
}

pub struct Fetcher {
    client: Client,
    max_concurrent: usize,
}

impl Fetcher {
    pub fn new(timeout_secs: u64, max_concurrent: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            max_concurrent: max_concurrent.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(config.request_timeout_secs, config.max_concurrent)
    }

    /// Fetch every feed, a bounded number at a time.
    ///
    /// Results come back in the same order as `feeds`, whatever order the
    /// requests complete in.
    pub async fn fetch_all(&self, feeds: &[FeedConfig]) -> Vec<Result<RawFeed, FetchError>> {
        info!("Fetching {} feeds", feeds.len());

        stream::iter(feeds)
            .map(|feed| self.fetch(&feed.url))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    pub async fn fetch(&self, url: &str) -> Result<RawFeed, FetchError> {
        info!("Fetching feed: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        Self::parse_feed(url, &bytes)
    }

    pub fn parse_feed(url: &str, bytes: &[u8]) -> Result<RawFeed, FetchError> {
        // feed_rs drops dates it can't parse, keep the raw text as a fallback
        let raw_dates = Self::extract_dates_from_xml(bytes);

        let parsed = parser::parse(bytes).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })?;

        info!("Parsed {} entries from {}", parsed.entries.len(), url);

        Ok(RawFeed {
            title: parsed.title.map(|t| t.content),
            entries: parsed.entries,
            raw_dates,
        })
    }

    /// Extract raw date text for each RSS `<item>` and Atom `<entry>`.
    pub fn extract_dates_from_xml(xml_bytes: &[u8]) -> HashMap<String, RawDates> {
        let mut dates = HashMap::new();
        let xml_str = match std::str::from_utf8(xml_bytes) {
            Ok(s) => s,
            Err(_) => return dates,
        };

        for item in Self::element_blocks(xml_str, "item") {
            let Some(link) = Self::extract_xml_text(item, "link") else {
                continue;
            };
            let raw = RawDates {
                published: Self::first_element(item, &["pubDate", "dc:date"]),
                updated: Self::first_element(item, &["atom:updated", "updated", "dc:modified"]),
            };
            if raw != RawDates::default() {
                dates.entry(link).or_insert(raw);
            }
        }

        for entry in Self::element_blocks(xml_str, "entry") {
            let Some(id) = Self::extract_xml_text(entry, "id") else {
                continue;
            };
            let raw = RawDates {
                published: Self::first_element(entry, &["published", "issued"]),
                updated: Self::first_element(entry, &["updated", "modified"]),
            };
            if raw != RawDates::default() {
                dates.entry(id).or_insert(raw);
            }
        }

        dates
    }

    fn first_element(xml: &str, tags: &[&str]) -> Option<String> {
        tags.iter()
            .filter_map(|tag| Self::extract_xml_text(xml, tag))
            .find(|value| !value.is_empty())
    }

    /// Element content as the parser would see it: CDATA unwrapped, entities decoded.
    pub fn extract_xml_text(xml: &str, tag: &str) -> Option<String> {
        Self::extract_xml_element(xml, tag).map(|raw| Self::decode_xml_text(&raw))
    }

    pub fn decode_xml_text(raw: &str) -> String {
        let raw = raw.trim();
        if let Some(inner) = raw
            .strip_prefix("<![CDATA[")
            .and_then(|rest| rest.strip_suffix("]]>"))
        {
            return inner.trim().to_string();
        }

        // &amp; last so "&amp;lt;" stays "&lt;"
        raw.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&")
    }

    /// Bodies of every `<tag>` or `<tag attr="...">` element.
    pub fn element_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
        let open = format!("<{}", tag);
        let close = format!("</{}>", tag);
        let mut blocks = Vec::new();
        let mut rest = xml;

        while let Some(start) = rest.find(&open) {
            let after = &rest[start + open.len()..];
            // skip longer names sharing the prefix, e.g. <items>
            if !after.starts_with(|c: char| c == '>' || c.is_whitespace()) {
                rest = after;
                continue;
            }
            let Some(tag_end) = after.find('>') else {
                break;
            };
            let body = &after[tag_end + 1..];
            let body_end = body.find(&close).unwrap_or(body.len());
            blocks.push(&body[..body_end]);
            rest = &body[body_end..];
        }

        blocks
    }

    pub fn extract_xml_element(xml: &str, tag: &str) -> Option<String> {
        let start_tag = format!("<{}>", tag);
        let end_tag = format!("</{}>", tag);

        let start = xml.find(&start_tag)? + start_tag.len();
        let end = xml[start..].find(&end_tag)? + start;

        Some(xml[start..end].trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
            <channel>
                <title>Media News</title>
                <link>https://media.example.com</link>
                <description>Latest</description>
                <item>
                    <title>First</title>
                    <link>https://media.example.com/1</link>
                    <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                </item>
                <item>
                    <title>Second</title>
                    <link>https://media.example.com/2</link>
                    <dc:date>2024-12-08 09:30:00</dc:date>
                </item>
            </channel>
        </rss>
    "#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
            <title>Atom Blog</title>
            <id>urn:blog</id>
            <updated>2024-12-09T10:00:00Z</updated>
            <entry>
                <title>Post</title>
                <id>urn:blog:post-1</id>
                <link href="https://blog.example.com/post-1"/>
                <updated>2024-12-09T10:00:00Z</updated>
                <published>2024-12-01T08:00:00Z</published>
            </entry>
        </feed>
    "#;

    // Tests for extract_xml_element
    mod extract_xml_element_tests {
        use super::*;

        #[test]
        fn test_extract_simple_element() {
            let xml = "<pubDate>Mon, 09 Dec 2024</pubDate>";
            let result = Fetcher::extract_xml_element(xml, "pubDate");
            assert_eq!(result, Some("Mon, 09 Dec 2024".to_string()));
        }

        #[test]
        fn test_extract_element_with_whitespace() {
            let xml = "<link>  https://example.com  </link>";
            let result = Fetcher::extract_xml_element(xml, "link");
            assert_eq!(result, Some("https://example.com".to_string()));
        }

        #[test]
        fn test_extract_element_not_found() {
            let xml = "<title>Hello</title>";
            assert_eq!(Fetcher::extract_xml_element(xml, "link"), None);
        }

        #[test]
        fn test_extract_element_no_closing_tag() {
            let xml = "<title>Hello";
            assert_eq!(Fetcher::extract_xml_element(xml, "title"), None);
        }

        #[test]
        fn test_extract_namespaced_element() {
            let xml = "<dc:date>2024-12-09</dc:date>";
            let result = Fetcher::extract_xml_element(xml, "dc:date");
            assert_eq!(result, Some("2024-12-09".to_string()));
        }
    }

    mod element_blocks_tests {
        use super::*;

        #[test]
        fn test_blocks_with_and_without_attributes() {
            let xml = r#"<item>one</item><item rdf:about="x">two</item>"#;
            assert_eq!(Fetcher::element_blocks(xml, "item"), vec!["one", "two"]);
        }

        #[test]
        fn test_longer_names_are_skipped() {
            let xml = "<items><seq/></items><item>only</item>";
            assert_eq!(Fetcher::element_blocks(xml, "item"), vec!["only"]);
        }

        #[test]
        fn test_unclosed_block_runs_to_end() {
            let xml = "<item>tail";
            assert_eq!(Fetcher::element_blocks(xml, "item"), vec!["tail"]);
        }

        #[test]
        fn test_no_blocks() {
            assert!(Fetcher::element_blocks("<channel></channel>", "item").is_empty());
        }
    }

    mod extract_dates_from_xml_tests {
        use super::*;

        #[test]
        fn test_rss_dates_keyed_by_link() {
            let dates = Fetcher::extract_dates_from_xml(RSS.as_bytes());

            assert_eq!(dates.len(), 2);
            assert_eq!(
                dates["https://media.example.com/1"].published.as_deref(),
                Some("Mon, 09 Dec 2024 12:00:00 GMT")
            );
            assert_eq!(
                dates["https://media.example.com/2"].published.as_deref(),
                Some("2024-12-08 09:30:00")
            );
            assert_eq!(dates["https://media.example.com/2"].updated, None);
        }

        #[test]
        fn test_atom_dates_keyed_by_id() {
            let dates = Fetcher::extract_dates_from_xml(ATOM.as_bytes());

            assert_eq!(dates.len(), 1);
            let raw = &dates["urn:blog:post-1"];
            assert_eq!(raw.published.as_deref(), Some("2024-12-01T08:00:00Z"));
            assert_eq!(raw.updated.as_deref(), Some("2024-12-09T10:00:00Z"));
        }

        #[test]
        fn test_escaped_link_key_is_decoded() {
            let xml = "<rss><channel><item>\
                <link>https://x.example/a?a=1&amp;b=2</link>\
                <pubDate>2024-12-07 08:15:00</pubDate>\
                </item></channel></rss>";
            let dates = Fetcher::extract_dates_from_xml(xml.as_bytes());

            assert!(dates.contains_key("https://x.example/a?a=1&b=2"));
            assert!(!dates.contains_key("https://x.example/a?a=1&amp;b=2"));
        }

        #[test]
        fn test_cdata_link_and_date_are_unwrapped() {
            let xml = "<rss><channel><item>\
                <link><![CDATA[https://x.example/b?a=1&b=2]]></link>\
                <pubDate><![CDATA[2024-12-07 08:15:00]]></pubDate>\
                </item></channel></rss>";
            let dates = Fetcher::extract_dates_from_xml(xml.as_bytes());

            let raw = &dates["https://x.example/b?a=1&b=2"];
            assert_eq!(raw.published.as_deref(), Some("2024-12-07 08:15:00"));
        }

        #[test]
        fn test_duplicate_link_keeps_first_item() {
            let xml = "<rss><channel>\
                <item><link>https://x.example/same</link><pubDate>first</pubDate></item>\
                <item><link>https://x.example/same</link><pubDate>second</pubDate></item>\
                </channel></rss>";
            let dates = Fetcher::extract_dates_from_xml(xml.as_bytes());

            assert_eq!(dates["https://x.example/same"].published.as_deref(), Some("first"));
        }

        #[test]
        fn test_decode_xml_text() {
            assert_eq!(
                Fetcher::decode_xml_text(" a &lt;b&gt; &quot;c&quot; &apos;d&apos; "),
                "a <b> \"c\" 'd'"
            );
            assert_eq!(Fetcher::decode_xml_text("&amp;lt;"), "&lt;");
            assert_eq!(Fetcher::decode_xml_text("<![CDATA[ x &amp; y ]]>"), "x &amp; y");
        }

        #[test]
        fn test_item_without_dates_is_omitted() {
            let xml = "<rss><channel><item><link>https://a.example</link></item></channel></rss>";
            assert!(Fetcher::extract_dates_from_xml(xml.as_bytes()).is_empty());
        }

        #[test]
        fn test_extract_invalid_utf8() {
            let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
            assert!(Fetcher::extract_dates_from_xml(&invalid_bytes).is_empty());
        }
    }

    mod parse_feed_tests {
        use super::*;

        #[test]
        fn test_parse_rss() {
            let feed =
                Fetcher::parse_feed("https://media.example.com/rss", RSS.as_bytes()).unwrap();

            assert_eq!(feed.title.as_deref(), Some("Media News"));
            assert_eq!(feed.entries.len(), 2);
            let raw = feed.raw_dates_for(&feed.entries[1]).unwrap();
            assert_eq!(raw.published.as_deref(), Some("2024-12-08 09:30:00"));
        }

        #[test]
        fn test_parse_atom_looks_up_by_id() {
            let feed =
                Fetcher::parse_feed("https://blog.example.com/atom", ATOM.as_bytes()).unwrap();

            assert_eq!(feed.title.as_deref(), Some("Atom Blog"));
            assert_eq!(feed.entries.len(), 1);
            assert!(feed.raw_dates_for(&feed.entries[0]).is_some());
        }

        #[test]
        fn test_parse_garbage_is_error() {
            let result = Fetcher::parse_feed("https://bad.example", b"<html>not a feed</html>");
            assert!(matches!(result, Err(FetchError::Parse { .. })));
        }
    }

    mod fetch_tests {
        use super::*;

        #[tokio::test]
        async fn test_fetch_success() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rss"))
                .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
                .mount(&server)
                .await;

            let fetcher = Fetcher::new(5, 2).unwrap();
            let feed = fetcher.fetch(&format!("{}/rss", server.uri())).await.unwrap();

            assert_eq!(feed.entries.len(), 2);
        }

        #[tokio::test]
        async fn test_fetch_http_error_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/missing"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let fetcher = Fetcher::new(5, 2).unwrap();
            let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

            match result {
                Err(FetchError::Status { status, .. }) => assert_eq!(status, StatusCode::NOT_FOUND),
                other => panic!("expected status error, got {:?}", other.map(|f| f.entries.len())),
            }
        }

        #[tokio::test]
        async fn test_fetch_all_preserves_config_order() {
            let server = MockServer::start().await;
            // The first feed answers last
            Mock::given(method("GET"))
                .and(path("/slow"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(ATOM)
                        .set_delay(Duration::from_millis(200)),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/fast"))
                .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
                .mount(&server)
                .await;

            let feeds = vec![
                FeedConfig {
                    name: None,
                    url: format!("{}/slow", server.uri()),
                    color: None,
                },
                FeedConfig {
                    name: None,
                    url: format!("{}/fast", server.uri()),
                    color: None,
                },
            ];

            let fetcher = Fetcher::new(5, 2).unwrap();
            let results = fetcher.fetch_all(&feeds).await;

            assert_eq!(results.len(), 2);
            assert_eq!(results[0].as_ref().unwrap().title.as_deref(), Some("Atom Blog"));
            assert_eq!(results[1].as_ref().unwrap().title.as_deref(), Some("Media News"));
        }

        #[test]
        fn test_fetch_all_empty() {
            let fetcher = Fetcher::new(5, 1).unwrap();
            let results = tokio_test::block_on(fetcher.fetch_all(&[]));
            assert!(results.is_empty());
        }
    }
}
