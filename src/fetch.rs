//!
//! src/fetch.rs
//!
//! Http client construction, page retrieval with retries, and the
//! markup extraction that turns a track page into its attributes
//!

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use regex::Regex;
use reqwest::{Client, StatusCode, header, redirect};
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::warn;

use crate::config::HttpConfig;
use crate::crawler::TrackFetcher;
use crate::errors::ScrapeError;
use crate::types::{TrackAttrs, TrackUrl};

/// Selectors for the public track page markup. Any missing node fails
/// the record.
const TITLE_SELECTOR: &str = ".entity-info .media-bd h1";
const ARTIST_SELECTOR: &str = ".entity-info .media-bd h2 a";
const ALBUM_SELECTOR: &str = ".featured-on .media-bd a";
const COVER_SELECTOR: &str = ".cover-art-image";

static COVER_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"url\((.*?)\)").unwrap());

/// Simple function to generate random wait between retries
fn generate_backoff(ms: u64, attempt: usize, rng: &mut SmallRng) -> Duration {
    let exp = (1_u64 << attempt.min(6)) * ms;
    let jitter: u64 = rng.gen_range(50..=200);
    Duration::from_millis(exp + jitter)
}

pub struct HttpFetcher {
    http: Client,
    max_retries: usize,
    backoff_ms: u64
}

impl HttpFetcher {
    pub fn new(cfg: &HttpConfig) -> Result<Self, ScrapeError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html")
        );

        let http = Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(cfg.connect_timeout)
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .pool_idle_timeout(Some(cfg.pool_idle_timeout))
            .redirect(redirect::Policy::limited(cfg.max_redirects as usize))
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ScrapeError::Http(format!("build client: {e}")))?;

        Ok( Self {
            http,
            max_retries: cfg.retry.max_attempts as usize,
            backoff_ms: cfg.retry.base_backoff.as_millis() as u64
        })
    }

    /// GET the page body, retrying 429 and 5xx with backoff. Anything
    /// else non-success is final.
    async fn get_page(&self, url: &TrackUrl) -> Result<String, ScrapeError> {
        let mut rng = SmallRng::from_entropy();
        let mut attempt = 0_usize;
        loop {
            let response = self.http.get(url.as_str()).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.text().await?);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status == StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();
                    if !retryable || attempt >= self.max_retries {
                        return Err(ScrapeError::Status(
                            format!("{status} for {url}")
                        ));
                    }
                    let backoff = generate_backoff(self.backoff_ms, attempt, &mut rng);
                    warn!(url = %url, status = %status,
                        backoff_ms = backoff.as_millis() as u64, "http.retry");
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(e.into());
                    }
                    let backoff = generate_backoff(self.backoff_ms, attempt, &mut rng);
                    warn!(url = %url, error = %e,
                        backoff_ms = backoff.as_millis() as u64, "http.retry.error");
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl TrackFetcher for HttpFetcher {
    async fn fetch(&self, url: &TrackUrl) -> Result<TrackAttrs, ScrapeError> {
        let body = self.get_page(url).await?;
        parse_track_page(&body)
    }
}

fn select_text(doc: &Html, selector: &str) -> Result<String, ScrapeError> {
    let sel = Selector::parse(selector)
        .map_err(|_| ScrapeError::Parse(format!("bad selector {selector}")))?;
    let node = doc.select(&sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("no node for {selector}")))?;
    Ok(node.text().collect::<String>().trim().to_string())
}

fn cover_url(doc: &Html) -> Result<String, ScrapeError> {
    let sel = Selector::parse(COVER_SELECTOR)
        .map_err(|_| ScrapeError::Parse(format!("bad selector {COVER_SELECTOR}")))?;
    let node = doc.select(&sel)
        .next()
        .ok_or_else(|| ScrapeError::Parse(format!("no node for {COVER_SELECTOR}")))?;
    let style = node.value()
        .attr("style")
        .ok_or_else(|| ScrapeError::Parse(
            format!("{COVER_SELECTOR} missing style attribute")
        ))?;
    let caps = COVER_URL.captures(style)
        .ok_or_else(|| ScrapeError::Parse(
            format!("{COVER_SELECTOR} style has no url()")
        ))?;

    // Cover urls are protocol-relative in the page markup.
    Ok(format!("https:{}", &caps[1]))
}

/// Pull title, artist, album and cover art out of a track page body.
pub fn parse_track_page(body: &str) -> Result<TrackAttrs, ScrapeError> {
    let doc = Html::parse_document(body);

    let title = select_text(&doc, TITLE_SELECTOR)?;
    let artist = select_text(&doc, ARTIST_SELECTOR)?;
    let album = select_text(&doc, ALBUM_SELECTOR)?;
    let cover = cover_url(&doc)?;

    Ok( TrackAttrs { title, artist, album, cover } )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="entity-info">
            <div class="media-bd">
              <h1>Breathe Deeper</h1>
              <h2><a href="/artist/5INjqkS1o8h1imAzPqGZBb">Tame Impala</a></h2>
            </div>
          </div>
          <div class="featured-on">
            <div class="media-bd">
              <a href="/album/31qVWUdRrlb8thMvts0yYL">The Slow Rush</a>
            </div>
          </div>
          <div class="cover-art-image"
               style="background-image: url(//i.scdn.co/image/ab67616d0000b273)">
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_all_attributes() {
        let attrs = parse_track_page(PAGE).unwrap();
        assert_eq!(attrs.title, "Breathe Deeper");
        assert_eq!(attrs.artist, "Tame Impala");
        assert_eq!(attrs.album, "The Slow Rush");
        assert_eq!(attrs.cover, "https://i.scdn.co/image/ab67616d0000b273");
    }

    #[test]
    fn missing_artist_node_names_the_selector() {
        let page = PAGE.replace("<h2>", "<h3>").replace("</h2>", "</h3>");
        let err = parse_track_page(&page).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
        assert!(err.to_string().contains(ARTIST_SELECTOR));
    }

    #[test]
    fn cover_without_style_attribute_fails() {
        let page = PAGE.replace(
            r#"style="background-image: url(//i.scdn.co/image/ab67616d0000b273)""#,
            ""
        );
        let err = parse_track_page(&page).unwrap_err();
        assert!(err.to_string().contains("missing style"));
    }

    #[test]
    fn cover_style_without_url_fails() {
        let page = PAGE.replace(
            "background-image: url(//i.scdn.co/image/ab67616d0000b273)",
            "background-color: black"
        );
        let err = parse_track_page(&page).unwrap_err();
        assert!(err.to_string().contains("no url()"));
    }

    #[test]
    fn text_is_trimmed() {
        let page = PAGE.replace(
            "<h1>Breathe Deeper</h1>",
            "<h1>\n  Breathe Deeper\n</h1>"
        );
        let attrs = parse_track_page(&page).unwrap();
        assert_eq!(attrs.title, "Breathe Deeper");
    }
}
