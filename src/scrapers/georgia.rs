//! Georgia News Japan scraper.
//!
//! The index page links every article under a `/post/` path, so candidate
//! discovery is a matter of walking all anchors, resolving relative hrefs
//! against the site base, and keeping the post links that carry a real
//! headline. Body extraction prefers paragraphs inside `<article>` or
//! `<main>`, then falls back to any substantial paragraph on the page,
//! then to the longest text-heavy `<div>`.

use crate::error::FetchError;
use crate::models::Article;
use itertools::Itertools;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Index links with titles shorter than this are navigation chrome, not
/// headlines.
const MIN_TITLE_CHARS: usize = 10;

/// Paragraphs shorter than this are bylines and captions, not body text.
const MIN_PARAGRAPH_CHARS: usize = 20;
const MIN_DIV_CHARS: usize = 100;

pub struct GeorgiaScraper {
    http: Client,
    index_url: Url,
}

impl GeorgiaScraper {
    pub fn new(index_url: &str) -> Result<Self, FetchError> {
        let index_url = Url::parse(index_url)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with static config");
        Ok(Self { http, index_url })
    }

    /// Fetch the index page and extract candidate articles, newest-first
    /// in source order. An index with no post links yields an empty list,
    /// not an error.
    #[instrument(level = "info", skip_all, fields(source = %self.index_url))]
    pub async fn fetch_candidates(&self) -> Result<Vec<Article>, FetchError> {
        let html = self.get_with_retry(self.index_url.as_str()).await?;
        let candidates = extract_candidates(&html, &self.index_url);
        info!(count = candidates.len(), "indexed candidate articles");
        debug!(urls = ?candidates.iter().map(|a| a.url.as_str()).collect::<Vec<_>>(), "candidate URLs");
        Ok(candidates)
    }

    /// Fetch one article page and extract its body text. `None` means the
    /// page loaded but no usable content was found; the caller summarizes
    /// the headline instead.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch_article_body(&self, url: &str) -> Result<Option<String>, FetchError> {
        let html = self.get_with_retry(url).await?;
        let body = extract_body(&html);
        match &body {
            Some(text) => info!(chars = text.chars().count(), "extracted article body"),
            None => warn!("no extractable body text on article page"),
        }
        Ok(body)
    }

    async fn get_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.get_once(url).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    warn!(attempt, max = MAX_ATTEMPTS, error = %e, "fetch attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        sleep(RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.expect("at least one attempt ran"))
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Walk every anchor on the index page and keep the `/post/` links that
/// carry a headline-length title. Duplicate links to the same article
/// (common in card layouts: image + title both link) collapse to one.
pub fn extract_candidates(html: &str, base: &Url) -> Vec<Article> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a[href]").unwrap();

    document
        .select(&anchor)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let title = element
                .text()
                .collect::<String>()
                .split_whitespace()
                .join(" ");
            if title.chars().count() < MIN_TITLE_CHARS {
                return None;
            }
            let resolved = base.join(href).ok()?;
            if !resolved.path().contains("/post/") {
                return None;
            }
            Some(Article {
                title,
                url: resolved.to_string(),
                source: base.to_string(),
            })
        })
        .unique_by(|a| a.id())
        .collect()
}

/// Extract readable body text from an article page.
pub fn extract_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    // Paragraphs inside the article container first.
    let scoped = Selector::parse("article p, main p").unwrap();
    let text = join_paragraphs(document.select(&scoped));
    if !text.is_empty() {
        return Some(text);
    }

    // Then any substantial paragraph on the page.
    let any_p = Selector::parse("p").unwrap();
    let text = join_paragraphs(document.select(&any_p));
    if !text.is_empty() {
        return Some(text);
    }

    // Last resort: the longest text-heavy div.
    let div = Selector::parse("div").unwrap();
    document
        .select(&div)
        .map(|d| d.text().collect::<String>().split_whitespace().join(" "))
        .filter(|t| t.chars().count() > MIN_DIV_CHARS)
        .max_by_key(|t| t.chars().count())
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = scraper::ElementRef<'a>>) -> String {
    paragraphs
        .map(|p| p.text().collect::<String>().split_whitespace().join(" "))
        .filter(|t| t.chars().count() > MIN_PARAGRAPH_CHARS)
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.georgia-news-japan.online/").unwrap()
    }

    #[test]
    fn test_extract_candidates_resolves_relative_links() {
        let html = r#"
            <html><body>
              <a href="/post/wine-exports">ジョージアワインの輸出が過去最高を記録</a>
              <a href="https://www.georgia-news-japan.online/post/visa-rules">ジョージアの滞在ビザ規則が改正される</a>
            </body></html>
        "#;
        let candidates = extract_candidates(html, &base());
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].url,
            "https://www.georgia-news-japan.online/post/wine-exports"
        );
        assert_eq!(candidates[0].title, "ジョージアワインの輸出が過去最高を記録");
    }

    #[test]
    fn test_extract_candidates_skips_short_titles_and_non_posts() {
        let html = r#"
            <html><body>
              <a href="/post/one">ホーム</a>
              <a href="/about">このサイトについて詳しく説明したページ</a>
              <a href="/post/two">トビリシ市内で新しい地下鉄路線の建設が始まる</a>
            </body></html>
        "#;
        let candidates = extract_candidates(html, &base());
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].url.ends_with("/post/two"));
    }

    #[test]
    fn test_extract_candidates_collapses_duplicate_links() {
        let html = r#"
            <html><body>
              <a href="/post/election">ジョージア議会選挙の結果が発表される</a>
              <a href="/post/election?ref=card">ジョージア議会選挙の結果が発表される</a>
            </body></html>
        "#;
        let candidates = extract_candidates(html, &base());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_extract_candidates_preserves_page_order() {
        let html = r#"
            <html><body>
              <a href="/post/first">最初の記事のタイトルはこちらです</a>
              <a href="/post/second">二番目の記事のタイトルはこちらです</a>
              <a href="/post/third">三番目の記事のタイトルはこちらです</a>
            </body></html>
        "#;
        let urls: Vec<String> = extract_candidates(html, &base())
            .into_iter()
            .map(|a| a.url)
            .collect();
        assert!(urls[0].ends_with("/first"));
        assert!(urls[1].ends_with("/second"));
        assert!(urls[2].ends_with("/third"));
    }

    #[test]
    fn test_extract_candidates_empty_page() {
        assert!(extract_candidates("<html><body></body></html>", &base()).is_empty());
    }

    #[test]
    fn test_extract_body_prefers_article_paragraphs() {
        let html = r#"
            <html><body>
              <p>サイドバーに表示される長めの無関係なお知らせテキストです。</p>
              <article>
                <p>ジョージア政府は本日、新しい経済政策のパッケージを発表した。</p>
                <p>短い</p>
                <p>この政策は外国からの投資を促進することを目的としている。</p>
              </article>
            </body></html>
        "#;
        let body = extract_body(html).unwrap();
        assert!(body.contains("経済政策のパッケージ"));
        assert!(body.contains("外国からの投資"));
        assert!(!body.contains("短い"));
        assert!(!body.contains("サイドバー"));
    }

    #[test]
    fn test_extract_body_falls_back_to_any_paragraph() {
        let html = r#"
            <html><body>
              <div><p>記事タグの外にあるが、十分に長い本文の段落がここにある。</p></div>
            </body></html>
        "#;
        let body = extract_body(html).unwrap();
        assert!(body.contains("十分に長い本文"));
    }

    #[test]
    fn test_extract_body_falls_back_to_longest_div() {
        let long_text = "ジョージアの歴史は古く、ワイン発祥の地としても知られている。".repeat(4);
        let html = format!(
            "<html><body><div>メニュー</div><div>{long_text}</div></body></html>"
        );
        let body = extract_body(&html).unwrap();
        assert!(body.contains("ワイン発祥の地"));
    }

    #[test]
    fn test_extract_body_none_when_nothing_substantial() {
        let html = "<html><body><p>短い。</p><div>メニュー</div></body></html>";
        assert!(extract_body(html).is_none());
    }
}
