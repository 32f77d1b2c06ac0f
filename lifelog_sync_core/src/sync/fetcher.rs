//! Cursor-driven page producer with a fixed-delay, per-page retry budget.

use crate::config::FetchConfig;
use crate::models::{Page, Record, Window};
use crate::sync::models::FetchTermination;
use crate::sync::traits::{DIRECTION_ASC, PageRequest, PageTransport};
use crate::{Error, Result};

/// Pull-driven producer of pages for one window.
///
/// Each call to [`PaginatedFetcher::next_page`] issues as many requests as it
/// takes to obtain the next non-empty page. Once the sequence ends the reason
/// is available from [`PaginatedFetcher::termination`]; failures never escape
/// as errors.
pub struct PaginatedFetcher<'a> {
    transport: &'a dyn PageTransport,
    config: &'a FetchConfig,
    collection: &'a str,
    window: Window,
    cursor: Option<String>,
    next_index: u32,
    pages_emitted: u32,
    records_emitted: u64,
    termination: Option<FetchTermination>,
}

impl<'a> PaginatedFetcher<'a> {
    pub fn new(
        transport: &'a dyn PageTransport,
        config: &'a FetchConfig,
        collection: &'a str,
        window: Window,
    ) -> Self {
        Self {
            transport,
            config,
            collection,
            window,
            cursor: None,
            next_index: 1,
            pages_emitted: 0,
            records_emitted: 0,
            termination: None,
        }
    }

    /// Next non-empty page, or `None` once the sequence has ended.
    pub async fn next_page(&mut self) -> Option<Page> {
        while self.termination.is_none() {
            let page_index = self.next_index;
            if page_index > self.config.max_pages {
                tracing::warn!(
                    max_pages = self.config.max_pages,
                    "page request limit reached; stopping fetch"
                );
                self.termination = Some(FetchTermination::PageLimitReached {
                    max_pages: self.config.max_pages,
                });
                break;
            }

            if page_index > 1 && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }

            let request = self.request();
            tracing::info!(
                page_index,
                start = %request.start,
                end = %request.end,
                timezone = %request.timezone,
                cursor = ?request.cursor,
                limit = request.limit,
                "fetching page"
            );

            let body = match self.fetch_with_retry(page_index, &request).await {
                Ok(body) => body,
                Err(termination) => {
                    self.termination = Some(termination);
                    break;
                }
            };

            let (records, next_cursor) = match parse_envelope(body, self.collection) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::error!(page_index, error = %e, "malformed page envelope; stopping fetch");
                    self.termination = Some(FetchTermination::ProtocolViolation {
                        page_index,
                        reason: e.to_string(),
                    });
                    break;
                }
            };
            tracing::info!(
                page_index,
                records = records.len(),
                has_next = next_cursor.is_some(),
                "page fetched"
            );

            match next_cursor.as_deref() {
                None => {
                    tracing::info!(pages = page_index, "no cursor returned; fetch complete");
                    self.termination = Some(FetchTermination::Completed { pages: page_index });
                }
                Some(next) if self.cursor.as_deref() == Some(next) => {
                    tracing::error!(page_index, cursor = next, "cursor did not advance; stopping fetch");
                    self.termination = Some(FetchTermination::ProtocolViolation {
                        page_index,
                        reason: format!("cursor '{next}' repeated"),
                    });
                }
                Some(next) => {
                    self.cursor = Some(next.to_string());
                    self.next_index += 1;
                }
            }

            if records.is_empty() {
                continue;
            }
            self.pages_emitted += 1;
            self.records_emitted += records.len() as u64;
            return Some(Page {
                index: page_index,
                records,
                next_cursor,
            });
        }
        None
    }

    /// Set once `next_page` has returned `None`.
    pub fn termination(&self) -> Option<&FetchTermination> {
        self.termination.as_ref()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_emitted
    }

    pub fn records_fetched(&self) -> u64 {
        self.records_emitted
    }

    fn request(&self) -> PageRequest {
        PageRequest {
            start: self.window.start_param(),
            end: self.window.end_param(),
            timezone: self.config.timezone.clone(),
            cursor: self.cursor.clone(),
            direction: DIRECTION_ASC,
            limit: self.config.page_limit,
        }
    }

    /// Attempting(n) -> Success | Attempting(n + 1) | Exhausted.
    async fn fetch_with_retry(
        &self,
        page_index: u32,
        request: &PageRequest,
    ) -> std::result::Result<serde_json::Value, FetchTermination> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.transport.get_page(request).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            if let Error::Protocol(reason) = err {
                tracing::error!(page_index, attempt, %reason, "undecodable page response; stopping fetch");
                return Err(FetchTermination::ProtocolViolation { page_index, reason });
            }

            tracing::warn!(
                page_index,
                attempt,
                max_attempts,
                error = %err,
                "page fetch failed"
            );
            if !err.is_transient() || attempt >= max_attempts {
                tracing::error!(
                    page_index,
                    attempts = attempt,
                    "page fetch failed permanently; stopping fetch"
                );
                return Err(FetchTermination::RetriesExhausted {
                    page_index,
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }
            if !self.config.retry_delay.is_zero() {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
    }
}

/// Splits a response envelope into its records and continuation cursor.
///
/// Expected shape:
/// `{"data": {"<collection>": [..]}, "meta": {"<collection>": {"nextCursor": ".." | null}}}`.
/// An empty-string cursor is treated like `null`.
pub fn parse_envelope(
    mut body: serde_json::Value,
    collection: &str,
) -> Result<(Vec<Record>, Option<String>)> {
    let records = match body
        .get_mut("data")
        .and_then(|data| data.get_mut(collection))
        .map(serde_json::Value::take)
    {
        Some(serde_json::Value::Array(items)) => items.into_iter().map(Record::new).collect(),
        Some(other) => {
            return Err(Error::Protocol(format!(
                "data.{collection} must be a list, got {}",
                json_kind(&other)
            )));
        }
        None => {
            return Err(Error::Protocol(format!(
                "response is missing data.{collection}"
            )));
        }
    };

    let meta = body
        .get("meta")
        .and_then(|meta| meta.get(collection))
        .and_then(|meta| meta.as_object())
        .ok_or_else(|| Error::Protocol(format!("response is missing meta.{collection}")))?;

    let next_cursor = match meta.get("nextCursor") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(Error::Protocol(format!(
                "meta.{collection}.nextCursor must be a string or null, got {}",
                json_kind(other)
            )));
        }
    };

    Ok((records, next_cursor))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::test_support::{ScriptedTransport, envelope, pages, unavailable};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn window() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2025, 3, 13, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn fast_config() -> FetchConfig {
        FetchConfig {
            retry_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            ..FetchConfig::default()
        }
    }

    async fn drain(fetcher: &mut PaginatedFetcher<'_>) -> Vec<Page> {
        let mut out = Vec::new();
        while let Some(page) = fetcher.next_page().await {
            out.push(page);
        }
        out
    }

    #[tokio::test]
    async fn follows_cursor_until_absent() {
        let transport = ScriptedTransport::new(pages(&[100, 100, 42]));
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.iter().map(Page::len).collect::<Vec<_>>(), [100, 100, 42]);
        assert_eq!(got.iter().map(|p| p.index).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(
            fetcher.termination(),
            Some(&FetchTermination::Completed { pages: 3 })
        );
        assert_eq!(fetcher.pages_fetched(), 3);
        assert_eq!(fetcher.records_fetched(), 242);

        let cursors: Vec<_> = transport.requests().into_iter().map(|r| r.cursor).collect();
        assert_eq!(
            cursors,
            [None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[tokio::test]
    async fn requests_carry_window_and_fixed_parameters() {
        let transport = ScriptedTransport::new(pages(&[1]));
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());
        drain(&mut fetcher).await;

        let req = &transport.requests()[0];
        assert_eq!(req.start, "2025-03-13T00:00:00Z");
        assert_eq!(req.end, "2025-03-20T00:00:00Z");
        assert_eq!(req.timezone, "America/New_York");
        assert_eq!(req.direction, "asc");
        assert_eq!(req.limit, 100);
        assert_eq!(req.cursor, None);
    }

    #[tokio::test]
    async fn null_cursor_after_first_page_ends_sequence() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 10, None)),
            Ok(envelope(10, 10, Some("never-requested"))),
        ]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.len(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_pages_are_skipped_but_followed() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 0, Some("c1"))),
            Ok(envelope(0, 5, None)),
        ]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].index, 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn transient_failures_retry_the_same_request() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 3, Some("c1"))),
            unavailable(),
            unavailable(),
            Ok(envelope(3, 2, None)),
        ]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.iter().map(Page::len).sum::<usize>(), 5);
        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[1..].iter().all(|r| r == &requests[1]));
        assert!(fetcher.termination().unwrap().is_completed());
    }

    #[tokio::test]
    async fn exhausted_retries_stop_fetching() {
        let mut script = vec![Ok(envelope(0, 7, Some("c1")))];
        script.extend((0..5).map(|_| unavailable()));
        script.push(Ok(envelope(7, 7, None)));
        let transport = ScriptedTransport::new(script);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.len(), 1);
        assert_eq!(transport.requests().len(), 6);
        match fetcher.termination() {
            Some(FetchTermination::RetriesExhausted {
                page_index,
                attempts,
                ..
            }) => {
                assert_eq!(*page_index, 2);
                assert_eq!(*attempts, 5);
            }
            other => panic!("unexpected termination {other:?}"),
        }
        assert!(fetcher.next_page().await.is_none());
        assert_eq!(transport.requests().len(), 6);
    }

    #[tokio::test]
    async fn first_page_failing_every_attempt_yields_nothing() {
        let transport = ScriptedTransport::new((0..5).map(|_| unavailable()).collect());
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        assert!(drain(&mut fetcher).await.is_empty());
        assert_eq!(fetcher.records_fetched(), 0);
        assert!(matches!(
            fetcher.termination(),
            Some(FetchTermination::RetriesExhausted { page_index: 1, attempts: 5, .. })
        ));
    }

    #[tokio::test]
    async fn malformed_metadata_is_a_protocol_violation() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 4, Some("c1"))),
            Ok(serde_json::json!({ "data": { "lifelogs": [{"id": 4}] }, "meta": {} })),
        ]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.len(), 1);
        assert!(matches!(
            fetcher.termination(),
            Some(FetchTermination::ProtocolViolation { page_index: 2, .. })
        ));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn undecodable_body_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Err(Error::Protocol(
            "body is not json".to_string(),
        ))]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        assert!(drain(&mut fetcher).await.is_empty());
        assert_eq!(transport.requests().len(), 1);
        assert!(matches!(
            fetcher.termination(),
            Some(FetchTermination::ProtocolViolation { page_index: 1, .. })
        ));
    }

    #[tokio::test]
    async fn repeated_cursor_emits_page_then_stops() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 2, Some("same"))),
            Ok(envelope(2, 2, Some("same"))),
            Ok(envelope(4, 2, None)),
        ]);
        let cfg = fast_config();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let got = drain(&mut fetcher).await;
        assert_eq!(got.len(), 2);
        assert_eq!(transport.requests().len(), 2);
        assert!(matches!(
            fetcher.termination(),
            Some(FetchTermination::ProtocolViolation { page_index: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn default_delays_pace_requests_and_retries() {
        let transport = ScriptedTransport::new(vec![
            Ok(envelope(0, 2, Some("c1"))),
            unavailable(),
            Ok(envelope(2, 2, Some("c2"))),
            Ok(envelope(4, 2, None)),
        ]);
        let cfg = FetchConfig::default();
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        let started = tokio::time::Instant::now();
        let first = fetcher.next_page().await.unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);

        // 1 s between pages, then 2 s before the retry.
        let second = fetcher.next_page().await.unwrap();
        assert_eq!(second.index, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(3));

        fetcher.next_page().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(4));

        // No delay after the last page.
        assert!(fetcher.next_page().await.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn page_limit_caps_requests() {
        let transport = ScriptedTransport::new(pages(&[1, 1, 1, 1]));
        let cfg = FetchConfig {
            max_pages: 2,
            ..fast_config()
        };
        let mut fetcher = PaginatedFetcher::new(&transport, &cfg, "lifelogs", window());

        assert_eq!(drain(&mut fetcher).await.len(), 2);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(
            fetcher.termination(),
            Some(&FetchTermination::PageLimitReached { max_pages: 2 })
        );
    }

    #[test]
    fn parse_envelope_accepts_null_and_empty_cursors() {
        let (records, cursor) = parse_envelope(envelope(0, 2, None), "lifelogs").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(cursor, None);

        let body = serde_json::json!({
            "data": { "lifelogs": [] },
            "meta": { "lifelogs": { "nextCursor": "" } },
        });
        assert_eq!(parse_envelope(body, "lifelogs").unwrap().1, None);

        let body = serde_json::json!({
            "data": { "lifelogs": [] },
            "meta": { "lifelogs": {} },
        });
        assert_eq!(parse_envelope(body, "lifelogs").unwrap().1, None);
    }

    #[test]
    fn parse_envelope_rejects_malformed_shapes() {
        let cases = [
            serde_json::json!({}),
            serde_json::json!({ "data": { "lifelogs": {} }, "meta": { "lifelogs": {} } }),
            serde_json::json!({ "data": { "lifelogs": [] } }),
            serde_json::json!({ "data": { "lifelogs": [] }, "meta": { "lifelogs": null } }),
            serde_json::json!({ "data": { "lifelogs": [] }, "meta": { "lifelogs": { "nextCursor": 7 } } }),
        ];
        for body in cases {
            let err = parse_envelope(body.clone(), "lifelogs").unwrap_err();
            assert!(matches!(err, Error::Protocol(_)), "{body} -> {err}");
        }
    }
}
