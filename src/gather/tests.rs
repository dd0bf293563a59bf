//! Tests for the gather pipeline

use super::*;
use crate::decode::{FnDecoder, JsonDecoder};
use crate::error::{Error, Result};
use crate::http::{Fetcher, RawPage};
use crate::query::{PageKey, Query};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted Fetcher
// ============================================================================

#[derive(Clone)]
enum Reply {
    Page {
        headers: Vec<(&'static str, String)>,
        body: Value,
    },
    Fail(u16),
}

/// In-memory fetcher answering from a script keyed by `(path, page)`
#[derive(Default)]
struct ScriptedFetcher {
    replies: HashMap<PageKey, Reply>,
    calls: Mutex<Vec<PageKey>>,
    delay: Option<Duration>,
    cancel_after: Option<(PageKey, CancellationToken)>,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn reply(mut self, path: &str, page: Option<u32>, reply: Reply) -> Self {
        self.replies.insert(
            PageKey {
                path: path.to_string(),
                page,
            },
            reply,
        );
        self
    }

    /// Script pages `1..=total` of `path`, each with `per_page` items
    fn collection(mut self, path: &str, total: u32, per_page: u32) -> Self {
        for page in 1..=total {
            self = self.reply(path, Some(page), paged(page, total, items(page, per_page)));
        }
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn cancel_after(mut self, path: &str, page: Option<u32>, token: CancellationToken) -> Self {
        self.cancel_after = Some((
            PageKey {
                path: path.to_string(),
                page,
            },
            token,
        ));
        self
    }

    fn calls(&self) -> Vec<PageKey> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, query: &Query, cancel: &CancellationToken) -> Result<RawPage> {
        let key = query.key();
        self.calls.lock().unwrap().push(key.clone());

        if let Some(delay) = self.delay {
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }

        if let Some((trigger, token)) = &self.cancel_after {
            if *trigger == key {
                token.cancel();
            }
        }

        match self.replies.get(&key) {
            Some(Reply::Page { headers, body }) => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(
                        HeaderName::from_static(*name),
                        HeaderValue::from_str(value).unwrap(),
                    );
                }
                Ok(RawPage::new(200, map, serde_json::to_vec(body).unwrap()))
            }
            Some(Reply::Fail(status)) => Err(Error::http_status(*status, "scripted failure")),
            None => Err(Error::http_status(404, format!("no script for {query}"))),
        }
    }
}

fn paged(page: u32, total: u32, body: Value) -> Reply {
    let mut headers = vec![
        ("x-page", page.to_string()),
        ("x-total-pages", total.to_string()),
    ];
    if page < total {
        headers.push(("x-next-page", (page + 1).to_string()));
    }
    Reply::Page { headers, body }
}

fn items(page: u32, count: u32) -> Value {
    Value::Array(
        (0..count)
            .map(|i| json!({"id": page * 100 + i}))
            .collect(),
    )
}

fn gatherer(
    fetcher: &Arc<ScriptedFetcher>,
) -> Gatherer<Arc<ScriptedFetcher>, JsonDecoder<Vec<Value>>> {
    Gatherer::new(Arc::clone(fetcher), JsonDecoder::new())
}

fn keys<T>(calls: &[Call<T>]) -> BTreeSet<PageKey> {
    calls.iter().map(Call::key).collect()
}

fn key(path: &str, page: u32) -> PageKey {
    PageKey {
        path: path.to_string(),
        page: Some(page),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_single_page_collection() {
    let fetcher = Arc::new(ScriptedFetcher::new().reply(
        "groups",
        None,
        paged(1, 1, json!([{"id": 1}, {"id": 2}])),
    ));
    let gatherer = gatherer(&fetcher);

    let calls = collect_calls(gatherer.gather_all(vec![Query::new("groups")])).await;

    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query.path, "groups");
    assert_eq!(calls[0].value().unwrap().len(), 2);
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(gatherer.stats().derived, 0);
}

#[tokio::test]
async fn test_independent_seeds_do_not_mix() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .reply("group01", None, paged(1, 1, json!([{"id": 11}, {"id": 12}])))
            .reply("group02", None, paged(1, 1, json!([{"id": 21}, {"id": 22}]))),
    );
    let gatherer = gatherer(&fetcher);

    let calls = collect_calls(
        gatherer.gather_all(vec![Query::new("group01"), Query::new("group02")]),
    )
    .await;

    assert_eq!(calls.len(), 2);
    for call in &calls {
        let ids: Vec<u64> = call
            .value()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_u64().unwrap())
            .collect();
        match call.query.path.as_str() {
            "group01" => assert_eq!(ids, vec![11, 12]),
            "group02" => assert_eq!(ids, vec![21, 22]),
            other => panic!("unexpected path {other}"),
        }
    }
}

#[tokio::test]
async fn test_multi_page_collection() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 5, 3));
    let gatherer = gatherer(&fetcher);

    let calls =
        collect_calls(gatherer.gather_all(vec![Query::page_query("projects", 1)])).await;

    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(Call::is_ok));
    assert_eq!(
        keys(&calls),
        (1..=5).map(|p| key("projects", p)).collect::<BTreeSet<_>>()
    );

    let stats = gatherer.stats();
    assert_eq!(stats.fetched, 5);
    assert_eq!(stats.derived, 4);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_derived_page_failure_is_isolated() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .collection("projects", 5, 2)
            .reply("projects", Some(3), Reply::Fail(500)),
    );
    let gatherer = gatherer(&fetcher);

    let calls =
        collect_calls(gatherer.gather_all(vec![Query::page_query("projects", 1)])).await;

    assert_eq!(calls.len(), 5);
    let failed: Vec<&Call<Vec<Value>>> = calls.iter().filter(|c| !c.is_ok()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].key(), key("projects", 3));
    assert!(failed[0].headers.is_none());
    assert!(matches!(
        failed[0].error(),
        Some(Error::HttpStatus { status: 500, .. })
    ));
    assert_eq!(gatherer.stats().failed, 1);
}

#[tokio::test]
async fn test_dual_segregates_errors() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .collection("projects", 5, 2)
            .reply("projects", Some(3), Reply::Fail(502)),
    );
    let gatherer = gatherer(&fetcher);

    let (calls, errors) = gatherer.gather_all_dual(vec![Query::page_query("projects", 1)]);
    let (calls, errors) = collect_dual(calls, errors).await;

    assert_eq!(calls.len(), 4);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].query().page(), Some(3));
    assert!(errors[0].to_string().starts_with("projects (page 3): HTTP 502"));

    let pages: BTreeSet<u32> = calls.iter().filter_map(|c| c.query.page()).collect();
    assert_eq!(pages, BTreeSet::from([1, 2, 4, 5]));
}

#[tokio::test]
async fn test_seed_failure_derives_nothing() {
    let fetcher = Arc::new(ScriptedFetcher::new().reply("broken", None, Reply::Fail(403)));
    let gatherer = gatherer(&fetcher);

    let (calls, errors) = gatherer.gather_all_dual::<Vec<Value>>(vec![Query::new("broken")]);
    let (calls, errors) = collect_dual(calls, errors).await;

    assert!(calls.is_empty());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].query.path, "broken");
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn test_decode_failure_is_reported() {
    let fetcher = Arc::new(ScriptedFetcher::new().reply(
        "groups",
        None,
        paged(1, 1, json!({"message": "not a list"})),
    ));
    let gatherer = gatherer(&fetcher);

    let calls = collect_calls(gatherer.gather_all(vec![Query::new("groups")])).await;

    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0].error(), Some(Error::Decode { .. })));
}

// ============================================================================
// Cursor Handling
// ============================================================================

#[tokio::test]
async fn test_partial_cursor_yields_single_result() {
    let fetcher = Arc::new(ScriptedFetcher::new().reply(
        "events",
        None,
        Reply::Page {
            headers: vec![("x-page", "1".to_string())],
            body: json!([{"id": 1}]),
        },
    ));
    let gatherer = gatherer(&fetcher);

    let calls = collect_calls(gatherer.gather_all(vec![Query::new("events")])).await;

    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_ok());
    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(gatherer.stats().derived, 0);
}

#[tokio::test]
async fn test_total_pages_limit() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 1000, 1));
    let gatherer = gatherer(&fetcher).with_config(GatherConfig::default().total_pages_limit(5));

    let (calls, errors) = gatherer.gather_all_dual(vec![Query::page_query("projects", 1)]);
    let (calls, errors) = collect_dual(calls, errors).await;

    assert_eq!(calls.len(), 5);
    assert!(errors.is_empty());
    let fetched: BTreeSet<PageKey> = fetcher.calls().into_iter().collect();
    assert_eq!(
        fetched,
        (1..=5).map(|p| key("projects", p)).collect::<BTreeSet<_>>()
    );

    let stats = gatherer.stats();
    assert_eq!(stats.derived, 4);
    assert_eq!(stats.skipped, 995);
}

#[tokio::test]
async fn test_malformed_cursor_keeps_first_page() {
    let fetcher = Arc::new(ScriptedFetcher::new().reply(
        "groups",
        None,
        Reply::Page {
            headers: vec![
                ("x-page", "1".to_string()),
                ("x-total-pages", "many".to_string()),
            ],
            body: json!([{"id": 1}]),
        },
    ));
    let gatherer = gatherer(&fetcher);

    let (calls, errors) = gatherer.gather_all_dual(vec![Query::new("groups")]);
    let (calls, errors) = collect_dual::<Vec<Value>>(calls, errors).await;

    assert_eq!(calls.len(), 1);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].source, Error::InvalidHeader { .. }));
    assert_eq!(fetcher.calls().len(), 1);
}

// ============================================================================
// Closure and Completeness
// ============================================================================

#[tokio::test]
async fn test_stream_stays_open_while_seeds_pending() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 2, 1));
    let gatherer = gatherer(&fetcher);

    let (seeds, seeds_rx) = mpsc::channel(1);
    let mut calls = gatherer.gather::<Vec<Value>>(seeds_rx);

    seeds.send(Query::page_query("projects", 1)).await.unwrap();
    for _ in 0..2 {
        let call = timeout(Duration::from_secs(2), calls.recv())
            .await
            .expect("page should arrive")
            .expect("stream should be open");
        assert!(call.is_ok());
    }

    // Every page is answered but the seed stream is still open
    assert!(timeout(Duration::from_millis(100), calls.recv()).await.is_err());

    drop(seeds);
    let closed = timeout(Duration::from_secs(2), calls.recv())
        .await
        .expect("stream should close");
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_every_descriptor_answered_once() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .collection("a", 7, 1)
            .collection("b", 1, 1)
            .collection("c", 12, 1)
            .reply("c", Some(4), Reply::Fail(500))
            .reply("c", Some(9), Reply::Fail(500)),
    );
    let gatherer = gatherer(&fetcher).with_config(GatherConfig::default().workers_cap(3));

    let seeds = vec![
        Query::page_query("a", 1),
        Query::page_query("b", 1),
        Query::page_query("c", 1),
    ];
    let calls = collect_calls(gatherer.gather_all(seeds)).await;

    assert_eq!(calls.len(), 7 + 1 + 12);
    assert_eq!(keys(&calls).len(), calls.len());
    assert_eq!(calls.iter().filter(|c| !c.is_ok()).count(), 2);
    assert_eq!(fetcher.calls().len(), calls.len());
}

#[tokio::test]
async fn test_workers_fetch_concurrently() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .collection("projects", 11, 1)
            .delay(Duration::from_millis(200)),
    );
    let gatherer = gatherer(&fetcher).with_config(GatherConfig::default().workers_cap(5));

    let started = Instant::now();
    let calls =
        collect_calls(gatherer.gather_all(vec![Query::page_query("projects", 1)])).await;

    assert_eq!(calls.len(), 11);
    // Serially this would take 11 * 200ms
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_zero_capacities_are_clamped() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 3, 1));
    let config = GatherConfig {
        call_cap: 0,
        query_cap: 0,
        workers_cap: 0,
        error_cap: 0,
        total_pages_limit: 0,
    };
    let gatherer = gatherer(&fetcher).with_config(config);
    assert_eq!(gatherer.config().workers_cap, 1);

    let calls =
        collect_calls(gatherer.gather_all(vec![Query::page_query("projects", 1)])).await;
    assert_eq!(calls.len(), 3);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 3, 1));
    let gatherer = gatherer(&fetcher);
    gatherer.cancellation_token().cancel();

    let calls = collect_calls(gatherer.gather_all(vec![
        Query::page_query("projects", 1),
        Query::page_query("groups", 1),
    ]))
    .await;

    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.error().is_some_and(Error::is_cancelled)));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_cancel_stops_derivation() {
    let token = CancellationToken::new();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .collection("projects", 5, 1)
            .cancel_after("projects", Some(1), token.clone()),
    );
    let gatherer = gatherer(&fetcher).with_cancellation(token);

    let calls =
        collect_calls(gatherer.gather_all(vec![Query::page_query("projects", 1)])).await;

    assert_eq!(calls.len(), 1);
    assert!(calls[0].is_ok());
    assert_eq!(fetcher.calls(), vec![key("projects", 1)]);
}

// ============================================================================
// Decoder Strategy
// ============================================================================

#[tokio::test]
async fn test_callback_decoder() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 3, 4));
    let decoder = FnDecoder::new(|page: &RawPage| -> Result<usize> {
        let items: Vec<Value> = serde_json::from_slice(&page.body)?;
        Ok(items.len())
    });
    let gatherer = Gatherer::new(Arc::clone(&fetcher), decoder);

    let calls =
        collect_calls(gatherer.gather_all::<usize>(vec![Query::page_query("projects", 1)])).await;

    assert_eq!(calls.len(), 3);
    let total: usize = calls.iter().filter_map(Call::value).sum();
    assert_eq!(total, 12);
}

// ============================================================================
// Stage Tests
// ============================================================================

#[tokio::test]
async fn test_head_stage_emits_first_page_then_derives() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 4, 1));
    let source = Arc::new(PageSource::new(Arc::clone(&fetcher), JsonDecoder::<Vec<Value>>::new()));
    let head = HeadStage::new(
        source,
        GatherConfig::default().query_cap(10),
        CancellationToken::new(),
        Arc::new(GatherStats::default()),
    );

    let (seeds, seeds_rx) = mpsc::channel(1);
    let (mut calls, derived) = head.run::<Vec<Value>, CombinedOutlet<Vec<Value>>>(seeds_rx);
    seeds.send(Query::page_query("projects", 1)).await.unwrap();
    drop(seeds);

    let first = calls.recv().await.unwrap();
    assert_eq!(first.key(), key("projects", 1));
    assert!(calls.recv().await.is_none());

    let mut pages = Vec::new();
    while let Ok(query) = derived.recv().await {
        pages.push(query.page().unwrap());
    }
    assert_eq!(pages, vec![2, 3, 4]);
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn test_tail_stage_drains_queue() {
    let fetcher = Arc::new(ScriptedFetcher::new().collection("projects", 10, 1));
    let source = Arc::new(PageSource::new(Arc::clone(&fetcher), JsonDecoder::<Vec<Value>>::new()));
    let tail = TailStage::new(
        source,
        GatherConfig::default().workers_cap(3),
        CancellationToken::new(),
        Arc::new(GatherStats::default()),
    );

    let (queries, queries_rx) = async_channel::bounded(2);
    let (mut calls, mut errors) =
        tail.run::<Vec<Value>, SegregatedOutlet<Vec<Value>>>(queries_rx);

    tokio::spawn(async move {
        for page in 1..=10 {
            queries
                .send(Query::page_query("projects", page))
                .await
                .unwrap();
        }
    });

    let mut pages = BTreeSet::new();
    while let Some(call) = calls.recv().await {
        pages.insert(call.query.page().unwrap());
    }
    assert_eq!(pages, (1..=10).collect::<BTreeSet<u32>>());
    assert!(errors.recv().await.is_none());
}

#[tokio::test]
async fn test_fan_in_merges_and_closes() {
    let (a_tx, a_rx) = mpsc::channel(4);
    let (b_tx, b_rx) = mpsc::channel(4);
    let (c_tx, c_rx) = mpsc::channel::<u32>(4);
    let mut merged = FanIn::new(2).run(vec![a_rx, b_rx, c_rx]);
    drop(c_tx);

    tokio::spawn(async move {
        for n in [1, 2, 3] {
            a_tx.send(n).await.unwrap();
        }
    });
    for n in [10, 20] {
        b_tx.send(n).await.unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(merged.recv().await.unwrap());
    }

    // Per-input order is preserved
    let from_a: Vec<u32> = seen.iter().copied().filter(|n| *n < 10).collect();
    let from_b: Vec<u32> = seen.iter().copied().filter(|n| *n >= 10).collect();
    assert_eq!(from_a, vec![1, 2, 3]);
    assert_eq!(from_b, vec![10, 20]);

    // `b` is still open
    assert!(timeout(Duration::from_millis(50), merged.recv()).await.is_err());
    drop(b_tx);
    assert!(merged.recv().await.is_none());
}

#[tokio::test]
async fn test_fan_in_does_not_block_on_idle_input() {
    let (_idle_tx, idle_rx) = mpsc::channel::<u32>(1);
    let (busy_tx, busy_rx) = mpsc::channel(1);
    let mut merged = FanIn::new(1).run(vec![idle_rx, busy_rx]);

    busy_tx.send(7).await.unwrap();
    let value = timeout(Duration::from_secs(1), merged.recv()).await.unwrap();
    assert_eq!(value, Some(7));
}

// ============================================================================
// Envelope Tests
// ============================================================================

#[test]
fn test_call_conversions() {
    let query = Query::page_query("groups", 2);
    let ok: Call<u32> = CallNoError {
        query: query.clone(),
        headers: HeaderMap::new(),
        value: 5,
    }
    .into();
    assert!(ok.is_ok());
    assert_eq!(ok.value(), Some(&5));
    assert_eq!(ok.into_result().unwrap().into_value(), 5);

    let failed: Call<u32> = QueryError::new(query, Error::Cancelled).into();
    assert!(failed.headers.is_none());
    let error = failed.into_result().unwrap_err();
    assert_eq!(error.key(), key("groups", 2));
    assert_eq!(error.to_string(), "groups (page 2): Fetch cancelled");
}

#[test]
fn test_gather_config_defaults() {
    let config = GatherConfig::default();
    assert_eq!(
        (config.call_cap, config.query_cap, config.workers_cap, config.error_cap),
        (5, 5, 5, 1)
    );
    assert_eq!(config.total_pages_limit, 0);

    let parsed: GatherConfig =
        serde_yaml::from_str("workers_cap: 8\ntotal_pages_limit: 50").unwrap();
    assert_eq!(parsed.workers_cap, 8);
    assert_eq!(parsed.total_pages_limit, 50);
    assert_eq!(parsed.call_cap, 5);
}
