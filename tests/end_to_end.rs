//! Wire-level tests for the fetch pipeline: retry timing against a mock
//! server, and full chunk/schedule/merge round trips.

use std::time::{Duration, Instant};

use biodbs_fetch::{ErrorKind, RequestSpec, RequesterBuilder, RetryPolicy, batch};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(50),
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_retry_after_overrides_backoff_then_growth_resumes() {
    let mock_server = MockServer::start().await;

    // First attempt: 429 with a numeric Retry-After of one second
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "1")
                .set_body_string("throttled"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    // Second attempt: 429 without the header, so the next delay must be the
    // override times the exponential base (2s), not the 50ms schedule
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("throttled"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let requester = RequesterBuilder::builder()
        .policy(fast_policy())
        .build()
        .requester()
        .unwrap();
    requester.limiter().set_rate("127.0.0.1", 1000.0);

    let start = Instant::now();
    let response = requester
        .get(Url::parse(&mock_server.uri()).unwrap())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(response.body, "ok");
    // 1s (override) + 2s (override * base); the policy's own 50ms schedule
    // could never add up to this
    assert!(
        elapsed >= Duration::from_millis(2900),
        "finished too quickly: {elapsed:?}"
    );
    assert!(elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn test_timeout_exhausts_the_retry_budget() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let requester = RequesterBuilder::builder()
        .policy(RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        })
        .timeout(Duration::from_millis(100))
        .build()
        .requester()
        .unwrap();
    requester.limiter().set_rate("127.0.0.1", 1000.0);

    let result = requester.get(Url::parse(&mock_server.uri()).unwrap()).await;

    match result {
        Err(ErrorKind::TimeoutExhausted { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected TimeoutExhausted, got {other:?}"),
    }
}

/// Echoes the `ids` query parameter back as newline-separated records, the
/// way a tabular export endpoint would
struct EchoIds;

impl Respond for EchoIds {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = request
            .url
            .query_pairs()
            .find(|(name, _)| name == "ids")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let body: String = ids.split(',').map(|id| format!("{id}\n")).collect();
        ResponseTemplate::new(200).set_body_string(body)
    }
}

#[tokio::test]
async fn test_chunked_batch_round_trip_under_rate_limit() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(EchoIds)
        .expect(3)
        .mount(&mock_server)
        .await;

    let requester = RequesterBuilder::builder()
        .policy(fast_policy())
        .build()
        .requester()
        .unwrap();
    requester.limiter().set_rate("127.0.0.1", 5.0);

    let ids: Vec<String> = (0..1200).map(|i| format!("ENSG{i:011}")).collect();
    let base = Url::parse(&mock_server.uri()).unwrap().join("/export").unwrap();

    let specs: Vec<RequestSpec> = batch::chunk(&ids, 500)
        .into_iter()
        .map(|chunk| RequestSpec::get(base.clone()).with_param("ids", chunk.join(",")))
        .collect();
    assert_eq!(specs.len(), 3);

    let tasks: Vec<_> = specs
        .into_iter()
        .map(|spec| {
            let requester = &requester;
            async move { requester.execute(&spec).await.map(|response| response.body) }
        })
        .collect();

    let start = Instant::now();
    let outcome = batch::run(tasks, 4, true).await.unwrap();
    let elapsed = start.elapsed();

    // Three requests at five per second: the second and third each wait
    // their 200ms slot even with four workers available
    assert!(
        elapsed >= Duration::from_millis(380),
        "rate limit not enforced: {elapsed:?}"
    );

    let aggregated = batch::concat(outcome);
    assert!(aggregated.is_complete());
    let returned: Vec<&str> = aggregated
        .merged
        .as_deref()
        .unwrap()
        .lines()
        .collect();
    // Nothing lost, nothing duplicated, order preserved
    assert_eq!(returned, ids.iter().map(String::as_str).collect::<Vec<_>>());
}

/// Serves a paginated search endpoint: every page reports the total page
/// count, so the client can only discover the remaining pages from page one
struct PagedSearch {
    total_pages: u64,
}

impl Respond for PagedSearch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let page: u64 = request
            .url
            .query_pairs()
            .find(|(name, _)| name == "page")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(1);
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "page": page,
            "total_pages": self.total_pages,
            "results": [format!("record-from-page-{page}")],
        }))
    }
}

#[tokio::test]
async fn test_first_page_then_rest_pagination() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(PagedSearch { total_pages: 4 })
        .expect(4)
        .mount(&mock_server)
        .await;

    let requester = RequesterBuilder::builder()
        .policy(fast_policy())
        .build()
        .requester()
        .unwrap();
    requester.limiter().set_rate("127.0.0.1", 1000.0);

    let base = Url::parse(&mock_server.uri()).unwrap().join("/search").unwrap();

    // Page one reveals the total
    let first = requester
        .execute(&RequestSpec::get(base.clone()).with_param("page", "1"))
        .await
        .unwrap();
    let first: serde_json::Value = serde_json::from_str(&first.body).unwrap();
    let total_pages = first["total_pages"].as_u64().unwrap();

    // The rest go through the scheduler
    let rest: Vec<RequestSpec> = (2..=total_pages)
        .map(|page| RequestSpec::get(base.clone()).with_param("page", page.to_string()))
        .collect();
    let outcome = requester.execute_batch(rest, 4, true).await.unwrap();

    let mut records: Vec<String> = first["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap().to_string())
        .collect();
    for result in outcome.into_results() {
        let page: serde_json::Value =
            serde_json::from_str(&result.success().expect("page fetch failed").body).unwrap();
        for record in page["results"].as_array().unwrap() {
            records.push(record.as_str().unwrap().to_string());
        }
    }

    assert_eq!(
        records,
        vec![
            "record-from-page-1",
            "record-from-page-2",
            "record-from-page-3",
            "record-from-page-4",
        ]
    );
}
