//! Integration tests for ArxivMind
//!
//! These tests drive the public API end to end: chunked NDJSON decoding, the
//! HTTP client against a mock server, and the result view helpers.

use arxiv_mind::client::mock::{error_line, progress_line, result_line};
use arxiv_mind::client::{MockBackend, ResearchBackend, ResearchClient};
use arxiv_mind::models::{parse_timestamp, ProgressStep, ResearchEvent, SearchPhase, SearchState};
use arxiv_mind::stream::{decode_chunks, decode_chunks_with, DecoderOptions, NdjsonDecoder};
use arxiv_mind::utils::{publication_timeline, PaperFilter, SortMode, YearCount};
use arxiv_mind::{AnalysisResult, StreamError};
use futures_util::StreamExt;
use mockito::Matcher;
use serde_json::json;

const SCENARIO: [&str; 2] = [
    r#"{"type":"progress","step":"analyz"#,
    "ing\",\"message\":\"Parsing idea...\"}\n{\"type\":\"result\",\"data\":{\"papers\":[{\"url\":\"http://x/1\",\"title\":\"T\",\"summary\":\"S\"}],\"analysis\":\"{\\\"summary\\\":\\\"ok\\\",\\\"keyTrends\\\":[],\\\"suggestedDirections\\\":[]}\"}}\n",
];

fn collect<I, B>(chunks: I) -> (Vec<ResearchEvent>, Result<(), StreamError>)
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut events = Vec::new();
    let outcome = decode_chunks(chunks, |e| events.push(e)).map(|_| ());
    (events, outcome)
}

fn sample_body() -> String {
    format!(
        "{}\n{}{}{}",
        progress_line("analyzing", "Understanding your idea..."),
        progress_line("searching", "Searching arXiv for “graph transformers” ✓"),
        progress_line("reranking", "Scoring 2 papers"),
        result_line(
            json!([
                {
                    "url": "http://arxiv.org/abs/2401.00001",
                    "title": "Graph Transformers at Scale",
                    "summary": "We study attention over graphs.",
                    "authors": ["Ada Lovelace", "Alan Turing"],
                    "published": "2024-01-02 10:00:00+00:00",
                    "updated": "2024-01-03 10:00:00+00:00",
                    "categories": ["cs.LG"],
                    "score": 9,
                    "reason": "Directly addresses the idea"
                },
                {
                    "entry_id": "http://arxiv.org/abs/2101.00002",
                    "title": "Message Passing Revisited",
                    "published": "2021-06-01T00:00:00Z",
                    "score": "4.5"
                }
            ]),
            json!({
                "summary": "Attention is replacing message passing.",
                "keyTrends": ["Scaling"],
                "suggestedDirections": ["Sparse attention"]
            })
        )
    )
}

#[test]
fn test_end_to_end_scenario() {
    let (events, outcome) = collect(SCENARIO);
    outcome.unwrap();
    assert_eq!(events.len(), 2);

    match &events[0] {
        ResearchEvent::Progress {
            step,
            phase,
            message,
        } => {
            assert_eq!(step, &ProgressStep::Analyzing);
            assert_eq!(*phase, SearchPhase::GeneratingQuery);
            assert_eq!(message, "Parsing idea...");
        }
        other => panic!("expected progress, got {:?}", other),
    }

    let result = events[1].as_result().expect("result event");
    assert_eq!(result.papers.len(), 1);
    let paper = &result.papers[0];
    assert_eq!(paper.id, "http://x/1");
    assert_eq!(paper.link, "http://x/1");
    assert_eq!(paper.title, "T");
    assert_eq!(paper.summary, "S");
    assert!(paper.authors.is_empty());
    assert_eq!(paper.categories, vec!["Research".to_string()]);
    assert!(parse_timestamp(&paper.published).is_some());
    assert!(parse_timestamp(&paper.updated).is_some());
    assert_eq!(
        result.analysis,
        AnalysisResult {
            summary: "ok".to_string(),
            key_trends: vec![],
            suggested_directions: vec![],
        }
    );
}

#[test]
fn test_chunking_invariance_at_every_split() {
    let body = sample_body();
    let bytes = body.as_bytes();
    let (expected, outcome) = collect([bytes]);
    outcome.unwrap();
    assert_eq!(expected.len(), 4);

    for split in 0..=bytes.len() {
        let (left, right) = bytes.split_at(split);
        let (events, outcome) = collect([left, right]);
        assert!(outcome.is_ok(), "split at {} failed", split);
        assert_eq!(events.len(), expected.len(), "split at {}", split);
        for (got, want) in events.iter().zip(&expected) {
            match (got, want) {
                (ResearchEvent::Result(a), ResearchEvent::Result(b)) => {
                    assert_eq!(a.analysis, b.analysis);
                    let ids: Vec<_> = a.papers.iter().map(|p| &p.id).collect();
                    let want_ids: Vec<_> = b.papers.iter().map(|p| &p.id).collect();
                    assert_eq!(ids, want_ids, "split at {}", split);
                }
                _ => assert_eq!(got, want, "split at {}", split),
            }
        }
    }
}

#[test]
fn test_byte_at_a_time() {
    let body = sample_body();
    let (events, outcome) = collect(body.as_bytes().chunks(1));
    outcome.unwrap();
    assert_eq!(events.len(), 4);

    match &events[1] {
        ResearchEvent::Progress { message, .. } => {
            assert_eq!(message, "Searching arXiv for “graph transformers” ✓");
        }
        other => panic!("expected progress, got {:?}", other),
    }
}

#[test]
fn test_blank_and_invalid_lines_are_skipped() {
    let body = format!(
        "\n   \r\n{}{{not json}}\n\n{}",
        progress_line("searching", "one"),
        progress_line("reranking", "two")
    );
    let mut decoder = NdjsonDecoder::new();
    decoder.push(body.as_bytes());
    decoder.finish();

    let messages: Vec<String> = decoder
        .drain()
        .map(|item| match item.unwrap() {
            ResearchEvent::Progress { message, .. } => message,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(messages, vec!["one", "two"]);

    let stats = decoder.stats();
    assert_eq!(stats.malformed_lines, 1);
    assert_eq!(stats.events, 2);
}

#[test]
fn test_residual_line_without_newline() {
    let (events, outcome) = collect([r#"{"type":"progress","step":"searching","message":"last"}"#]);
    outcome.unwrap();
    assert_eq!(events, vec![ResearchEvent::progress(ProgressStep::Searching, "last")]);
}

#[test]
fn test_error_line_stops_the_session() {
    let body = format!(
        "{}{}{}",
        progress_line("searching", "before"),
        error_line("quota exceeded"),
        progress_line("reranking", "after")
    );
    let (events, outcome) = collect([body.as_bytes(), progress_line("reranking", "later").as_bytes()]);

    assert_eq!(events.len(), 1);
    assert_eq!(
        outcome.unwrap_err(),
        StreamError::Producer("quota exceeded".to_string())
    );
}

#[test]
fn test_strict_results_escalates_broken_result_line() {
    let body = "{\"type\":\"result\",\"data\":{\"papers\":[oops]}}\n";

    let (events, outcome) = collect([body]);
    assert!(events.is_empty());
    assert!(outcome.is_ok());

    let err = decode_chunks_with([body], DecoderOptions::default().strict_results(true), |_| {})
        .unwrap_err();
    assert!(matches!(err, StreamError::MalformedResult(_)));
}

#[test]
fn test_mistyped_paper_fields_keep_the_result_in_strict_mode() {
    let body = result_line(
        json!([
            {"url": "http://x/1", "title": "Good"},
            {"url": "http://x/2", "title": 42, "published": 1700000000},
            {"url": "http://x/3", "categories": "cs.CV", "authors": ["A", null]}
        ]),
        json!({"summary": "ok"}),
    );

    let mut events = Vec::new();
    let stats = decode_chunks_with(
        body.as_bytes().chunks(9),
        DecoderOptions::default().strict_results(true),
        |e| events.push(e),
    )
    .unwrap();

    assert_eq!(stats.malformed_lines, 0);
    let result = events.last().and_then(ResearchEvent::as_result).unwrap();
    let titles: Vec<_> = result.papers.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Good", "42", ""]);
    assert_eq!(result.papers[1].published_year(), Some(2023));
    assert_eq!(result.papers[2].categories, vec!["cs.CV".to_string()]);
    assert_eq!(result.papers[2].authors, vec!["A".to_string()]);
}

#[test]
fn test_truncated_character_at_end_is_fatal() {
    let bytes = "{\"type\":\"progress\",\"step\":\"searching\",\"message\":\"é\"}\n".as_bytes();
    let cut = &bytes[..bytes.iter().position(|b| *b == 0xC3).unwrap() + 1];
    let (_, outcome) = collect([cut]);
    assert!(matches!(outcome, Err(StreamError::Decode(_))));
}

#[test]
fn test_search_state_follows_events() {
    let (events, outcome) = collect(SCENARIO);
    outcome.unwrap();

    let mut state = SearchState::started();
    assert!(state.is_busy());
    state.apply(&events[0]);
    assert_eq!(state.message.as_deref(), Some("Parsing idea..."));
    state.apply(&events[1]);
    assert_eq!(state.phase, SearchPhase::Success);
    assert!(!state.is_busy());
}

#[test]
fn test_filter_and_timeline_on_decoded_papers() {
    let (events, outcome) = collect([sample_body()]);
    outcome.unwrap();
    let result = events.last().and_then(ResearchEvent::as_result).unwrap();

    let shown = PaperFilter::new(SortMode::Score)
        .min_score(5.0)
        .apply(&result.papers);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Graph Transformers at Scale");
    assert_eq!(shown[0].author_line(), "Ada Lovelace, Alan Turing");

    let by_date = PaperFilter::new(SortMode::Date).apply(&result.papers);
    assert_eq!(by_date[0].id, "http://arxiv.org/abs/2401.00001");
    assert_eq!(by_date[1].id, "http://arxiv.org/abs/2101.00002");
    assert_eq!(by_date[1].score, Some(4.5));

    assert_eq!(
        publication_timeline(&result.papers),
        vec![
            YearCount { year: 2021, count: 1 },
            YearCount { year: 2024, count: 1 },
        ]
    );
}

#[tokio::test]
async fn test_mock_backend_session() {
    let body = sample_body();
    let (a, b) = body.as_bytes().split_at(40);
    let backend = MockBackend::with_chunks([a, b]);

    let mut phases = Vec::new();
    let mut sink = |event: ResearchEvent| phases.push(event.phase());
    let stats = backend
        .research("graph transformers", &mut sink)
        .await
        .unwrap();

    assert_eq!(
        phases,
        vec![
            SearchPhase::GeneratingQuery,
            SearchPhase::FetchingPapers,
            SearchPhase::Analyzing,
            SearchPhase::Success,
        ]
    );
    assert_eq!(stats.events, 4);
    assert_eq!(backend.submitted_ideas(), vec!["graph transformers"]);
}

#[tokio::test]
async fn test_http_client_streams_events() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/research")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"idea": "graph transformers"})))
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(sample_body())
        .create_async()
        .await;

    let client = ResearchClient::new(&server.url()).unwrap();
    let mut events = Vec::new();
    let mut sink = |event: ResearchEvent| events.push(event);
    let stats = client
        .research("graph transformers", &mut sink)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(stats.events, 4);
    let result = events.last().and_then(ResearchEvent::as_result).unwrap();
    assert_eq!(result.papers.len(), 2);
    assert_eq!(result.analysis.key_trends, vec!["Scaling".to_string()]);
}

#[tokio::test]
async fn test_http_client_event_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = format!(
        "{}{}{}",
        progress_line("searching", "Searching..."),
        error_line("LLM unavailable"),
        progress_line("reranking", "never seen")
    );
    let _mock = server
        .mock("POST", "/api/research")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = ResearchClient::new(&server.url()).unwrap();
    let items: Vec<_> = client
        .research_events("agents")
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(
        items[1].clone().unwrap_err(),
        StreamError::Producer("LLM unavailable".to_string())
    );
}

#[tokio::test]
async fn test_http_client_non_success_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/research")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let client = ResearchClient::new(&server.url()).unwrap();
    let mut count = 0;
    let mut sink = |_event: ResearchEvent| count += 1;
    let err = client.research("anything", &mut sink).await.unwrap_err();

    assert_eq!(
        err,
        StreamError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        }
    );
    assert_eq!(err.to_string(), "Backend error: 503 Service Unavailable");
    assert_eq!(count, 0);
}
