// tests/static_fetch.rs
//! Static fetcher against a throwaway local HTTP server.
mod common;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use pop_scrape::config::options::{FetchOptions, SourceOptions};
use pop_scrape::core::canon::AliasTable;
use pop_scrape::core::retry::RetryPolicy;
use pop_scrape::error::FetchError;
use pop_scrape::fetch::{self, Target};
use pop_scrape::model::RawTable;
use pop_scrape::specs;

/// Answers each connection with the next queued `(status, body)`, then 404s.
async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_server = seen.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else { break };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match sock.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let head = String::from_utf8_lossy(&buf).to_string();
            seen_by_server.lock().unwrap().push(head.lines().next().unwrap_or("").to_string());
            let (status, body) = queue.lock().unwrap().pop_front().unwrap_or((404, String::new()));
            let resp = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });
    (format!("http://{addr}"), seen)
}

fn options(base: &str, diag: &str) -> (SourceOptions, FetchOptions) {
    let source = SourceOptions {
        world_url: format!("{base}/world-population/"),
        countries_url: format!("{base}/world-population/population-by-country/"),
        user_agent: "pop_scrape-test".into(),
    };
    let fetch = FetchOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            factor: 2,
            max_delay: Duration::from_millis(5),
        },
        diagnostics_dir: std::env::temp_dir().join(diag),
        ..FetchOptions::default()
    };
    (source, fetch)
}

#[tokio::test]
async fn fetches_and_extracts_country_table() {
    let (base, seen) = serve(vec![(200, common::countries_html(234))]).await;
    let (source, opts) = options(&base, "pop_scrape_static_ok");
    let fetcher = fetch::build(&source, &opts).unwrap();

    let table = fetcher.fetch(Target::Countries).await.unwrap();
    assert_eq!(table.len(), 234);
    let out = specs::extract(&table, Target::Countries, &AliasTable::default());
    assert_eq!(out.records.len(), 234);
    assert_eq!(out.dropped, 0);
    assert!(specs::countries::is_population_descending(&table));

    let request_line = seen.lock().unwrap()[0].clone();
    assert!(request_line.contains("/population-by-country/?t="), "{request_line}");
}

#[tokio::test]
async fn retries_server_errors() {
    let (base, seen) = serve(vec![(503, String::new()), (200, common::world_html())]).await;
    let (source, opts) = options(&base, "pop_scrape_static_retry");
    let fetcher = fetch::build(&source, &opts).unwrap();

    let RawTable::Counters(c) = fetcher.fetch(Target::World).await.unwrap() else { panic!() };
    assert_eq!(c[specs::world::CURRENT_POPULATION], "8045311447");
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn short_table_exhausts_and_saves_html() {
    let diag = std::env::temp_dir().join("pop_scrape_static_short");
    let _ = std::fs::remove_dir_all(&diag);
    let short = common::countries_html(50);
    let (base, _) = serve(vec![(200, short.clone()), (200, short.clone()), (200, short)]).await;
    let (source, opts) = options(&base, "pop_scrape_static_short");
    let fetcher = fetch::build(&source, &opts).unwrap();

    match fetcher.fetch(Target::Countries).await {
        Err(FetchError::Exhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::NotReady { .. }));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    let saved: Vec<_> = std::fs::read_dir(&diag).unwrap().collect();
    assert_eq!(saved.len(), 1);
    let _ = std::fs::remove_dir_all(&diag);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let (base, seen) = serve(vec![]).await;
    let (source, opts) = options(&base, "pop_scrape_static_404");
    let fetcher = fetch::build(&source, &opts).unwrap();

    assert!(fetcher.fetch(Target::World).await.is_err());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn permanent_failure_saves_html_on_first_attempt() {
    let diag = std::env::temp_dir().join("pop_scrape_static_gone");
    let _ = std::fs::remove_dir_all(&diag);
    let (base, seen) = serve(vec![(404, "<html><body>gone</body></html>".to_string())]).await;
    let (source, opts) = options(&base, "pop_scrape_static_gone");
    let fetcher = fetch::build(&source, &opts).unwrap();

    match fetcher.fetch(Target::World).await {
        Err(FetchError::Exhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 1);
            assert!(matches!(*last, FetchError::Status { status: 404, .. }));
        }
        other => panic!("expected a permanent failure, got {other:?}"),
    }
    assert_eq!(seen.lock().unwrap().len(), 1);
    let saved: Vec<_> = std::fs::read_dir(&diag).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(saved.len(), 1);
    assert!(std::fs::read_to_string(&saved[0]).unwrap().contains("gone"));
    let _ = std::fs::remove_dir_all(&diag);
}
