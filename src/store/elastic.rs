// src/store/elastic.rs
//! Elasticsearch over its REST API.
//!
//! Request bodies and response parsing are plain functions so they can be
//! checked without a cluster.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::options::StoreOptions;
use crate::error::StoreError;
use crate::model::SnapshotDocument;

use super::{BulkItemOutcome, DocumentStore, FieldMutation, IndexSchema, Query, TimestampFilter};

pub struct ElasticStore {
    client: Client,
    opts: StoreOptions,
}

impl ElasticStore {
    pub fn new(opts: StoreOptions) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(opts.timeout)
            .danger_accept_invalid_certs(opts.insecure_tls)
            .build()?;
        Ok(Self { client, opts })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join!(self.opts.host.trim_end_matches('/'), "/", path.trim_start_matches('/'));
        let req = self.client.request(method, url);
        match &self.opts.username {
            Some(user) => req.basic_auth(user, self.opts.password.as_deref()),
            None => req,
        }
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<bool, StoreError> {
        let head = self.request(Method::HEAD, &self.opts.index).send().await?;
        match head.status() {
            StatusCode::OK => {
                tracing::debug!(index = %self.opts.index, "index exists");
                Ok(false)
            }
            StatusCode::NOT_FOUND => {
                let put = self.request(Method::PUT, &self.opts.index).json(&schema.body).send().await?;
                match check(put).await {
                    Ok(_) => {
                        tracing::info!(index = %self.opts.index, "created index");
                        Ok(true)
                    }
                    Err(StoreError::Status { status, body }) if is_already_exists(status, &body) => {
                        tracing::debug!(index = %self.opts.index, "index created concurrently");
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            }
            other => Err(StoreError::Status { status: other.as_u16(), body: String::new() }),
        }
    }

    async fn bulk_write(&self, docs: Vec<SnapshotDocument>) -> Result<Vec<BulkItemOutcome>, StoreError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let body = bulk_body(&self.opts.index, &docs)?;
        let resp = self
            .request(Method::POST, "_bulk?refresh=wait_for")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let text = check(resp).await?.text().await?;
        parse_bulk_response(&text)
    }

    async fn update_by_query(&self, query: &Query, mutation: &FieldMutation) -> Result<u64, StoreError> {
        let path = join!(&self.opts.index, "/_update_by_query?conflicts=proceed&refresh=true");
        let resp = self
            .request(Method::POST, &path)
            .json(&update_body(query, *mutation))
            .send()
            .await?;
        let text = check(resp).await?.text().await?;
        parse_update_response(&text)
    }
}

/* ---------------- request bodies ---------------- */

/// NDJSON: an action line and a source line per document.
pub fn bulk_body(index: &str, docs: &[SnapshotDocument]) -> Result<String, StoreError> {
    let mut out = String::new();
    for doc in docs {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        out.push_str(&action.to_string());
        out.push('\n');
        out.push_str(&serde_json::to_string(doc)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn query_dsl(query: &Query) -> Value {
    let mut filter = Vec::new();
    let mut must_not = Vec::new();
    if !query.types.is_empty() {
        let types: Vec<&str> = query.types.iter().map(|t| t.as_str()).collect();
        filter.push(json!({ "terms": { "type": types } }));
    }
    if let Some(current) = query.is_current {
        filter.push(json!({ "term": { "is_current": current } }));
    }
    match &query.timestamp {
        Some(TimestampFilter::Eq(ts)) => filter.push(json!({ "term": { "@timestamp": ts } })),
        Some(TimestampFilter::NotEq(ts)) => must_not.push(json!({ "term": { "@timestamp": ts } })),
        None => {}
    }
    json!({ "bool": { "filter": filter, "must_not": must_not } })
}

pub fn update_body(query: &Query, mutation: FieldMutation) -> Value {
    let script = match mutation {
        FieldMutation::SetCurrent(value) => json!({
            "source": "ctx._source.is_current = params.value",
            "lang": "painless",
            "params": { "value": value }
        }),
    };
    json!({ "query": query_dsl(query), "script": script })
}

/* ---------------- responses ---------------- */

/// Another process created the index between our HEAD and PUT.
pub fn is_already_exists(status: u16, body: &str) -> bool {
    if status != 400 {
        return false;
    }
    serde_json::from_str::<Value>(body)
        .map(|v| v["error"]["type"] == "resource_already_exists_exception")
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<std::collections::HashMap<String, BulkItem>>,
}

#[derive(Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

pub fn parse_bulk_response(text: &str) -> Result<Vec<BulkItemOutcome>, StoreError> {
    let resp: BulkResponse = serde_json::from_str(text)?;
    resp.items
        .into_iter()
        .map(|mut item| {
            let (_, it) = item
                .drain()
                .next()
                .ok_or_else(|| StoreError::Response(s!("empty bulk item")))?;
            Ok(match it.error {
                Some(err) => BulkItemOutcome::failed(it.id, error_reason(&err)),
                None if it.status >= 300 => BulkItemOutcome::failed(it.id, format!("HTTP {}", it.status)),
                None => BulkItemOutcome::ok(it.id),
            })
        })
        .collect()
}

fn error_reason(err: &Value) -> String {
    let kind = err["type"].as_str().unwrap_or("error");
    match err["reason"].as_str() {
        Some(reason) => format!("{kind}: {reason}"),
        None => s!(kind),
    }
}

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    updated: u64,
    #[serde(default)]
    failures: Vec<Value>,
}

pub fn parse_update_response(text: &str) -> Result<u64, StoreError> {
    let resp: UpdateResponse = serde_json::from_str(text)?;
    match resp.failures.first() {
        Some(f) => Err(StoreError::Response(format!(
            "{} update failures, first: {}",
            resp.failures.len(),
            error_reason(&f["cause"])
        ))),
        None => Ok(resp.updated),
    }
}
