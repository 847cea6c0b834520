//! Bucketing pass over the diagnostics stream.
//!
//! Records are grouped under a running response-path key; each bucket keeps
//! the worst status and the longest duration seen for that path, including
//! timing folded in from matched `fetch:` spans.

use super::trace::{join_path, SpanForest, TraceRecord};
use serde::Serialize;
use std::collections::HashMap;

/// Key used for records observed before any response path is known.
/// It never resolves to a schema location and is dropped at presentation.
pub const OPERATION_KEY: &str = "$operation";

/// HTTP status attribute carried by fetch spans.
const HTTP_STATUS_ATTR: &str = "http.status_code";

/// Aggregated observations for one response path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSummary {
    /// Dotted response path, e.g. `topProducts.0.reviews`.
    pub key: String,
    /// Worst HTTP status seen for this path.
    pub status: Option<i64>,
    /// Longest duration seen for this path, in milliseconds.
    pub duration_ms: Option<f64>,
}

impl PathSummary {
    fn new(key: String) -> Self {
        PathSummary {
            key,
            status: None,
            duration_ms: None,
        }
    }

    fn fold_status(&mut self, status: i64) {
        self.status = Some(self.status.map_or(status, |cur| cur.max(status)));
    }

    fn fold_duration(&mut self, ms: f64) {
        self.duration_ms = Some(self.duration_ms.map_or(ms, |cur| cur.max(ms)));
    }
}

/// Pass 2 over the stream: bucket every record under the current path key.
///
/// The key starts at [`OPERATION_KEY`], resets to it whenever a record
/// carries a `documentHash` (a new request began), and is replaced by the
/// record's own joined path when one is present. Records without a path
/// inherit the key of the nearest preceding record that had one.
pub fn summarize(records: &[TraceRecord]) -> Vec<PathSummary> {
    let forest = SpanForest::from_records(records);

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, PathSummary> = HashMap::new();
    let mut current = OPERATION_KEY.to_string();

    for record in records {
        if record.document_hash.is_some() {
            current = OPERATION_KEY.to_string();
        }
        if let Some(path) = &record.path {
            current = join_path(path);
        }

        let bucket = buckets.entry(current.clone()).or_insert_with(|| {
            order.push(current.clone());
            PathSummary::new(current.clone())
        });

        if let Some(status) = record.status {
            bucket.fold_status(status);
        }
        if let Some(ns) = record.duration_ns {
            bucket.fold_duration(ns.0 as f64 / 1_000_000.0);
        }

        // A span reference pulls in every fetch span descending from it.
        if let Some(span_id) = &record.span_id {
            for fetch in forest.fetch_spans() {
                if !forest.chain_contains(fetch, span_id) {
                    continue;
                }
                if let Some(ms) = fetch.duration_ms() {
                    bucket.fold_duration(ms);
                }
                if let Some(status) = fetch.attr_i64(HTTP_STATUS_ATTR) {
                    bucket.fold_status(status);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| buckets.remove(&key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::trace::{
        JsonU64, PathSegment, ResourceSpans, ScopeSpans, Span,
    };

    fn path(segments: &[&str]) -> Option<Vec<PathSegment>> {
        Some(
            segments
                .iter()
                .map(|s| PathSegment::Key(s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_pathless_records_inherit_preceding_key() {
        let records = vec![
            TraceRecord {
                document_hash: Some("abc".to_string()),
                path: path(&["user"]),
                status: Some(200),
                ..TraceRecord::default()
            },
            TraceRecord {
                status: Some(404),
                ..TraceRecord::default()
            },
            TraceRecord {
                duration_ns: Some(JsonU64(2_000_000)),
                ..TraceRecord::default()
            },
            TraceRecord {
                status: Some(503),
                ..TraceRecord::default()
            },
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].key, "user");
        assert_eq!(summaries[0].status, Some(503));
        assert_eq!(summaries[0].duration_ms, Some(2.0));
    }

    #[test]
    fn test_document_hash_resets_to_operation_key() {
        let records = vec![
            TraceRecord {
                path: path(&["user"]),
                status: Some(200),
                ..TraceRecord::default()
            },
            // New request: the stale "user" key must not leak into it.
            TraceRecord {
                document_hash: Some("def".to_string()),
                status: Some(500),
                ..TraceRecord::default()
            },
            TraceRecord {
                status: Some(502),
                ..TraceRecord::default()
            },
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, "user");
        assert_eq!(summaries[0].status, Some(200));
        assert_eq!(summaries[1].key, OPERATION_KEY);
        assert_eq!(summaries[1].status, Some(502));
    }

    #[test]
    fn test_status_and_duration_are_max_reduced() {
        let records = vec![
            TraceRecord {
                path: path(&["orders"]),
                status: Some(500),
                duration_ns: Some(JsonU64(9_000_000)),
                ..TraceRecord::default()
            },
            TraceRecord {
                path: path(&["orders"]),
                status: Some(200),
                duration_ns: Some(JsonU64(1_000_000)),
                ..TraceRecord::default()
            },
        ];
        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, Some(500));
        assert_eq!(summaries[0].duration_ms, Some(9.0));
    }

    #[test]
    fn test_fetch_spans_fold_into_ancestor_bucket() {
        // Chain a (root) -> b -> c, where c is the fetch span. A record
        // pointing at a must pick up c's timing and status.
        let spans = vec![
            Span {
                span_id: "a".to_string(),
                name: "query".to_string(),
                ..Span::default()
            },
            Span {
                span_id: "b".to_string(),
                name: "resolve".to_string(),
                parent_span_id: Some("a".to_string()),
                ..Span::default()
            },
            Span {
                span_id: "c".to_string(),
                name: "fetch:reviews".to_string(),
                parent_span_id: Some("b".to_string()),
                start_time_unix_nano: Some(JsonU64(0)),
                end_time_unix_nano: Some(JsonU64(12_000_000)),
                attributes: vec![serde_json::from_value(serde_json::json!({
                    "key": "http.status_code",
                    "value": {"intValue": 502}
                }))
                .unwrap()],
                ..Span::default()
            },
        ];
        let records = vec![
            TraceRecord {
                resource_spans: Some(vec![ResourceSpans {
                    scope_spans: vec![ScopeSpans { spans }],
                }]),
                ..TraceRecord::default()
            },
            TraceRecord {
                path: path(&["topProducts"]),
                span_id: Some("a".to_string()),
                status: Some(200),
                ..TraceRecord::default()
            },
        ];
        let summaries = summarize(&records);
        let bucket = summaries.iter().find(|s| s.key == "topProducts").unwrap();
        assert_eq!(bucket.status, Some(502));
        assert_eq!(bucket.duration_ms, Some(12.0));
    }

    #[test]
    fn test_unrelated_span_reference_folds_nothing() {
        let spans = vec![Span {
            span_id: "c".to_string(),
            name: "fetch:reviews".to_string(),
            parent_span_id: Some("b".to_string()),
            start_time_unix_nano: Some(JsonU64(0)),
            end_time_unix_nano: Some(JsonU64(5_000_000)),
            ..Span::default()
        }];
        let records = vec![
            TraceRecord {
                resource_spans: Some(vec![ResourceSpans {
                    scope_spans: vec![ScopeSpans { spans }],
                }]),
                ..TraceRecord::default()
            },
            TraceRecord {
                path: path(&["other"]),
                span_id: Some("zz".to_string()),
                ..TraceRecord::default()
            },
        ];
        let summaries = summarize(&records);
        let bucket = summaries.iter().find(|s| s.key == "other").unwrap();
        assert_eq!(bucket.duration_ms, None);
        assert_eq!(bucket.status, None);
    }

    #[test]
    fn test_empty_stream_yields_no_summaries() {
        assert!(summarize(&[]).is_empty());
    }
}
