//! OpenTelemetry-shaped trace input.
//!
//! The runtime hands over a flat list of diagnostic records; one of them
//! carries the span forest (`resourceSpans` → `scopeSpans` → `spans`).
//! OTLP JSON encodes 64-bit integers as strings, so the numeric fields here
//! accept both representations.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Prefix of spans that represent outbound calls made while resolving a field.
pub const FETCH_PREFIX: &str = "fetch:";

/// One record of the runtime diagnostics stream. Every field is optional;
/// a record may carry any mix of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    /// GraphQL response path, e.g. `["user", "friends", 0, "name"]`.
    #[serde(default)]
    pub path: Option<Vec<PathSegment>>,
    /// HTTP status observed directly on this record.
    #[serde(default)]
    pub status: Option<i64>,
    /// Duration in nanoseconds observed directly on this record.
    #[serde(default)]
    pub duration_ns: Option<JsonU64>,
    /// Span this record is attached to.
    #[serde(default)]
    pub span_id: Option<String>,
    /// Present on the first record of a new top-level request.
    #[serde(default)]
    pub document_hash: Option<String>,
    /// The embedded span forest, present on at most one record.
    #[serde(default)]
    pub resource_spans: Option<Vec<ResourceSpans>>,
}

/// A response path segment: field name or list index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(u64),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => write!(f, "{k}"),
        }
    }
}

/// Join a response path into a bucket key: `user.friends.0.name`.
pub fn join_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpans {
    #[serde(default)]
    pub scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSpans {
    #[serde(default)]
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub span_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub start_time_unix_nano: Option<JsonU64>,
    #[serde(default)]
    pub end_time_unix_nano: Option<JsonU64>,
    #[serde(default)]
    pub attributes: Vec<KeyValue>,
}

impl Span {
    pub fn is_fetch(&self) -> bool {
        self.name.starts_with(FETCH_PREFIX)
    }

    /// Span duration in milliseconds, if both timestamps are present and
    /// end does not precede start.
    pub fn duration_ms(&self) -> Option<f64> {
        let start = self.start_time_unix_nano?.0;
        let end = self.end_time_unix_nano?.0;
        if end < start {
            return None;
        }
        Some((end - start) as f64 / 1_000_000.0)
    }

    /// Integer attribute lookup, accepting stringified numbers.
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        let value = self
            .attributes
            .iter()
            .find(|kv| kv.key == key)?
            .value
            .as_ref()?;
        if let Some(int) = value.int_value {
            // Out-of-range values read as absent, never as a wrapped negative.
            return i64::try_from(int.0).ok();
        }
        value.string_value.as_deref()?.parse().ok()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    pub key: String,
    #[serde(default)]
    pub value: Option<AttrValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrValue {
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub int_value: Option<JsonU64>,
    #[serde(default)]
    pub double_value: Option<f64>,
    #[serde(default)]
    pub bool_value: Option<bool>,
}

/// All spans of the embedded forest, indexed by id.
#[derive(Debug, Default)]
pub struct SpanForest {
    by_id: HashMap<String, Span>,
    fetch_ids: Vec<String>,
}

impl SpanForest {
    /// Pass 1 over the stream: collect every span, remember the fetch spans.
    pub fn from_records(records: &[TraceRecord]) -> Self {
        let mut forest = SpanForest::default();
        for record in records {
            let Some(resource_spans) = &record.resource_spans else {
                continue;
            };
            for resource in resource_spans {
                for scope in &resource.scope_spans {
                    for span in &scope.spans {
                        if span.is_fetch() {
                            forest.fetch_ids.push(span.span_id.clone());
                        }
                        forest.by_id.insert(span.span_id.clone(), span.clone());
                    }
                }
            }
        }
        forest
    }

    pub fn fetch_spans(&self) -> impl Iterator<Item = &Span> {
        self.fetch_ids
            .iter()
            .filter_map(move |id| self.by_id.get(id))
    }

    /// Walk `span`'s parent chain; true if `target` appears anywhere in it.
    /// O(depth) per call, guarded against malformed cycles.
    pub fn chain_contains(&self, span: &Span, target: &str) -> bool {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut parent = span.parent_span_id.as_deref();
        while let Some(id) = parent {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            parent = self
                .by_id
                .get(id)
                .and_then(|next| next.parent_span_id.as_deref());
        }
        false
    }
}

/// A 64-bit unsigned integer that OTLP JSON may spell as a string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonU64(pub u64);

impl<'de> Deserialize<'de> for JsonU64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct U64Visitor;

        impl Visitor<'_> for U64Visitor {
            type Value = JsonU64;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an unsigned 64-bit integer or its string form")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonU64, E> {
                Ok(JsonU64(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonU64, E> {
                u64::try_from(v)
                    .map(JsonU64)
                    .map_err(|_| E::custom("negative value"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonU64, E> {
                v.parse().map(JsonU64).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_otlp_json_shapes() {
        let json = r#"{
            "spanId": "c",
            "name": "fetch:reviews",
            "parentSpanId": "b",
            "startTimeUnixNano": "1000000",
            "endTimeUnixNano": 4000000,
            "attributes": [
                {"key": "http.status_code", "value": {"intValue": "502"}}
            ]
        }"#;
        let span: Span = serde_json::from_str(json).unwrap();
        assert!(span.is_fetch());
        assert_eq!(span.duration_ms(), Some(3.0));
        assert_eq!(span.attr_i64("http.status_code"), Some(502));
        assert_eq!(span.attr_i64("missing"), None);
    }

    #[test]
    fn test_attr_i64_out_of_range_reads_as_absent() {
        let span = Span {
            span_id: "x".to_string(),
            attributes: vec![serde_json::from_value(serde_json::json!({
                "key": "http.status_code",
                "value": {"intValue": "18446744073709551615"}
            }))
            .unwrap()],
            ..Span::default()
        };
        assert_eq!(span.attr_i64("http.status_code"), None);
    }

    #[test]
    fn test_join_path_with_indices() {
        let path = vec![
            PathSegment::Key("user".to_string()),
            PathSegment::Key("friends".to_string()),
            PathSegment::Index(0),
            PathSegment::Key("name".to_string()),
        ];
        assert_eq!(join_path(&path), "user.friends.0.name");
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let span = Span {
            span_id: "x".to_string(),
            start_time_unix_nano: Some(JsonU64(10)),
            end_time_unix_nano: Some(JsonU64(5)),
            ..Span::default()
        };
        assert_eq!(span.duration_ms(), None);
    }

    #[test]
    fn test_chain_walks_ancestors_with_cycle_guard() {
        let mk = |id: &str, parent: Option<&str>, name: &str| Span {
            span_id: id.to_string(),
            name: name.to_string(),
            parent_span_id: parent.map(str::to_string),
            ..Span::default()
        };
        let record = TraceRecord {
            resource_spans: Some(vec![ResourceSpans {
                scope_spans: vec![ScopeSpans {
                    spans: vec![
                        mk("a", None, "query"),
                        mk("b", Some("a"), "resolve"),
                        mk("c", Some("b"), "fetch:reviews"),
                        // Malformed: its parent chain loops.
                        mk("d", Some("e"), "fetch:loop"),
                        mk("e", Some("d"), "loop"),
                    ],
                }],
            }]),
            ..TraceRecord::default()
        };
        let forest = SpanForest::from_records(&[record]);

        let fetches: Vec<_> = forest.fetch_spans().collect();
        assert_eq!(fetches.len(), 2);

        let c = forest.by_id.get("c").unwrap();
        assert!(forest.chain_contains(c, "a"));
        assert!(forest.chain_contains(c, "b"));
        assert!(!forest.chain_contains(c, "c"), "own id is not in the parent chain");
        assert!(!forest.chain_contains(c, "zz"));

        // The loop terminates instead of hanging.
        let d = forest.by_id.get("d").unwrap();
        assert!(!forest.chain_contains(d, "zz"));
    }
}
