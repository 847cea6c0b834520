//! Runtime trace correlation.
//!
//! Turns an OpenTelemetry-shaped diagnostics stream into per-file
//! annotations: records are bucketed by response path ([`summary`]),
//! each path is mapped back to the schema location that defines the
//! field ([`locate_field`]), and the results are published per file
//! with whole-set replacement ([`PresentationBuffer`]).

pub mod summary;
pub mod trace;

pub use summary::{summarize, PathSummary, OPERATION_KEY};
pub use trace::{PathSegment, Span, SpanForest, TraceRecord};

use crate::index::{SchemaIndex, SymbolLocation};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Severity of a published annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl Severity {
    /// Severity policy for an observed HTTP status: missing or below 400
    /// is informational, 500 and above is an error, the rest are warnings.
    pub fn for_status(status: Option<i64>) -> Severity {
        match status {
            None => Severity::Information,
            Some(code) if code < 400 => Severity::Information,
            Some(code) if code >= 500 => Severity::Error,
            Some(_) => Severity::Warning,
        }
    }
}

/// One annotation anchored to a field definition in a schema file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiagnostic {
    /// Response path the observation came from.
    pub path: String,
    /// 1-based line of the field definition.
    pub line: usize,
    /// 1-based column of the field definition.
    pub character: usize,
    pub severity: Severity,
    pub message: String,
}

/// Resolve a dotted response-path key to the schema location defining it.
///
/// Two-segment keys (`Type.field`) resolve through the per-type field
/// index, since the definitions index holds field-level locations for root
/// types only. Single-segment keys match a field on one of the root
/// operation types. List indices and deeper paths do not resolve, and
/// neither does the [`OPERATION_KEY`] sentinel.
pub fn locate_field(index: &SchemaIndex, key: &str) -> Option<SymbolLocation> {
    if key == OPERATION_KEY {
        return None;
    }
    let segments: Vec<&str> = key.split('.').collect();
    match segments.as_slice() {
        [type_name, field] => index
            .fields_of(type_name)
            .iter()
            .find(|info| info.name == *field)
            .map(|info| info.location.clone()),
        [field] => index
            .find_definition(field)?
            .iter()
            .find(|loc| {
                loc.container
                    .as_deref()
                    .is_some_and(|container| index.is_root_type(container))
            })
            .cloned(),
        _ => None,
    }
}

/// Correlate a raw diagnostics stream against the index, producing the
/// per-file annotation sets to publish. Summaries whose path does not
/// resolve to a schema location are dropped.
pub fn correlate(
    index: &SchemaIndex,
    records: &[TraceRecord],
) -> HashMap<PathBuf, Vec<FieldDiagnostic>> {
    let summaries = summarize(records);
    let mut by_file: HashMap<PathBuf, Vec<FieldDiagnostic>> = HashMap::new();

    for summary in &summaries {
        let Some(location) = locate_field(index, &summary.key) else {
            debug!(path = %summary.key, "no schema location for trace path");
            continue;
        };
        by_file
            .entry(location.file.clone())
            .or_default()
            .push(FieldDiagnostic {
                path: summary.key.clone(),
                line: location.line,
                character: location.character,
                severity: Severity::for_status(summary.status),
                message: render_message(summary),
            });
    }
    by_file
}

fn render_message(summary: &PathSummary) -> String {
    let mut parts = Vec::new();
    if let Some(ms) = summary.duration_ms {
        parts.push(format!("max {ms:.1} ms"));
    }
    if let Some(status) = summary.status {
        parts.push(format!("HTTP {status}"));
    }
    if parts.is_empty() {
        format!("{}: observed in trace", summary.key)
    } else {
        format!("{}: {}", summary.key, parts.join(", "))
    }
}

/// Published annotation sets, one per file.
///
/// Publication always replaces the whole set for a file, so stale
/// annotations from a previous trace never survive a new one.
#[derive(Debug, Default)]
pub struct PresentationBuffer {
    published: HashMap<PathBuf, Vec<FieldDiagnostic>>,
}

impl PresentationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the annotation set for a single file.
    pub fn replace(&mut self, file: PathBuf, set: Vec<FieldDiagnostic>) {
        self.published.insert(file, set);
    }

    /// Publish a correlation result: every file in `sets` gets its set
    /// replaced wholesale.
    pub fn publish(&mut self, sets: HashMap<PathBuf, Vec<FieldDiagnostic>>) {
        for (file, set) in sets {
            self.replace(file, set);
        }
    }

    /// Drop every published annotation.
    pub fn clear(&mut self) {
        self.published.clear();
    }

    pub fn diagnostics_for(&self, file: &Path) -> &[FieldDiagnostic] {
        self.published.get(file).map_or(&[], |set| set.as_slice())
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.published.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::trace::PathSegment;
    use async_graphql_parser::parse_schema;
    use std::path::Path;

    fn indexed(sdl: &str, file: &str) -> SchemaIndex {
        let mut index = SchemaIndex::default();
        let doc = parse_schema(sdl).unwrap();
        index.index_document(&doc, Path::new(file));
        index
    }

    fn summary(key: &str, status: Option<i64>, duration_ms: Option<f64>) -> PathSummary {
        PathSummary {
            key: key.to_string(),
            status,
            duration_ms,
        }
    }

    #[test]
    fn test_severity_policy() {
        assert_eq!(Severity::for_status(None), Severity::Information);
        assert_eq!(Severity::for_status(Some(200)), Severity::Information);
        assert_eq!(Severity::for_status(Some(399)), Severity::Information);
        assert_eq!(Severity::for_status(Some(404)), Severity::Warning);
        assert_eq!(Severity::for_status(Some(500)), Severity::Error);
        assert_eq!(Severity::for_status(Some(503)), Severity::Error);
    }

    #[test]
    fn test_locate_field_by_container_and_root() {
        let index = indexed(
            "type Query { user: User }\ntype User { name: String reviews: [Review] }",
            "schema.graphql",
        );
        // Two segments: container must match the type name.
        let loc = locate_field(&index, "User.reviews").unwrap();
        assert_eq!(loc.container.as_deref(), Some("User"));
        assert_eq!(loc.line, 2);

        // One segment: only root-type fields qualify.
        let loc = locate_field(&index, "user").unwrap();
        assert_eq!(loc.container.as_deref(), Some("Query"));
        assert!(locate_field(&index, "name").is_none());

        // The sentinel and unknown names never resolve.
        assert!(locate_field(&index, OPERATION_KEY).is_none());
        assert!(locate_field(&index, "User.missing").is_none());
        assert!(locate_field(&index, "a.b.c").is_none());
    }

    #[test]
    fn test_correlate_end_to_end() {
        let index = indexed(
            "type Query { topProducts: [Product] }\ntype Product { reviews: [Review] }",
            "products.graphql",
        );
        let records = vec![
            TraceRecord {
                document_hash: Some("abc".to_string()),
                path: Some(vec![PathSegment::Key("topProducts".to_string())]),
                status: Some(200),
                ..TraceRecord::default()
            },
            TraceRecord {
                path: Some(vec![
                    PathSegment::Key("Product".to_string()),
                    PathSegment::Key("reviews".to_string()),
                ]),
                status: Some(502),
                ..TraceRecord::default()
            },
        ];
        let sets = correlate(&index, &records);
        let diags = &sets[Path::new("products.graphql")];
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].path, "topProducts");
        assert_eq!(diags[0].severity, Severity::Information);
        assert_eq!(diags[1].path, "Product.reviews");
        assert_eq!(diags[1].severity, Severity::Error);
        assert!(diags[1].message.contains("HTTP 502"));
    }

    #[test]
    fn test_unresolvable_paths_are_dropped() {
        let index = indexed("type Query { ping: String }", "schema.graphql");
        let records = vec![TraceRecord {
            path: Some(vec![PathSegment::Key("nope".to_string())]),
            status: Some(500),
            ..TraceRecord::default()
        }];
        assert!(correlate(&index, &records).is_empty());
    }

    #[test]
    fn test_publish_replaces_whole_set_per_file() {
        let mut buffer = PresentationBuffer::new();
        let file = PathBuf::from("schema.graphql");
        let diag = |path: &str| FieldDiagnostic {
            path: path.to_string(),
            line: 1,
            character: 1,
            severity: Severity::Information,
            message: String::new(),
        };

        buffer.replace(file.clone(), vec![diag("a"), diag("b")]);
        assert_eq!(buffer.diagnostics_for(&file).len(), 2);

        let mut next = HashMap::new();
        next.insert(file.clone(), vec![diag("c")]);
        buffer.publish(next);
        let current = buffer.diagnostics_for(&file);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].path, "c");

        buffer.clear();
        assert!(buffer.diagnostics_for(&file).is_empty());
    }

    #[test]
    fn test_message_rendering() {
        assert_eq!(
            render_message(&summary("user", Some(502), Some(12.0))),
            "user: max 12.0 ms, HTTP 502"
        );
        assert_eq!(
            render_message(&summary("user", None, None)),
            "user: observed in trace"
        );
    }
}
