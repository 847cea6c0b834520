//! Full-project scan: traversal, parallel parsing, serialized indexing.
//!
//! Every scan rebuilds the index from scratch. Parsing the discovered files
//! is fanned out with rayon; merging results into the `SchemaIndex` stays on
//! the calling thread, so the index only ever has a single writer.

use async_graphql_parser::parse_schema;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

use crate::executables::scan_executables;
use crate::index::SchemaIndex;
use crate::store::FileStore;
use crate::traverse;

/// Why a unit (file, document, executable entry) was left out of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    NotFound,
    ReadError,
    ParseError,
    BadExecutableEntry,
}

/// One skipped unit. The scan still completes; skipped units are simply
/// absent from subsequent lookups.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSkip {
    pub unit: String,
    pub kind: SkipKind,
    pub message: String,
}

/// Outcome of one scan: what was found, what was indexed, what was skipped.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub files: Vec<PathBuf>,
    pub indexed: usize,
    pub skips: Vec<ScanSkip>,
    pub operations: usize,
    pub persisted_documents: usize,
    pub duration_ms: u64,
    pub cancelled: bool,
}

/// Rebuild the index from the entry file. Clears every index first, then
/// discovers, parses, and indexes all reachable schema files, then scans
/// executables over the merged SDL. `cancel` is checked between per-file
/// iterations; a cancelled scan leaves a valid partial index and says so in
/// the report. Never returns an error: per-unit failures become skips.
pub fn run_scan(
    store: &dyn FileStore,
    index: &mut SchemaIndex,
    entry: &Path,
    project_root: &Path,
    cancel: &AtomicBool,
) -> ScanReport {
    let started = Instant::now();
    index.clear();

    let files = traverse::discover(store, entry);
    let mut report = ScanReport {
        files: files.clone(),
        indexed: 0,
        skips: Vec::new(),
        operations: 0,
        persisted_documents: 0,
        duration_ms: 0,
        cancelled: false,
    };

    // Read every file up front; the raw texts are needed again for the
    // merged-document executable scan.
    let mut sources: Vec<(PathBuf, Option<String>)> = Vec::with_capacity(files.len());
    for file in files {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        match store.read_text(&file) {
            Ok(text) => sources.push((file, Some(text))),
            Err(err) => {
                warn!(path = %file.display(), error = %err, "failed to read schema file");
                report.skips.push(ScanSkip {
                    unit: file.display().to_string(),
                    kind: SkipKind::ReadError,
                    message: err.to_string(),
                });
                sources.push((file, None));
            }
        }
    }

    // Parse in parallel; each file is independent until the merge.
    let parsed: Vec<Option<Result<_, String>>> = sources
        .par_iter()
        .map(|(_, text)| {
            text.as_deref()
                .map(|text| parse_schema(text).map_err(|err| err.to_string()))
        })
        .collect();

    // Merge serially: the index has exactly one writer.
    for ((path, _), result) in sources.iter().zip(parsed) {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            break;
        }
        match result {
            None => {}
            Some(Ok(doc)) => {
                index.index_document(&doc, path);
                report.indexed += 1;
            }
            Some(Err(message)) => {
                warn!(path = %path.display(), error = %message, "schema file failed to parse");
                report.skips.push(ScanSkip {
                    unit: path.display().to_string(),
                    kind: SkipKind::ParseError,
                    message,
                });
            }
        }
    }

    if !report.cancelled {
        let merged = sources
            .iter()
            .filter_map(|(_, text)| text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        let summary = scan_executables(&merged, project_root, store, index, &mut report.skips);
        report.operations = summary.operations;
        report.persisted_documents = summary.persisted_documents;
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        files = report.files.len(),
        indexed = report.indexed,
        skips = report.skips.len(),
        operations = report.operations,
        cancelled = report.cancelled,
        "scan complete"
    );
    report
}
