//! Executable document scanning.
//!
//! After all schema files are indexed, the merged SDL is parsed once more
//! and every `@sdl(executables: [{document: "...", persist: true}])` entry is
//! resolved: the referenced file is parsed as a standalone executable
//! document, its operations and fragments are registered under the file's
//! URI, and documents marked `persist` are additionally registered by a
//! `sha256:<hex>` hash over the file's exact bytes. Each entry is processed
//! independently; a bad one is logged, recorded as a skip, and never stops
//! the rest.

use async_graphql_parser::types::{
    ConstDirective, ExecutableDocument, OperationType, ServiceDocument, TypeSystemDefinition,
};
use async_graphql_parser::{parse_query, parse_schema, Pos};
use async_graphql_value::ConstValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{LensError, Result};
use crate::index::{OperationEntry, OperationKind, PersistedDocument, SchemaIndex};
use crate::scan::{ScanSkip, SkipKind};
use crate::store::FileStore;

/// Outcome counts of one executable scan.
#[derive(Debug, Default)]
pub struct ExecutableSummary {
    pub operations: usize,
    pub persisted_documents: usize,
}

/// Scan the merged SDL for `@sdl(executables: ...)` references and register
/// everything they point at. Never fails; per-entry problems land in `skips`.
pub fn scan_executables(
    merged_sdl: &str,
    project_root: &Path,
    store: &dyn FileStore,
    index: &mut SchemaIndex,
    skips: &mut Vec<ScanSkip>,
) -> ExecutableSummary {
    let mut summary = ExecutableSummary::default();

    let doc = match parse_schema(merged_sdl) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "merged schema failed to parse; skipping executable scan");
            skips.push(ScanSkip {
                unit: "<merged schema>".to_string(),
                kind: SkipKind::ParseError,
                message: err.to_string(),
            });
            return summary;
        }
    };

    for directive in sdl_directives(&doc) {
        let Some(value) = directive.get_argument("executables") else {
            continue;
        };
        let ConstValue::List(entries) = &value.node else {
            warn!("@sdl executables argument is not a list");
            skips.push(ScanSkip {
                unit: "@sdl(executables:)".to_string(),
                kind: SkipKind::BadExecutableEntry,
                message: "executables argument is not a list".to_string(),
            });
            continue;
        };
        for entry in entries {
            match process_entry(entry, project_root, store, index) {
                Ok(outcome) => {
                    summary.operations += outcome.operations;
                    summary.persisted_documents += usize::from(outcome.persisted);
                }
                Err(err) => {
                    warn!(error = %err, "skipping executable entry");
                    skips.push(skip_for(&err, entry));
                }
            }
        }
    }

    summary
}

/// Every `@sdl` directive attached to a schema or type definition.
fn sdl_directives(doc: &ServiceDocument) -> Vec<&ConstDirective> {
    let mut out = Vec::new();
    for definition in &doc.definitions {
        let directives = match definition {
            TypeSystemDefinition::Schema(schema) => &schema.node.directives,
            TypeSystemDefinition::Type(ty) => &ty.node.directives,
            TypeSystemDefinition::Directive(_) => continue,
        };
        out.extend(
            directives
                .iter()
                .map(|d| &d.node)
                .filter(|d| d.name.node.as_str() == "sdl"),
        );
    }
    out
}

struct EntryOutcome {
    operations: usize,
    persisted: bool,
}

fn process_entry(
    entry: &ConstValue,
    project_root: &Path,
    store: &dyn FileStore,
    index: &mut SchemaIndex,
) -> Result<EntryOutcome> {
    let ConstValue::Object(fields) = entry else {
        return Err(LensError::BadExecutableEntry(
            "entry is not an object".to_string(),
        ));
    };
    let document = fields
        .iter()
        .find(|(key, _)| key.as_str() == "document")
        .map(|(_, value)| value);
    let Some(ConstValue::String(document)) = document else {
        return Err(LensError::BadExecutableEntry(
            "entry is missing a string `document` field".to_string(),
        ));
    };
    let persist = fields
        .iter()
        .find(|(key, _)| key.as_str() == "persist")
        .map(|(_, value)| matches!(value, ConstValue::Boolean(true)))
        .unwrap_or(false);

    let path = resolve_document(project_root, document);
    if !store.exists(&path) {
        return Err(LensError::FileNotFound(path));
    }

    // Raw bytes first: the persisted-document id is a hash over the exact
    // bytes on disk, never a normalized form.
    let bytes = store.read_bytes(&path)?;
    let text = String::from_utf8(bytes.clone()).map_err(|err| LensError::ParseFailed {
        path: path.clone(),
        message: format!("not valid UTF-8: {err}"),
    })?;
    let doc = parse_query(&text).map_err(|err| LensError::ParseFailed {
        path: path.clone(),
        message: err.to_string(),
    })?;

    let file_uri = format!("file://{}", path.display());
    let mut entries = collect_entries(&doc, &text, &file_uri);
    let mut persisted = false;

    if persist && !entries.is_empty() {
        for entry in &mut entries {
            entry.persisted = true;
        }
        let id = format!("sha256:{}", hex::encode(Sha256::digest(&bytes)));
        debug!(id = %id, uri = %file_uri, "registered persisted document");
        index.register_persisted(PersistedDocument {
            id,
            file_uri: file_uri.clone(),
            operations: entries.clone(),
        });
        persisted = true;
    }

    let operations = entries.len();
    index.register_operations(file_uri, entries);

    Ok(EntryOutcome {
        operations,
        persisted,
    })
}

/// Absolute document paths pass through; relative ones join the project root.
fn resolve_document(project_root: &Path, document: &str) -> PathBuf {
    let path = Path::new(document);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Collect every operation and fragment definition into entries ordered by
/// source position, with byte ranges derived from the AST positions.
fn collect_entries(doc: &ExecutableDocument, text: &str, file_uri: &str) -> Vec<OperationEntry> {
    let line_starts = line_starts(text);

    let mut raw: Vec<(Pos, String, OperationKind)> = Vec::new();
    for (name, op) in doc.operations.iter() {
        let name = name
            .map(|n| n.to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        raw.push((op.pos, name, operation_kind(op.node.ty)));
    }
    for (name, fragment) in &doc.fragments {
        raw.push((fragment.pos, name.to_string(), OperationKind::Fragment));
    }
    raw.sort_by_key(|(pos, _, _)| (pos.line, pos.column));

    let starts: Vec<usize> = raw
        .iter()
        .map(|(pos, _, _)| byte_offset(text, &line_starts, *pos))
        .collect();

    raw.into_iter()
        .enumerate()
        .map(|(i, (_, name, kind))| {
            let start = starts[i];
            // A definition runs to the start of the next one (trailing
            // whitespace trimmed), or to the trimmed end of file.
            let end = match starts.get(i + 1) {
                Some(&next) => text[..next].trim_end().len(),
                None => text.trim_end().len(),
            };
            OperationEntry {
                name,
                kind,
                file_uri: file_uri.to_string(),
                start,
                end,
                persisted: false,
            }
        })
        .collect()
}

fn operation_kind(ty: OperationType) -> OperationKind {
    match ty {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => OperationKind::Subscription,
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Convert a 1-based (line, column) parser position to a byte offset.
fn byte_offset(text: &str, line_starts: &[usize], pos: Pos) -> usize {
    let line = pos.line.saturating_sub(1).min(line_starts.len() - 1);
    let start = line_starts[line];
    text[start..]
        .char_indices()
        .nth(pos.column.saturating_sub(1))
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len())
}

fn skip_for(err: &LensError, entry: &ConstValue) -> ScanSkip {
    let unit = match entry {
        ConstValue::Object(fields) => fields
            .iter()
            .find(|(key, _)| key.as_str() == "document")
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| "<executable entry>".to_string()),
        other => other.to_string(),
    };
    let kind = match err {
        LensError::FileNotFound(_) => SkipKind::NotFound,
        LensError::ReadFailed { .. } | LensError::Io(_) => SkipKind::ReadError,
        LensError::ParseFailed { .. } => SkipKind::ParseError,
        LensError::BadExecutableEntry(_) => SkipKind::BadExecutableEntry,
    };
    ScanSkip {
        unit,
        kind,
        message: err.to_string(),
    }
}
