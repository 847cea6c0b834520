use async_graphql_parser::types::{ServiceDocument, TypeKind, TypeSystemDefinition};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::relations::RelationGraph;
use super::typeexpr::{full_type, is_builtin_scalar, is_list_type, unwrap_type};
use super::types::{
    ArgumentInfo, FieldInfo, OperationEntry, PersistedDocument, RootOperation, SymbolLocation,
};

/// The schema index — every lookup table built from a scan, owned together.
///
/// All maps are reset by `clear()` at the start of a scan and rebuilt from
/// scratch; nothing mutates them except the indexing calls below. Single
/// writer per scan: callers needing concurrency wrap the whole index behind
/// a lock.
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    /// Names of the root operation types (normally Query/Mutation/Subscription).
    root_types: Vec<String>,
    /// Index: symbol name -> ordered, position-deduplicated locations.
    definitions: HashMap<String, Vec<SymbolLocation>>,
    /// Index: root field name -> operation info. Keyed by field name alone;
    /// a repeat across root types overwrites (documented ambiguity).
    root_operations: HashMap<String, RootOperation>,
    /// Index: type name -> fields in discovery order, duplicates preserved.
    fields: HashMap<String, Vec<FieldInfo>>,
    /// Index: type name -> directive names, primary object definitions only.
    type_directives: HashMap<String, Vec<String>>,
    /// Field-level edges between non-scalar types.
    relations: RelationGraph,
    /// Operation map: file URI -> executable definitions found there.
    operations: HashMap<String, Vec<OperationEntry>>,
    /// Persisted-document registry: `sha256:<hex>` id -> document.
    persisted: HashMap<String, PersistedDocument>,
}

/// Counts over the index, for reports and the CLI.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub definitions: usize,
    pub root_operations: usize,
    pub field_entries: usize,
    pub relation_edges: usize,
    pub operation_files: usize,
    pub persisted_documents: usize,
}

impl SchemaIndex {
    pub fn new(root_types: Vec<String>) -> Self {
        Self {
            root_types,
            definitions: HashMap::new(),
            root_operations: HashMap::new(),
            fields: HashMap::new(),
            type_directives: HashMap::new(),
            relations: RelationGraph::new(),
            operations: HashMap::new(),
            persisted: HashMap::new(),
        }
    }

    /// Reset every index. Called synchronously at the start of each scan.
    pub fn clear(&mut self) {
        self.definitions.clear();
        self.root_operations.clear();
        self.fields.clear();
        self.type_directives.clear();
        self.relations.clear();
        self.operations.clear();
        self.persisted.clear();
    }

    /// Index every top-level definition of one parsed schema document.
    pub fn index_document(&mut self, doc: &ServiceDocument, file: &Path) {
        for definition in &doc.definitions {
            let TypeSystemDefinition::Type(positioned) = definition else {
                continue;
            };
            let def = &positioned.node;
            let type_name = def.name.node.as_str();

            // Type-level symbol location at the definition's start token.
            // Extensions are a distinct definition kind and do not qualify.
            if !def.extend {
                self.record_definition(
                    type_name,
                    SymbolLocation {
                        file: file.to_path_buf(),
                        line: positioned.pos.line,
                        character: positioned.pos.column,
                        container: None,
                    },
                );
            }

            let TypeKind::Object(object) = &def.kind else {
                continue;
            };

            if !def.extend {
                let directives: Vec<String> = def
                    .directives
                    .iter()
                    .map(|d| d.node.name.node.to_string())
                    .collect();
                self.type_directives.insert(type_name.to_string(), directives);
            }

            let is_root = self.is_root_type(type_name);

            for field in &object.fields {
                let fd = &field.node;
                let field_name = fd.name.node.as_str();
                let return_ty = &fd.ty.node;
                let location = SymbolLocation {
                    file: file.to_path_buf(),
                    line: field.pos.line,
                    character: field.pos.column,
                    container: Some(type_name.to_string()),
                };
                let args: Vec<ArgumentInfo> = fd
                    .arguments
                    .iter()
                    .map(|arg| ArgumentInfo {
                        name: arg.node.name.node.to_string(),
                        ty: full_type(&arg.node.ty.node),
                    })
                    .collect();

                if is_root {
                    self.record_definition(field_name, location.clone());
                    // Last-processed definition wins on a repeated name.
                    self.root_operations.insert(
                        field_name.to_string(),
                        RootOperation {
                            return_type: unwrap_type(return_ty).to_string(),
                            is_list: is_list_type(return_ty),
                            args: args.clone(),
                            location: location.clone(),
                        },
                    );
                }

                self.fields
                    .entry(type_name.to_string())
                    .or_default()
                    .push(FieldInfo {
                        name: field_name.to_string(),
                        ty: full_type(return_ty),
                        is_list: is_list_type(return_ty),
                        args,
                        directives: fd
                            .directives
                            .iter()
                            .map(|d| d.node.name.node.to_string())
                            .collect(),
                        location,
                    });

                let bare = unwrap_type(return_ty);
                if !bare.is_empty() && !is_builtin_scalar(bare) {
                    self.relations
                        .add_relation(type_name, bare, field_name, is_list_type(return_ty));
                }
            }
        }
        debug!(file = %file.display(), "indexed schema document");
    }

    fn record_definition(&mut self, name: &str, location: SymbolLocation) {
        let bucket = self.definitions.entry(name.to_string()).or_default();
        let duplicate = bucket.iter().any(|existing| {
            existing.file == location.file
                && existing.line == location.line
                && existing.character == location.character
        });
        if !duplicate {
            bucket.push(location);
        }
    }

    /// Exact-match definition lookup. Empty or blank names never resolve;
    /// there is no fuzzy matching.
    pub fn find_definition(&self, name: &str) -> Option<&[SymbolLocation]> {
        if name.trim().is_empty() {
            return None;
        }
        self.definitions
            .get(name)
            .map(|locations| locations.as_slice())
            .filter(|locations| !locations.is_empty())
    }

    pub fn is_root_type(&self, name: &str) -> bool {
        self.root_types.iter().any(|root| root == name)
    }

    pub fn root_types(&self) -> &[String] {
        &self.root_types
    }

    pub fn root_operations(&self) -> &HashMap<String, RootOperation> {
        &self.root_operations
    }

    /// Fields recorded for a type, in discovery order.
    pub fn fields_of(&self, type_name: &str) -> &[FieldInfo] {
        self.fields
            .get(type_name)
            .map(|fields| fields.as_slice())
            .unwrap_or(&[])
    }

    /// Directive names on a type's primary definition.
    pub fn directives_of(&self, type_name: &str) -> &[String] {
        self.type_directives
            .get(type_name)
            .map(|directives| directives.as_slice())
            .unwrap_or(&[])
    }

    pub fn relations(&self) -> &RelationGraph {
        &self.relations
    }

    /// Replace the operation entries registered for a file URI.
    pub fn register_operations(&mut self, file_uri: String, entries: Vec<OperationEntry>) {
        self.operations.insert(file_uri, entries);
    }

    pub fn register_persisted(&mut self, document: PersistedDocument) {
        self.persisted.insert(document.id.clone(), document);
    }

    pub fn operations(&self) -> &HashMap<String, Vec<OperationEntry>> {
        &self.operations
    }

    pub fn persisted_documents(&self) -> &HashMap<String, PersistedDocument> {
        &self.persisted
    }

    /// Look up a persisted document by its `sha256:<hex>` id.
    pub fn find_persisted(&self, id: &str) -> Option<&PersistedDocument> {
        self.persisted.get(id)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            definitions: self.definitions.len(),
            root_operations: self.root_operations.len(),
            field_entries: self.fields.values().map(Vec::len).sum(),
            relation_edges: self.relations.edge_count(),
            operation_files: self.operations.len(),
            persisted_documents: self.persisted.len(),
        }
    }
}

impl Default for SchemaIndex {
    fn default() -> Self {
        Self::new(vec![
            "Query".to_string(),
            "Mutation".to_string(),
            "Subscription".to_string(),
        ])
    }
}
