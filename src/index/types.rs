use serde::Serialize;
use std::path::PathBuf;

/// Source location of a named schema symbol.
///
/// `container == None` means the symbol is a type definition; a field of a
/// type carries the owning type's name as its container. Line and character
/// are 1-based, as the parser reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    pub file: PathBuf,
    pub line: usize,
    pub character: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl SymbolLocation {
    /// Dedup key: container is deliberately excluded.
    pub fn position_key(&self) -> (PathBuf, usize, usize) {
        (self.file.clone(), self.line, self.character)
    }
}

/// One argument of a field, with its full wrapped type signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentInfo {
    pub name: String,
    pub ty: String,
}

/// A field on a root operation type (Query/Mutation/Subscription).
///
/// Keyed by field name alone in the root-operation map: if two root types
/// declare the same field name, the last-processed definition wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootOperation {
    /// Bare return type name, wrappers stripped.
    pub return_type: String,
    pub is_list: bool,
    pub args: Vec<ArgumentInfo>,
    pub location: SymbolLocation,
}

/// A field recorded in the per-type field index.
///
/// Entries append in discovery order; extensions append more entries for the
/// same type, and duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Full wrapped signature, e.g. `[User!]!`.
    pub ty: String,
    pub is_list: bool,
    pub args: Vec<ArgumentInfo>,
    pub directives: Vec<String>,
    pub location: SymbolLocation,
}

/// One edge in the type-relationship graph: a field on `from_type` returning
/// (possibly wrapped) `to_type`. The same type pair may recur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRelationship {
    pub from_type: String,
    pub to_type: String,
    pub field_name: String,
    pub is_list: bool,
}

/// Kind of an executable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Fragment,
}

/// An operation or fragment found in an executable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationEntry {
    /// Operation name, or `<anonymous>` for unnamed operations.
    pub name: String,
    pub kind: OperationKind,
    pub file_uri: String,
    /// Byte range of the definition within its file.
    pub start: usize,
    pub end: usize,
    pub persisted: bool,
}

/// A document registered for invocation by content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedDocument {
    /// `sha256:` followed by 64 lowercase hex characters, computed over the
    /// raw file bytes. Clients compute the same hash independently.
    pub id: String,
    pub file_uri: String,
    pub operations: Vec<OperationEntry>,
}
