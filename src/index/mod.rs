//! Schema index module — the structural backbone of SchemaLens.
//!
//! Provides the index data model, the `SchemaIndex` aggregate built from
//! parsed schema documents, the type-relationship graph, and the type
//! expression helpers shared by indexing and lookups.

pub mod relations;
pub mod schema;
pub mod typeexpr;
pub mod types;

pub use relations::RelationGraph;
pub use schema::SchemaIndex;
pub use typeexpr::{full_type, is_builtin_scalar, is_list_type, unwrap_type};
pub use types::{
    ArgumentInfo, FieldInfo, OperationEntry, OperationKind, PersistedDocument, RootOperation,
    SymbolLocation, TypeRelationship,
};
