//! # SchemaLens
//!
//! Structural index and runtime-trace correlator for GraphQL schema projects.
//!
//! SchemaLens walks a schema project from its entry file, following the
//! textual `@sdl(files: [...])` include directives, and builds an in-memory
//! index over everything it finds:
//!
//! - **Symbol locations**: every named definition with its source positions
//! - **Root operations**: fields on Query/Mutation/Subscription
//! - **Field and directive indexes** per type
//! - **Type relationships**: which types reference which, through what field
//! - **Executables**: operations declared via `@sdl(executables: [...])`,
//!   with persisted documents registered by content hash
//!
//! A separate pass correlates OpenTelemetry-shaped runtime traces back to
//! the schema, attaching per-field latency and status annotations to the
//! files that define the observed fields.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schemalens::SchemaProject;
//!
//! let mut project = SchemaProject::open("./my-graph");
//! let report = project.scan();
//! println!("indexed {} of {} files", report.indexed, report.files.len());
//!
//! if let Some(locations) = project.index().find_definition("User") {
//!     println!("User defined at {:?}", locations[0]);
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executables;
pub mod index;
pub mod scan;
pub mod store;
pub mod traverse;

// Re-exports for convenience
pub use config::LensConfig;
pub use diagnostics::{FieldDiagnostic, PresentationBuffer, Severity, TraceRecord};
pub use error::{LensError, Result};
pub use index::SchemaIndex;
pub use scan::{run_scan, ScanReport, ScanSkip, SkipKind};
pub use store::{DiskStore, FileStore};

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Name of the optional project configuration file.
pub const CONFIG_FILE: &str = "schemalens.toml";

/// A schema project rooted in a directory.
///
/// Owns the configuration, the index, and the published diagnostics for one
/// project. Scanning rebuilds the index in place; everything else reads it.
pub struct SchemaProject {
    root: PathBuf,
    config: LensConfig,
    store: DiskStore,
    index: SchemaIndex,
    diagnostics: PresentationBuffer,
}

impl SchemaProject {
    /// Open a project rooted at `root`, reading `schemalens.toml` from it if
    /// present. The index starts empty; call [`scan`](Self::scan) to fill it.
    pub fn open<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        // Traversal dedups on absolute paths; a relative root would let the
        // same file appear under two spellings.
        let root = root.canonicalize().unwrap_or(root);
        let config = LensConfig::load(&root.join(CONFIG_FILE));
        let index = SchemaIndex::new(config.schema.root_types.clone());
        SchemaProject {
            root,
            config,
            store: DiskStore,
            index,
            diagnostics: PresentationBuffer::new(),
        }
    }

    /// Rebuild the index from the configured entry file.
    pub fn scan(&mut self) -> ScanReport {
        self.scan_with_cancel(&AtomicBool::new(false))
    }

    /// Rebuild the index, checking `cancel` between files. A cancelled scan
    /// leaves a valid partial index and reports itself as cancelled.
    pub fn scan_with_cancel(&mut self, cancel: &AtomicBool) -> ScanReport {
        let entry = self.config.resolve_entry(&self.root);
        run_scan(&self.store, &mut self.index, &entry, &self.root, cancel)
    }

    /// Correlate a runtime diagnostics stream against the current index and
    /// publish the resulting per-file annotations, replacing any prior set
    /// for the affected files.
    pub fn apply_trace(&mut self, records: &[TraceRecord]) {
        let sets = diagnostics::correlate(&self.index, records);
        self.diagnostics.publish(sets);
    }

    /// Published annotations for one schema file.
    pub fn diagnostics_for(&self, file: &Path) -> &[FieldDiagnostic] {
        self.diagnostics.diagnostics_for(file)
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn config(&self) -> &LensConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::PathSegment;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_open_scan_and_lookup() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("index.graphql"),
            "type Query @sdl(files: [\"user.graphql\"]) { user: User }",
        )
        .unwrap();
        fs::write(
            dir.path().join("user.graphql"),
            "type User { name: String }",
        )
        .unwrap();

        let mut project = SchemaProject::open(dir.path());
        let report = project.scan();
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.indexed, 2);
        assert!(!report.cancelled);

        let locations = project.index().find_definition("User").unwrap();
        assert_eq!(locations[0].file, dir.path().join("user.graphql"));
        assert!(project.index().root_operations().contains_key("user"));
    }

    #[test]
    fn test_open_absolutizes_relative_root() {
        let project = SchemaProject::open(".");
        assert!(project.root().is_absolute());

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.graphql"), "type Query { ok: Boolean }").unwrap();
        let project = SchemaProject::open(dir.path());
        assert!(project.root().is_absolute());
        assert!(project
            .config()
            .resolve_entry(project.root())
            .is_absolute());
    }

    #[test]
    fn test_config_overrides_entry() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[project]\nentry = \"main.graphql\"\n",
        )
        .unwrap();
        fs::write(dir.path().join("main.graphql"), "type Query { ok: Boolean }").unwrap();

        let mut project = SchemaProject::open(dir.path());
        let report = project.scan();
        assert_eq!(report.indexed, 1);
        assert!(project.index().find_definition("Query").is_some());
    }

    #[test]
    fn test_trace_annotations_land_on_defining_file() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("index.graphql");
        fs::write(&entry, "type Query { user: User }\ntype User { name: String }").unwrap();

        let mut project = SchemaProject::open(dir.path());
        project.scan();

        let records = vec![TraceRecord {
            path: Some(vec![PathSegment::Key("user".to_string())]),
            status: Some(502),
            ..TraceRecord::default()
        }];
        project.apply_trace(&records);

        let diags = project.diagnostics_for(&entry);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);

        // A later trace touching the same file replaces its set wholesale.
        let records = vec![TraceRecord {
            path: Some(vec![PathSegment::Key("user".to_string())]),
            status: Some(200),
            ..TraceRecord::default()
        }];
        project.apply_trace(&records);
        let diags = project.diagnostics_for(&entry);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Information);
    }
}
