use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level SchemaLens configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LensConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Project-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Entry schema file, relative to the project root.
    #[serde(default = "default_entry")]
    pub entry: String,
}

/// Schema indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Names of the root operation types.
    #[serde(default = "default_root_types")]
    pub root_types: Vec<String>,
}

fn default_entry() -> String {
    "index.graphql".to_string()
}

fn default_root_types() -> Vec<String> {
    vec![
        "Query".to_string(),
        "Mutation".to_string(),
        "Subscription".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            root_types: default_root_types(),
        }
    }
}

impl LensConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the entry file relative to the project root.
    pub fn resolve_entry(&self, project_root: &Path) -> PathBuf {
        let entry = Path::new(&self.project.entry);
        if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            project_root.join(entry)
        }
    }

    /// True if `name` is one of the configured root operation type names.
    pub fn is_root_type(&self, name: &str) -> bool {
        self.schema.root_types.iter().any(|r| r == name)
    }
}
