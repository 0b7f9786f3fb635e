//! Spec loader for building schemas from disk at startup
//!
//! - Specs stored as `<dir>/<name>.json`, one declarative spec per file
//! - Every spec is built eagerly; a bad spec fails the whole load
//! - Built schemas are shared behind `Arc` and never replaced

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::caster::FormatOverrides;
use super::errors::{SpecError, SpecResult};
use super::parser::Schema;
use super::types::SchemaSpec;

/// Registry of named, built schemas.
pub struct SpecLoader {
    /// Directory containing spec files
    spec_dir: PathBuf,
    /// Source specs by name
    specs: HashMap<String, SchemaSpec>,
    /// Built schemas by name
    schemas: HashMap<String, Arc<Schema>>,
}

impl SpecLoader {
    /// Creates a loader reading spec files from `spec_dir`.
    pub fn new(spec_dir: &Path) -> Self {
        Self {
            spec_dir: spec_dir.to_path_buf(),
            specs: HashMap::new(),
            schemas: HashMap::new(),
        }
    }

    pub fn spec_dir(&self) -> &Path {
        &self.spec_dir
    }

    /// Loads and builds every `*.json` spec in the spec directory.
    ///
    /// A missing directory leaves the registry empty.
    pub fn load_all(&mut self) -> SpecResult<()> {
        if !self.spec_dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.spec_dir).map_err(|e| {
            SpecError::malformed(
                self.spec_dir.display().to_string(),
                format!("Failed to read spec directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SpecError::malformed(
                    self.spec_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }

        // deterministic registration order
        paths.sort();
        for path in paths {
            self.load_spec_file(&path)?;
        }

        Ok(())
    }

    /// Loads, builds and registers a single spec file under its file stem.
    pub fn load_spec_file(&mut self, path: &Path) -> SpecResult<Arc<Schema>> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SpecError::malformed(path.display().to_string(), "Invalid file name"))?
            .to_string();

        let spec = read_spec(path)?;
        self.register(name, spec)
    }

    /// Builds and registers a spec.
    ///
    /// # Errors
    ///
    /// `AlreadyRegistered` if `name` is taken, or any construction error.
    pub fn register(&mut self, name: impl Into<String>, spec: SchemaSpec) -> SpecResult<Arc<Schema>> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            warn!(schema = %name, "rejected re-registration");
            return Err(SpecError::AlreadyRegistered(name));
        }

        let schema = Arc::new(Schema::build(&spec, &FormatOverrides::default())?);
        info!(schema = %name, attributes = schema.len(), "registered schema");

        self.specs.insert(name.clone(), spec);
        self.schemas.insert(name, Arc::clone(&schema));
        Ok(schema)
    }

    /// Gets a built schema by name.
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// Gets the declarative source of a registered schema.
    pub fn spec(&self, name: &str) -> Option<&SchemaSpec> {
        self.specs.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Writes a spec to `<spec_dir>/<name>.json`.
    ///
    /// Existing files are never overwritten.
    pub fn save_spec(&self, name: &str, spec: &SchemaSpec) -> SpecResult<PathBuf> {
        let path = self.spec_dir.join(format!("{}.json", name));
        if path.exists() {
            return Err(SpecError::AlreadyRegistered(name.to_string()));
        }

        fs::create_dir_all(&self.spec_dir).map_err(|e| {
            SpecError::malformed(
                self.spec_dir.display().to_string(),
                format!("Failed to create spec directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(spec).map_err(|e| {
            SpecError::malformed(
                path.display().to_string(),
                format!("Failed to serialize spec: {}", e),
            )
        })?;

        fs::write(&path, content).map_err(|e| {
            SpecError::malformed(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })?;

        Ok(path)
    }
}

/// Reads and decodes one spec file.
pub fn read_spec(path: &Path) -> SpecResult<SchemaSpec> {
    let content = fs::read_to_string(path).map_err(|e| {
        SpecError::malformed(
            path.display().to_string(),
            format!("Failed to read file: {}", e),
        )
    })?;

    serde_json::from_str(&content).map_err(|e| {
        SpecError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
    })
}
