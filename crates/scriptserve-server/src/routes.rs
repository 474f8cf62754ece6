//! Script route cache
//!
//! Maps URL paths to handler scripts on disk. A route is the script's path
//! under the scripts directory with the `.js` extension removed, so
//! `scripts/api/time.js` serves `/api/time`.
//!
//! Loaded sources are cached per route together with a hash and the file's
//! modification time. Lookups take a read lock; the write lock is held
//! only while a changed or newly seen file is loaded. A script that fails
//! to parse stays in the cache with its error recorded, so requests for it
//! report the compile failure instead of a missing route.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use boa_engine::{Context, Script, Source};

use scriptserve_common::error::{EngineError, Result};

/// One loaded handler script.
#[derive(Debug)]
pub struct ScriptResource {
    /// URL path this script serves.
    pub route: String,
    /// Location on disk.
    pub filename: PathBuf,
    /// Source text, shared with in-flight executions.
    pub source: Arc<String>,
    /// Hash of the source text at load time.
    pub hash: u64,
    /// Modification time at load time, used for invalidation.
    pub modified: SystemTime,
    /// Parse error recorded at load time, when the source is broken.
    pub compile_error: Option<String>,
}

impl ScriptResource {
    fn load(route: &str, filename: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(filename)?;
        let modified = std::fs::metadata(filename)?.modified()?;

        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let hash = hasher.finish();

        let compile_error = check_parse(&source);
        if let Some(error) = &compile_error {
            tracing::warn!(route, file = %filename.display(), error, "script does not parse");
        }

        Ok(Self {
            route: route.to_string(),
            filename: filename.to_path_buf(),
            source: Arc::new(source),
            hash,
            modified,
            compile_error,
        })
    }

    fn is_stale(&self) -> bool {
        match std::fs::metadata(&self.filename).and_then(|m| m.modified()) {
            Ok(modified) => modified != self.modified,
            Err(_) => true,
        }
    }
}

/// Parses the source in a throwaway context, returning the error text on
/// failure. The compiled form cannot be shared across request contexts,
/// so only the outcome is kept.
fn check_parse(source: &str) -> Option<String> {
    let mut ctx = Context::default();
    match Script::parse(Source::from_bytes(source), None, &mut ctx) {
        Ok(_) => None,
        Err(e) => Some(e.to_string()),
    }
}

/// Route-keyed cache of handler scripts.
pub struct ScriptCache {
    root: PathBuf,
    entries: RwLock<HashMap<String, Arc<ScriptResource>>>,
}

impl ScriptCache {
    /// Scans the scripts directory and loads every `.js` file found.
    ///
    /// Broken scripts are kept with their parse error recorded; only an
    /// unreadable directory aborts startup.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(EngineError::InvalidConfig(format!(
                "scripts directory {} does not exist",
                root.display()
            )));
        }

        let mut entries = HashMap::new();
        let mut files = Vec::new();
        collect_scripts(&root, &mut files)?;

        for filename in files {
            let route = route_for(&root, &filename);
            tracing::info!(route, file = %filename.display(), "adding script route");
            let resource = ScriptResource::load(&route, &filename)?;
            entries.insert(route, Arc::new(resource));
        }

        Ok(Self {
            root,
            entries: RwLock::new(entries),
        })
    }

    /// Looks up the script for a URL path, reloading it when the file
    /// changed and loading it fresh when the route is new. Returns `None`
    /// when no script file backs the path.
    pub fn resolve(&self, path: &str) -> Result<Option<Arc<ScriptResource>>> {
        let cached = {
            let entries = self
                .entries
                .read()
                .map_err(|_| EngineError::ScriptFault("script cache poisoned".into()))?;
            entries.get(path).cloned()
        };

        if let Some(resource) = &cached {
            if !resource.is_stale() {
                return Ok(Some(resource.clone()));
            }
        }

        let Some(filename) = self.backing_file(path) else {
            if cached.is_some() {
                // file was deleted; drop the route
                let mut entries = self
                    .entries
                    .write()
                    .map_err(|_| EngineError::ScriptFault("script cache poisoned".into()))?;
                entries.remove(path);
            }
            return Ok(None);
        };

        let resource = Arc::new(ScriptResource::load(path, &filename)?);
        let mut entries = self
            .entries
            .write()
            .map_err(|_| EngineError::ScriptFault("script cache poisoned".into()))?;
        entries.insert(path.to_string(), resource.clone());
        Ok(Some(resource))
    }

    /// Routes currently loaded, mostly for startup logging.
    pub fn routes(&self) -> Vec<String> {
        match self.entries.read() {
            Ok(entries) => {
                let mut routes: Vec<String> = entries.keys().cloned().collect();
                routes.sort();
                routes
            }
            Err(_) => Vec::new(),
        }
    }

    /// Maps a URL path back to its script file, refusing path traversal.
    fn backing_file(&self, path: &str) -> Option<PathBuf> {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.split('/').any(|seg| seg.is_empty() || seg.starts_with('.')) {
            return None;
        }
        let candidate = self.root.join(format!("{trimmed}.js"));
        candidate.is_file().then_some(candidate)
    }
}

fn collect_scripts(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_scripts(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "js") {
            files.push(path);
        }
    }
    Ok(())
}

fn route_for(root: &Path, filename: &Path) -> String {
    let relative = filename.strip_prefix(root).unwrap_or(filename);
    let mut route = String::from("/");
    route.push_str(&relative.to_string_lossy());
    if let Some(stripped) = route.strip_suffix(".js") {
        stripped.to_string()
    } else {
        route
    }
}
