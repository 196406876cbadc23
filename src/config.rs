//! Two-layer configuration store.
//!
//! A **global** layer lives at `$HOME/.claudesync/config.json` and a **local**
//! layer at `<root>/.claudesync/config.local.json`, where `<root>` is the
//! nearest ancestor of the working directory containing a `.claudesync`
//! folder. Reads prefer the local layer. Every mutation rewrites the layer it
//! touched while holding the write lock, so concurrent writers serialize and
//! the last one wins.
//!
//! Values are free-form JSON so unknown keys round-trip untouched; the
//! well-known keys have typed accessors below.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::models::SessionCredential;

pub const CONFIG_DIR: &str = ".claudesync";
pub const GLOBAL_FILE: &str = "config.json";
pub const LOCAL_FILE: &str = "config.local.json";

pub const ACTIVE_PROVIDER: &str = "active_provider";
pub const ACTIVE_ORGANIZATION_ID: &str = "active_organization_id";
pub const ACTIVE_PROJECT_ID: &str = "active_project_id";
pub const ACTIVE_PROJECT_NAME: &str = "active_project_name";
pub const LOCAL_PATH: &str = "local_path";
pub const CLAUDE_API_URL: &str = "claude_api_url";
pub const SYNC_CHANGE_DETECTION: &str = "sync_change_detection";
pub const PUSH_EXCLUDE: &str = "push_exclude";

pub const DEFAULT_API_URL: &str = "https://claude.ai/api";
pub const DEFAULT_PROVIDER: &str = "claude.ai";

const SESSION_KEY_SUFFIX: &str = "_session_key";

/// Which layer a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Local,
}

#[derive(Debug, Default, Clone)]
struct Layers {
    global: Map<String, Value>,
    local: Map<String, Value>,
}

#[derive(Debug)]
pub struct ConfigStore {
    global_dir: PathBuf,
    /// Directory holding the discovered `.claudesync` folder, if any.
    local_root: Option<PathBuf>,
    cwd: PathBuf,
    layers: RwLock<Layers>,
}

impl ConfigStore {
    /// Open the store for this process: global layer under `$HOME`, local
    /// layer discovered from the current directory.
    pub fn open() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::config("cannot determine home directory (HOME unset)"))?;
        let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
        Self::load(home.join(CONFIG_DIR), cwd)
    }

    /// Load both layers from explicit locations.
    ///
    /// `global_dir` is the directory holding `config.json`; `cwd` is where
    /// the search for a local `.claudesync` folder starts.
    pub fn load(global_dir: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Result<Self> {
        let global_dir = global_dir.into();
        let cwd = cwd.into();
        let local_root = discover_local_root(&cwd);

        let global = read_layer(&global_dir.join(GLOBAL_FILE))?;
        let local = match &local_root {
            Some(root) => read_layer(&root.join(CONFIG_DIR).join(LOCAL_FILE))?,
            None => Map::new(),
        };

        Ok(Self {
            global_dir,
            local_root,
            cwd,
            layers: RwLock::new(Layers { global, local }),
        })
    }

    /// Directory local config is read from and written to.
    pub fn local_root(&self) -> &Path {
        self.local_root.as_deref().unwrap_or(&self.cwd)
    }

    pub fn global_path(&self) -> PathBuf {
        self.global_dir.join(GLOBAL_FILE)
    }

    pub fn local_path(&self) -> PathBuf {
        self.local_root().join(CONFIG_DIR).join(LOCAL_FILE)
    }

    /// Local value if present, else global, else `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .local
            .get(key)
            .or_else(|| layers.global.get(key))
            .cloned()
    }

    /// String value for `key`; non-string and null values read as absent.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Like [`get_string`](Self::get_string), but absence is a config error.
    pub fn require_string(&self, key: &str) -> Result<String> {
        self.get_string(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::config(format!("'{}' is not set", key)))
    }

    /// Write `key` into one layer and persist that layer.
    pub fn set(&self, key: &str, value: impl Into<Value>, scope: Scope) -> Result<()> {
        if scope == Scope::Local && key.ends_with(SESSION_KEY_SUFFIX) {
            return Err(Error::config(format!(
                "'{}' holds a session credential and can only be stored globally",
                key
            )));
        }
        let value = value.into();
        self.mutate(scope, |layer| {
            layer.insert(key.to_string(), value);
        })
    }

    /// Remove `key` from one layer and persist that layer.
    pub fn unset(&self, key: &str, scope: Scope) -> Result<()> {
        self.mutate(scope, |layer| {
            layer.remove(key);
        })
    }

    /// Store a session key in the global layer under `<provider>_session_key`.
    pub fn set_session_key(&self, provider: &str, key: &str, expiry: DateTime<Utc>) -> Result<()> {
        let entry = serde_json::json!({
            "key": key,
            "expiry": expiry.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        self.mutate(Scope::Global, |layer| {
            layer.insert(session_entry_key(provider), entry);
        })
    }

    /// Read back the session key for `provider`.
    ///
    /// Absent, malformed, or empty entries are all reported as a missing
    /// credential.
    pub fn session_key(&self, provider: &str) -> Result<SessionCredential> {
        let entry = {
            let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
            layers.global.get(&session_entry_key(provider)).cloned()
        };
        let entry = entry.ok_or_else(|| Error::missing_credential(provider, "not found"))?;

        let key = entry
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing_credential(provider, "malformed entry"))?;
        if key.is_empty() {
            return Err(Error::missing_credential(provider, "empty session key"));
        }
        let expiry = entry
            .get("expiry")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .ok_or_else(|| Error::missing_credential(provider, "malformed expiry"))?
            .with_timezone(&Utc);

        Ok(SessionCredential {
            provider: provider.to_string(),
            key: key.to_string(),
            expiry,
        })
    }

    /// Drop every stored session key.
    pub fn clear_all_session_keys(&self) -> Result<()> {
        self.mutate(Scope::Global, |layer| {
            layer.retain(|k, _| !k.ends_with(SESSION_KEY_SUFFIX));
        })
    }

    /// Providers that currently have a session key entry, sorted.
    pub fn providers_with_session_keys(&self) -> Vec<String> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        layers
            .global
            .keys()
            .filter_map(|k| k.strip_suffix(SESSION_KEY_SUFFIX))
            .map(str::to_string)
            .collect()
    }

    /// Switch the active organization and clear the project pointers in a
    /// single local write.
    pub fn select_organization(&self, organization_id: &str) -> Result<()> {
        self.mutate(Scope::Local, |layer| {
            layer.insert(
                ACTIVE_ORGANIZATION_ID.to_string(),
                Value::String(organization_id.to_string()),
            );
            layer.remove(ACTIVE_PROJECT_ID);
            layer.remove(ACTIVE_PROJECT_NAME);
        })
    }

    /// Set both project pointers in a single local write.
    pub fn select_project(&self, project_id: &str, project_name: &str) -> Result<()> {
        self.mutate(Scope::Local, |layer| {
            layer.insert(
                ACTIVE_PROJECT_ID.to_string(),
                Value::String(project_id.to_string()),
            );
            layer.insert(
                ACTIVE_PROJECT_NAME.to_string(),
                Value::String(project_name.to_string()),
            );
        })
    }

    pub fn api_url(&self) -> String {
        self.get_string(CLAUDE_API_URL)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn active_provider(&self) -> String {
        self.get_string(ACTIVE_PROVIDER)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    pub fn active_organization_id(&self) -> Result<String> {
        self.require_string(ACTIVE_ORGANIZATION_ID).map_err(|_| {
            Error::config("no active organization; run 'claudesync organization set' first")
        })
    }

    pub fn active_project_id(&self) -> Result<String> {
        self.require_string(ACTIVE_PROJECT_ID).map_err(|_| {
            Error::config("no active project; run 'claudesync project set' or 'project create' first")
        })
    }

    /// The sync root: `local_path` resolved against the local root when
    /// relative.
    pub fn sync_root(&self) -> Result<PathBuf> {
        let raw = self.require_string(LOCAL_PATH)?;
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.local_root().join(path))
        }
    }

    /// Extra exclude globs for `push`.
    pub fn push_excludes(&self) -> Vec<String> {
        match self.get(PUSH_EXCLUDE) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Merged view (local over global) with session key values masked.
    pub fn merged_redacted(&self) -> Map<String, Value> {
        let layers = self.layers.read().unwrap_or_else(PoisonError::into_inner);
        let mut merged = layers.global.clone();
        for (k, v) in &layers.local {
            merged.insert(k.clone(), v.clone());
        }
        for (k, v) in merged.iter_mut() {
            if k.ends_with(SESSION_KEY_SUFFIX) {
                if let Some(obj) = v.as_object_mut() {
                    obj.insert("key".to_string(), Value::String("********".to_string()));
                }
            }
        }
        merged
    }

    fn mutate(&self, scope: Scope, f: impl FnOnce(&mut Map<String, Value>)) -> Result<()> {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        match scope {
            Scope::Global => {
                f(&mut layers.global);
                write_layer(&self.global_path(), &layers.global)
            }
            Scope::Local => {
                f(&mut layers.local);
                write_layer(&self.local_path(), &layers.local)
            }
        }
    }
}

fn session_entry_key(provider: &str) -> String {
    format!("{}{}", provider, SESSION_KEY_SUFFIX)
}

/// Nearest ancestor of `start` (inclusive) containing a `.claudesync` folder.
fn discover_local_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_DIR).is_dir())
        .map(Path::to_path_buf)
}

fn read_layer(path: &Path) -> Result<Map<String, Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(Error::io(path, e)),
    };
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(&content)
        .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))
}

fn write_layer(path: &Path, layer: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(layer)?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| Error::io(path, e))?;
    tracing::debug!(path = %path.display(), "configuration written");
    Ok(())
}
