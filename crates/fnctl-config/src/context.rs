use crate::error::{ConfigError, Result};
use fnctl_core::ConfigSource;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Context used when nothing else selects one
pub const DEFAULT_CONTEXT: &str = "default";

/// Environment variable selecting the context
pub const CONTEXT_ENV: &str = "FN_CONTEXT";

const CURRENT_CONTEXT_KEY: &str = "current-context";

/// fnctl configuration directory (`~/.fn`)
pub fn get_config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".fn"))
}

/// Name of the context to load, in priority order:
///
/// 1. explicit (`--context`)
/// 2. `FN_CONTEXT`
/// 3. `current-context` in `<config_dir>/config.yaml`
/// 4. "default"
pub fn resolve_context_name(config_dir: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return validate_context_name(name);
    }

    if let Ok(name) = std::env::var(CONTEXT_ENV)
        && !name.is_empty()
    {
        return validate_context_name(&name);
    }

    let global = config_dir.join("config.yaml");
    if global.exists() {
        let values = load_flattened(&global)?;
        if let Some(name) = values.get(CURRENT_CONTEXT_KEY).filter(|n| !n.is_empty()) {
            return validate_context_name(name);
        }
    }

    Ok(DEFAULT_CONTEXT.to_string())
}

fn validate_context_name(name: &str) -> Result<String> {
    // a separator would escape the contexts directory
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ConfigError::InvalidContextName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Config Source backed by a YAML context file
///
/// Nested maps flatten to dotted keys:
///
/// ```yaml
/// provider: oracle
/// oracle:
///   compartment-id: ocid1.compartment.oc1..xyz
/// ```
///
/// yields `provider` and `oracle.compartment-id`.
#[derive(Debug, Clone, Default)]
pub struct ContextConfigSource {
    name: String,
    values: HashMap<String, String>,
}

impl ContextConfigSource {
    /// Load `~/.fn/contexts/<name>.yaml`
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let dir = get_config_dir()?;
        Self::load_from_dir(&dir, explicit)
    }

    /// Load from an explicit configuration directory
    pub fn load_from_dir(config_dir: &Path, explicit: Option<&str>) -> Result<Self> {
        let name = resolve_context_name(config_dir, explicit)?;
        let path = config_dir.join("contexts").join(format!("{}.yaml", name));

        // no file: empty source, defaults apply
        if !path.exists() {
            debug!(context = %name, path = %path.display(), "Context file not found, using defaults");
            return Ok(Self {
                name,
                values: HashMap::new(),
            });
        }

        debug!(context = %name, path = %path.display(), "Loading context");
        Ok(Self {
            name,
            values: load_flattened(&path)?,
        })
    }

    /// Parse a YAML document directly
    pub fn from_yaml(name: impl Into<String>, yaml: &str) -> Result<Self> {
        let name = name.into();
        let values = parse_flattened(&name, yaml)?;
        Ok(Self { name, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ConfigSource for ContextConfigSource {
    fn get_string(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn is_set(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

fn load_flattened(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    parse_flattened(&path.display().to_string(), &content)
}

fn parse_flattened(origin: &str, yaml: &str) -> Result<HashMap<String, String>> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
        path: origin.to_string(),
        source,
    })?;

    let mut values = HashMap::new();
    match value {
        Value::Null => {}
        Value::Mapping(_) => flatten("", &value, &mut values),
        _ => return Err(ConfigError::NotAMapping(origin.to_string())),
    }
    Ok(values)
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(key) = scalar_to_string(k) else {
                    continue;
                };
                let full = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&full, v, out);
            }
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        other => {
            if let Some(s) = scalar_to_string(other) {
                out.insert(prefix.to_string(), s);
            } else if let Value::Sequence(items) = other {
                // sequences are kept comma separated
                let joined: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
                out.insert(prefix.to_string(), joined.join(","));
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
