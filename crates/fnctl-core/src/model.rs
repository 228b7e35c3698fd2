//! Resource model: applications, functions and triggers

use crate::error::{FnError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum byte length of an annotation key
pub const MAX_ANNOTATION_KEY_BYTES: usize = 128;

/// Maximum byte length of an annotation value's serialized form
pub const MAX_ANNOTATION_VALUE_BYTES: usize = 512;

pub type Config = BTreeMap<String, String>;
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// Resource kinds addressable through a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Application,
    Function,
    Trigger,
}

impl ResourceType {
    /// Short name used in user-facing messages ("app hello not found")
    pub fn short_name(self) -> &'static str {
        match self {
            ResourceType::Application => "app",
            ResourceType::Function => "function",
            ResourceType::Trigger => "trigger",
        }
    }

    /// Plural form used in "No apps found" style hints
    pub fn plural(self) -> &'static str {
        match self {
            ResourceType::Application => "apps",
            ResourceType::Function => "functions",
            ResourceType::Trigger => "triggers",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Top-level container grouping functions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// Opaque server-assigned identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Unique name; may only contain alphanumerics, `-` and `_`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Configuration applied to every function in the app
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: Config,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,

    /// Comma separated syslog URLs receiving function logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syslog_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Deployable unit referencing a container image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Name, unique within the parent app
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,

    /// Full container image reference, e.g. `fnproject/hello:0.0.1`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// Maximum usable memory in MiB; 0 means "unset"
    #[serde(default, skip_serializing_if = "is_zero")]
    pub memory: u64,

    /// Execution timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,

    /// Hot container idle timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: Config,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

/// Trigger class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    #[default]
    Http,
    Schedule,
    Queue,
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerType::Http => write!(f, "http"),
            TriggerType::Schedule => write!(f, "schedule"),
            TriggerType::Queue => write!(f, "queue"),
        }
    }
}

impl std::str::FromStr for TriggerType {
    type Err = FnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(TriggerType::Http),
            "schedule" => Ok(TriggerType::Schedule),
            "queue" => Ok(TriggerType::Queue),
            other => Err(FnError::InvalidArgument(format!(
                "unknown trigger type '{}', expected http, schedule or queue",
                other
            ))),
        }
    }
}

/// Named external entry point attached to a function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Name, unique within `(app_id, fn_id)`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fn_id: String,

    /// URI path, e.g. `say/hello`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    /// `None` in a change set leaves the stored type alone
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: Annotations,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parent identifiers scoping a name lookup or a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub app_id: Option<String>,
    pub fn_id: Option<String>,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn app(app_id: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            fn_id: None,
        }
    }

    /// Function scope; an empty `fn_id` widens to the whole app
    pub fn function(app_id: impl Into<String>, fn_id: impl Into<String>) -> Self {
        let fn_id = fn_id.into();
        Self {
            app_id: Some(app_id.into()),
            fn_id: if fn_id.is_empty() { None } else { Some(fn_id) },
        }
    }
}

/// Behavior shared by the three persisted entities
pub trait Resource:
    Clone + Send + Sync + Serialize + serde::de::DeserializeOwned + std::fmt::Debug + 'static
{
    const TYPE: ResourceType;

    fn id(&self) -> &str;
    fn name(&self) -> &str;

    /// Copy with every server-owned field cleared; this is the create body.
    fn for_create(&self) -> Self;

    /// Apply the caller's changes (`self`) onto a server representation.
    ///
    /// Unset fields leave `target` untouched; a config entry with an empty
    /// value deletes that key.
    fn merge_into(&self, target: &mut Self);

    /// Client-side validation run before any network call
    fn validate(&self) -> Result<()>;
}

impl Resource for App {
    const TYPE: ResourceType = ResourceType::Application;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_create(&self) -> Self {
        Self {
            id: String::new(),
            created_at: None,
            updated_at: None,
            ..self.clone()
        }
    }

    fn merge_into(&self, target: &mut Self) {
        merge_config(&mut target.config, &self.config);
        merge_annotations(&mut target.annotations, &self.annotations);
        if self.syslog_url.is_some() {
            target.syslog_url = self.syslog_url.clone();
        }
    }

    fn validate(&self) -> Result<()> {
        validate_name(Self::TYPE, &self.name)?;
        if self.name.contains('/') || self.name.contains(':') {
            return Err(FnError::InvalidArgument(format!(
                "app name '{}' looks like an image name",
                self.name
            )));
        }
        validate_annotations(&self.annotations)
    }
}

impl Resource for Function {
    const TYPE: ResourceType = ResourceType::Function;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_create(&self) -> Self {
        Self {
            id: String::new(),
            created_at: None,
            updated_at: None,
            ..self.clone()
        }
    }

    fn merge_into(&self, target: &mut Self) {
        if !self.image.is_empty() {
            target.image = self.image.clone();
        }
        if self.memory != 0 {
            target.memory = self.memory;
        }
        if self.timeout.is_some() {
            target.timeout = self.timeout;
        }
        if self.idle_timeout.is_some() {
            target.idle_timeout = self.idle_timeout;
        }
        merge_config(&mut target.config, &self.config);
        merge_annotations(&mut target.annotations, &self.annotations);
    }

    fn validate(&self) -> Result<()> {
        validate_name(Self::TYPE, &self.name)?;
        validate_annotations(&self.annotations)
    }
}

impl Resource for Trigger {
    const TYPE: ResourceType = ResourceType::Trigger;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn for_create(&self) -> Self {
        Self {
            id: String::new(),
            created_at: None,
            updated_at: None,
            trigger_type: Some(self.trigger_type.unwrap_or_default()),
            ..self.clone()
        }
    }

    fn merge_into(&self, target: &mut Self) {
        if !self.source.is_empty() {
            target.source = self.source.clone();
        }
        if self.trigger_type.is_some() {
            target.trigger_type = self.trigger_type;
        }
        merge_annotations(&mut target.annotations, &self.annotations);
    }

    fn validate(&self) -> Result<()> {
        validate_name(Self::TYPE, &self.name)?;
        validate_annotations(&self.annotations)
    }
}

/// Merge `changes` onto `current`; an empty value removes the key.
pub fn merge_config(current: &mut Config, changes: &Config) {
    for (k, v) in changes {
        if v.is_empty() {
            current.remove(k);
        } else {
            current.insert(k.clone(), v.clone());
        }
    }
}

/// Merge annotation changes; a JSON `null` or empty-string value removes the key.
pub fn merge_annotations(current: &mut Annotations, changes: &Annotations) {
    for (k, v) in changes {
        let remove = v.is_null() || v.as_str().is_some_and(str::is_empty);
        if remove {
            current.remove(k);
        } else {
            current.insert(k.clone(), v.clone());
        }
    }
}

/// Names match `[A-Za-z0-9_-]+`
pub fn validate_name(kind: ResourceType, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FnError::InvalidArgument(format!(
            "{} name must not be empty",
            kind
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(FnError::InvalidArgument(format!(
            "invalid {} name '{}': character '{}' is not allowed (use letters, digits, '-' or '_')",
            kind, name, bad
        )));
    }
    Ok(())
}

pub fn validate_annotations(annotations: &Annotations) -> Result<()> {
    for (key, value) in annotations {
        if key.is_empty()
            || key.len() > MAX_ANNOTATION_KEY_BYTES
            || !key.bytes().all(|b| b.is_ascii_graphic())
        {
            return Err(FnError::InvalidArgument(format!(
                "invalid annotation key '{}': keys must be 1-{} bytes of printable ASCII without whitespace",
                key, MAX_ANNOTATION_KEY_BYTES
            )));
        }
        let serialized = serde_json::to_vec(value)?;
        if serialized.len() > MAX_ANNOTATION_VALUE_BYTES {
            return Err(FnError::InvalidArgument(format!(
                "annotation '{}' value is {} bytes when serialized (max {})",
                key,
                serialized.len(),
                MAX_ANNOTATION_VALUE_BYTES
            )));
        }
    }
    Ok(())
}
