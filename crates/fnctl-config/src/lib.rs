//! fnctl configuration
//!
//! Context files live at `~/.fn/contexts/<name>.yaml`. `API_URL`,
//! `FN_TOKEN` and `FN_PROVIDER` override their keys, and encrypted signing
//! keys are unlocked with a pass phrase read from the terminal.

pub mod context;
pub mod env;
pub mod error;
pub mod passphrase;

pub use context::{ContextConfigSource, get_config_dir, resolve_context_name};
pub use env::EnvOverrides;
pub use error::{ConfigError, Result};
pub use passphrase::TerminalPassphraseSource;

/// Load the selected context with environment overrides applied
pub fn load(context: Option<&str>) -> Result<EnvOverrides<ContextConfigSource>> {
    let source = ContextConfigSource::load(context)?;
    Ok(EnvOverrides::new(source))
}
