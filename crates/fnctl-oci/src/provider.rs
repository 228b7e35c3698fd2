//! Managed-cloud provider

use crate::api::{OciApplications, OciFunctions};
use crate::compartment::CompartmentInjector;
use crate::key::{key_id, load_private_key};
use crate::profile::{OciProfile, WithProfile, default_config_file};
use crate::signer::{OciSigningTransport, REQUEST_TARGET, RequestSigner};
use fnctl_core::config::{
    self, API_URL, CALL_URL, HTTP_INSECURE, ORACLE_COMPARTMENT_ID, ORACLE_DISABLE_CERTS,
    ORACLE_KEY_FILE,
};
use fnctl_core::{
    ApiUrl, ConfigSource, FnError, HttpTransport, PassphraseSource, ResourceApiClient,
    ResourceType, Result, RetryPolicy, SharedTransport, Trigger, UnsupportedCollection,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Headers signed on every request, in signing order
pub const SIGNED_BASE_HEADERS: &[&str] = &["host", "date", REQUEST_TARGET];

/// Attempts for an update whose version went stale
pub const UPDATE_ATTEMPTS: u32 = 3;

pub const TRIGGERS_UNSUPPORTED: &str = "HTTP Triggers are not supported on this provider";

/// Provider for the managed cloud functions service
pub struct OracleProvider {
    api_url: ApiUrl,
    call_url: Option<ApiUrl>,
    compartment_id: String,
    signer: Arc<RequestSigner>,
    transport: SharedTransport,
}

impl std::fmt::Debug for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleProvider")
            .field("api_url", &self.api_url)
            .field("call_url", &self.call_url)
            .field("compartment_id", &self.compartment_id)
            .field("key_id", &self.signer.key_id())
            .finish()
    }
}

fn required(config: &dyn ConfigSource, key: &str, what: &str) -> Result<String> {
    let value = config.get_string(key);
    if value.is_empty() {
        return Err(FnError::Config(format!(
            "no {} specified in config key {}",
            what, key
        )));
    }
    Ok(value)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

impl OracleProvider {
    /// Build from configuration. The private key is read here, and the
    /// passphrase source is asked at most once when the key is encrypted.
    ///
    /// Credentials the context leaves unset come from `~/.oci/config`.
    pub fn from_config(
        config: &dyn ConfigSource,
        passphrase: &dyn PassphraseSource,
    ) -> Result<Self> {
        Self::from_config_with_profiles(config, passphrase, default_config_file().as_deref())
    }

    /// Like [`OracleProvider::from_config`] with an explicit OCI config file
    pub fn from_config_with_profiles(
        config: &dyn ConfigSource,
        passphrase: &dyn PassphraseSource,
        oci_config: Option<&Path>,
    ) -> Result<Self> {
        let profile = OciProfile::discover(config, oci_config)?;
        let config = &WithProfile::new(config, profile);

        let api_url = ApiUrl::parse(&required(config, API_URL, "API endpoint")?)?;

        let raw_call = config.get_string(CALL_URL);
        let call_url = if raw_call.is_empty() {
            None
        } else {
            Some(ApiUrl::parse(&raw_call)?)
        };

        let compartment_id = required(config, ORACLE_COMPARTMENT_ID, "OCI compartment ID")?;
        let key_id = key_id(config)?;
        let key_file = expand_home(&required(config, ORACLE_KEY_FILE, "private key file")?);
        let key = load_private_key(&key_file, config, passphrase)?;

        let insecure = config.get_bool(HTTP_INSECURE) || config.get_bool(ORACLE_DISABLE_CERTS);
        let timeout = config::http_timeout(config)?;
        let transport = HttpTransport::new(timeout, insecure)?.shared();

        info!(api_url = %api_url, compartment = %compartment_id, "Configured managed-cloud provider");
        debug!(key_id = %key_id, key_file = %key_file.display(), "Loaded signing key");

        let signer = RequestSigner::new(key_id, key).with_base_headers(SIGNED_BASE_HEADERS);
        let mut provider = Self::new(api_url, compartment_id, signer, transport);
        provider.call_url = call_url;
        Ok(provider)
    }

    /// Build around an existing signer and base transport
    pub fn new(
        api_url: ApiUrl,
        compartment_id: impl Into<String>,
        signer: RequestSigner,
        transport: SharedTransport,
    ) -> Self {
        Self {
            api_url,
            call_url: None,
            compartment_id: compartment_id.into(),
            signer: Arc::new(signer),
            transport,
        }
    }

    pub fn with_call_url(mut self, call_url: ApiUrl) -> Self {
        self.call_url = Some(call_url);
        self
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    pub fn call_url(&self) -> &ApiUrl {
        self.call_url.as_ref().unwrap_or(&self.api_url)
    }

    pub fn compartment_id(&self) -> &str {
        &self.compartment_id
    }

    pub fn transport(&self) -> SharedTransport {
        self.transport.clone()
    }

    /// Compartment injector around the signer around `inner`
    pub fn wrap_call_transport(&self, inner: SharedTransport) -> Result<SharedTransport> {
        let signed = Arc::new(OciSigningTransport::new(self.signer.clone(), inner));
        Ok(Arc::new(CompartmentInjector::new(
            &self.compartment_id,
            signed,
        )?))
    }

    /// Applications and functions over the signed transport; triggers are
    /// not offered by the service
    pub fn api_client_v2(&self) -> Result<ResourceApiClient> {
        let transport = self.wrap_call_transport(self.transport.clone())?;
        let base = self.api_url.to_string();
        Ok(ResourceApiClient {
            apps: Arc::new(OciApplications::new(
                base.clone(),
                self.compartment_id.clone(),
                transport.clone(),
            )),
            functions: Arc::new(OciFunctions::new(
                base,
                self.compartment_id.clone(),
                transport,
            )),
            triggers: Arc::new(UnsupportedCollection::<Trigger>::new(TRIGGERS_UNSUPPORTED)),
        })
    }

    pub fn unavailable_resources(&self) -> BTreeSet<ResourceType> {
        BTreeSet::from([ResourceType::Trigger])
    }

    pub fn update_retry(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(UPDATE_ATTEMPTS)
    }
}
