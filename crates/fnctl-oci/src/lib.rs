//! Managed-cloud provider for fnctl
//!
//! Requests are signed with an RSA key (HTTP Signatures, `rsa-sha256`) and
//! carry the configured compartment in `opc-compartment-id`. The transport
//! stack for every call is:
//!
//! ```text
//! CompartmentInjector -> OciSigningTransport -> HttpTransport
//! ```
//!
//! Only applications and functions are offered; trigger operations fail
//! with `NotSupported`.
//!
//! Signing credentials missing from the context are read from a profile of
//! `~/.oci/config` (`oracle.profile`, default `DEFAULT`).

pub mod api;
pub mod compartment;
pub mod key;
pub mod profile;
pub mod provider;
pub mod signer;

pub use api::{OciApplications, OciFunctions, invoke_endpoint};
pub use compartment::{COMPARTMENT_HEADER, CompartmentInjector};
pub use key::{key_id, load_private_key, parse_private_key};
pub use profile::{OciProfile, WithProfile};
pub use provider::OracleProvider;
pub use signer::{Clock, OciSigningTransport, RequestSigner, SystemClock};
