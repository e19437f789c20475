//! Multi-provider token authentication gateway.
//!
//! Decides, for every inbound HTTP request, whether the caller presents a
//! valid bearer token from a trusted provider, and attaches the verified
//! [`Principal`] before downstream logic runs.
//!
//! # Pre-conditions
//! - The trust configuration must be loaded before the server accepts
//!   connections.
//!
//! # Post-conditions
//! - The loaded [`AuthConfiguration`] is immutable for the process lifetime.
//!
//! # Invariants
//! - Every trust record carries key material matching its algorithm's
//!   family.
//! - Verification never widens the algorithm set beyond the one a record
//!   declares.

pub mod algorithm;
pub mod claims;
pub mod loader;
pub mod middleware;
pub mod provider;
pub mod verify;

pub use algorithm::{KeyFamily, SigningAlgorithm};
pub use loader::{LoaderError, load_auth_configuration};
pub use middleware::{GatewayState, Principal, authenticate};
pub use provider::{AuthConfiguration, KeyMaterial, ProviderTrust};
