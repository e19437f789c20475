// Life of a request:
// 1. OPTIONS pre-flight passes straight through.
// 2. The gateway extracts the bearer token (or applies the anonymous
//    policy when there is none).
// 3. The token's structure is decoded without trusting it, and the provider
//    table is narrowed by issuer, audience, and algorithm.
// 4. Each surviving candidate's key is tried until one verifies the
//    signature.
// 5. The verified principal is attached to the request and downstream
//    handling runs.
//
// System components:
//  - Configuration loader (startup, fail-fast)
//  - Claim narrower + signature verifier (request time, pure)
//  - Gateway middleware (axum)

pub mod auth;
pub mod config;
pub mod diagnostics;

#[cfg(test)]
pub mod testing;

pub use auth::{AuthConfiguration, GatewayState, Principal};
pub use diagnostics::{Diagnostics, TracingDiagnostics};
