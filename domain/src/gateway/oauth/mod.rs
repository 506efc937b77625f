//! OAuth authentication gateway.
//!
//! Re-exports OAuth types from connect-auth and provides provider-specific clients.

pub mod tiktok;

// Re-export OAuth types from connect-auth
pub use connect_auth::oauth::{
    token::{Storage, TokenBundle, TokenGrant},
    AuthorizationRequest, PkceVerifier, StateParameter, TokenExchangeClient,
};
