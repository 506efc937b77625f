//! # connect-auth
//!
//! OAuth 2.0 building blocks for linking a creator to a TikTok account:
//! - PKCE verifier/challenge pairs and CSRF tokens drawn from an injectable
//!   random source
//! - The composite `state` parameter carrying the creator key through the provider
//! - A session capability for the short-lived values bound to the user agent
//! - The TikTok authorize URL builder and token exchange client
//! - Token types and the persister trait that stores them
//!
//! ## Architecture
//!
//! This crate holds protocol logic only. The `domain` crate orchestrates the
//! connection flow on top of these primitives and the `web` crate provides the
//! cookie-backed session and the HTTP surface.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use connect_auth::{
//!     oauth::{PkceVerifier, StateParameter, TokenExchangeClient},
//!     random::OsRandom,
//!     session::SessionStore,
//! };
//! ```

pub mod error;
pub mod http;
pub mod oauth;
pub mod random;
pub mod session;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
