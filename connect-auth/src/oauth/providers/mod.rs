//! Provider-specific OAuth clients.

pub mod tiktok;
