//! Outbound integrations: the TikTok OAuth endpoints and the Airtable record store.

pub mod airtable;
pub mod oauth;
