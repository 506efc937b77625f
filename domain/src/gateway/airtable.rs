use crate::error::{ConfigErrorKind, DomainErrorKind, Error, InternalErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use connect_auth::error::{Error as ConnectAuthError, ErrorKind, TokenErrorKind};
use connect_auth::oauth::token::{Storage, TokenBundle};
use log::*;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service::config::Config;

/// Airtable client that upserts one record per creator into the creators table.
///
/// Records are keyed on the `creator_key` field. Concurrent writes for the
/// same creator are not coordinated, the last one wins.
pub struct AirtableCreatorStore {
    client: reqwest::Client,
    table_url: String,
}

/// Fields written for a connected creator.
#[derive(Debug, Serialize)]
struct CreatorFields<'a> {
    creator_key: &'a str,
    open_id: &'a str,
    access_token: &'a str,
    refresh_token: &'a str,
    expires_at: String,
    refresh_expires_at: String,
    scope: &'a str,
    token_type: &'a str,
    is_connected: bool,
}

#[derive(Debug, Serialize)]
struct RecordWrite<'a> {
    fields: CreatorFields<'a>,
}

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<RecordRef>,
}

#[derive(Debug, Deserialize)]
struct RecordRef {
    id: String,
}

impl AirtableCreatorStore {
    /// Create a store from the `AIRTABLE_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        match (
            config.airtable_api_token(),
            config.airtable_base_id(),
            config.airtable_creators_table(),
        ) {
            (Some(api_token), Some(base_id), Some(table)) => {
                Self::new(config.airtable_base_url(), &base_id, &table, &api_token)
            }
            _ => {
                error!("Airtable API token, base id or creators table is not configured");
                Err(Error::config(ConfigErrorKind::MissingRecordStore))
            }
        }
    }

    pub fn new(base_url: &str, base_id: &str, table: &str, api_token: &str) -> Result<Self, Error> {
        let client = build_client(api_token)?;
        let table_url = format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            base_id,
            urlencoding::encode(table)
        );

        Ok(Self { client, table_url })
    }

    /// Find the id of the record holding `creator_key`, if there is one.
    async fn find_record(&self, creator_key: &str) -> Result<Option<String>, ConnectAuthError> {
        let formula = format!("{{creator_key}}=\"{}\"", escape_formula_string(creator_key));

        let response = self
            .client
            .get(&self.table_url)
            .query(&[("filterByFormula", formula.as_str()), ("maxRecords", "1")])
            .send()
            .await
            .map_err(store_error)?;

        let response = ensure_success(response, "lookup").await?;
        let list: RecordList = response.json().await.map_err(store_error)?;

        Ok(list.records.into_iter().next().map(|record| record.id))
    }
}

#[async_trait]
impl Storage for AirtableCreatorStore {
    async fn upsert(&self, creator_key: &str, tokens: TokenBundle) -> Result<(), ConnectAuthError> {
        let body = RecordWrite {
            fields: CreatorFields {
                creator_key,
                open_id: &tokens.open_id,
                access_token: tokens.access_token.expose_secret(),
                refresh_token: tokens.refresh_token.expose_secret(),
                expires_at: airtable_timestamp(tokens.expires_at),
                refresh_expires_at: airtable_timestamp(tokens.refresh_expires_at),
                scope: &tokens.scope,
                token_type: &tokens.token_type,
                is_connected: true,
            },
        };

        let request = match self.find_record(creator_key).await? {
            Some(record_id) => {
                debug!("Updating Airtable record {record_id} for creator {creator_key}");
                self.client
                    .patch(format!("{}/{}", self.table_url, record_id))
            }
            None => {
                debug!("Creating Airtable record for creator {creator_key}");
                self.client.post(&self.table_url)
            }
        };

        let response = request.json(&body).send().await.map_err(store_error)?;
        ensure_success(response, "write").await?;

        info!("Stored TikTok tokens for creator {creator_key}");
        Ok(())
    }
}

/// Build HTTP client with Airtable authentication
fn build_client(api_token: &str) -> Result<reqwest::Client, Error> {
    let mut headers = reqwest::header::HeaderMap::new();
    let mut auth_header = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_token}"))
        .map_err(|err| {
            warn!("Failed to create authorization header value: {err:?}");
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to create authorization header value".to_string(),
                )),
            }
        })?;
    auth_header.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth_header);

    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .build()?)
}

/// Pass 2xx responses through and turn anything else into a storage error
/// carrying the status and body text.
async fn ensure_success(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, ConnectAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("Airtable {operation} failed: {status} {body}");
    Err(store_error(format!("Airtable {operation} failed: {status} {body}")))
}

fn store_error(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ConnectAuthError {
    ConnectAuthError {
        source: Some(err.into()),
        error_kind: ErrorKind::Token(TokenErrorKind::Storage),
    }
}

/// Quote a value for use inside an Airtable formula string literal.
fn escape_formula_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-01-01T01:00:00.000Z`.
fn airtable_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
