use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default TikTok authorization endpoint used when `TIKTOK_AUTHORIZE_URL` is not set.
pub const DEFAULT_TIKTOK_AUTHORIZE_URL: &str = "https://www.tiktok.com/v2/auth/authorize/";

/// Default TikTok token endpoint used when `TIKTOK_TOKEN_URL` is not set.
pub const DEFAULT_TIKTOK_TOKEN_URL: &str = "https://open.tiktokapis.com/v2/oauth/token/";

/// Scopes requested from TikTok when `TIKTOK_SCOPES` is not set.
pub const DEFAULT_TIKTOK_SCOPES: &str = "user.info.basic,video.upload,video.publish";

/// Default Airtable REST API base URL used when `AIRTABLE_BASE_URL` is not set.
pub const DEFAULT_AIRTABLE_BASE_URL: &str = "https://api.airtable.com/v0";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The TikTok client key issued for this application.
    #[arg(long, env)]
    tiktok_client_key: Option<String>,

    /// The TikTok client secret used at code exchange.
    #[arg(long, env, hide_env_values = true)]
    tiktok_client_secret: Option<String>,

    /// The TikTok authorization endpoint the user agent is redirected to.
    #[arg(long, env, default_value = DEFAULT_TIKTOK_AUTHORIZE_URL)]
    tiktok_authorize_url: String,

    /// The TikTok token endpoint.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_TIKTOK_TOKEN_URL)]
    tiktok_token_url: String,

    /// Comma separated list of scopes to request.
    #[arg(long, env, default_value = DEFAULT_TIKTOK_SCOPES)]
    tiktok_scopes: String,

    /// The public base URL this service is reachable at (e.g. https://connect.example.com).
    /// The OAuth callback URI and the dashboard redirect are derived from it.
    #[arg(long, env)]
    public_base_url: Option<String>,

    /// The personal access token used when calling the Airtable API.
    #[arg(long, env, hide_env_values = true)]
    airtable_api_token: Option<String>,

    /// The Airtable base holding the creators table.
    #[arg(long, env)]
    airtable_base_id: Option<String>,

    /// The Airtable table (name or id) creator connections are written to.
    #[arg(long, env)]
    airtable_creators_table: Option<String>,

    /// The base URL of the Airtable REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_AIRTABLE_BASE_URL)]
    airtable_base_url: String,

    /// Directory holding the static dashboard served at `/`.
    #[arg(long, env, default_value = "./public")]
    dashboard_dir: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Treats a blank value the same as an unset one.
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn tiktok_client_key(&self) -> Option<String> {
        non_blank(&self.tiktok_client_key)
    }

    pub fn tiktok_client_secret(&self) -> Option<String> {
        non_blank(&self.tiktok_client_secret)
    }

    pub fn tiktok_authorize_url(&self) -> &str {
        &self.tiktok_authorize_url
    }

    pub fn tiktok_token_url(&self) -> &str {
        &self.tiktok_token_url
    }

    pub fn tiktok_scopes(&self) -> &str {
        &self.tiktok_scopes
    }

    /// Returns the public base URL as configured, without normalisation.
    pub fn public_base_url(&self) -> Option<String> {
        non_blank(&self.public_base_url)
    }

    pub fn airtable_api_token(&self) -> Option<String> {
        non_blank(&self.airtable_api_token)
    }

    pub fn airtable_base_id(&self) -> Option<String> {
        non_blank(&self.airtable_base_id)
    }

    pub fn airtable_creators_table(&self) -> Option<String> {
        non_blank(&self.airtable_creators_table)
    }

    /// Returns the Airtable API base URL.
    pub fn airtable_base_url(&self) -> &str {
        &self.airtable_base_url
    }

    pub fn dashboard_dir(&self) -> &str {
        &self.dashboard_dir
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
