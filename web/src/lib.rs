use log::*;
use service::AppState;
use std::io;
use tokio::net::TcpListener;

mod controller;
mod error;
mod extractors;
pub mod router;

pub use error::{Error, Result};

pub async fn init_server(app_state: AppState) -> io::Result<()> {
    let interface = app_state.config.interface.as_deref().unwrap_or("127.0.0.1");
    let server_url = format!("{}:{}", interface, app_state.config.port);

    info!(
        "Server starting in {} mode... listening for connections on http://{}",
        app_state.config.runtime_env(),
        server_url
    );

    match app_state.config.public_base_url() {
        Some(base_url) => info!(
            "OAuth callback registered as {}/api/oauth/callback",
            base_url.trim_end_matches('/')
        ),
        None => warn!("PUBLIC_BASE_URL is not set; OAuth requests will be rejected"),
    }

    let listener = TcpListener::bind(&server_url).await?;
    let app = router::define_routes(app_state);

    axum::serve(listener, app).await
}
