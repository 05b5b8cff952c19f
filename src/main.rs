use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use curl2req::server::{AppState, app};

const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("server is running on http://localhost:{port}");

    let state = Arc::new(AppState::default());
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
