use holdings_exporter::api::{app_router, AppState};
use holdings_exporter::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let listen_addr = config.listen_addr;
    let router = app_router(AppState::new(client, config));

    log::info!("Listening on {listen_addr}");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
