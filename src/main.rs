use sentinel::api;
use sentinel::logger::*;
use sentinel::server::*;
use sentinel::settings::*;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_settings(&project_settings.log)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;

    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error)
        .with(warp::log("sentinel::http"));

    let (bound, serving) =
        warp::serve(api_v1).try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = signal::ctrl_c().await {
                error!("could not listen for SIGINT: {}", e);
            }
        })?;
    info!(%bound, "listening");
    serving.await;

    let shutdown_timeout = std::time::Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
