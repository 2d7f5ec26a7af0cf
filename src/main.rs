use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use palmread::analysis::Analyzer;
use palmread::config::ServiceConfig;
use palmread::server::{self, routes};
use palmread::util::init_tracing;

use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::load()?;
    info!("loaded {config:?}");
    if config.api_key().is_none() {
        warn!("GEMINI_API_KEY is not set: analysis requests will fail until it is configured");
    }

    let (host, port) = config.bind_address();
    let bind = (host.to_string(), port);

    let analyzer = web::Data::new(Analyzer::new(config)?);

    // Start the HTTP server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(analyzer.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "SAMEORIGIN")),
            )
            .wrap(middleware::Logger::default())
            .configure(server::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .bind(bind)?;

    info!("palmistry API server running on port {port}");
    info!("health check: http://localhost:{port}/health");

    server.run().await?;
    Ok(())
}
