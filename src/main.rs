use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use pricewatch::db::{self, ProductRepository};
use pricewatch::scrape::{HttpScraper, PriceRefresher, ScrapeOrchestrator};
use pricewatch::{routes, telemetry, AppState, Settings};

fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default().allow_any_method().allow_any_header().max_age(3600);
    if origins.is_empty() {
        return cors.allow_any_origin();
    }
    origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
}

async fn start_server(settings: Settings) -> std::io::Result<()> {
    let pool = db::init_pool(&settings.database).map_err(std::io::Error::other)?;
    let repo = ProductRepository::new(pool);
    let scraper = HttpScraper::new(&settings.scraper).map_err(std::io::Error::other)?;
    let orchestrator = ScrapeOrchestrator::new(Arc::new(scraper), repo.clone());

    if settings.refresh.interval_hours > 0 {
        let refresher = PriceRefresher::new(
            orchestrator.clone(),
            repo.clone(),
            Duration::from_secs(settings.refresh.interval_hours * 3600),
            settings.refresh.max_workers,
        );
        tokio::spawn(refresher.run());
    }

    let app_state = web::Data::new(AppState { repo, orchestrator });
    let origins = settings.cors.allowed_origins.clone();
    let addr = settings.server_address();

    tracing::info!("Starting HTTP server on http://{}", addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(&origins))
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind(addr)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    telemetry::init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    start_server(settings).await
}
