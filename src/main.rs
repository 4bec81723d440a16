use actix_web::{web, App, HttpServer};
use actix_cors::Cors;
use cursor_relay::debug_page::debug_page;
use cursor_relay::websocket::admit;
use cursor_relay::{health_check, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn cors(config: &Settings) -> Cors {
    if !config.cors.enabled {
        return Cors::default();
    }

    let cors = if config.cors.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        Cors::default()
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET"])
    };

    cors.max_age(config.cors.max_age as usize)
}

#[actix_web::main]
async fn main() -> cursor_relay::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    let state = web::Data::new(AppState::new(config.clone()));

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;

    info!(
        "Relay ready at ws://{}:{}{} (debug page at http://{}:{}/)",
        config.server.host,
        config.server.port,
        config.multiplayer.path,
        config.server.host,
        config.server.port
    );

    let workers = config.server.workers as usize;
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config))
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .route("/", web::get().to(debug_page))
            .default_service(web::to(admit))
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
