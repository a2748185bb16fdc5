use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use log::info;
use sqlx::postgres::PgPoolOptions;

use campaign_market::config::AppConfig;
use campaign_market::controllers::campaign_controller::{
    apply_to_campaign, create_campaign, get_campaigns,
};
use campaign_market::controllers::payment_controller::payment_callback;
use campaign_market::middleware::auth::AuthMiddleware;
use campaign_market::services::reconciler;
use campaign_market::services::telebirr::TelebirrClient;

async fn health() -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(r#"{"status": "Ok"}"#)
}

async fn run() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    info!("Connected to Postgres");

    let telebirr = TelebirrClient::new(&config).expect("Failed to build payment provider client");

    reconciler::spawn(pool.clone(), telebirr.clone(), config.clone());

    let bind_addr = config.bind_addr.clone();

    HttpServer::new(move || {
        let api_scope = web::scope("/api")
            .wrap(AuthMiddleware::new(config.jwt_secret.clone()))
            .service(get_campaigns)
            .service(create_campaign)
            .service(apply_to_campaign)
            .service(payment_callback);

        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(telebirr.clone()))
            .route("/health", web::get().to(health))
            .service(api_scope)
    })
    .bind(bind_addr)?
    .run()
    .await
}

fn main() -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");
    runtime.block_on(run())
}
