use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, middleware, web};

use itsm::auth::probe::{SchemaFeatureProbe, spawn_refresher};
use itsm::auth::scope::{ResourceType, ScopeEngine};
use itsm::auth::subject::SubjectContextFactory;
use itsm::config::AppConfig;
use itsm::errors::AppError;
use itsm::{db, handlers, models};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;

    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    // Refuse to start without a resolver rather than degrade every user.
    let catalog = models::permission::load_catalog(&pool).await?;
    let factory = SubjectContextFactory::builder().resolver(Arc::new(catalog)).build()?;

    let probe = Arc::new(SchemaFeatureProbe::new(ResourceType::side_tables()));
    probe.refresh(&pool).await;
    spawn_refresher(probe.clone(), pool.clone(), config.feature_probe_interval);

    let engine = web::Data::new(ScopeEngine::new(probe));
    let factory = web::Data::new(factory);
    let pool_data = web::Data::new(pool);
    let secret_key = config.session_key.clone();

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(false)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(pool_data.clone())
            .app_data(factory.clone())
            .app_data(engine.clone())
            .configure(handlers::configure)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound().json(serde_json::json!({ "error": "not found" }))
            }))
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;
    Ok(())
}
