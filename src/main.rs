use actix_identity::IdentityMiddleware;
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use secrecy::ExposeSecret;
use std::io;
use std::time::Duration;

use watchlists::auth::LocalAuth;
use watchlists::config::Config;
use watchlists::google::{GoogleEndpoints, GoogleOAuth};
use watchlists::omdb::OmdbClient;
use watchlists::session_store::SledSessionStore;
use watchlists::{routes, session_middleware, views};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("watchlists=info,actix_web=info"),
    )
    .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    let db = sled::open(&config.database_path).map_err(io::Error::other)?;
    log::info!("opened database at {}", config.database_path.display());

    let sessions = SledSessionStore::open(&db).map_err(io::Error::other)?;
    // The first sweep runs immediately and clears what the last run left behind.
    sessions.spawn_purge_task(SESSION_PURGE_INTERVAL);

    let tera = web::Data::new(views::load_templates().map_err(io::Error::other)?);
    let omdb = web::Data::new(OmdbClient::new(&config.omdb).map_err(io::Error::other)?);
    let google = web::Data::new(
        GoogleOAuth::new(&config.google, GoogleEndpoints::default()).map_err(io::Error::other)?,
    );
    let auth = web::Data::new(LocalAuth::new(config.bcrypt_cost));
    let db = web::Data::new(db);
    let key = Key::from(config.session_secret.expose_secret().as_bytes());
    let cookie_secure = config.cookie_secure;

    log::info!("listening on {}", config.bind_address());
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(IdentityMiddleware::default())
            .wrap(session_middleware(
                sessions.clone(),
                key.clone(),
                cookie_secure,
            ))
            .app_data(tera.clone())
            .app_data(db.clone())
            .app_data(omdb.clone())
            .app_data(google.clone())
            .app_data(auth.clone())
            .configure(routes::configure)
    })
    .bind(config.bind_address())?
    .run()
    .await
}
