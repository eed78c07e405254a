//! Honors Parking backend server.
//!
//! ```bash
//! export REDIS_URL=redis://127.0.0.1:6379          # optional, cookie sessions otherwise
//! export NAVER_CLIENT_ID=... NAVER_CLIENT_SECRET=... # optional, same for GOOGLE_ and KAKAO_
//! export ADMIN_USERNAME=admin ADMIN_PASSWORD=...     # optional seeded admin
//! cargo run -p honors-parking-server
//! ```

use std::io;

use actix_session::storage::{CookieSessionStore, RedisSessionStore, SessionStore};
use actix_session::SessionMiddleware;
use actix_web::cookie::Key;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use honors_parking_server::config::{AppConfig, SESSION_COOKIE};
use honors_parking_server::handlers::{self, public::SocialLogins};
use honors_parking_server::security_config::SecurityConfig;
use parking_security_core::http::security::{InMemoryUserDetailsManager, PasswordEncoder, User};

fn session_key(config: &AppConfig) -> Key {
    match config.session_secret.as_deref() {
        Some(secret) if secret.len() >= 64 => Key::from(secret.as_bytes()),
        Some(_) => {
            log::warn!("SESSION_SECRET is shorter than 64 bytes, using a random key");
            Key::generate()
        }
        None => Key::generate(),
    }
}

fn user_store(config: &AppConfig) -> io::Result<InMemoryUserDetailsManager> {
    let encoder = SecurityConfig::password_encoder();
    let users = InMemoryUserDetailsManager::new(encoder.clone());

    if let Some(admin) = &config.admin {
        let encoded = encoder.encode(&admin.password).map_err(io::Error::other)?;
        users
            .create_user(
                User::with_encoded_password(&admin.username, encoded)
                    .roles(&["ADMIN".to_string(), "USER".to_string()]),
            )
            .map_err(io::Error::other)?;
        log::info!("Seeded admin account '{}'", admin.username);
    }
    Ok(users)
}

async fn run<S, F>(config: AppConfig, security: SecurityConfig, store: F) -> io::Result<()>
where
    S: SessionStore + 'static,
    F: Fn() -> S + Clone + Send + 'static,
{
    let chain = security.filter_chain().map_err(io::Error::other)?;
    let cors_source = security.cors_configuration_source();
    let social = web::Data::new(SocialLogins::from_chain(&chain));
    let users = web::Data::new(security.users().clone());
    let key = session_key(&config);

    log::info!("Starting server at http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(chain.clone())
            .wrap(
                SessionMiddleware::builder(store(), key.clone())
                    .cookie_name(SESSION_COOKIE.to_string())
                    .cookie_secure(false)
                    .build(),
            )
            .wrap(cors_source.clone().into_cors())
            .wrap(Logger::default())
            .app_data(users.clone())
            .app_data(social.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env();
    let security = SecurityConfig::new(&config, user_store(&config)?).map_err(io::Error::other)?;

    match config.redis_url.clone() {
        Some(url) => {
            let store = RedisSessionStore::new(url)
                .await
                .map_err(|e| io::Error::other(e.to_string()))?;
            log::info!("Using Redis session store");
            run(config, security, move || store.clone()).await
        }
        None => {
            log::info!("Using cookie session store");
            run(config, security, CookieSessionStore::default).await
        }
    }
}
