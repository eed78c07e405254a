//! Route handlers organized by access level.

pub mod account;
pub mod admin;
pub mod my;
pub mod public;

use actix_web::web;

/// Registers every route of the backend.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(public::login_page)
        .service(account::join)
        .service(account::confirm)
        .service(my::my)
        .service(my::profile)
        .service(admin::admin);
}
