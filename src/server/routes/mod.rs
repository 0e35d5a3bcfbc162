//! HTTP route modules

pub mod batch;
pub mod health;

use actix_web::web;

/// Assemble the full route table
pub fn configure(cfg: &mut web::ServiceConfig) {
    health::configure_routes(cfg);
    batch::configure_routes(cfg);
}
