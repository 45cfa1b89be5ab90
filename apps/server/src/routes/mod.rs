use actix_web::web::ServiceConfig;

pub mod devices;
pub mod health;

/// Register every route of the server
pub fn routes(cfg: &mut ServiceConfig) {
    cfg.configure(health::routes).configure(devices::routes);
}
