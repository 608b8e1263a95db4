pub mod health;
pub mod quotes;
pub mod watchlist;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(quotes::config)
            .configure(watchlist::config)
    );
}
