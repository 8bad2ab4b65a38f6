pub mod auth;
pub mod complaint;
pub mod health;
pub mod register;

use actix_web::web;

use crate::error::ServiceError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // body JSON illisible -> 400 au même format que les erreurs de validation
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ServiceError::validation(format!("Invalid JSON body: {}", err)).into());

    // segment de chemin ou query string invalides -> même corps JSON que les autres erreurs
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| ServiceError::NotFound(format!("Invalid path: {}", err)).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ServiceError::validation(format!("Invalid query string: {}", err)).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .app_data(path_config)
            .app_data(query_config)
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(register::register_routes)
            .configure(complaint::complaint_routes)
    );
}
