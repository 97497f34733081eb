//! API related tools (such as middlewares) and endpoints.
use actix_web::web::ServiceConfig;
use actix_web::HttpResponse;

pub mod routes;

/// Successful (200) API response with no data returned to the client.
#[inline]
pub fn done() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({}))
}

/// Configure an HTTP Server with all endpoints in this API module, scoped under `/api/v1`
/// (spec §6).
pub fn configure(config: &mut ServiceConfig) {
    let scope = actix_web::web::scope("/api/v1")
        .service(self::routes::cluster_status)
        .service(self::routes::collections_info)
        .service(self::routes::snapshots_info)
        .service(self::routes::replicate_shards)
        .service(self::routes::delete_collection)
        .service(self::routes::create_snapshot)
        .service(self::routes::delete_snapshot)
        .service(self::routes::recover_snapshot)
        .service(self::routes::recover_snapshot_from_url)
        .service(self::routes::download_snapshot)
        .service(self::routes::delete_pod)
        .service(self::routes::manage_stateful_set);
    config.service(scope);
    config.service(self::routes::health);
}
