//! HTTP handlers for the Vigilante REST API (spec §6).
use actix_web::get;
use actix_web::post;
use actix_web::web::Json;
use actix_web::HttpResponse;
use futures_util::StreamExt;
use serde::Serialize;

use vigilante_context::Context;
use vigilante_errors::HttpError;
use vigilante_injector::Injector;
use vigilante_operator::CreateSnapshotRequest;
use vigilante_operator::DeleteCollectionRequest;
use vigilante_operator::DeleteSnapshotRequest;
use vigilante_operator::DownloadSnapshotRequest;
use vigilante_operator::ManageStatefulSetRequest;
use vigilante_operator::PodDeleteRequest;
use vigilante_operator::RecoverFromSnapshotRequest;
use vigilante_operator::ReplicateShardsRequest;

/// Response body for `GET /api/v1/collections/info`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionsInfo {
    collections: Vec<vigilante_cluster_model::CollectionView>,
    issues: Vec<String>,
}

/// Response body for `GET /api/v1/snapshots/info`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotsInfo {
    snapshots: Vec<vigilante_cluster_model::SnapshotEntry>,
}

/// Liveness probe. Returns 503 until the Monitor Loop has published its first
/// [`ClusterModel`](vigilante_cluster_model::ClusterModel), 200 afterwards.
#[get("/health")]
pub async fn health() -> HttpResponse {
    let model = Injector::global().model.load();
    if model.last_refresh == time::OffsetDateTime::UNIX_EPOCH {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({"status": "starting"}));
    }
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

#[get("/cluster/status")]
pub async fn cluster_status() -> HttpResponse {
    let model = Injector::global().model.load();
    HttpResponse::Ok().json(&*model)
}

#[get("/collections/info")]
pub async fn collections_info() -> HttpResponse {
    let model = Injector::global().model.load();
    HttpResponse::Ok().json(CollectionsInfo {
        collections: model.collections.clone(),
        issues: model.issues.clone(),
    })
}

#[get("/snapshots/info")]
pub async fn snapshots_info() -> HttpResponse {
    let model = Injector::global().model.load();
    HttpResponse::Ok().json(SnapshotsInfo {
        snapshots: model.snapshots.clone(),
    })
}

#[post("/cluster/replicate-shards")]
pub async fn replicate_shards(
    context: Context,
    request: Json<ReplicateShardsRequest>,
) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .replicate_shards(&context, request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[actix_web::delete("/collections")]
pub async fn delete_collection(
    context: Context,
    request: Json<DeleteCollectionRequest>,
) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .delete_collection(&context, request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/snapshots")]
pub async fn create_snapshot(request: Json<CreateSnapshotRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .create_snapshot(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[actix_web::delete("/snapshots")]
pub async fn delete_snapshot(request: Json<DeleteSnapshotRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .delete_snapshot(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/snapshots/recover")]
pub async fn recover_snapshot(request: Json<RecoverFromSnapshotRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .recover_from_snapshot(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/snapshots/recover-from-url")]
pub async fn recover_snapshot_from_url(
    request: Json<RecoverFromSnapshotRequest>,
) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .recover_from_snapshot(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/snapshots/download")]
pub async fn download_snapshot(request: Json<DownloadSnapshotRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let download = injector
        .operator
        .download_snapshot(request.into_inner())
        .await
        .map_err(HttpError::from)?;

    let stream = download
        .bytes
        .map(|chunk| chunk.map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error)));
    let mut response = HttpResponse::Ok();
    response.content_type("application/octet-stream");
    if let Some(length) = download.content_length {
        response.no_chunking(length);
    }
    Ok(response.streaming(stream))
}

#[post("/kubernetes/delete-pod")]
pub async fn delete_pod(request: Json<PodDeleteRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .pod_delete(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/kubernetes/manage-statefulset")]
pub async fn manage_stateful_set(request: Json<ManageStatefulSetRequest>) -> Result<HttpResponse, HttpError> {
    let injector = Injector::global();
    let result = injector
        .operator
        .manage_stateful_set(request.into_inner())
        .await
        .map_err(HttpError::from)?;
    Ok(HttpResponse::Ok().json(result))
}
