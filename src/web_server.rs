use actix_web::{http::header, web, App, HttpResponse, HttpServer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use crate::document::PhotoDocument;
use crate::error::AppError;
use crate::ingest::{IngestionAck, IngestionPipeline, UploadEvent};
use crate::search_service::PhotoSearch;

#[derive(Serialize, Debug)]
pub struct SearchResults {
    pub results: Vec<PhotoDocument>,
}

async fn search_photos(
    search: web::Data<PhotoSearch>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    log::debug!("Received search request: {:?}", query);

    let results = search.search(query.get("q").map(String::as_str)).await.map_err(|e| {
        log::error!("Search query failed: {}", e);
        AppError::SearchFailed
    })?;

    Ok(HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .json(SearchResults { results }))
}

async fn ingest_uploads(
    pipeline: web::Data<IngestionPipeline>,
    event: web::Json<UploadEvent>,
) -> HttpResponse {
    pipeline.ingest(&event).await;
    HttpResponse::Ok().json(IngestionAck::ok())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/search").route(web::get().to(search_photos)))
        .service(web::resource("/api/ingest").route(web::post().to(ingest_uploads)));
}

pub async fn start_web_server(
    port: u16,
    pipeline: Arc<IngestionPipeline>,
    search: Arc<PhotoSearch>,
) -> std::io::Result<()> {
    let pipeline_data = web::Data::from(pipeline);
    let search_data = web::Data::from(search);

    log::info!("Starting web server on port: {}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(pipeline_data.clone())
            .app_data(search_data.clone())
            .configure(configure)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
