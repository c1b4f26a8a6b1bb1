use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use actix_multipart::Multipart;
use futures::TryStreamExt;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;
use actix_cors::Cors;
use clap::Parser;
use serde::Deserialize;

use ig_checker_lib::{logger, CheckerError, ConfigArgs, Orchestrator};

mod job_manager;
use job_manager::{JobInput, JobManager};

const INDEX_HTML: &str = include_str!("../static/index.html");
const UPLOAD_DIR: &str = "uploads";

/// Web front end for the Instagram profile checker.
#[derive(Parser, Debug)]
#[command(name = "ig-checker-server", version)]
struct ServerArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    #[command(flatten)]
    config: ConfigArgs,
}

struct AppState {
    job_manager: JobManager,
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

fn error_response(status: actix_web::http::StatusCode, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "status": "error",
        "message": message.to_string(),
    }))
}

fn job_started(job_id: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "job_id": job_id,
        "message": "Batch queued."
    }))
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(INDEX_HTML)
}

#[get("/api/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json("Server is running")
}

#[post("/api/check/text")]
async fn check_text(body: web::Json<TextRequest>, data: web::Data<AppState>) -> impl Responder {
    let job_id = Uuid::new_v4().to_string();
    data.job_manager.start_job(job_id.clone(), JobInput::Text(body.into_inner().text));
    job_started(&job_id)
}

#[post("/api/check/upload")]
async fn check_upload(mut payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    let job_id = Uuid::new_v4().to_string();
    let mut saved_path: Option<PathBuf> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let (is_file, extension) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name() == Some("file"),
                cd.get_filename().map(upload_extension).unwrap_or("csv"),
            ),
            None => (false, "csv"),
        };
        if !is_file {
            continue;
        }

        if let Err(e) = std::fs::create_dir_all(UPLOAD_DIR) {
            return error_response(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, e);
        }
        let file_path = PathBuf::from(UPLOAD_DIR).join(format!("{}.{}", job_id, extension));
        let mut f = match std::fs::File::create(&file_path) {
            Ok(f) => f,
            Err(e) => return error_response(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, e),
        };

        let mut written = 0usize;
        loop {
            match field.try_next().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = f.write_all(&chunk) {
                        return error_response(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, e);
                    }
                    written += chunk.len();
                }
                Ok(None) => break,
                Err(e) => return error_response(actix_web::http::StatusCode::BAD_REQUEST, e),
            }
        }

        // An empty file input still sends the field with no bytes.
        if written > 0 {
            saved_path = Some(file_path);
        }
    }

    match saved_path {
        Some(path) => {
            log::info!("Saved upload for job {} to {:?}", job_id, path);
            data.job_manager.start_job(job_id.clone(), JobInput::Upload(path));
            job_started(&job_id)
        }
        None => error_response(actix_web::http::StatusCode::BAD_REQUEST, CheckerError::NoFileProvided),
    }
}

fn upload_extension(original_name: &str) -> &'static str {
    let lower = original_name.to_lowercase();
    ["xlsx", "xlsm", "xls", "ods"]
        .into_iter()
        .find(|ext| lower.ends_with(&format!(".{}", ext)))
        .unwrap_or("csv")
}

#[get("/api/status/{job_id}")]
async fn get_status(path: web::Path<String>, data: web::Data<AppState>) -> impl Responder {
    match data.job_manager.get(&path.into_inner()) {
        Some(job) => HttpResponse::Ok().json(job),
        None => error_response(actix_web::http::StatusCode::NOT_FOUND, "Job not found"),
    }
}

#[get("/api/download/{job_id}/{kind}")]
async fn download_result(path: web::Path<(String, String)>, data: web::Data<AppState>) -> impl Responder {
    let (job_id, kind) = path.into_inner();
    let Some(job) = data.job_manager.get(&job_id) else {
        return error_response(actix_web::http::StatusCode::NOT_FOUND, "Job not found");
    };

    let (file_path, content_type) = match kind.as_str() {
        "csv" => (job.csv_path, "text/csv"),
        "txt" => (job.text_path, "text/plain"),
        _ => return error_response(actix_web::http::StatusCode::NOT_FOUND, "Unknown export type"),
    };
    let Some(file_path) = file_path else {
        return error_response(actix_web::http::StatusCode::NOT_FOUND, "Result file not generated yet.");
    };

    match std::fs::read(&file_path) {
        Ok(content) => {
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            HttpResponse::Ok()
                .content_type(content_type)
                .append_header(("Content-Disposition", format!("attachment; filename=\"{}\"", file_name)))
                .body(content)
        }
        Err(e) => error_response(actix_web::http::StatusCode::NOT_FOUND, e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ServerArgs::parse();
    let config = args
        .config
        .into_config()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let log_path = logger::init(&config.output_dir);
    let orchestrator = Orchestrator::new(config, log_path);
    let state = web::Data::new(AppState { job_manager: JobManager::new(orchestrator) });

    log::info!("Starting Web Server at http://{}", args.bind);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(index)
            .service(health_check)
            .service(check_text)
            .service(check_upload)
            .service(get_status)
            .service(download_result)
    })
    .bind(args.bind.as_str())?
    .run()
    .await
}
