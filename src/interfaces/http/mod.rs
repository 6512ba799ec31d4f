use crate::application::LookupUseCase;
use crate::domain::error::{AppError, Result};
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("index.html");
const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub lookup: Arc<LookupUseCase>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub value: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct ReloadResponse {
    rows: usize,
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/lookup")]
async fn lookup_value(
    data: web::Data<HttpState>,
    query: web::Query<LookupQuery>,
) -> impl Responder {
    let value = query.into_inner().value;
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Lookup value={:?}", value),
    );

    let use_case = data.lookup.clone();
    match run_blocking(move || use_case.execute(&value)).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Lookup failed: {}", e),
            );
            error_response(&e)
        }
    }
}

#[get("/columns")]
async fn columns(data: web::Data<HttpState>) -> impl Responder {
    let use_case = data.lookup.clone();
    match run_blocking(move || use_case.columns()).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => error_response(&e),
    }
}

#[post("/reload")]
async fn reload(data: web::Data<HttpState>) -> impl Responder {
    add_log(&data.logs, "INFO", "HttpApi", "Reloading dataset");

    let use_case = data.lookup.clone();
    match run_blocking(move || use_case.reload()).await {
        Ok(rows) => {
            add_log(
                &data.logs,
                "INFO",
                "HttpApi",
                &format!("Dataset reloaded ({} rows)", rows),
            );
            HttpResponse::Ok().json(ReloadResponse { rows })
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Reload failed: {}", e),
            );
            error_response(&e)
        }
    }
}

#[get("/health")]
async fn health(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.lookup.cache_stats())
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(PoisonError::into_inner);
    HttpResponse::Ok().json(&*logs)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

fn error_response(err: &AppError) -> HttpResponse {
    let body = ErrorBody {
        error: err.to_string(),
    };
    match err {
        AppError::ValidationError(_) => HttpResponse::BadRequest().json(body),
        AppError::LoadError(_) => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(PoisonError::into_inner);
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

/// Record a UI-visible log line and mirror it to tracing.
pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    match level {
        "ERROR" => error!(source, "{}", message),
        "WARN" => warn!(source, "{}", message),
        _ => info!(source, "{}", message),
    }
    add_log_entry(logs, level, source, message);
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(
        web::scope("/api")
            .service(lookup_value)
            .service(columns)
            .service(reload)
            .service(health)
            .service(get_logs),
    );
}

pub fn start_server(
    lookup: Arc<LookupUseCase>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    host: &str,
    port: u16,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { lookup, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Local tool; any origin may query

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
