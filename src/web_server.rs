//! The HTTP transport: a thread-per-connection server exposing the engine's
//! endpoints over raw `TcpListener`/`TcpStream`, no web framework. Each
//! connection runs on its own spawned thread, matching the
//! request-level-parallelism model: independent requests share nothing but
//! the on-disk `LayoutStore`/`LayoutManager`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::coordinator::{Coordinator, OptimizeRequest};
use crate::errors::EngineError;
use crate::grid::PhysicalPoint;
use crate::layout::{LayoutManager, LayoutStore};
use crate::pathfinding::supported_algorithm_tags;

pub struct Server {
    store: Arc<LayoutStore>,
    manager: Arc<LayoutManager>,
}

impl Server {
    pub fn new(store: LayoutStore, manager: LayoutManager) -> Self {
        Self {
            store: Arc::new(store),
            manager: Arc::new(manager),
        }
    }

    /// Bind and serve forever, one thread per accepted connection.
    pub fn run(&self, bind_address: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind_address)?;
        info!(address = bind_address, "listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let store = Arc::clone(&self.store);
                    let manager = Arc::clone(&self.manager);
                    thread::spawn(move || handle_connection(stream, &store, &manager));
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
        Ok(())
    }
}

struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<Request>> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line)? == 0 {
        return Ok(None);
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("/").to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }

    Ok(Some(Request { method, path, body }))
}

fn handle_connection(mut stream: TcpStream, store: &LayoutStore, manager: &LayoutManager) {
    let request = match read_request(&mut stream) {
        Ok(Some(r)) => r,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "failed to read request");
            return;
        }
    };

    let (status, content_type, body) = route(&request, store, manager);
    if let Err(e) = write_response(&mut stream, status, content_type, &body) {
        warn!(error = %e, "failed to write response");
    }
}

fn route(request: &Request, store: &LayoutStore, manager: &LayoutManager) -> (u16, &'static str, Vec<u8>) {
    let path = request.path.split('?').next().unwrap_or("/");

    match (request.method.as_str(), path) {
        ("POST", "/upload_layout") => upload_layout(store, manager, &request.body),
        ("POST", "/optimize_path") => optimize_path(store, manager, &request.body),
        ("POST", "/validate_poi_placement") => validate_poi_placement(store, &request.body),
        ("GET", "/layout_status") => layout_status(store),
        ("GET", "/layout_hash") => layout_hash(store),
        ("GET", "/layout_svg") => layout_svg(store),
        ("GET", "/pathfinding_algorithms") => pathfinding_algorithms(),
        ("GET", "/healthz") => (200, "application/json", br#"{"status":"ok"}"#.to_vec()),
        _ => (404, "application/json", json_error_body("NotFound", "no such route")),
    }
}

fn upload_layout(store: &LayoutStore, manager: &LayoutManager, body: &[u8]) -> (u16, &'static str, Vec<u8>) {
    match store.save(body) {
        Ok(outcome) => {
            let svg_outcome = store
                .load(outcome.hash)
                .and_then(|grid| manager.ensure_svg(store, &grid, outcome.hash));
            let generated_svg = matches!(svg_outcome, Ok(ref o) if o.regenerated);
            if let Err(e) = &svg_outcome {
                warn!(error = %e, "SVG generation after upload failed");
            }

            let body = json!({
                "success": true,
                "layout_hash": outcome.hash.to_hex(),
                "rows": outcome.rows,
                "cols": outcome.cols,
                "edge_length_cm": outcome.edge_length_cm,
                "updated": outcome.updated,
                "generated_layout_svg": generated_svg,
            });
            (200, "application/json", serde_json::to_vec(&body).unwrap())
        }
        Err(e) => error_response(&e),
    }
}

fn optimize_path(store: &LayoutStore, manager: &LayoutManager, body: &[u8]) -> (u16, &'static str, Vec<u8>) {
    let request: OptimizeRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(&EngineError::invalid_layout(format!("bad request body: {e}")));
        }
    };

    match Coordinator::optimize(store, manager, request) {
        Ok(response) => (200, "application/json", serde_json::to_vec(&response).unwrap()),
        Err(e) => {
            error!(error = %e, "optimize_path failed");
            error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    poi_coordinates: Vec<PhysicalPoint>,
}

fn validate_poi_placement(store: &LayoutStore, body: &[u8]) -> (u16, &'static str, Vec<u8>) {
    let request: ValidateRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(&EngineError::invalid_layout(format!("bad request body: {e}")));
        }
    };

    match Coordinator::validate_poi_placement(store, &request.poi_coordinates) {
        Ok(summary) => {
            let body = json!({ "success": true, "results": summary });
            (200, "application/json", serde_json::to_vec(&body).unwrap())
        }
        Err(e) => error_response(&e),
    }
}

fn layout_status(store: &LayoutStore) -> (u16, &'static str, Vec<u8>) {
    match store.load_current() {
        Ok((grid, hash)) => {
            let obstacle_count = grid
                .iter_cells()
                .filter(|(_, c)| *c == crate::grid::CellCode::Obstacle)
                .count();
            let navigable_count = grid.iter_cells().filter(|(_, c)| c.is_walkable()).count();
            let body = json!({
                "layout_hash": hash.to_hex(),
                "rows": grid.rows(),
                "cols": grid.cols(),
                "edge_length_cm": grid.edge_length_cm().get(),
                "obstacle_count": obstacle_count,
                "navigable_count": navigable_count,
                "svg_cached": store.svg_path(hash).exists(),
            });
            (200, "application/json", serde_json::to_vec(&body).unwrap())
        }
        Err(_) => (
            200,
            "application/json",
            serde_json::to_vec(&json!({ "layout_hash": null, "uploaded": false })).unwrap(),
        ),
    }
}

fn layout_hash(store: &LayoutStore) -> (u16, &'static str, Vec<u8>) {
    match store.current_hash() {
        Ok(Some(hash)) => (
            200,
            "application/json",
            serde_json::to_vec(&json!({ "layout_hash": hash.to_hex() })).unwrap(),
        ),
        _ => (
            200,
            "application/json",
            serde_json::to_vec(&json!({ "layout_hash": null, "uploaded": false })).unwrap(),
        ),
    }
}

fn layout_svg(store: &LayoutStore) -> (u16, &'static str, Vec<u8>) {
    let hash = match store.current_hash() {
        Ok(Some(h)) => h,
        _ => return (404, "application/json", json_error_body("NoLayout", "no layout uploaded")),
    };
    match std::fs::read(store.svg_path(hash)) {
        Ok(bytes) => (200, "image/svg+xml", bytes),
        Err(_) => (404, "application/json", json_error_body("StorageIO", "svg not yet generated")),
    }
}

fn pathfinding_algorithms() -> (u16, &'static str, Vec<u8>) {
    let body = json!({
        "algorithms": supported_algorithm_tags(),
        "default": "astar",
    });
    (200, "application/json", serde_json::to_vec(&body).unwrap())
}

fn error_response(err: &EngineError) -> (u16, &'static str, Vec<u8>) {
    let status = err.http_status();
    (status, "application/json", json_error_body(err.kind(), &err.to_string()))
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    message: &'a str,
}

fn json_error_body(kind: &str, message: &str) -> Vec<u8> {
    serde_json::to_vec(&ErrorBody {
        success: false,
        error: kind,
        message,
    })
    .unwrap()
}

fn write_response(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) -> std::io::Result<()> {
    let status_text = match status {
        200 => "OK",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let header = format!(
        "HTTP/1.1 {status} {status_text}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)
}
