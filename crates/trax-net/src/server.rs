//! Synchronous TCP driver.
//!
//! The core stays synchronous; this driver owns the sockets and threads.
//! Each connection gets a handler thread; all connections share one
//! session (model, planner) behind a mutex, so the single-writer rule of
//! the core holds: a solve and an obstacle edit never interleave.

use crate::framing::{read_frame, write_frame};
use crate::messages::MessageType;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use trax_algo::{report, Planner, SolveOptions, Weights};
use trax_core::{Agent, GeoPoint, Planet, TraxError};
use trax_io::load_model;
use trax_scenarios::{resolve_in_frame, CoordinateSystem};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory scanned for loadable terrain models.
    pub models_dir: PathBuf,
    pub agent: Agent,
    pub weights: Weights,
    pub alpha: f64,
}

/// Shared per-server session state.
pub struct Session {
    config: ServerConfig,
    planner: Option<Planner>,
}

impl Session {
    pub fn new(config: ServerConfig) -> Self {
        Session { config, planner: None }
    }
}

/// Bind and serve until the process exits.
pub fn serve<A: ToSocketAddrs + std::fmt::Display>(addr: A, config: ServerConfig) -> Result<()> {
    let listener =
        TcpListener::bind(&addr).with_context(|| format!("binding server to {addr}"))?;
    info!(%addr, "traverse server listening");
    let session = Arc::new(Mutex::new(Session::new(config)));
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
                    if let Err(err) = handle_connection(stream, &session) {
                        warn!(peer, "connection ended: {err:#}");
                    }
                });
            }
            Err(err) => error!("accept failed: {err}"),
        }
    }
    Ok(())
}

/// Serve frames from one client until it disconnects.
pub fn handle_connection(mut stream: TcpStream, session: &Mutex<Session>) -> Result<()> {
    loop {
        let Some((message_type, payload)) = read_frame(&mut stream)? else {
            return Ok(());
        };
        let (response_type, response) = {
            let mut session = session
                .lock()
                .map_err(|_| anyhow!("session mutex poisoned"))?;
            dispatch(&mut session, message_type, &payload)
        };
        write_frame(&mut stream, response_type, &response)?;
    }
}

/// Route one request to its handler; failures become a `Simple` error
/// envelope carrying the stable error kind.
fn dispatch(session: &mut Session, message_type: MessageType, payload: &Value) -> (MessageType, Value) {
    let result = match message_type {
        MessageType::AvailableModelsRequest => available_models(session),
        MessageType::ModelLoadRequest => load_model_request(session, payload),
        MessageType::StartPointSetRequest => set_endpoint(session, payload, true),
        MessageType::EndPointSetRequest => set_endpoint(session, payload, false),
        MessageType::RadialObstacleSetRequest => set_radial_obstacle(session, payload),
        MessageType::PathFindRequest => find_path(session),
        other => Err(anyhow!("'{other:?}' is not a request")),
    };
    match (message_type.response(), result) {
        (Some(response_type), Ok(body)) => (response_type, body),
        (_, Err(err)) => (MessageType::Simple, error_envelope(&err)),
        (None, Ok(_)) => (
            MessageType::Simple,
            json!({"error": "protocol_error", "detail": "message is not a request"}),
        ),
    }
}

fn error_envelope(err: &anyhow::Error) -> Value {
    let kind = err
        .downcast_ref::<TraxError>()
        .map(TraxError::kind)
        .unwrap_or("io_error");
    json!({"error": kind, "detail": format!("{err:#}")})
}

fn available_models(session: &Session) -> Result<Value> {
    let mut models: Vec<String> = Vec::new();
    let dir = &session.config.models_dir;
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("listing models in {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if matches!(ext, "txt" | "tif" | "tiff" | "png") {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                models.push(name.to_string());
            }
        }
    }
    models.sort();
    Ok(json!({"models": models}))
}

fn load_model_request(session: &mut Session, payload: &Value) -> Result<Value> {
    let model = payload["model"]
        .as_str()
        .context("'model' field is required")?;
    let max_slope = payload["max_slope"].as_f64().unwrap_or(35.0);
    let planet = payload["planet"]
        .as_str()
        .map(|p| serde_json::from_value(json!(p)))
        .transpose()
        .context("bad 'planet' field")?
        .unwrap_or(Planet::Earth);
    let path = session.config.models_dir.join(model);
    let grid = load_model(&path, planet, max_slope)?;
    let body = json!({
        "model": model,
        "width": grid.width(),
        "height": grid.height(),
        "resolution": grid.resolution(),
    });
    session.planner = Some(Planner::new(
        grid,
        session.config.agent,
        session.config.weights,
        session.config.alpha,
    ));
    info!(model, "model loaded");
    Ok(body)
}

fn coordinate_args(payload: &Value) -> Result<(CoordinateSystem, [f64; 2])> {
    let system: CoordinateSystem = serde_json::from_value(
        payload
            .get("coordinate_system")
            .cloned()
            .unwrap_or(json!("row_col")),
    )
    .context("bad 'coordinate_system' field")?;
    let pair = payload["coordinates"]
        .as_array()
        .filter(|a| a.len() == 2)
        .context("'coordinates' must be a two-element array")?;
    let a = pair[0].as_f64().context("bad coordinate value")?;
    let b = pair[1].as_f64().context("bad coordinate value")?;
    Ok((system, [a, b]))
}

fn planner_of(session: &mut Session) -> Result<&mut Planner> {
    session.planner.as_mut().context("no model loaded")
}

fn set_endpoint(session: &mut Session, payload: &Value, is_start: bool) -> Result<Value> {
    let (system, pair) = coordinate_args(payload)?;
    let planner = planner_of(session)?;
    let cell = resolve_in_frame(planner.grid(), system, pair)?;
    let point = GeoPoint::RowCol { row: cell.row, col: cell.col };
    let cell = if is_start { planner.set_start(point)? } else { planner.set_goal(point)? };
    Ok(json!({"coordinates": [cell.row, cell.col]}))
}

fn set_radial_obstacle(session: &mut Session, payload: &Value) -> Result<Value> {
    let (system, pair) = coordinate_args(payload)?;
    let radius = payload["radius"].as_f64().context("'radius' field is required")?;
    let state = payload["state"].as_bool().unwrap_or(true);
    let planner = planner_of(session)?;
    let center = resolve_in_frame(planner.grid(), system, pair)?;
    let changed = planner.set_obstacle_disc(
        GeoPoint::RowCol { row: center.row, col: center.col },
        radius,
        state,
    )?;
    Ok(json!({"changed": changed, "state": state}))
}

fn find_path(session: &mut Session) -> Result<Value> {
    let planner = planner_of(session)?;
    let traverse = planner.find_path(&SolveOptions::default())?;
    Ok(report::traverse_json(&traverse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn test_config(dir: &std::path::Path) -> ServerConfig {
        ServerConfig {
            models_dir: dir.to_path_buf(),
            agent: Agent::default(),
            weights: Weights::energy_only(),
            alpha: 1.0,
        }
    }

    fn write_flat_model(dir: &std::path::Path) {
        let mut body = String::from("cellsize 1\n");
        for _ in 0..5 {
            body.push_str("0 0 0 0 0\n");
        }
        std::fs::write(dir.join("flat.txt"), body).unwrap();
    }

    fn request(stream: &mut TcpStream, t: MessageType, payload: Value) -> (MessageType, Value) {
        write_frame(stream, t, &payload).unwrap();
        read_frame(stream).unwrap().expect("server closed early")
    }

    #[test]
    fn test_full_session_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        write_flat_model(dir.path());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let session = Mutex::new(Session::new(test_config(dir.path())));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let (stream, _) = listener.accept().unwrap();
                handle_connection(stream, &session).unwrap();
            });

            let mut client = TcpStream::connect(addr).unwrap();

            let (t, body) =
                request(&mut client, MessageType::AvailableModelsRequest, json!({}));
            assert_eq!(t, MessageType::AvailableModels);
            assert_eq!(body["models"], json!(["flat.txt"]));

            let (t, body) = request(
                &mut client,
                MessageType::ModelLoadRequest,
                json!({"model": "flat.txt", "max_slope": 35.0}),
            );
            assert_eq!(t, MessageType::ModelLoaded);
            assert_eq!(body["width"], json!(5));

            let (t, body) = request(
                &mut client,
                MessageType::StartPointSetRequest,
                json!({"coordinates": [0, 0], "coordinate_system": "row_col"}),
            );
            assert_eq!(t, MessageType::StartPointSet);
            assert_eq!(body["coordinates"], json!([0, 0]));

            let (t, _) = request(
                &mut client,
                MessageType::EndPointSetRequest,
                json!({"coordinates": [4, 4], "coordinate_system": "row_col"}),
            );
            assert_eq!(t, MessageType::EndPointSet);

            let (t, body) = request(&mut client, MessageType::PathFindRequest, json!({}));
            assert_eq!(t, MessageType::PathFound);
            assert_eq!(body["path"].as_array().unwrap().len(), 5);
            assert_eq!(body["alpha"], json!(1.0));

            drop(client);
        });
    }

    #[test]
    fn test_obstacle_round_trip_changes_path() {
        let dir = tempfile::tempdir().unwrap();
        write_flat_model(dir.path());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let session = Mutex::new(Session::new(test_config(dir.path())));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let (stream, _) = listener.accept().unwrap();
                handle_connection(stream, &session).unwrap();
            });

            let mut client = TcpStream::connect(addr).unwrap();
            request(
                &mut client,
                MessageType::ModelLoadRequest,
                json!({"model": "flat.txt"}),
            );
            request(
                &mut client,
                MessageType::StartPointSetRequest,
                json!({"coordinates": [0, 0]}),
            );
            request(
                &mut client,
                MessageType::EndPointSetRequest,
                json!({"coordinates": [4, 4]}),
            );

            let (t, body) = request(
                &mut client,
                MessageType::RadialObstacleSetRequest,
                json!({"coordinates": [2, 2], "radius": 1.0}),
            );
            assert_eq!(t, MessageType::ObstaclesChanged);
            assert_eq!(body["changed"], json!(5));

            let (_, body) = request(&mut client, MessageType::PathFindRequest, json!({}));
            assert!(body["path"].as_array().unwrap().len() > 5);
            drop(client);
        });
    }

    #[test]
    fn test_error_envelope_for_blocked_solve() {
        let dir = tempfile::tempdir().unwrap();
        write_flat_model(dir.path());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let session = Mutex::new(Session::new(test_config(dir.path())));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let (stream, _) = listener.accept().unwrap();
                handle_connection(stream, &session).unwrap();
            });

            let mut client = TcpStream::connect(addr).unwrap();
            // Path find with no model loaded → Simple error envelope.
            let (t, body) = request(&mut client, MessageType::PathFindRequest, json!({}));
            assert_eq!(t, MessageType::Simple);
            assert!(body["error"].is_string());
            drop(client);
        });
    }
}
