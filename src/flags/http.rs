//! HTTP control plane for the profile flag store.
//!
//! Runs on its own thread and only touches the shared
//! `InMemoryFlagOracle`; it never calls into the engine. Routing is a
//! pure function over method and path so it is testable without opening
//! a socket.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::flags::oracle::{InMemoryFlagOracle, ProfileFlag};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagRequestError {
    #[error("invalid profile id: {0}")]
    InvalidProfile(String),
    #[error("unknown flag: {0}")]
    UnknownFlag(String),
    #[error("the None flag cannot be set")]
    NoneFlag,
    #[error("invalid boolean: {0}")]
    InvalidBool(String),
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReply {
    pub status: u16,
    pub body: Value,
}

impl RouteReply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn bad_request(err: FlagRequestError) -> Self {
        Self {
            status: 400,
            body: json!({ "error": err.to_string() }),
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            body: json!({ "error": "not found" }),
        }
    }
}

fn parse_profile(raw: &str) -> Result<Uuid, FlagRequestError> {
    Uuid::parse_str(raw).map_err(|_| FlagRequestError::InvalidProfile(raw.to_string()))
}

/// Flag-name parsing is case-insensitive; `None` is parseable but never
/// settable.
fn parse_flag(raw: &str) -> Result<ProfileFlag, FlagRequestError> {
    match ProfileFlag::parse(raw) {
        Some(ProfileFlag::None) => Err(FlagRequestError::NoneFlag),
        Some(flag) => Ok(flag),
        None => Err(FlagRequestError::UnknownFlag(raw.to_string())),
    }
}

fn parse_bool(raw: &str) -> Result<bool, FlagRequestError> {
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(FlagRequestError::InvalidBool(raw.to_string()))
    }
}

fn set_reply(
    oracle: &InMemoryFlagOracle,
    profile_raw: &str,
    flag_raw: &str,
    enabled: bool,
) -> Result<RouteReply, FlagRequestError> {
    let profile = parse_profile(profile_raw)?;
    let flag = parse_flag(flag_raw)?;
    oracle.set_flag(profile, flag, enabled);
    Ok(RouteReply::ok(json!({
        "profileId": profile.to_string(),
        "flag": flag.name(),
        "enabled": enabled,
    })))
}

fn status_reply(oracle: &InMemoryFlagOracle) -> RouteReply {
    let mut profiles = serde_json::Map::new();
    for (profile, bits) in oracle.snapshot() {
        let mut entry = serde_json::Map::new();
        for flag in ProfileFlag::all() {
            entry.insert(flag.name().to_string(), json!(bits & flag.bit() != 0));
        }
        profiles.insert(profile.to_string(), Value::Object(entry));
    }
    RouteReply::ok(Value::Object(profiles))
}

/// Dispatch one request against the store.
pub fn route(method: &str, path: &str, oracle: &InMemoryFlagOracle) -> RouteReply {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let result = match (method, segments.as_slice()) {
        ("GET", ["flags", "status"]) => return status_reply(oracle),
        ("PUT", ["flags", "set", profile, flag, value]) => match parse_bool(value) {
            Ok(enabled) => set_reply(oracle, profile, flag, enabled),
            Err(err) => Err(err),
        },
        // Deprecated aliases of /flags/set.
        ("PUT", ["flags", "enable", profile, flag]) => set_reply(oracle, profile, flag, true),
        ("PUT", ["flags", "disable", profile, flag]) => set_reply(oracle, profile, flag, false),
        _ => return RouteReply::not_found(),
    };
    match result {
        Ok(reply) => reply,
        Err(err) => RouteReply::bad_request(err),
    }
}

/// The running control plane. The listener thread lives until the
/// process exits.
pub struct FlagServer {
    addr: String,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl FlagServer {
    /// Bind and serve in a background thread. A bind failure is an
    /// error for the caller to log; the engine keeps running without
    /// the control plane either way.
    pub fn spawn(addr: &str, oracle: Arc<InMemoryFlagOracle>) -> Result<Self> {
        let server = tiny_http::Server::http(addr)
            .map_err(|e| anyhow::anyhow!("cannot bind flag server on {addr}: {e}"))?;
        let bound = server
            .server_addr()
            .to_ip()
            .map(|a| a.to_string())
            .unwrap_or_else(|| addr.to_string());
        info!("flag control plane listening on {bound}");
        let handle = thread::Builder::new()
            .name("flag-http".to_string())
            .spawn(move || serve(server, oracle))
            .context("cannot spawn flag server thread")?;
        Ok(Self {
            addr: bound,
            handle,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

fn serve(server: tiny_http::Server, oracle: Arc<InMemoryFlagOracle>) {
    for request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or("");
        let reply = route(&method, path, &oracle);
        let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
            .expect("static header");
        let response = tiny_http::Response::from_string(reply.body.to_string())
            .with_status_code(reply.status)
            .with_header(header);
        if let Err(e) = request.respond(response) {
            error!("flag server response failed: {e}");
        }
    }
}
