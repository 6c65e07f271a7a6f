//! Control-plane integration: a real listener on an ephemeral port,
//! driven with raw HTTP over a TcpStream.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use uuid::Uuid;

use fivefret::flags::http::FlagServer;
use fivefret::flags::{FlagOracle, InMemoryFlagOracle, ProfileFlag};

fn request(addr: &str, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).expect("connect to flag server");
    stream.write_all(raw.as_bytes()).expect("send request");
    let mut response = String::new();
    stream.read_to_string(&mut response).expect("read response");
    response
}

#[test]
fn server_sets_flags_over_the_wire() {
    let oracle = Arc::new(InMemoryFlagOracle::new());
    let server = FlagServer::spawn("127.0.0.1:0", Arc::clone(&oracle)).expect("bind");
    let profile = Uuid::new_v4();

    let response = request(
        server.addr(),
        &format!(
            "PUT /flags/set/{profile}/AutoPlay/true HTTP/1.1\r\nHost: x\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        ),
    );
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("\"enabled\":true"));
    assert!(oracle.is_flag_set(profile, ProfileFlag::AutoPlay));

    let response = request(
        server.addr(),
        "GET /flags/status HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(&profile.to_string()));
    assert!(response.contains("\"AutoPlay\":true"));
}

#[test]
fn server_rejects_garbage_with_json_errors() {
    let oracle = Arc::new(InMemoryFlagOracle::new());
    let server = FlagServer::spawn("127.0.0.1:0", Arc::clone(&oracle)).expect("bind");

    let response = request(
        server.addr(),
        "PUT /flags/set/not-a-uuid/AutoPlay/true HTTP/1.1\r\nHost: x\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 400"));
    assert!(response.contains("invalid profile id"));

    let response = request(
        server.addr(),
        "GET /nowhere HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
    );
    assert!(response.starts_with("HTTP/1.1 404"));
}
