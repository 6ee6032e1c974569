use std::{
    net::{TcpListener, TcpStream},
    process::Command,
    time::Duration,
};

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}

#[test]
fn unreachable_database_exits_with_code_1_before_listening() {
    let port = free_port();

    let output = Command::new(env!("CARGO_BIN_EXE_calesync"))
        .env("HOST", "127.0.0.1")
        .env("PORT", port.to_string())
        .env("MONGODB_URI", "mongodb://127.0.0.1:1/calesync")
        .env("MONGODB_SERVER_SELECTION_TIMEOUT_MS", "300")
        .env("RUST_LOG", "calesync=info")
        .env("NO_COLOR", "1")
        .env_remove("LOG_FORMAT")
        .output()
        .expect("run calesync binary");

    assert_eq!(output.status.code(), Some(1));

    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("connect to MongoDB"), "logs: {logs}");
    assert!(!logs.contains("server is running"), "logs: {logs}");
    assert!(!logs.contains("MongoDB disconnected"), "logs: {logs}");

    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
}

#[test]
fn malformed_port_exits_with_code_1() {
    let output = Command::new(env!("CARGO_BIN_EXE_calesync"))
        .env("PORT", "eighty")
        .env("RUST_LOG", "calesync=info")
        .env("NO_COLOR", "1")
        .env_remove("LOG_FORMAT")
        .output()
        .expect("run calesync binary");

    assert_eq!(output.status.code(), Some(1));
    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("load configuration"), "logs: {logs}");
}
