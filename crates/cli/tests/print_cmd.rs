//! CLI tests for the print and status subcommands.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use assert_cmd::cargo;

fn labelprint_cmd() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("labelprint"));
    cmd.env_remove("LABELPRINT_PRINTER").env_remove("RUST_LOG");
    cmd
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid json {stdout:?}: {e}"))
}

/// One-connection mock printer: answers `~S,MODEL` with `SRP-Q300` and
/// status queries with `status`. Returns the port and a handle yielding
/// everything received.
fn mock_printer(status: u8) -> (u16, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    received.extend_from_slice(&buf[..n]);
                    if received.ends_with(b"~S,MODEL\r\n") {
                        stream.write_all(b"SRP-Q300\r\n").unwrap();
                    } else if received.ends_with(b"~S,CHECK\r\n") {
                        stream.write_all(&[status]).unwrap();
                    }
                }
            }
        }
        received
    });
    (port, handle)
}

#[test]
fn help_lists_subcommands() {
    let output = labelprint_cmd().arg("--help").output().expect("failed to run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["discover", "status", "text", "barcode", "raster"] {
        assert!(stdout.contains(sub), "missing {sub} in help");
    }
}

#[test]
fn text_help_shows_flags() {
    let output = labelprint_cmd()
        .args(["text", "--help"])
        .output()
        .expect("failed to run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--printer", "--port", "--font", "--align", "--bold", "--timeout-ms"] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
    assert!(stdout.contains("LABELPRINT_PRINTER"));
}

#[test]
fn text_is_printed_over_tcp() {
    let (port, server) = mock_printer(0x00);
    let output = labelprint_cmd()
        .args([
            "text",
            "Hello",
            "--printer",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--output",
            "json",
        ])
        .output()
        .expect("failed to run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let json = json_stdout(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["printer"], "SRP-Q300");

    let received = String::from_utf8(server.join().unwrap()).unwrap();
    assert_eq!(
        received,
        "~S,MODEL\r\nCB\r\nT0,0,3,1,1,0,0,N,N,L,'Hello'\r\nP1,1\r\n"
    );
}

#[test]
fn printer_from_environment() {
    let (port, server) = mock_printer(0x00);
    let output = labelprint_cmd()
        .env("LABELPRINT_PRINTER", "127.0.0.1")
        .args(["barcode", "ABC-123", "--port", &port.to_string(), "--output", "json"])
        .output()
        .expect("failed to run");

    assert!(output.status.success());
    let received = String::from_utf8(server.join().unwrap()).unwrap();
    assert!(received.contains("'ABC-123'"));
    assert!(received.ends_with("P1,1\r\n"));
}

#[test]
fn status_reports_paper_out() {
    let (port, server) = mock_printer(0x04);
    let output = labelprint_cmd()
        .args([
            "status",
            "--printer",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--output",
            "json",
        ])
        .output()
        .expect("failed to run");

    assert!(output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["printer"], "SRP-Q300");
    assert_eq!(json["status"]["connected"], true);
    assert_eq!(json["status"]["paper_out"], true);
    assert_eq!(json["status"]["paper_state"], "out");
    assert!(json["extended"].is_null());
    drop(server.join());
}

#[test]
fn empty_printer_is_validation_error() {
    let output = labelprint_cmd()
        .args(["text", "Hello", "--printer", "", "--output", "json"])
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "validation_error");
}

#[test]
fn refused_connection_is_connect_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let output = labelprint_cmd()
        .args([
            "status",
            "--printer",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "--output",
            "json",
        ])
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["error"], "connect_error");
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("failed to connect to 127.0.0.1:")),
        "unexpected message: {}",
        json["message"]
    );
}

#[test]
fn missing_raster_file_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.png");
    let output = labelprint_cmd()
        .args([
            "raster",
            path.to_str().unwrap(),
            "--printer",
            "127.0.0.1",
            "--output",
            "json",
        ])
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    let json = json_stdout(&output);
    assert_eq!(json["error"], "command_failed");
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.contains("failed to read")),
        "unexpected message: {}",
        json["message"]
    );
}

#[test]
fn pretty_errors_go_to_stderr() {
    let output = labelprint_cmd()
        .args(["text", "Hello", "--printer", "", "--output", "pretty"])
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to connect"), "stderr: {stderr}");
}
