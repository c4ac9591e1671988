//! End-to-end tests against the `respkv` binary.

#![cfg(unix)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn spawn_server(addr: &str, dir: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_respkv"))
        .args(["-addr", addr, "-dir"])
        .arg(dir)
        .env("RUST_LOG", "info")
        .env("NO_COLOR", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn connect(addr: &str) -> TcpStream {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .unwrap();
                return stream;
            }
            Err(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => panic!("server never came up on {}: {}", addr, e),
        }
    }
}

fn roundtrip(stream: &mut TcpStream, request: &[u8], reply_len: usize) -> Vec<u8> {
    stream.write_all(request).unwrap();
    let mut buf = vec![0u8; reply_len];
    stream.read_exact(&mut buf).unwrap();
    buf
}

fn interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn test_sigint_exits_cleanly_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let addr = free_addr();

    let server = spawn_server(&addr, dir.path());
    let mut client = connect(&addr);
    assert_eq!(
        roundtrip(&mut client, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n", 5),
        b"+OK\r\n"
    );
    drop(client);

    interrupt(&server);
    let output = server.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let logs = String::from_utf8_lossy(&output.stdout);
    assert_eq!(logs.matches("Closing store").count(), 1, "logs:\n{}", logs);

    let server = spawn_server(&addr, dir.path());
    let mut client = connect(&addr);
    assert_eq!(
        roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n", 7),
        b"$1\r\nv\r\n"
    );
    drop(client);

    interrupt(&server);
    assert_eq!(server.wait_with_output().unwrap().status.code(), Some(0));
}

#[test]
fn test_bind_failure_exits_non_zero() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();
    let dir = tempfile::tempdir().unwrap();

    let output = spawn_server(&addr, dir.path()).wait_with_output().unwrap();
    assert_ne!(output.status.code(), Some(0));
}
