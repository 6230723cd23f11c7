#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

use discipc::frame::{FrameReader, FrameWriter, Handshake, Opcode};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "discipc-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn discipc(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_discipc"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .arg("--pipe-dir")
        .arg(dir)
        .args(args)
        .env_remove("DISCIPC_CLIENT_ID")
        .output()
        .expect("discipc should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let text = String::from_utf8_lossy(&output.stdout);
    let line = text.lines().last().expect("stdout should have a line");
    serde_json::from_str(line).expect("stdout should be JSON")
}

#[test]
fn probe_first_reports_lowest_listening_channel() {
    let dir = unique_temp_dir("probe-first");
    let _listener = UnixListener::bind(dir.join("discord-ipc-3")).expect("bind");

    let output = discipc(&dir, &["probe", "--first"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json[0]["channel"], 3);
    assert_eq!(json[0]["reachable"], true);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn probe_without_peers_exits_with_transport_code() {
    let dir = unique_temp_dir("probe-none");

    let output = discipc(&dir, &["probe"]);
    assert_eq!(output.status.code(), Some(3));

    let json = stdout_json(&output);
    let results = json.as_array().expect("probe output should be an array");
    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|r| r["reachable"] == false));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn handshake_wait_prints_peer_reply() {
    let dir = unique_temp_dir("handshake");
    let listener = UnixListener::bind(dir.join("discord-ipc-0")).expect("bind");

    let peer = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = FrameReader::new(stream.try_clone().expect("clone"));
        let frame = reader.try_read_frame().expect("handshake frame");
        assert_eq!(frame.kind(), Some(Opcode::Handshake));
        let handshake = Handshake::from_payload(frame.data()).expect("handshake json");
        assert_eq!(handshake.client_id, "4242");

        FrameWriter::new(stream)
            .send(Opcode::Frame.into(), br#"{"evt":"READY"}"#)
            .expect("reply");
    });

    let output = discipc(&dir, &["handshake", "--client-id", "4242", "--wait"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    peer.join().expect("peer thread");

    let json = stdout_json(&output);
    assert_eq!(json["channel"], 0);
    assert_eq!(json["opcode_name"], "FRAME");
    assert_eq!(json["payload"], r#"{"evt":"READY"}"#);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_on_explicit_channel_echoes_payload() {
    let dir = unique_temp_dir("send");
    let listener = UnixListener::bind(dir.join("discord-ipc-5")).expect("bind");

    let peer = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = FrameReader::new(stream.try_clone().expect("clone"));
        let mut writer = FrameWriter::new(stream);
        let frame = reader.try_read_frame().expect("frame");
        writer.write_frame(&frame).expect("echo");
        writer.send(Opcode::Close.into(), b"{}").expect("close");
    });

    let output = discipc(
        &dir,
        &[
            "send",
            "--channel",
            "5",
            "--json",
            r#"{"cmd":"PING"}"#,
            "--wait",
            "--count",
            "5",
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    peer.join().expect("peer thread");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
    assert_eq!(first["channel"], 5);
    assert_eq!(first["payload"], r#"{"cmd":"PING"}"#);
    let last: serde_json::Value = serde_json::from_str(lines[1]).expect("json");
    assert_eq!(last["opcode_name"], "CLOSE");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_rejects_invalid_json_payload() {
    let dir = unique_temp_dir("bad-json");

    let output = discipc(&dir, &["send", "--json", "{not json"]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_channel_fails_with_transport_code() {
    let dir = unique_temp_dir("missing");

    let output = discipc(&dir, &["send", "--channel", "2", "--data", "x"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));

    let _ = std::fs::remove_dir_all(&dir);
}
