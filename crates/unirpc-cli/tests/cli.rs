//! Integration tests for the unirpc binary

use std::io::Write;
use std::net::SocketAddr;

use assert_cmd::Command;
use tokio::net::TcpListener;
use unirpc_core::Value;
use unirpc_server::{HandlerError, RpcServer};

/// Run a server on a background runtime for the rest of the test process
fn start_server() -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            RpcServer::builder()
                .register_fn("testfun", |_| Ok(vec![Value::from("ok")]))
                .register_fn("fail", |_| Err(HandlerError::value_error("whoops")))
                .register("silent", |_| async {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    Ok(vec![])
                })
                .build()
                .serve_with_shutdown(listener, std::future::pending())
                .await
                .unwrap();
        });
    });
    rx.recv().unwrap()
}

fn unirpc() -> Command {
    Command::cargo_bin("unirpc").unwrap()
}

fn stdout_of(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_call_testfun() {
    let addr = start_server();
    let assert = unirpc()
        .args(["call", "testfun", "--uid", "69420", "-e"])
        .arg(format!("tcp://{}", addr))
        .assert()
        .success();

    let reply = stdout_of(assert.get_output());
    assert_eq!(reply["rpc_tag"], "__RPC_RESULT__");
    assert_eq!(reply["uid"], 69420);
    assert_eq!(reply["result"], serde_json::json!(["ok"]));
}

#[test]
fn test_remote_error_exit_code() {
    let addr = start_server();
    let assert = unirpc()
        .args(["call", "fail", "-e"])
        .arg(addr.to_string())
        .assert()
        .code(4);

    let reply = stdout_of(assert.get_output());
    assert_eq!(reply["exception"], "ValueError");
    assert_eq!(reply["descr"], "whoops");
}

#[test]
fn test_timeout_exit_code() {
    let addr = start_server();
    unirpc()
        .args(["call", "silent", "--timeout-ms", "50", "-e"])
        .arg(addr.to_string())
        .assert()
        .code(3);
}

#[test]
fn test_invalid_args_exit_code() {
    unirpc()
        .args(["call", "testfun", "--args", "{\"not\": \"a list\"}"])
        .assert()
        .code(2);
    unirpc()
        .args(["call", "testfun", "-e", "host:notaport"])
        .assert()
        .code(2);
}

#[test]
fn test_config_file_supplies_endpoint() {
    let addr = start_server();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "endpoint: tcp://{}\ntimeout_ms: 1000", addr).unwrap();

    unirpc()
        .args(["call", "testfun", "--config"])
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn test_explain_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"rpc_tag":"__RPC_RESULT__","handle":"testfun","uid":666,"result":["some string",{{"rpc_tag":"__RPC_VAL_NDARRAY__","dtype":"int64","shape":[3],"data":"BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA"}}]}}"#
    )
    .unwrap();

    let assert = unirpc().arg("explain").arg(file.path()).assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(out.contains("result[1]: int64[3] = [6, 7, 8]"));
}

#[test]
fn test_explain_stdin() {
    let assert = unirpc()
        .arg("explain")
        .write_stdin(r#"{"rpc_tag":"__RPC_ERROR__","handle":"f","uid":1,"exception":"KeyError","descr":"x"}"#)
        .assert()
        .success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(out.contains("exception: KeyError"));
}
