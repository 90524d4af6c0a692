use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};
use serde_json::{Value, json};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{
    fs,
    io::{BufRead, BufReader, ErrorKind, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::Path,
    sync::{
        Arc,
        mpsc::{self, Sender},
    },
    thread,
    time::Duration,
};

use handpose::{Chirality, HandAnchor, ProfileStore};

use super::pipeline::{IpcMsg, Shared, run_pipeline};
use super::runtime::socket_path;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run_daemon() -> Result<()> {
    // socket
    let sock = socket_path()?;
    if sock.exists() {
        let _ = fs::remove_file(&sock);
    }
    let listener = UnixListener::bind(&sock).with_context(|| format!("binding {}", sock.display()))?;
    listener.set_nonblocking(true)?;
    info!("daemon: listening on {}", sock.display());

    // state
    let store = ProfileStore::load_or_install_default()?;
    info!("daemon: active profile '{}'", store.active_name);

    let shared = Arc::new(Shared::new());
    signal_hook::flag::register(SIGINT, shared.stop.clone())?;
    signal_hook::flag::register(SIGTERM, shared.stop.clone())?;

    let (tx_req, rx_req) = mpsc::channel::<IpcMsg>();

    // accept loop
    let acceptor = {
        let shared = shared.clone();
        thread::spawn(move || accept_loop(listener, shared, tx_req))
    };

    // tick loop owns the engine and the profile store
    let outcome = run_pipeline(store, &shared, rx_req);

    shared.request_stop();
    if acceptor.join().is_err() {
        error!("accept loop panicked");
    }
    cleanup(&sock);
    info!("daemon: stopped");
    outcome
}

fn cleanup(sock: &Path) {
    if let Err(e) = fs::remove_file(sock) {
        if e.kind() != ErrorKind::NotFound {
            error!("failed to remove {}: {e}", sock.display());
        }
    }
}

fn accept_loop(listener: UnixListener, shared: Arc<Shared>, tx_req: Sender<IpcMsg>) {
    while !shared.stopping() {
        match listener.accept() {
            Ok((stream, _)) => {
                let shared = shared.clone();
                let tx = tx_req.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, &shared, &tx) {
                        error!("ipc client error: {e}");
                    }
                });
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(e) => {
                error!("accept failed: {e}");
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn handle_client(mut stream: UnixStream, shared: &Shared, tx_req: &Sender<IpcMsg>) -> Result<()> {
    // the listener is nonblocking; clients get plain blocking reads
    stream.set_nonblocking(false)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim().is_empty() {
        return Ok(());
    }
    let resp = match serde_json::from_str::<Value>(&line) {
        Ok(req) => respond(&req, shared, tx_req),
        Err(e) => json!({"ok": false, "error": format!("bad request: {e}")}),
    };
    writeln!(stream, "{resp}")?;
    Ok(())
}

/// Build the response line for one request.
fn respond(req: &Value, shared: &Shared, tx_req: &Sender<IpcMsg>) -> Value {
    let op = req.get("op").and_then(|v| v.as_str()).unwrap_or("");
    match op {
        "status" => match shared.status.snapshot() {
            Some(status) => json!({"ok": true, "data": &*status}),
            None => json!({"ok": true, "data": null}),
        },
        "anchor" => match req.get("anchor").cloned().map(serde_json::from_value::<HandAnchor>) {
            Some(Ok(anchor)) => {
                let hand = anchor.chirality;
                shared.cells.publish(anchor);
                json!({"ok": true, "data": {"hand": hand}})
            }
            Some(Err(e)) => json!({"ok": false, "error": format!("bad anchor: {e}")}),
            None => json!({"ok": false, "error": "missing \"anchor\""}),
        },
        "lost" => match req.get("hand").and_then(|v| v.as_str()).and_then(Chirality::parse) {
            Some(hand) => {
                debug!("{} hand lost", hand.as_str());
                shared.cells.lose(hand);
                json!({"ok": true, "data": {"hand": hand}})
            }
            None => json!({"ok": false, "error": "expected \"hand\": \"left\" | \"right\""}),
        },
        "reload" => forward(tx_req, IpcMsg::Reload),
        "use" => {
            let name = req.get("profile").and_then(|v| v.as_str()).unwrap_or("").to_string();
            if name.is_empty() {
                json!({"ok": false, "error": "missing \"profile\""})
            } else {
                forward(tx_req, |reply| IpcMsg::UseProfile(name, reply))
            }
        }
        "list" => forward(tx_req, IpcMsg::List),
        "shutdown" => {
            info!("daemon: shutdown requested");
            shared.request_stop();
            json!({"ok": true, "data": "shutting down"})
        }
        _ => json!({"ok": false, "error": format!("unknown op: {op}")}),
    }
}

/// Hand a request to the tick loop and wait for its answer.
fn forward(tx_req: &Sender<IpcMsg>, make: impl FnOnce(Sender<Value>) -> IpcMsg) -> Value {
    let (reply_tx, reply_rx) = mpsc::channel();
    if tx_req.send(make(reply_tx)).is_err() {
        return json!({"ok": false, "error": "daemon is shutting down"});
    }
    reply_rx
        .recv_timeout(REPLY_TIMEOUT)
        .unwrap_or_else(|_| json!({"ok": false, "error": "daemon did not answer in time"}))
}

// client helper
pub fn client_request(req: Value) -> Result<Value> {
    let sock = socket_path()?;
    if !sock.exists() {
        return Err(anyhow!(
            "handpose daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let mut stream = UnixStream::connect(&sock)?;
    let line = serde_json::to_string(&req)? + "\n";
    stream.write_all(line.as_bytes())?;
    let mut reader = BufReader::new(stream);
    let mut resp = String::new();
    reader.read_line(&mut resp)?;
    let v: Value = serde_json::from_str(&resp)?;
    Ok(v)
}
