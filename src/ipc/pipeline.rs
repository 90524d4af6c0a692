use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use handpose::{
    AnchorCells, GestureFrameEngine, GestureFrameResult, LatestValue, PinchObservables,
    ProfileStore,
};

/// State shared between the tick loop and socket clients.
#[derive(Debug, Default)]
pub struct Shared {
    pub cells: AnchorCells,
    pub status: LatestValue<DaemonStatus>,
    pub stop: Arc<AtomicBool>,
}

impl Shared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Published after every tick for `status` requests.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub active_profile: String,
    pub tick_hz: f64,
    pub ticks: u64,
    pub result: GestureFrameResult,
    pub observables: PinchObservables,
}

/// Profile requests that need the store owned by the tick loop.
pub enum IpcMsg {
    Reload(Sender<Value>),
    UseProfile(String, Sender<Value>),
    List(Sender<Value>),
}

fn tick_period(hz: f64) -> Result<Duration> {
    Ok(Duration::try_from_secs_f64(1.0 / hz)?)
}

/// Run the engine at the active profile's tick rate until a stop is
/// requested. Engine state never leaves this thread.
pub fn run_pipeline(mut store: ProfileStore, shared: &Shared, rx: Receiver<IpcMsg>) -> Result<()> {
    let mut engine = GestureFrameEngine::new(store.profile.engine_settings());
    let mut period = tick_period(store.profile.engine.tick_hz)?;
    let mut ticks: u64 = 0;
    let started = Instant::now();
    let mut next = started;
    info!(
        "pipeline: ticking at {:.1} Hz with profile '{}'",
        store.profile.engine.tick_hz, store.active_name
    );

    while !shared.stopping() {
        while let Ok(msg) = rx.try_recv() {
            if handle_msg(msg, &mut store) {
                engine.set_settings(store.profile.engine_settings());
                period = tick_period(store.profile.engine.tick_hz)?;
            }
        }

        let result = engine.tick(&shared.cells, started.elapsed().as_secs_f64());
        ticks += 1;
        shared.status.publish(DaemonStatus {
            active_profile: store.active_name.clone(),
            tick_hz: store.profile.engine.tick_hz,
            ticks,
            result,
            observables: *engine.observables(),
        });

        next += period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            // fell behind; don't try to catch up with a burst of ticks
            next = now;
        }
    }

    info!("pipeline: stopped after {ticks} ticks");
    Ok(())
}

/// Returns true when the active profile changed.
fn handle_msg(msg: IpcMsg, store: &mut ProfileStore) -> bool {
    match msg {
        IpcMsg::Reload(reply) => {
            let outcome = store.reload();
            let changed = outcome.is_ok();
            match outcome {
                Ok(()) => info!("profile '{}' reloaded", store.active_name),
                Err(ref e) => warn!("reload failed, keeping last good profile: {e}"),
            }
            let _ = reply.send(profile_reply(outcome, store));
            changed
        }
        IpcMsg::UseProfile(name, reply) => {
            let outcome = store.set_active(&name);
            let changed = outcome.is_ok();
            match outcome {
                Ok(()) => info!("switched active profile to {}", store.active_name),
                Err(ref e) => warn!("use profile '{name}' failed: {e}"),
            }
            let _ = reply.send(profile_reply(outcome, store));
            changed
        }
        IpcMsg::List(reply) => {
            let _ = reply.send(json!({
                "ok": true,
                "data": {"profiles": store.list_profiles(), "active": store.active_name}
            }));
            false
        }
    }
}

fn profile_reply(outcome: handpose::Result<()>, store: &ProfileStore) -> Value {
    match outcome {
        Ok(()) => json!({"ok": true, "data": {"active_profile": store.active_name}}),
        Err(e) => json!({"ok": false, "error": e.to_string()}),
    }
}
