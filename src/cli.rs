use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use pico_args::Arguments;
use std::{
    env,
    fs::File,
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
    process::Command,
};

use handpose::{AnchorCells, EngineSettings, GestureFrameEngine, config, read_frames};

use crate::ipc;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // Hidden daemon mode (spawned by `start`)
    if pargs.contains("--daemon") {
        return ipc::run_daemon();
    }

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    // Flags-based help (-h/--help)
    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("replay") => {
            let pretty = pargs.contains("--pretty");
            let path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handpose replay <file> [--pretty]"))?;
            replay(&path, pretty)
        }

        Some("start") => {
            let exe = env::current_exe()?;
            let child = Command::new(exe).arg("--daemon").spawn()?;
            println!("handpose: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("stop") => request(serde_json::json!({"op":"shutdown"})),
        Some("status") => request(serde_json::json!({"op":"status"})),
        Some("reload") => request(serde_json::json!({"op":"reload"})),

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: handpose use <profile_name>"))?;
            request(serde_json::json!({"op":"use","profile":name}))
        }

        Some("list") => request(serde_json::json!({"op":"list"})),

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn request(req: serde_json::Value) -> Result<()> {
    let r = ipc::client_request(req)?;
    print_response(&r);
    Ok(())
}

/// Thresholds for offline replay: the active profile if one is installed,
/// built-in defaults otherwise. Never writes to the config directory.
fn replay_settings() -> EngineSettings {
    let active = config::default_config_dir().and_then(|dir| config::read_active(&dir));
    match active {
        Ok(Some((name, profile))) => {
            info!("replay: using profile '{name}'");
            profile.engine_settings()
        }
        Ok(None) => {
            info!("replay: no profile installed; using built-in thresholds");
            EngineSettings::default()
        }
        Err(e) => {
            warn!("replay: {e}; using built-in thresholds");
            EngineSettings::default()
        }
    }
}

fn replay(path: &Path, pretty: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let frames = read_frames(BufReader::new(file))?;
    info!("replay: {} frames from {}", frames.len(), path.display());

    let cells = AnchorCells::new();
    let mut engine = GestureFrameEngine::new(replay_settings());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for frame in &frames {
        cells.apply(frame);
        let result = engine.tick(&cells, frame.timestamp);
        let line = if pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"handpose - hand pose and pinch recognizer

USAGE:
  handpose help [command]           Show general or command-specific help
  handpose replay <file> [--pretty] Run a recorded JSON Lines session
  handpose start                    Start the daemon
  handpose stop                     Stop the daemon
  handpose status                   Show the latest frame and pinch state
  handpose reload                   Reload active profile
  handpose use <name>               Switch active profile
  handpose list                     List profiles

TIPS:
  - Profiles: ~/.config/handpose/profiles
  - Active profile pointer: ~/.config/handpose/active
  - Control socket: ~/.local/run/handpose.sock
  - RUST_LOG=debug shows pinch transitions
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "replay" => println!(
            "usage: handpose replay <file> [--pretty]\nFeeds each recorded frame through the engine and prints one result per line."
        ),
        "start" => println!("usage: handpose start\nStarts the background daemon."),
        "stop" => println!("usage: handpose stop\nStops the running daemon."),
        "status" => println!(
            "usage: handpose status\nShows active profile, tick count, last frame result and pinch observables."
        ),
        "reload" => println!(
            "usage: handpose reload\nReloads the current profile; keeps last good on error."
        ),
        "use" => {
            println!("usage: handpose use <name>\nSwitches active profile to <name> and reloads.")
        }
        "list" => println!("usage: handpose list\nLists available profiles and the active one."),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
