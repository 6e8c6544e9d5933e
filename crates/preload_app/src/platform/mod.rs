mod app;
mod config;
mod effects;
mod logging;
mod status;

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use preload_core::{Msg, SessionOutcome};
use preload_engine::EngineHandle;
use preload_logging::{preload_info, preload_warn};

use app::{run_session, SessionHandle};
use config::{load_config, DEFAULT_CONFIG_FILENAME};
use effects::{spawn_event_pump, EngineEffectRunner};
use status::{LogStatusSink, ProgressBoard};

const EXIT_CANCELLED: u8 = 130;
const STOP_GRACE: Duration = Duration::from_millis(250);

pub fn run_app() -> anyhow::Result<ExitCode> {
    logging::initialize();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
    let config = load_config(&config_path)?;
    let settings = config.engine_settings();
    preload_info!(
        "preload starting: use_snapshot={} peers={} data_dir={}",
        config.use_snapshot,
        settings.node.peers.len(),
        config.data_dir.display()
    );

    let (engine, events) = EngineHandle::new(&settings).context("failed to start IO engine")?;
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    spawn_event_pump(events, msg_tx.clone());
    spawn_cancel_listener(SessionHandle::new(msg_tx.clone()));
    msg_tx
        .send(Msg::Start)
        .context("session inbox closed before start")?;
    drop(msg_tx);

    let mut executor = EngineEffectRunner::new(engine.clone());
    let mut sink = LogStatusSink;
    let board = ProgressBoard::default();
    let outcome = run_session(
        config.session_config(),
        &msg_rx,
        &mut executor,
        &mut sink,
        &board,
    );

    let code = match outcome {
        SessionOutcome::Ready => {
            preload_info!("node is synced; type `q` to stop it");
            supervise_node(&msg_rx);
            ExitCode::SUCCESS
        }
        SessionOutcome::Failed(_) => ExitCode::FAILURE,
        SessionOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
    };
    engine.stop_node();
    thread::sleep(STOP_GRACE);
    Ok(code)
}

/// Keeps the launcher alive while the synced node runs.
fn supervise_node(inbox: &mpsc::Receiver<Msg>) {
    while let Ok(msg) = inbox.recv() {
        match msg {
            Msg::Cancel => break,
            Msg::NodeStartFailed { cause } => {
                preload_warn!("node stopped: {}", cause);
                break;
            }
            _ => {}
        }
    }
}

/// Typing `cancel` or `q` on stdin cancels the session.
fn spawn_cancel_listener(handle: SessionHandle) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match line.trim() {
                "cancel" | "q" => {
                    preload_warn!("cancel requested from console");
                    if !handle.cancel() {
                        break;
                    }
                }
                "" => {}
                other => preload_info!("unknown console command {:?}", other),
            }
        }
    });
}
