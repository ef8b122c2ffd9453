mod command;
mod config;
mod drone;
mod safety;
mod transport;
mod vision;

use command::{CommandExecutor, Instruction};
use config::AgentConfig;
use drone::{DroneController, TelloController};
use safety::FailsafeSupervisor;
use std::sync::Arc;
use tello_shared::{Action, FlightStateHandle, RawCommand};
use transport::{CommandLink, VideoStream};
use vision::VisionFeed;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AgentConfig::default();
    info!("Tello agent starting");
    info!("  drone: {}", config.link.drone_addr);
    info!("  video: {}", config.video.bind_addr);

    let link = Arc::new(CommandLink::connect(config.link.clone()).await?);
    let controller = Arc::new(TelloController::new(link.clone()));

    match controller.connect().await {
        Ok(()) => {
            if let Ok(percent) = controller.battery().await {
                info!("Battery: {}%", percent);
            }
        }
        Err(e) => warn!("Drone handshake failed: {} (commands will keep trying)", e),
    }

    let video = VideoStream::start(config.video.clone()).await?;
    let vision = Arc::new(VisionFeed::new());
    let flight_state = Arc::new(FlightStateHandle::new());

    let (queue_tx, queue_rx) = mpsc::unbounded_channel::<Instruction>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let controller_dyn: Arc<dyn DroneController> = controller.clone();
    let executor = CommandExecutor::new(
        controller_dyn.clone(),
        vision.clone(),
        flight_state.clone(),
        config.executor.clone(),
    );
    let executor_task = tokio::spawn(executor.run(queue_rx, shutdown_rx));

    // Instruction producer: the external translator feeds JSON objects,
    // one per line, on stdin
    let producer_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        read_instructions(queue_tx, producer_shutdown).await;
    });

    wait_for_shutdown(&shutdown_tx).await;

    // Executor stops cooperatively, then the fail-safe runs before any
    // resource is released
    let _ = executor_task.await;

    let supervisor = FailsafeSupervisor::new(controller_dyn, flight_state);
    supervisor.run().await;

    video.stop();
    link.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Read translated commands from stdin and push them onto the queue.
/// `quit`/`exit` (or EOF) requests shutdown.
async fn read_instructions(
    queue_tx: mpsc::UnboundedSender<Instruction>,
    shutdown_tx: watch::Sender<bool>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit" | "stop") {
            break;
        }

        let raw: RawCommand = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Not a translated command ({}); expected one JSON object per line", e);
                continue;
            }
        };

        let text = raw.description.clone();
        match Action::try_from(raw) {
            Ok(action) => {
                info!("Command queued: {}", text);
                if queue_tx.send(Instruction { action, text }).is_err() {
                    break;
                }
            }
            Err(e) => error!("Rejected '{}': {}", text, e),
        }
    }

    let _ = shutdown_tx.send(true);
}

/// Wait for either external interrupt signal or an internal shutdown
/// request, then make sure the shutdown flag is set.
async fn wait_for_shutdown(shutdown_tx: &watch::Sender<bool>) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            warn!("SIGINT received - shutting down");
        }
        _ = async {
            match sigterm.as_mut() {
                Some(sig) => { sig.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => {
            warn!("SIGTERM received - shutting down");
        }
        _ = shutdown_rx.changed() => {
            info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(true);
}
