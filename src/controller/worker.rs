use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::ControllerError;
use super::status::{CommandOutcome, ControlCommand, ControllerMode, ControllerStatus};
use crate::abort::CancelFlag;
use crate::scan::ScanOrchestrator;

#[derive(Debug)]
struct Shared {
    status: ControllerStatus,
}

/// A queued command tagged with the number of stops issued before it.
struct Queued {
    command: ControlCommand,
    generation: u64,
}

/// Producer side of the command queue.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<Queued>,
    shared: Arc<StdMutex<Shared>>,
    cancel: CancelFlag,
    stops: Arc<AtomicU64>,
}

impl ControllerHandle {
    /// Enqueues `command` without waiting; fails if the queue is full.
    pub fn submit(&self, command: ControlCommand) -> Result<(), ControllerError> {
        log::info!("Queued {}", command.name());
        let queued = Queued {
            command,
            generation: self.stops.load(Ordering::SeqCst),
        };
        self.tx.try_send(queued).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ControllerError::Busy,
            mpsc::error::TrySendError::Closed(_) => ControllerError::Closed,
        })
    }

    pub fn status(&self) -> ControllerStatus {
        self.shared.lock().unwrap().status.clone()
    }

    /// Stops the robot: the running command is cancelled and every command
    /// queued before this call is discarded.
    pub fn stop(&self) {
        log::warn!("Stop requested");
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Starts the consumer task that owns `orchestrator`.
///
/// The task ends once every handle is dropped and the command in progress
/// has finished.
pub fn spawn(
    orchestrator: ScanOrchestrator,
    cancel: CancelFlag,
    capacity: usize,
) -> (ControllerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let shared = Arc::new(StdMutex::new(Shared {
        status: ControllerStatus::default(),
    }));
    let stops = Arc::new(AtomicU64::new(0));

    let join = tokio::spawn(run_controller_loop(
        orchestrator,
        rx,
        shared.clone(),
        cancel.clone(),
        stops.clone(),
    ));

    (
        ControllerHandle {
            tx,
            shared,
            cancel,
            stops,
        },
        join,
    )
}

async fn run_controller_loop(
    mut orchestrator: ScanOrchestrator,
    mut rx: mpsc::Receiver<Queued>,
    shared: Arc<StdMutex<Shared>>,
    cancel: CancelFlag,
    stops: Arc<AtomicU64>,
) {
    while let Some(Queued {
        command,
        generation,
    }) = rx.recv().await
    {
        // Clear before comparing so a stop landing after the check still
        // reaches the command about to run.
        cancel.reset();
        if generation < stops.load(Ordering::SeqCst) {
            log::warn!("Discarded queued {} after stop", command.name());
            continue;
        }

        {
            let mut locked = shared.lock().unwrap();
            locked.status.mode = mode_for(&command);
        }

        let (success, message) = execute(&mut orchestrator, &shared, &command).await;
        if success {
            log::info!("{}: {}", command.name(), message);
        } else {
            log::warn!("{} failed: {}", command.name(), message);
        }

        let mut locked = shared.lock().unwrap();
        locked.status.mode = ControllerMode::Idle;
        locked.status.completed += 1;
        locked.status.last_outcome = Some(CommandOutcome {
            command: command.name().to_string(),
            success,
            message,
            finished_at: Utc::now(),
        });
    }
    log::info!("Command queue closed, controller exiting");
}

fn mode_for(command: &ControlCommand) -> ControllerMode {
    match command {
        ControlCommand::Scan(plan) => ControllerMode::Scanning {
            plan: *plan,
            started_at: Utc::now(),
            position: None,
        },
        ControlCommand::Capture => ControllerMode::Capturing,
        ControlCommand::TakePhoto => ControllerMode::TakingPhoto,
        ControlCommand::SendAntenna(antenna) => ControllerMode::SendingAntenna { antenna: *antenna },
        ControlCommand::ReadHeading => ControllerMode::ReadingHeading,
    }
}

async fn execute(
    orchestrator: &mut ScanOrchestrator,
    shared: &Arc<StdMutex<Shared>>,
    command: &ControlCommand,
) -> (bool, String) {
    match command {
        ControlCommand::Scan(plan) => {
            let progress = shared.clone();
            let result = orchestrator
                .run_with(*plan, move |record| {
                    let mut locked = progress.lock().unwrap();
                    locked.status.samples_captured += 1;
                    locked.status.last_sample = Some(record.clone());
                    if let ControllerMode::Scanning { position, .. } = &mut locked.status.mode {
                        *position = record.position;
                    }
                })
                .await;
            match result {
                Ok(summary) => (
                    true,
                    format!(
                        "scan {} completed with {} samples",
                        summary.run_id,
                        summary.records.len()
                    ),
                ),
                Err(e) => (false, e.to_string()),
            }
        }
        ControlCommand::Capture => match orchestrator.capture_here().await {
            Ok(record) => {
                let message = format!("captured sample {}", record.id);
                let mut locked = shared.lock().unwrap();
                locked.status.samples_captured += 1;
                locked.status.last_sample = Some(record);
                (true, message)
            }
            Err(e) => (false, e.to_string()),
        },
        ControlCommand::TakePhoto => match orchestrator.take_photo().await {
            Ok(Some(name)) => {
                let message = format!("photo saved as {}", name);
                shared.lock().unwrap().status.last_photo = Some(name);
                (true, message)
            }
            Ok(None) => (false, "photo capture failed".to_string()),
            Err(e) => (false, e.to_string()),
        },
        ControlCommand::SendAntenna(antenna) => match orchestrator.send_antenna(*antenna).await {
            Ok(()) => (true, format!("sent '{}'", antenna)),
            Err(e) => (false, format!("failed to send '{}': {}", antenna, e)),
        },
        ControlCommand::ReadHeading => match orchestrator.heading().await {
            Ok(heading) => {
                shared.lock().unwrap().status.last_heading = Some(heading);
                (true, format!("heading {}", heading))
            }
            Err(e) => (false, e.to_string()),
        },
    }
}
