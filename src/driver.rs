//! Session tick driver.
//!
//! Two periodic tasks (detection pull and session clock) feed one command
//! queue. A single actor task owns the `SessionEngine` and applies commands
//! strictly in order, so the tracked state has exactly one writer.

use crate::aggregate::SessionSummary;
use crate::detector::{Detection, DetectionSource};
use crate::error::AppError;
use crate::state::{SessionEngine, SessionState};
use crate::tracking::PersonId;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_CLOCK_INTERVAL: Duration = Duration::from_secs(1);
const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    pub detection_interval: Duration,
    pub clock_interval: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            detection_interval: DEFAULT_DETECTION_INTERVAL,
            clock_interval: DEFAULT_CLOCK_INTERVAL,
        }
    }
}

/// What the tickers need to know about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Gate {
    active: bool,
    generation: u64,
}

impl Gate {
    fn of(state: &SessionState) -> Self {
        Self {
            active: state.is_active(),
            generation: state.generation,
        }
    }
}

enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<Option<SessionSummary>>),
    Select(Option<PersonId>, oneshot::Sender<Result<(), AppError>>),
    Reset(oneshot::Sender<Result<(), AppError>>),
    Detections { generation: u64, batch: Vec<Detection> },
    ClockTick { generation: u64 },
    Shutdown,
}

/// Control and read access to a running driver.
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
}

impl fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}

impl DriverHandle {
    pub async fn start(&self) -> Result<(), AppError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Start(reply)).await?;
        response.await.map_err(|_| AppError::DriverClosed)
    }

    pub async fn stop(&self) -> Result<Option<SessionSummary>, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Stop(reply)).await?;
        response.await.map_err(|_| AppError::DriverClosed)
    }

    pub async fn select(&self, selection: Option<PersonId>) -> Result<(), AppError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Select(selection, reply)).await?;
        response.await.map_err(|_| AppError::DriverClosed)?
    }

    pub async fn reset_after_summary(&self) -> Result<(), AppError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Reset(reply)).await?;
        response.await.map_err(|_| AppError::DriverClosed)?
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.send(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    async fn send(&self, command: Command) -> Result<(), AppError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::DriverClosed)
    }
}

/// Spawn the actor and both tickers on the current tokio runtime.
pub fn spawn_driver<S>(
    engine: SessionEngine,
    source: S,
    settings: DriverSettings,
) -> (DriverHandle, JoinHandle<()>)
where
    S: DetectionSource + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (gate_tx, gate_rx) = watch::channel(Gate::of(engine.state()));
    let state_rx = engine.subscribe();

    info!(
        detection_interval_ms = settings.detection_interval.as_millis(),
        clock_interval_ms = settings.clock_interval.as_millis(),
        "Starting session driver"
    );

    tokio::spawn(run_detection_ticker(
        source,
        gate_rx.clone(),
        command_tx.clone(),
        settings.detection_interval,
    ));
    tokio::spawn(run_clock_ticker(
        gate_rx,
        command_tx.clone(),
        settings.clock_interval,
    ));
    let actor = tokio::spawn(run_actor(engine, command_rx, gate_tx));

    (
        DriverHandle {
            commands: command_tx,
            state_rx,
        },
        actor,
    )
}

async fn run_actor(
    mut engine: SessionEngine,
    mut commands: mpsc::Receiver<Command>,
    gate: watch::Sender<Gate>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Start(reply) => {
                engine.start();
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                let _ = reply.send(engine.stop());
            }
            Command::Select(selection, reply) => {
                let _ = reply.send(engine.select(selection));
            }
            Command::Reset(reply) => {
                let _ = reply.send(engine.reset_after_summary());
            }
            Command::Detections { generation, batch } => {
                engine.apply_detections(generation, &batch);
            }
            Command::ClockTick { generation } => {
                engine.advance_clock(generation);
            }
            Command::Shutdown => {
                info!("Session driver shutting down");
                break;
            }
        }

        let next = Gate::of(engine.state());
        gate.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

async fn run_detection_ticker<S>(
    mut source: S,
    mut gate: watch::Receiver<Gate>,
    commands: mpsc::Sender<Command>,
    period: Duration,
) where
    S: DetectionSource,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = gate.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *gate.borrow_and_update();
                if current.active {
                    ticker.reset();
                }
            }
            _ = ticker.tick() => {
                let current = *gate.borrow();
                if !current.active {
                    continue;
                }
                // The next pull waits until this batch is queued. A pull that
                // races a stop is the in-flight batch; the engine takes at
                // most one of those.
                let batch = source.pull_detections();
                let command = Command::Detections {
                    generation: current.generation,
                    batch,
                };
                if commands.send(command).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Detection ticker stopped");
}

async fn run_clock_ticker(
    mut gate: watch::Receiver<Gate>,
    commands: mpsc::Sender<Command>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = gate.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *gate.borrow_and_update();
                if current.active {
                    ticker.reset();
                }
            }
            _ = ticker.tick() => {
                let current = *gate.borrow();
                if !current.active {
                    continue;
                }
                let command = Command::ClockTick {
                    generation: current.generation,
                };
                if commands.send(command).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Clock ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::mock::{MockFace, batch};
    use crate::scoring::heuristic::HeuristicModel;
    use crate::state::SessionPhase;
    use crate::tracking::{PersonTracker, TrackerConfig};

    struct RepeatingSource {
        faces: Vec<MockFace>,
    }

    impl DetectionSource for RepeatingSource {
        fn pull_detections(&mut self) -> Vec<Detection> {
            batch(&self.faces)
        }
    }

    fn engine() -> SessionEngine {
        SessionEngine::new(PersonTracker::new(
            Box::new(HeuristicModel::with_defaults()),
            TrackerConfig::default(),
            10,
        ))
    }

    fn fast_settings() -> DriverSettings {
        DriverSettings {
            detection_interval: Duration::from_millis(10),
            clock_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn driver_runs_session_through_summary_and_reset() -> Result<(), AppError> {
        let source = RepeatingSource {
            faces: vec![MockFace::attentive(), MockFace::turned_away()],
        };
        let (handle, actor) = spawn_driver(engine(), source, fast_settings());

        handle.start().await?;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let summary = handle.stop().await?.expect("summary after non-zero session");

        assert!(summary.duration_secs >= 1);
        assert_eq!(summary.persons.len(), 2);
        assert_eq!(summary.persons[0].focus_score, 100);
        assert_eq!(summary.persons[1].focus_score, 35);
        assert!(summary.events.is_empty());

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert_eq!(snapshot.persons.len(), 2);

        handle.reset_after_summary().await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.snapshot().persons.is_empty());
        assert_eq!(handle.snapshot().elapsed_secs, 0);

        handle.shutdown().await?;
        actor.await.expect("actor task");
        Ok(())
    }

    #[tokio::test]
    async fn subscribers_see_published_snapshots() -> Result<(), AppError> {
        let source = RepeatingSource {
            faces: vec![MockFace::tilted()],
        };
        let (handle, actor) = spawn_driver(engine(), source, fast_settings());
        let mut updates = handle.subscribe();

        handle.start().await?;
        let snapshot = {
            let waited = tokio::time::timeout(
                Duration::from_secs(1),
                updates.wait_for(|state| !state.persons.is_empty()),
            )
            .await
            .expect("person tracked within a second");
            let state = waited.map_err(|_| AppError::DriverClosed)?;
            SessionState::clone(&state)
        };

        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.persons[&1].focus_score, 50);

        handle.shutdown().await?;
        actor.await.expect("actor task");
        Ok(())
    }

    #[tokio::test]
    async fn nothing_is_pulled_while_idle() -> Result<(), AppError> {
        let source = RepeatingSource {
            faces: vec![MockFace::attentive()],
        };
        let (handle, actor) = spawn_driver(engine(), source, fast_settings());

        tokio::time::sleep(Duration::from_millis(60)).await;

        let snapshot = handle.snapshot();
        assert!(snapshot.persons.is_empty());
        assert_eq!(snapshot.elapsed_secs, 0);

        handle.shutdown().await?;
        actor.await.expect("actor task");
        Ok(())
    }

    #[tokio::test]
    async fn selection_errors_cross_the_queue() -> Result<(), AppError> {
        let source = RepeatingSource {
            faces: vec![MockFace::attentive()],
        };
        let (handle, actor) = spawn_driver(engine(), source, fast_settings());

        handle.start().await?;
        assert_eq!(handle.select(Some(3)).await, Err(AppError::UnknownPerson(3)));
        assert_eq!(
            handle.reset_after_summary().await,
            Err(AppError::SessionActive)
        );

        handle.shutdown().await?;
        actor.await.expect("actor task");
        assert_eq!(handle.start().await, Err(AppError::DriverClosed));
        Ok(())
    }
}
