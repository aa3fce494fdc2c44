//! The session worker task and the handle used to talk to it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::machine::{SessionContext, SessionMachine, SessionSnapshot};
use crate::error::{CoreError, Result};
use crate::events::{Event, Notification, WorkParams};
use crate::hotkey::HotkeyAction;
use crate::storage::ConfigUpdate;
use crate::timer::Envelope;

/// Cloneable front door to a running session.
///
/// Every command only enqueues an event; the worker applies it later, in
/// order. Dropping the last handle stops the worker.
#[derive(Clone)]
pub struct SessionHandle {
    queue: UnboundedSender<Envelope>,
    snapshot: watch::Receiver<SessionSnapshot>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    fn send(&self, event: Event) -> Result<()> {
        self.queue
            .send(Envelope::from(event))
            .map_err(|_| CoreError::WorkerStopped)
    }

    pub fn start_work(&self, params: WorkParams) -> Result<()> {
        self.send(Event::StartWork(params))
    }

    pub fn stop_work(&self) -> Result<()> {
        self.send(Event::StopWork)
    }

    pub fn force_rest(&self) -> Result<()> {
        self.send(Event::ForceRest)
    }

    pub fn temp_pause(&self) -> Result<()> {
        self.send(Event::TempPause)
    }

    pub fn temp_resume(&self) -> Result<()> {
        self.send(Event::TempResume)
    }

    pub fn unlock(&self, phrase: impl Into<String>) -> Result<()> {
        self.send(Event::Unlock(phrase.into()))
    }

    pub fn update_config(&self, update: ConfigUpdate) -> Result<()> {
        self.send(Event::UpdateConfig(update))
    }

    /// For a rest overlay that runs its own countdown.
    pub fn notify_rest_complete(&self) -> Result<()> {
        self.send(Event::RestComplete)
    }

    pub fn notify_rest_cancelled(&self) -> Result<()> {
        self.send(Event::RestCancel)
    }

    pub fn dispatch_hotkey(&self, action: HotkeyAction) -> Result<()> {
        self.send(action.event())
    }

    /// State as of the last processed event.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Ask the worker to stop. Outstanding timers are cancelled before it
    /// returns; events still queued are not processed.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

/// A spawned session.
pub struct SessionWorker {
    pub handle: SessionHandle,
    pub notifications: UnboundedReceiver<Notification>,
    pub join: JoinHandle<()>,
}

/// Spawn the session worker on the current tokio runtime.
pub fn spawn(ctx: SessionContext) -> SessionWorker {
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let machine = SessionMachine::new(ctx, queue_tx.clone(), notify_tx);
    let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

    let join = tokio::spawn(run(machine, queue_rx, shutdown_rx, snapshot_tx));

    SessionWorker {
        handle: SessionHandle {
            queue: queue_tx,
            snapshot: snapshot_rx,
            shutdown: Arc::new(shutdown_tx),
        },
        notifications: notify_rx,
        join,
    }
}

async fn run(
    mut machine: SessionMachine,
    mut queue: UnboundedReceiver<Envelope>,
    mut shutdown: watch::Receiver<bool>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    info!("session worker started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            envelope = queue.recv() => {
                let Some(envelope) = envelope else {
                    break;
                };
                let name = envelope.event.name();
                if catch_unwind(AssertUnwindSafe(|| machine.dispatch(envelope))).is_err() {
                    error!(event = name, "event handler panicked, event dropped");
                }
                snapshots.send_replace(machine.snapshot());
            }
        }
    }

    machine.shutdown();
    info!("session worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IdleError;
    use crate::idle::FixedIdle;
    use crate::session::Mode;
    use crate::storage::Config;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn full_work_rest_cycle() {
        let worker = spawn(SessionContext::new(Config::default(), FixedIdle::new(0)));
        let handle = worker.handle.clone();

        handle.start_work(WorkParams::new(1, 1)).unwrap();
        sleep(Duration::from_millis(30_500)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.mode, Mode::Working);
        assert_eq!(snap.work_remaining_secs, Some(30));

        sleep(Duration::from_secs(40)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.mode, Mode::Resting);
        assert_eq!(snap.rest.map(|r| r.remaining_seconds), Some(50));

        sleep(Duration::from_secs(61)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.mode, Mode::Working);
        assert_eq!(snap.total_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_worker() {
        let worker = spawn(SessionContext::new(Config::default(), FixedIdle::new(0)));
        worker.handle.start_work(WorkParams::new(10, 1)).unwrap();
        sleep(Duration::from_millis(10)).await;

        worker.handle.shutdown();
        worker.join.await.unwrap();

        assert!(matches!(
            worker.handle.force_rest(),
            Err(CoreError::WorkerStopped)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_worker() {
        let SessionWorker { handle, join, .. } =
            spawn(SessionContext::new(Config::default(), FixedIdle::new(0)));
        drop(handle);
        join.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_handler_does_not_kill_the_worker() {
        let config = Config {
            idle_detection_enabled: true,
            ..Config::default()
        };
        let sensor = || -> std::result::Result<u64, IdleError> { panic!("sensor exploded") };
        let worker = spawn(SessionContext::new(config, sensor));
        let handle = worker.handle.clone();

        handle.start_work(WorkParams::new(10, 1)).unwrap();
        // The first idle check panics inside the handler.
        sleep(Duration::from_secs(6)).await;
        assert_eq!(handle.snapshot().mode, Mode::Working);

        handle.dispatch_hotkey(HotkeyAction::ForceRest).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.snapshot().mode, Mode::Resting);
    }
}
