//! Named one-shot timers that deliver events to the session queue.
//!
//! Every arming gets a fresh token. A timer task only enqueues if its token
//! is still the active one for its id when it wakes up, and the worker only
//! handles the event if it can still claim the ticket when it dequeues it.
//! Between the two checks a cancel or restart of the same id wins.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerId {
    WorkCountdown,
    IdleCheck,
    ActivityCheck,
    DisplayUpdate,
    #[serde(rename = "temp_pause_timer")]
    TempPause,
    RestTick,
}

impl TimerId {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerId::WorkCountdown => "work_countdown",
            TimerId::IdleCheck => "idle_check",
            TimerId::ActivityCheck => "activity_check",
            TimerId::DisplayUpdate => "display_update",
            TimerId::TempPause => "temp_pause_timer",
            TimerId::RestTick => "rest_tick",
        }
    }

    /// The event a timer with this id delivers.
    pub fn event(self) -> Event {
        match self {
            TimerId::WorkCountdown => Event::WorkTimeout,
            TimerId::IdleCheck => Event::CheckIdle,
            TimerId::ActivityCheck => Event::CheckActivity,
            TimerId::DisplayUpdate => Event::UpdateDisplay,
            TimerId::TempPause => Event::TempPauseTimeout,
            TimerId::RestTick => Event::RestTick,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one arming of one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: TimerId,
    pub token: u64,
}

/// An item on the session queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event: Event,
    /// Set when a timer produced the event.
    pub ticket: Option<Ticket>,
}

impl From<Event> for Envelope {
    fn from(event: Event) -> Self {
        Self {
            event,
            ticket: None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    token: u64,
    delay: Duration,
    fired: bool,
    handle: Option<JoinHandle<()>>,
}

type Slots = Arc<Mutex<HashMap<TimerId, Slot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<TimerId, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Called by the timer task when its sleep ends.
fn fire(slots: &Slots, queue: &UnboundedSender<Envelope>, ticket: Ticket) -> bool {
    let mut guard = lock(slots);
    match guard.get_mut(&ticket.id) {
        Some(slot) if slot.token == ticket.token && !slot.fired => {
            slot.fired = true;
            slot.handle = None;
            // Sent under the lock so a concurrent cancel cannot slip in
            // between the token check and the enqueue.
            let _ = queue.send(Envelope {
                event: ticket.id.event(),
                ticket: Some(ticket),
            });
            true
        }
        _ => {
            debug!(timer = %ticket.id, token = ticket.token, "stale timer discarded at fire");
            false
        }
    }
}

pub struct TimerRegistry {
    slots: Slots,
    next_token: u64,
    queue: UnboundedSender<Envelope>,
}

impl TimerRegistry {
    pub fn new(queue: UnboundedSender<Envelope>) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_token: 0,
            queue,
        }
    }

    /// Arm `id` to fire after `delay`, replacing any earlier arming.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, id: TimerId, delay: Duration) -> Ticket {
        self.cancel(id);

        self.next_token += 1;
        let ticket = Ticket {
            id,
            token: self.next_token,
        };
        lock(&self.slots).insert(
            id,
            Slot {
                token: ticket.token,
                delay,
                fired: false,
                handle: None,
            },
        );

        let slots = Arc::clone(&self.slots);
        let queue = self.queue.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(&slots, &queue, ticket);
        });

        if let Some(slot) = lock(&self.slots).get_mut(&id) {
            if slot.token == ticket.token && !slot.fired {
                slot.handle = Some(handle);
            }
        }
        debug!(
            timer = %id,
            token = ticket.token,
            delay_ms = delay.as_millis() as u64,
            "timer armed"
        );
        ticket
    }

    pub fn cancel(&mut self, id: TimerId) {
        if let Some(slot) = lock(&self.slots).remove(&id) {
            if let Some(handle) = slot.handle {
                handle.abort();
            }
            debug!(timer = %id, token = slot.token, "timer cancelled");
        }
    }

    pub fn cancel_all(&mut self) {
        let drained: Vec<(TimerId, Slot)> = lock(&self.slots).drain().collect();
        for (id, slot) in drained {
            if let Some(handle) = slot.handle {
                handle.abort();
            }
            debug!(timer = %id, token = slot.token, "timer cancelled");
        }
    }

    /// Take ownership of a fired ticket as its event is dequeued.
    ///
    /// Returns `false` if the timer was cancelled or re-armed after firing,
    /// in which case the event must be dropped.
    pub fn claim(&mut self, ticket: Ticket) -> bool {
        let mut guard = lock(&self.slots);
        let claimable = guard
            .get(&ticket.id)
            .is_some_and(|slot| slot.token == ticket.token && slot.fired);
        if claimable {
            guard.remove(&ticket.id);
        }
        claimable
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whether `id` is armed and has not fired yet.
    pub fn is_armed(&self, id: TimerId) -> bool {
        lock(&self.slots).get(&id).is_some_and(|slot| !slot.fired)
    }

    /// Delay of the pending arming of `id`.
    pub fn delay_of(&self, id: TimerId) -> Option<Duration> {
        lock(&self.slots)
            .get(&id)
            .filter(|slot| !slot.fired)
            .map(|slot| slot.delay)
    }

    /// Ids with a pending arming, in a stable order.
    pub fn armed(&self) -> Vec<TimerId> {
        let guard = lock(&self.slots);
        let mut ids: Vec<TimerId> = guard
            .iter()
            .filter(|(_, slot)| !slot.fired)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_by_key(|id| id.as_str());
        ids
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
