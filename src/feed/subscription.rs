use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::entities::JourneyState;
use crate::error::Error;

pub type UpdateCallback = Box<dyn Fn(JourneyState) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync>;

thread_local! {
    // subscriptions whose gate is held by this thread
    static DELIVERING: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

struct Delivering(usize);

impl Delivering {
    fn enter(key: usize) -> Self {
        DELIVERING.with(|keys| keys.borrow_mut().push(key));
        Self(key)
    }

    fn contains(key: usize) -> bool {
        DELIVERING.with(|keys| keys.borrow().contains(&key))
    }
}

impl Drop for Delivering {
    fn drop(&mut self) {
        DELIVERING.with(|keys| {
            let mut keys = keys.borrow_mut();
            if let Some(pos) = keys.iter().rposition(|key| *key == self.0) {
                keys.remove(pos);
            }
        });
    }
}

/// Returned by `subscribe`. Becomes inert once unsubscribed or replaced.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) id: u64,
    pub(crate) journey_id: String,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn journey_id(&self) -> &str {
        &self.journey_id
    }
}

pub(crate) struct Subscription {
    pub id: u64,
    pub journey_id: String,
    alive: AtomicBool,
    /// Held for the whole of every delivery so that closing waits out a
    /// delivery already in flight on another thread.
    gate: Mutex<()>,
    on_update: UpdateCallback,
    on_error: ErrorCallback,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Subscription {
    pub fn new(
        id: u64,
        journey_id: impl Into<String>,
        on_update: UpdateCallback,
        on_error: ErrorCallback,
    ) -> Self {
        Self {
            id,
            journey_id: journey_id.into(),
            alive: AtomicBool::new(true),
            gate: Mutex::new(()),
            on_update,
            on_error,
            task: Mutex::new(None),
        }
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            id: self.id,
            journey_id: self.journey_id.clone(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Runs `f` while holding the gate, or not at all once closed. A
    /// callback re-entering its own subscription already holds the gate.
    pub fn gated<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if Delivering::contains(self.key()) {
            return self.is_alive().then(f);
        }

        let _gate = lock(&self.gate);

        if !self.is_alive() {
            return None;
        }

        let _delivering = Delivering::enter(self.key());

        Some(f())
    }

    /// Callers must already hold the gate through [`Subscription::gated`].
    pub fn notify(&self, state: JourneyState) {
        (self.on_update)(state)
    }

    pub fn report(&self, err: Error) {
        self.gated(|| (self.on_error)(err));
    }

    pub fn set_task(&self, task: JoinHandle<()>) {
        if self.is_alive() {
            *lock(&self.task) = Some(task);
        } else {
            task.abort();
        }
    }

    /// Waits for any in-flight delivery on another thread; no callback runs
    /// after this returns. Called from this subscription's own callback it
    /// returns at once and the running callback is the last one.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);

        if !Delivering::contains(self.key()) {
            drop(lock(&self.gate));
        }

        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, OnceLock};

    fn counting() -> (Subscription, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let updates = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let (u, e) = (updates.clone(), errors.clone());

        let subscription = Subscription::new(
            1,
            "J1",
            Box::new(move |_: JourneyState| {
                u.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |_: Error| {
                e.fetch_add(1, Ordering::SeqCst);
            }),
        );

        (subscription, updates, errors)
    }

    #[test]
    fn closed_subscription_runs_nothing() {
        let (subscription, updates, errors) = counting();
        subscription.close();

        let ran = subscription.gated(|| subscription.notify(JourneyState::new("J1")));
        subscription.report(crate::error::unexpected_error());

        assert!(ran.is_none());
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let (subscription, _, _) = counting();
        subscription.close();
        subscription.close();

        assert!(!subscription.is_alive());
        assert_eq!(subscription.handle().journey_id(), "J1");
    }

    #[test]
    fn closing_from_own_callback_does_not_block() {
        let slot: Arc<OnceLock<Arc<Subscription>>> = Arc::new(OnceLock::new());
        let updates = Arc::new(AtomicUsize::new(0));
        let (inner_slot, u) = (slot.clone(), updates.clone());

        let subscription = Arc::new(Subscription::new(
            1,
            "J1",
            Box::new(move |_: JourneyState| {
                u.fetch_add(1, Ordering::SeqCst);
                if let Some(own) = inner_slot.get() {
                    own.close();
                }
            }),
            Box::new(|_: Error| ()),
        ));
        let _ = slot.set(subscription.clone());

        let ran = subscription.gated(|| subscription.notify(JourneyState::new("J1")));
        let again = subscription.gated(|| subscription.notify(JourneyState::new("J1")));

        assert!(ran.is_some());
        assert!(again.is_none());
        assert!(!subscription.is_alive());
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }
}
