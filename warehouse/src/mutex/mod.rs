//! FIFO mutual exclusion for a model's writes.
//!
//! [`Mutex::lock`] runs its callback immediately when free and queues it
//! otherwise; [`Mutex::unlock`] hands the lock straight to the next queued
//! callback. [`Mutex::acquire`] wraps that protocol in a future resolving to
//! a [`MutexGuard`] that unlocks on drop.

use futures::channel::oneshot;
use parking_lot::Mutex as StateLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Returns `false` when it declines the lock it was handed.
type Callback = Box<dyn FnOnce() -> bool + Send>;

#[derive(Default)]
struct State {
    locked: bool,
    queue: VecDeque<Callback>,
}

#[derive(Clone, Default)]
pub struct Mutex {
    state: Arc<StateLock<State>>,
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Mutex")
            .field("locked", &state.locked)
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl Mutex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Number of callbacks waiting behind the current holder.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Run `callback` now if the mutex is free, otherwise after every
    /// callback queued before it has been released.
    pub fn lock<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Box::new(move || {
            callback();
            true
        }));
    }

    fn enqueue(&self, callback: Callback) {
        {
            let mut state = self.state.lock();
            if state.locked {
                state.queue.push_back(callback);
                return;
            }
            state.locked = true;
        }
        if !callback() {
            self.unlock();
        }
    }

    /// Pass the lock to the next queued callback that takes it, or release it.
    pub fn unlock(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some(next) => next,
                    None => {
                        state.locked = false;
                        return;
                    }
                }
            };
            if next() {
                return;
            }
        }
    }

    /// Wait for the lock. The returned guard releases it when dropped.
    pub async fn acquire(&self) -> MutexGuard {
        let (tx, rx) = oneshot::channel::<()>();
        // A waiter that went away declines the grant.
        self.enqueue(Box::new(move || tx.send(()).is_ok()));
        let mut waiter = Waiter {
            rx,
            mutex: Some(self.clone()),
        };
        // The sender is consumed by the callback, so the channel can only
        // close after a grant.
        let _ = (&mut waiter.rx).await;
        waiter.mutex = None;
        MutexGuard {
            mutex: self.clone(),
        }
    }
}

/// A queued `acquire`. Dropped before completion, it releases a grant
/// that already arrived.
struct Waiter {
    rx: oneshot::Receiver<()>,
    mutex: Option<Mutex>,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(mutex) = self.mutex.take() {
            self.rx.close();
            if let Ok(Some(())) = self.rx.try_recv() {
                mutex.unlock();
            }
        }
    }
}

/// Holds the lock until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct MutexGuard {
    mutex: Mutex,
}

impl Drop for MutexGuard {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
