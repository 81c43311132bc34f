//! Ctrl-C handling while a reply is in flight.
//!
//! At the prompt rustyline reports Ctrl-C itself.  While the loop is waiting on the network
//! the terminal is in cooked mode, so the signal arrives here instead and wakes the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use crate::error::{Error, Result};

/// A latch set by Ctrl-C that async code can wait on.
#[derive(Debug, Default)]
pub struct Interrupt {
    fired: AtomicBool,
    notify: Notify,
}

impl Interrupt {
    /// Creates an interrupt that is not wired to any signal.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates an interrupt and installs it as the process Ctrl-C handler.
    pub fn install() -> Result<Arc<Self>> {
        let interrupt = Self::new();
        let handler = Arc::clone(&interrupt);
        ctrlc::set_handler(move || handler.trigger())
            .map_err(|e| Error::config(format!("failed to install Ctrl-C handler: {e}")))?;
        Ok(interrupt)
    }

    /// Fire the interrupt, waking every waiter.
    pub fn trigger(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Clear a stale interrupt before a new wait.
    pub fn arm(&self) {
        self.fired.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the interrupt fires.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}
