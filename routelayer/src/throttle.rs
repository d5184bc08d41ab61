//! Burst-collapsing call utilities.
//!
//! Rapid event bursts (mouse drags, viewport moves) must not translate into
//! one downstream pass per event. [`Throttle`] runs its callback on the
//! leading and trailing edge of a burst, dropping intermediates;
//! [`Debounce`] runs it once after the burst goes quiet. Both guarantee the
//! final event of a burst is eventually processed.
//!
//! Each instance owns a background tokio task; dropping the handle shuts the
//! task down. Construct them inside a runtime context.

use std::time::Duration;

use tokio::sync::mpsc;

/// Leading+trailing-edge throttle.
///
/// The first call of a burst runs immediately; calls during the cooldown
/// window collapse into a single trailing run when the window elapses.
pub struct Throttle {
    tx: mpsc::UnboundedSender<()>,
}

impl Throttle {
    pub fn new(interval: Duration, callback: impl Fn() + Send + Sync + 'static) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                callback();

                // The cooldown window is fixed at the leading run; calls
                // landing inside it only mark the trailing run, they must
                // not push the window out.
                let mut trailing = false;
                let cooldown = tokio::time::sleep(interval);
                tokio::pin!(cooldown);
                loop {
                    tokio::select! {
                        _ = &mut cooldown => break,
                        message = rx.recv() => match message {
                            Some(()) => trailing = true,
                            None => return,
                        },
                    }
                }
                if trailing {
                    callback();
                }
            }
        });

        Self { tx }
    }

    pub fn call(&self) {
        let _ = self.tx.send(());
    }
}

/// Trailing-edge debounce: the callback runs once, `delay` after the last
/// call of a burst.
pub struct Debounce {
    tx: mpsc::UnboundedSender<()>,
}

impl Debounce {
    pub fn new(delay: Duration, callback: impl Fn() + Send + Sync + 'static) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            loop {
                if rx.recv().await.is_none() {
                    return;
                }
                // Restart the quiet-period timer on every further call.
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            callback();
                            break;
                        }
                        message = rx.recv() => if message.is_none() {
                            return;
                        },
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn call(&self) {
        let _ = self.tx.send(());
    }
}
