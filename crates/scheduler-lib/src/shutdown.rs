//! Process shutdown signalling
//!
//! A [`ShutdownTrigger`] is held by whoever handles SIGINT; any number of
//! [`ShutdownSignal`] clones can wait on it. Once triggered the signal stays
//! triggered, so late waiters return immediately.

use tokio::sync::watch;

pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Resolves once shutdown has been triggered. Pends forever if the
    /// trigger is dropped without firing.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|triggered| *triggered).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}
