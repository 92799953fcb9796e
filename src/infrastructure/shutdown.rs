use std::time::Duration;

use tokio::{sync::watch, time::sleep};

/// Foreground side of the one-way stop flag.
#[derive(Clone)]
pub struct StopHandle {
    sender: watch::Sender<bool>,
}

/// Worker side of the stop flag. Checked between messages and between cycles.
#[derive(Clone)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopHandle {
    pub fn new() -> (Self, StopSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, StopSignal { receiver })
    }

    pub fn subscribe(&self) -> StopSignal {
        StopSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn request_stop(&self) {
        self.sender.send_replace(true);
    }
}

impl StopSignal {
    pub async fn stopped(&mut self) {
        // wait_for returns at once when the flag is already set
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Sleeps for `duration`; returns `false` when a stop arrives first.
    pub async fn pause(&mut self, duration: Duration) -> bool {
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            _ = sleep(duration) => true,
            _ = self.stopped() => false,
        }
    }
}

pub fn install_signal_handlers(handle: StopHandle) {
    let ctrlc = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "lifecycle", "ctrl-c received");
            ctrlc.request_stop();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                tracing::info!(target: "lifecycle", "SIGTERM received");
                handle.request_stop();
            }
        });
    }
}
