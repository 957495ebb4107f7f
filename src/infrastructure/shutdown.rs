use tokio::sync::watch;

/// Broadcast stop signal shared by the feed reader, scheduler, and app.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl ShutdownListener {
    /// Resolves once shutdown is triggered (or every `Shutdown` is dropped).
    pub async fn notified(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        let _ = self.receiver.wait_for(|stopped| *stopped).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "lifecycle", signal = "SIGINT", "stop requested");
            ctrlc.trigger();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown;
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                tracing::info!(target: "lifecycle", signal = "SIGTERM", "stop requested");
                term.trigger();
            }
        });
    }
}
