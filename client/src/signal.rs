use log::{debug, error};
use tokio::sync::watch::{self, Receiver as WatchReceiver};

#[cfg(windows)]
pub async fn wait_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(_) => {
            debug!("recv ctrl_c, shutdown")
        }
        Err(e) => {
            debug!("error, ctrl_c, {:?}", e);
        }
    }
}

#[cfg(unix)]
pub async fn wait_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(v) => v,
        Err(e) => {
            debug!("error, signal, {:?}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = terminate.recv() => {
            debug!("recv unix terminate signal");
        },
        s = tokio::signal::ctrl_c() => {
            debug!("recv unix ctrl_c signal, {:?}", s);
        }
    }
}

/// Spawns the signal waiter and returns the receiver the loops watch.
pub fn shutdown_channel() -> WatchReceiver<u8> {
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    tokio::spawn(async move {
        wait_shutdown().await;
        if let Err(e) = signal_tx.send(1) {
            error!("error, {:?}", e);
        }
    });

    signal_rx
}
