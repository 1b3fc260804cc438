use {
    super::reconciler::Reconciler,
    std::time::Duration,
    tokio::sync::watch,
};

pub const SWEEP_BATCH: i64 = 100;

/// Periodically expire PENDING orders past their deadline. Abandoned
/// checkouts have no cancel signal, this loop is what closes them.
pub async fn run_expiry_sweep(
    reconciler: Reconciler,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "order expiry sweep started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("order expiry sweep shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        // Drain full batches before sleeping again.
        loop {
            match reconciler.expire_overdue(SWEEP_BATCH).await {
                Ok(0) => break,
                Ok(n) => {
                    tracing::info!(count = n, "expired overdue orders");
                    if n < SWEEP_BATCH as u64 {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "expiry sweep error");
                    break;
                }
            }
        }
    }
}
