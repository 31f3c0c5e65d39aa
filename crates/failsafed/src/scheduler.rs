//! Recovery scheduler.
//!
//! A single one-minute tick drives all time-based behavior: counting down
//! the recovery window and firing the scheduled full or progressive
//! recovery. The loop owns its cancellation handle (a watch channel) so the
//! daemon can stop it deterministically on shutdown.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::controller::Controller;

const TICK_SECONDS: u64 = 60;

pub struct RecoveryScheduler {
    controller: Arc<Controller>,
    shutdown: watch::Receiver<bool>,
}

impl RecoveryScheduler {
    pub fn new(controller: Arc<Controller>, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            controller,
            shutdown,
        }
    }

    /// Run until the shutdown signal fires. One tick per minute; ticks and
    /// controller operations serialize on the state lock, so a tick can
    /// never observe a half-applied operation.
    pub async fn run(mut self) {
        info!("Recovery scheduler running (tick every {}s)", TICK_SECONDS);
        loop {
            tokio::select! {
                _ = sleep(Duration::from_secs(TICK_SECONDS)) => {
                    self.controller.tick_minute().await;
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Recovery scheduler stopped");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DigestVerifier;
    use crate::dispatch::{DirectiveSink, LoggingSink};
    use crate::persist::StateStore;

    fn build(dir: &tempfile::TempDir) -> Arc<Controller> {
        let verifier = Arc::new(DigestVerifier::new(DigestVerifier::digest_of("c")));
        Arc::new(Controller::new(
            StateStore::new(dir.path()),
            verifier,
            Arc::new(LoggingSink) as Arc<dyn DirectiveSink>,
            true,
            5,
        ))
    }

    #[tokio::test]
    async fn test_shutdown_stops_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(RecoveryScheduler::new(controller, rx).run());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_drive_recovery() {
        use failsafe_common::state::{OverallStatus, RecoveryMode};

        let dir = tempfile::tempdir().unwrap();
        let controller = build(&dir);
        controller
            .execute_protocol("c", "emergency-shutdown", "drill", RecoveryMode::Automatic, 2)
            .await
            .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(RecoveryScheduler::new(Arc::clone(&controller), rx).run());

        // paused clock: sleeps resolve as time auto-advances
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(TICK_SECONDS + 1)).await;
        }

        let state = controller.state().await;
        assert_eq!(state.overall_status, OverallStatus::Operational);
        assert!(!state.schedule_armed());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
