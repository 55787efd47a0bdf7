use crate::utils::Broadcaster;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use warden_protocol::v1::event::UpdateNotice;

pub const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Registers the daemon to launch when the operator logs in to the host.
#[async_trait::async_trait]
pub trait StartupRegistrar: Send + Sync {
    async fn is_enabled(&self) -> anyhow::Result<bool>;

    async fn set_enabled(&self, enabled: bool) -> anyhow::Result<()>;
}

/// Keeps the flag in memory only.
#[derive(Default)]
pub struct NoopRegistrar {
    enabled: AtomicBool,
}

#[async_trait::async_trait]
impl StartupRegistrar for NoopRegistrar {
    async fn is_enabled(&self) -> anyhow::Result<bool> {
        Ok(self.enabled.load(Ordering::Relaxed))
    }

    async fn set_enabled(&self, enabled: bool) -> anyhow::Result<()> {
        self.enabled.store(enabled, Ordering::Relaxed);
        debug!("launch on login set to {} (not registered with the host)", enabled);
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait UpdateChecker: Send + Sync {
    /// `Some` when a release newer than `current_version` exists.
    async fn check(&self, current_version: &str) -> anyhow::Result<Option<UpdateNotice>>;
}

pub struct NoopUpdateChecker;

#[async_trait::async_trait]
impl UpdateChecker for NoopUpdateChecker {
    async fn check(&self, _: &str) -> anyhow::Result<Option<UpdateNotice>> {
        Ok(None)
    }
}

/// Checks now and then every `interval`, announcing any newer release.
pub fn spawn_update_watch(
    checker: Arc<dyn UpdateChecker>,
    broadcaster: Arc<Broadcaster>,
    current_version: &'static str,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match checker.check(current_version).await {
                Ok(Some(notice)) => {
                    info!(
                        "update available: {} -> {}",
                        notice.current_version, notice.latest_version
                    );
                    broadcaster.announce_update(notice);
                }
                Ok(None) => debug!("no update available"),
                Err(err) => warn!("update check failed: {}", err),
            }
        }
    })
}
