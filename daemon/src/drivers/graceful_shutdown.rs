use log::{debug, error, info, warn};
use tokio::select;
use tokio::task::JoinSet;

use super::driver::Driver;
use std::sync::Arc;
use tokio::sync::Notify;

pub struct GracefulShutdown {
    drivers: Vec<Arc<dyn Driver>>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        Self { drivers: vec![] }
    }
}

impl GracefulShutdown {
    pub fn add_driver(&mut self, driver: impl Driver + 'static) {
        self.drivers.push(Arc::new(driver));
    }

    /// Runs every driver until ctrl+c, or until one of them exits on its own.
    pub async fn watch(mut self, stop_notify: Arc<Notify>) {
        let mut join_set = JoinSet::new();
        for driver in self.drivers.drain(..) {
            join_set.spawn(async move {
                match driver.run().await {
                    Ok(()) => debug!("driver {} finished", driver.name()),
                    Err(err) => error!("driver {} failed: {:#}", driver.name(), err),
                }
            });
        }
        debug!("graceful shutdown start watching");

        select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => info!("ctrl+c received, shutting down"),
                Err(err) => error!("can't listen for ctrl+c: {}", err),
            },
            _ = join_set.join_next() => warn!("a driver stopped unexpectedly, shutting down"),
        }

        stop_notify.notify_waiters();
        while join_set.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct FailingDriver;

    #[async_trait::async_trait]
    impl Driver for FailingDriver {
        async fn run(&self) -> anyhow::Result<()> {
            anyhow::bail!("address in use")
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct WaitingDriver(Arc<Notify>);

    #[async_trait::async_trait]
    impl Driver for WaitingDriver {
        async fn run(&self) -> anyhow::Result<()> {
            self.0.notified().await;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "waiting"
        }
    }

    #[tokio::test]
    async fn failed_driver_stops_the_others() {
        let stop = Arc::new(Notify::new());
        let mut gs = GracefulShutdown::new();
        gs.add_driver(WaitingDriver(stop.clone()));
        gs.add_driver(FailingDriver);

        tokio::time::timeout(Duration::from_secs(5), gs.watch(stop))
            .await
            .unwrap();
    }
}
