use crate::management::supervisor::ProcessSupervisor;
use crate::utils::status::{HostProbe, HostUsage};
use log::{debug, error};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use warden_protocol::management::instance::{TelemetrySample, TpsSource};
use warden_protocol::v1::event::Events;

pub const NOMINAL_TPS: f64 = 20.0;
pub const MIN_SYNTHETIC_TPS: f64 = 5.0;

/// Load based guess at the tick rate. Not a measurement.
pub fn synthetic_tps(cpu_percent: f64, memory_percent: f64, players: usize) -> f64 {
    let load = (cpu_percent + memory_percent) / 200.0;
    let crowd = players as f64 * 0.1;
    (NOMINAL_TPS - load - crowd).max(MIN_SYNTHETIC_TPS)
}

pub fn tps_policy(
    measured: Option<f64>,
    running: bool,
    cpu_percent: f64,
    memory_percent: f64,
    players: usize,
) -> (f64, TpsSource) {
    match measured {
        Some(tps) if running => (tps, TpsSource::Measured),
        _ if running => (
            synthetic_tps(cpu_percent, memory_percent, players),
            TpsSource::Estimated,
        ),
        _ => (0.0, TpsSource::Estimated),
    }
}

/// Periodically polls host and process usage and publishes `performance_update`.
pub struct TelemetrySampler {
    supervisor: Arc<ProcessSupervisor>,
    probe: Option<HostProbe>,
    interval: Duration,
}

impl TelemetrySampler {
    pub fn new(supervisor: Arc<ProcessSupervisor>, interval: Duration) -> Self {
        Self {
            supervisor,
            probe: Some(HostProbe::new()),
            interval: interval.max(Duration::from_millis(100)),
        }
    }

    async fn probe(&mut self, pid: Option<u32>) -> HostUsage {
        let Some(mut probe) = self.probe.take() else {
            return HostUsage::default();
        };
        match tokio::task::spawn_blocking(move || {
            let usage = probe.refresh(pid);
            (probe, usage)
        })
        .await
        {
            Ok((probe, usage)) => {
                self.probe = Some(probe);
                usage
            }
            Err(err) => {
                error!("host probe failed: {}", err);
                self.probe = Some(HostProbe::new());
                HostUsage::default()
            }
        }
    }

    /// Takes one sample, stores it as the latest and publishes it.
    pub async fn sample_once(&mut self) -> TelemetrySample {
        let inputs = self.supervisor.telemetry_inputs().await;
        let usage = self.probe(inputs.pid).await;
        let process = usage.process.filter(|_| inputs.running).unwrap_or_default();

        let (estimated_tps, tps_source) = tps_policy(
            inputs.measured_tps,
            inputs.running,
            usage.cpu_percent,
            usage.memory_percent,
            inputs.player_count,
        );
        let sample = TelemetrySample {
            cpu_percent: usage.cpu_percent,
            process_cpu_percent: process.cpu_percent,
            process_memory_mb: process.memory_mb,
            system_memory_percent: usage.memory_percent,
            estimated_tps,
            tps_source,
            player_count: inputs.player_count,
            uptime_seconds: inputs.uptime_seconds,
            running: inputs.running,
        };

        self.supervisor.record_sample(sample.clone()).await;
        self.supervisor
            .broadcaster()
            .publish(Events::PerformanceUpdate {
                sample: sample.clone(),
            });
        sample
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("telemetry sampler running every {:?}", self.interval);
            loop {
                ticker.tick().await;
                self.sample_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::history::HistoryPersister;
    use crate::management::supervisor::SupervisorOptions;
    use crate::utils::Broadcaster;
    use pretty_assertions::assert_eq;

    #[test]
    fn synthetic_tps_drops_with_load_and_players() {
        assert_eq!(synthetic_tps(0.0, 0.0, 0), 20.0);
        assert!(synthetic_tps(50.0, 50.0, 0) < synthetic_tps(10.0, 10.0, 0));
        assert!(synthetic_tps(10.0, 10.0, 20) < synthetic_tps(10.0, 10.0, 2));
        assert_eq!(synthetic_tps(100.0, 100.0, 0), 19.0);
    }

    #[test]
    fn synthetic_tps_never_drops_below_floor() {
        assert_eq!(synthetic_tps(100.0, 100.0, 1000), MIN_SYNTHETIC_TPS);
    }

    #[test]
    fn policy_prefers_measured_and_zeroes_when_stopped() {
        assert_eq!(
            tps_policy(Some(17.5), true, 90.0, 90.0, 3),
            (17.5, TpsSource::Measured)
        );
        assert_eq!(
            tps_policy(None, true, 0.0, 0.0, 0),
            (20.0, TpsSource::Estimated)
        );
        assert_eq!(
            tps_policy(Some(17.5), false, 0.0, 0.0, 0),
            (0.0, TpsSource::Estimated)
        );
    }

    #[tokio::test]
    async fn sample_while_stopped_is_zeroed_and_published() {
        let broadcaster = Arc::new(Broadcaster::default());
        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::default(),
            vec![],
            broadcaster.clone(),
            HistoryPersister::disabled(),
        );
        let mut observer = broadcaster.attach(vec![]);
        // drop the empty history replay
        observer.try_recv();

        let mut sampler = TelemetrySampler::new(supervisor.clone(), Duration::from_secs(2));
        let sample = sampler.sample_once().await;

        assert!(!sample.running);
        assert_eq!(sample.estimated_tps, 0.0);
        assert_eq!(sample.process_memory_mb, 0.0);
        assert_eq!(sample.uptime_seconds, 0);

        let payload = observer.try_recv().unwrap();
        assert!(payload.contains("performance_update"));
        assert_eq!(supervisor.report(20).await.performance, Some(sample));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sample_after_start_reads_the_child() {
        use crate::management::supervisor::tests::{
            fake_java, start_retrying, supervisor, OBEDIENT_SERVER,
        };

        let dir = tempfile::tempdir().unwrap();
        let supervisor = supervisor(SupervisorOptions::default());
        let instance =
            start_retrying(&supervisor, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        let mut sampler = TelemetrySampler::new(supervisor.clone(), Duration::from_secs(2));
        let sample = sampler.sample_once().await;

        assert!(sample.running);
        assert_eq!(sample.tps_source, TpsSource::Estimated);
        assert!((MIN_SYNTHETIC_TPS..=NOMINAL_TPS).contains(&sample.estimated_tps));
        assert!(sample.process_memory_mb > 0.0, "no metrics for pid {:?}", instance.pid);
        assert_eq!(sample.player_count, 0);

        supervisor.stop().await.unwrap();
    }
}
