use crate::management::history::ConsoleHistory;
use crate::management::parser::LineEvent;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use warden_protocol::management::console::ConsoleEntry;
use warden_protocol::management::instance::{ServerInstance, TelemetrySample};
use warden_protocol::v1::event::Events;

/// Everything the control path, the output relay and the sampler share.
/// Lives behind one mutex.
#[derive(Debug)]
pub struct InstanceState {
    pub instance: ServerInstance,
    pub players: HashSet<String>,
    pub history: ConsoleHistory,
    pub latest_sample: Option<TelemetrySample>,
    /// bumped on every launch so stale relays can be told apart
    pub run_id: u64,
    tps_window: Duration,
    tps_samples: VecDeque<(Instant, f64)>,
}

impl InstanceState {
    pub fn new(history: ConsoleHistory, tps_window: Duration) -> Self {
        Self {
            instance: ServerInstance::default(),
            players: HashSet::new(),
            history,
            latest_sample: None,
            run_id: 0,
            tps_window,
            tps_samples: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, event: LineEvent, now: Instant) {
        match event {
            LineEvent::Tps(tps) => self.tps_samples.push_back((now, tps)),
            LineEvent::PlayerJoined(name) => {
                self.players.insert(name);
            }
            LineEvent::PlayerLeft(name) => {
                self.players.remove(&name);
            }
        }
    }

    /// Mean of the TPS figures printed within the trailing window.
    pub fn measured_tps(&mut self, now: Instant) -> Option<f64> {
        while let Some((at, _)) = self.tps_samples.front() {
            if now.saturating_duration_since(*at) > self.tps_window {
                self.tps_samples.pop_front();
            } else {
                break;
            }
        }
        if self.tps_samples.is_empty() {
            return None;
        }
        let sum: f64 = self.tps_samples.iter().map(|(_, tps)| tps).sum();
        Some(sum / self.tps_samples.len() as f64)
    }

    /// Forgets per-process observations when a process starts or ends.
    pub fn reset_run(&mut self) {
        self.players.clear();
        self.tps_samples.clear();
    }
}

/// Side effects collected under the state lock and released after it.
#[derive(Default)]
pub struct Outbox {
    pub events: Vec<Events>,
    /// history version and the full history, when a flush is due
    pub flush: Option<(u64, Vec<ConsoleEntry>)>,
}

impl Outbox {
    pub fn entry(&mut self, state: &mut InstanceState, entry: ConsoleEntry) {
        if state.history.append(entry.clone()) {
            self.flush = Some(state.history.versioned());
        }
        self.events.push(Events::ConsoleUpdate { entry });
    }

    pub fn status(&mut self, state: &InstanceState) {
        self.events.push(Events::StatusChanged {
            instance: state.instance.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> InstanceState {
        InstanceState::new(
            ConsoleHistory::with_entries(vec![], 10, 10),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn joins_and_leaves_track_player_set() {
        let mut state = state();
        let now = Instant::now();
        state.apply(LineEvent::PlayerJoined("Steve".into()), now);
        state.apply(LineEvent::PlayerJoined("Steve".into()), now);
        state.apply(LineEvent::PlayerJoined("Alex".into()), now);
        assert_eq!(state.players.len(), 2);

        state.apply(LineEvent::PlayerLeft("Steve".into()), now);
        state.apply(LineEvent::PlayerLeft("Nobody".into()), now);
        assert_eq!(state.players.len(), 1);

        state.reset_run();
        assert!(state.players.is_empty());
    }

    #[test]
    fn measured_tps_averages_within_window() {
        let mut state = state();
        let start = Instant::now();
        state.apply(LineEvent::Tps(10.0), start);
        state.apply(LineEvent::Tps(20.0), start + Duration::from_secs(30));
        assert_eq!(state.measured_tps(start + Duration::from_secs(40)), Some(15.0));

        // the first figure falls out of the window
        assert_eq!(state.measured_tps(start + Duration::from_secs(61)), Some(20.0));
        assert_eq!(state.measured_tps(start + Duration::from_secs(200)), None);
    }

    #[test]
    fn outbox_requests_flush_when_history_is_due() {
        let mut state = InstanceState::new(
            ConsoleHistory::with_entries(vec![], 10, 2),
            Duration::from_secs(60),
        );
        let mut outbox = Outbox::default();
        outbox.entry(&mut state, ConsoleEntry::output("a"));
        assert!(outbox.flush.is_none());
        outbox.entry(&mut state, ConsoleEntry::output("b"));
        assert_eq!(
            outbox.flush.as_ref().map(|(version, entries)| (*version, entries.len())),
            Some((2, 2))
        );
        assert_eq!(outbox.events.len(), 2);
    }
}
