use crate::management::console::ConsoleEntry;
use crate::management::instance::{ServerInstance, TelemetrySample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateNotice {
    pub current_version: String,
    pub latest_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Events {
    ConsoleUpdate { entry: ConsoleEntry },
    /// replay sent to an observer right after it attaches
    ConsoleHistory { entries: Vec<ConsoleEntry> },
    PerformanceUpdate { sample: TelemetrySample },
    StatusChanged { instance: ServerInstance },
    UpdateAvailable(UpdateNotice),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventPacket {
    #[serde(flatten)]
    pub event: Events,
    pub time: u64,
}

impl EventPacket {
    pub fn new(event: Events) -> Self {
        Self {
            event,
            time: chrono::Utc::now().timestamp() as u64,
        }
    }
}

impl From<Events> for EventPacket {
    fn from(event: Events) -> Self {
        Self::new(event)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::management::instance::InstanceStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_changed_packet_shape() {
        let packet = EventPacket {
            event: Events::StatusChanged {
                instance: ServerInstance {
                    status: InstanceStatus::Crashed,
                    ..Default::default()
                },
            },
            time: 1700000000,
        };
        let expected = serde_json::json!({
            "event": "status_changed",
            "data": {
                "instance": {
                    "status": "crashed",
                    "pid": null,
                    "started_at": null,
                    "command_line": []
                }
            },
            "time": 1700000000
        });
        assert_eq!(serde_json::to_value(&packet).unwrap(), expected);
    }

    #[test]
    fn update_notice_is_flattened_into_data() {
        let packet = EventPacket {
            event: Events::UpdateAvailable(UpdateNotice {
                current_version: "0.1.0".into(),
                latest_version: "0.2.0".into(),
            }),
            time: 1,
        };
        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["event"], "update_available");
        assert_eq!(json["data"]["latest_version"], "0.2.0");
    }
}
