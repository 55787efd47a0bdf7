use crate::management::console::ConsoleEntry;
use crate::management::instance::{ServerInstance, ServerSettings, StatusReport};
use crate::user::{PendingRegistrationInfo, Role};
use crate::v1::action::retcode::Retcode;
use crate::v1::action::status::ActionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum ActionParameters {
    // misc
    Ping {},

    // session
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        password: String,
        #[serde(default)]
        email: Option<String>,
    },
    Logout {},

    // instance operation
    Start {},
    Stop {},
    Restart {},
    SendCommand {
        command: String,
    },
    Status {},
    ConsoleHistory {
        #[serde(default)]
        limit: Option<usize>,
    },

    // account administration
    PendingRegistrations {},
    Approve {
        username: String,
    },
    Reject {
        username: String,
    },

    // settings
    GetSettings {},
    UpdateSettings {
        settings: ServerSettings,
    },
    SetLaunchOnLogin {
        enabled: bool,
    },
}

impl ActionParameters {
    /// Actions that can be executed before a session exists.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            ActionParameters::Ping {}
                | ActionParameters::Login { .. }
                | ActionParameters::Register { .. }
        )
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ActionResults {
    ActionError,

    // misc
    Ping {
        time: u64,
    },

    // session
    Login {
        token: String,
        username: String,
        role: Role,
        expires_at: u64,
    },
    Register {
        username: String,
        pending: bool,
    },
    Logout {},

    // instance operation
    Start {
        instance: ServerInstance,
    },
    Stop {
        instance: ServerInstance,
    },
    Restart {
        instance: ServerInstance,
    },
    SendCommand {},
    Status(StatusReport),
    ConsoleHistory {
        entries: Vec<ConsoleEntry>,
    },

    // account administration
    PendingRegistrations {
        pending: Vec<PendingRegistrationInfo>,
    },
    Approve {
        username: String,
    },
    Reject {
        username: String,
    },

    // settings
    GetSettings {
        settings: ServerSettings,
        launch_on_login: bool,
    },
    UpdateSettings {
        settings: ServerSettings,
    },
    SetLaunchOnLogin {
        enabled: bool,
    },
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ActionRequest {
    #[serde(flatten)]
    pub parameters: ActionParameters, // flattened
    #[serde(default)]
    pub id: Uuid,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub data: ActionResults,
    #[serde(flatten)]
    pub retcode: Retcode,
    pub id: Uuid,
}
