use super::super::Protocol;
use std::sync::Arc;

use crate::auth::GateError;
use crate::management::SupervisorError;
use crate::router::{CommandRouter, RouterError};
use log::{error, warn};
use warden_protocol::v1::action::retcode::Retcode;
use warden_protocol::v1::action::status::ActionStatus;
use warden_protocol::v1::action::{
    retcode, ActionParameters, ActionRequest, ActionResponse, ActionResults,
};
use uuid::Uuid;

pub struct ProtocolV1 {
    router: Arc<CommandRouter>,
}

impl Protocol for ProtocolV1 {
    fn process_text_request(&self, raw: &str) -> Result<ActionRequest, ActionResponse> {
        serde_json::from_str::<ActionRequest>(raw).map_err(|err| {
            warn!("bad request: {}", err);
            Self::err(retcode::BAD_REQUEST.with_message(&err.to_string()), Uuid::nil())
        })
    }

    async fn process_request(&self, token: Option<&str>, request: ActionRequest) -> ActionResponse {
        match self.dispatch(token, request.parameters).await {
            Ok(data) => Self::ok(data, request.id),
            Err(err) => Self::err(Self::retcode_of(&err), request.id),
        }
    }

    async fn process_text(&self, token: Option<&str>, raw: &str) -> String {
        let response = match self.process_text_request(raw) {
            Ok(request) => self.process_request(token, request).await,
            Err(response) => response,
        };
        serde_json::to_string(&response).unwrap_or_else(|err| {
            error!("could not serialize response: {}", err);
            String::new()
        })
    }
}

impl ProtocolV1 {
    pub fn new(router: Arc<CommandRouter>) -> Self {
        Self { router }
    }

    pub fn err(retcode: Retcode, id: Uuid) -> ActionResponse {
        ActionResponse {
            status: ActionStatus::Error,
            data: ActionResults::ActionError,
            retcode,
            id,
        }
    }

    fn ok(data: ActionResults, id: Uuid) -> ActionResponse {
        ActionResponse {
            status: ActionStatus::Ok,
            data,
            retcode: retcode::OK.clone(),
            id,
        }
    }

    pub fn retcode_of(err: &RouterError) -> Retcode {
        match err {
            RouterError::Gate(gate) => match gate {
                GateError::Auth(msg) => retcode::AUTH_FAILED.with_message(msg),
                GateError::Forbidden => retcode::FORBIDDEN.clone(),
                GateError::Conflict(_) => retcode::CONFLICT.with_message(&gate.to_string()),
                GateError::NotFound(_) => retcode::NOT_FOUND.with_message(&gate.to_string()),
                GateError::InvalidInput(msg) => retcode::PARAM_ERROR.with_message(msg),
                GateError::Internal(msg) => retcode::UNEXPECTED_ERROR.with_message(msg),
            },
            RouterError::Supervisor(supervisor) => match supervisor {
                SupervisorError::Launch(msg) => retcode::LAUNCH_ERROR.with_message(msg),
                SupervisorError::NotRunning => retcode::NOT_RUNNING.clone(),
                SupervisorError::AlreadyRunning => retcode::ALREADY_RUNNING.clone(),
                SupervisorError::EmptyCommand => {
                    retcode::PARAM_ERROR.with_message(&supervisor.to_string())
                }
                SupervisorError::Io(msg) => retcode::PROCESS_ERROR.with_message(msg),
            },
            RouterError::Integration(msg) => retcode::UNEXPECTED_ERROR.with_message(msg),
        }
    }

    async fn dispatch(
        &self,
        token: Option<&str>,
        parameters: ActionParameters,
    ) -> Result<ActionResults, RouterError> {
        let router = &self.router;
        let results = match parameters {
            ActionParameters::Ping {} => ActionResults::Ping {
                time: chrono::Utc::now().timestamp() as u64,
            },
            ActionParameters::Login { username, password } => {
                let grant = router.login(&username, &password).await?;
                ActionResults::Login {
                    token: grant.token,
                    username: grant.session.username,
                    role: grant.session.role,
                    expires_at: grant.session.expires_at,
                }
            }
            ActionParameters::Register {
                username,
                password,
                email,
            } => {
                router
                    .register(&username, &password, email.as_deref())
                    .await?;
                ActionResults::Register {
                    username,
                    pending: true,
                }
            }
            ActionParameters::Logout {} => {
                router.logout(token).await?;
                ActionResults::Logout {}
            }
            ActionParameters::Start {} => ActionResults::Start {
                instance: router.start(token).await?,
            },
            ActionParameters::Stop {} => ActionResults::Stop {
                instance: router.stop(token).await?,
            },
            ActionParameters::Restart {} => ActionResults::Restart {
                instance: router.restart(token).await?,
            },
            ActionParameters::SendCommand { command } => {
                router.send_command(token, &command).await?;
                ActionResults::SendCommand {}
            }
            ActionParameters::Status {} => ActionResults::Status(router.status(token).await?),
            ActionParameters::ConsoleHistory { limit } => ActionResults::ConsoleHistory {
                entries: router.console_history(token, limit).await?,
            },
            ActionParameters::PendingRegistrations {} => ActionResults::PendingRegistrations {
                pending: router.pending_registrations(token).await?,
            },
            ActionParameters::Approve { username } => {
                router.approve(token, &username).await?;
                ActionResults::Approve { username }
            }
            ActionParameters::Reject { username } => {
                router.reject(token, &username).await?;
                ActionResults::Reject { username }
            }
            ActionParameters::GetSettings {} => {
                let (settings, launch_on_login) = router.get_settings(token).await?;
                ActionResults::GetSettings {
                    settings,
                    launch_on_login,
                }
            }
            ActionParameters::UpdateSettings { settings } => ActionResults::UpdateSettings {
                settings: router.update_settings(token, settings).await?,
            },
            ActionParameters::SetLaunchOnLogin { enabled } => ActionResults::SetLaunchOnLogin {
                enabled: router.set_launch_on_login(token, enabled).await?,
            },
        };
        Ok(results)
    }
}
