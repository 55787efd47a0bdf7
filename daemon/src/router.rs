use crate::auth::{AccessGate, GateError, LoginGrant, Session};
use crate::config::ConfigStore;
use crate::integrations::StartupRegistrar;
use crate::management::config::is_memory_size;
use crate::management::{LaunchConfig, ProcessSupervisor, SupervisorError};
use log::info;
use std::sync::Arc;
use thiserror::Error;
use warden_protocol::management::console::ConsoleEntry;
use warden_protocol::management::instance::{ServerInstance, ServerSettings, StatusReport};
use warden_protocol::user::{PendingRegistrationInfo, Role};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("{0}")]
    Integration(String),
}

/// Resolves the caller and checks it holds at least `required`.
pub async fn authorize(
    gate: &AccessGate,
    token: Option<&str>,
    required: Role,
) -> Result<Session, GateError> {
    let token = token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| GateError::Auth("login required".into()))?;
    let session = gate.resolve(token).await?;
    if session.role.satisfies(required) {
        Ok(session)
    } else {
        Err(GateError::Forbidden)
    }
}

/// Maps every external command onto the gate and the supervisor.
pub struct CommandRouter {
    gate: Arc<AccessGate>,
    supervisor: Arc<ProcessSupervisor>,
    config: Arc<ConfigStore>,
    registrar: Arc<dyn StartupRegistrar>,
}

impl CommandRouter {
    pub fn new(
        gate: Arc<AccessGate>,
        supervisor: Arc<ProcessSupervisor>,
        config: Arc<ConfigStore>,
        registrar: Arc<dyn StartupRegistrar>,
    ) -> Self {
        Self {
            gate,
            supervisor,
            config,
            registrar,
        }
    }

    pub async fn authorize(&self, token: Option<&str>, required: Role) -> Result<Session, RouterError> {
        Ok(authorize(&self.gate, token, required).await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, RouterError> {
        Ok(self.gate.login(username, password).await?)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), RouterError> {
        Ok(self.gate.register(username, password, email).await?)
    }

    pub async fn logout(&self, token: Option<&str>) -> Result<(), RouterError> {
        let token = token.ok_or_else(|| GateError::Auth("login required".into()))?;
        Ok(self.gate.logout(token).await?)
    }

    pub async fn start(&self, token: Option<&str>) -> Result<ServerInstance, RouterError> {
        let session = self.authorize(token, Role::User).await?;
        let launch = LaunchConfig::from_settings(&self.config.server_settings().await);
        info!("{} requested start", session.username);
        Ok(self.supervisor.start(launch).await?)
    }

    pub async fn stop(&self, token: Option<&str>) -> Result<ServerInstance, RouterError> {
        let session = self.authorize(token, Role::User).await?;
        info!("{} requested stop", session.username);
        Ok(self.supervisor.stop().await?)
    }

    pub async fn restart(&self, token: Option<&str>) -> Result<ServerInstance, RouterError> {
        let session = self.authorize(token, Role::User).await?;
        info!("{} requested restart", session.username);
        Ok(self.supervisor.restart().await?)
    }

    pub async fn send_command(&self, token: Option<&str>, command: &str) -> Result<(), RouterError> {
        self.authorize(token, Role::User).await?;
        Ok(self.supervisor.send_command(command).await?)
    }

    pub async fn status(&self, token: Option<&str>) -> Result<StatusReport, RouterError> {
        self.authorize(token, Role::User).await?;
        let max_players = self.config.server_settings().await.max_players;
        Ok(self.supervisor.report(max_players).await)
    }

    pub async fn console_history(
        &self,
        token: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ConsoleEntry>, RouterError> {
        self.authorize(token, Role::User).await?;
        let limit = limit.unwrap_or(self.supervisor.options().replay_limit);
        Ok(self.supervisor.console_history(limit).await)
    }

    pub async fn pending_registrations(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<PendingRegistrationInfo>, RouterError> {
        let session = self.authorize(token, Role::Admin).await?;
        Ok(self.gate.list_pending(&session).await?)
    }

    pub async fn approve(&self, token: Option<&str>, username: &str) -> Result<(), RouterError> {
        let session = self.authorize(token, Role::Admin).await?;
        Ok(self.gate.approve(&session, username).await?)
    }

    pub async fn reject(&self, token: Option<&str>, username: &str) -> Result<(), RouterError> {
        let session = self.authorize(token, Role::Admin).await?;
        Ok(self.gate.reject(&session, username).await?)
    }

    pub async fn get_settings(
        &self,
        token: Option<&str>,
    ) -> Result<(ServerSettings, bool), RouterError> {
        self.authorize(token, Role::User).await?;
        let launch_on_login = self
            .registrar
            .is_enabled()
            .await
            .map_err(|err| RouterError::Integration(err.to_string()))?;
        Ok((self.config.server_settings().await, launch_on_login))
    }

    /// Stores new launch settings. They apply from the next start.
    pub async fn update_settings(
        &self,
        token: Option<&str>,
        settings: ServerSettings,
    ) -> Result<ServerSettings, RouterError> {
        let session = self.authorize(token, Role::Admin).await?;
        validate_settings(&settings)?;

        self.config.update_server(settings.clone()).await;
        info!("{} updated server settings", session.username);
        Ok(settings)
    }

    pub async fn set_launch_on_login(
        &self,
        token: Option<&str>,
        enabled: bool,
    ) -> Result<bool, RouterError> {
        self.authorize(token, Role::Admin).await?;
        self.registrar
            .set_enabled(enabled)
            .await
            .map_err(|err| RouterError::Integration(err.to_string()))?;
        Ok(enabled)
    }
}

fn validate_settings(settings: &ServerSettings) -> Result<(), GateError> {
    if settings.java_path.trim().is_empty() {
        return Err(GateError::InvalidInput("java path must not be empty".into()));
    }
    for (name, value) in [
        ("minMemory", &settings.min_memory),
        ("maxMemory", &settings.max_memory),
    ] {
        if !is_memory_size(value) {
            return Err(GateError::InvalidInput(format!(
                "{} must look like 512M or 2G",
                name
            )));
        }
    }
    if settings.port == 0 {
        return Err(GateError::InvalidInput("port must not be 0".into()));
    }
    Ok(())
}
