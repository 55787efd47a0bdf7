use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::auth::{AccessGate, AccountPaths};
use crate::config::{ConfigStore, CONFIG_FILE};
use crate::drivers::websocket::{WsConnManager, WsDriver};
use crate::drivers::GracefulShutdown;
use crate::integrations::{
    spawn_update_watch, NoopRegistrar, NoopUpdateChecker, UPDATE_CHECK_INTERVAL,
};
use crate::management::{
    load_history, HistoryPersister, LaunchConfig, ProcessSupervisor, TelemetrySampler,
};
use crate::protocols::v1::ProtocolV1;
use crate::router::CommandRouter;
use crate::utils::Broadcaster;
use tokio::sync::Notify;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const HISTORY_FILE: &str = "console_history.json";
pub const ADMIN_PASSWORD_ENV: &str = "WARDEN_ADMIN_PASSWORD";
static START_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

pub struct ApplicationState {
    pub stop_notify: Arc<Notify>,
    pub config: Arc<ConfigStore>,
    pub supervisor: Arc<ProcessSupervisor>,
    pub router: Arc<CommandRouter>,
    pub protocol_v1: Arc<ProtocolV1>,
    pub ws_connections: Mutex<Vec<JoinHandle<()>>>,
    pub ws_conn_manager: WsConnManager,
}
pub type AppState = Arc<ApplicationState>;

pub fn get_start_time() -> &'static DateTime<Utc> {
    START_TIME.deref()
}

async fn init_app_state(data_dir: PathBuf) -> AppState {
    let config = Arc::new(ConfigStore::load(data_dir.join(CONFIG_FILE)));
    let snapshot = config.snapshot().await;
    debug!(
        "config loaded: listening on {}, history cap {}",
        snapshot.bind_addr(),
        snapshot.console_history_cap
    );

    let history_path = data_dir.join(HISTORY_FILE);
    let supervisor = ProcessSupervisor::new(
        snapshot.supervisor_options(),
        load_history(&history_path),
        Arc::new(Broadcaster::default()),
        HistoryPersister::spawn(history_path),
    );

    let gate = Arc::new(AccessGate::open(
        AccountPaths::in_dir(&data_dir),
        &snapshot.auth,
    ));
    gate.bootstrap_admin(std::env::var(ADMIN_PASSWORD_ENV).ok())
        .await;

    let router = Arc::new(CommandRouter::new(
        gate,
        supervisor.clone(),
        config.clone(),
        Arc::new(NoopRegistrar::default()),
    ));
    let protocol_v1 = Arc::new(ProtocolV1::new(router.clone())); // v1 protocol resources

    Arc::new(ApplicationState {
        stop_notify: Arc::new(Notify::new()),
        config,
        supervisor,
        router,
        protocol_v1,
        ws_connections: Mutex::new(vec![]),
        ws_conn_manager: WsConnManager::new(),
    })
}

pub async fn run_app() -> anyhow::Result<()> {
    let _ = get_start_time();

    let state = init_app_state(std::env::current_dir()?).await;
    let snapshot = state.config.snapshot().await;

    let telemetry =
        TelemetrySampler::new(state.supervisor.clone(), snapshot.telemetry_interval()).spawn();
    let update_watch = spawn_update_watch(
        Arc::new(NoopUpdateChecker),
        state.supervisor.broadcaster().clone(),
        VERSION,
        UPDATE_CHECK_INTERVAL,
    );

    if snapshot.server.auto_start {
        match state
            .supervisor
            .start(LaunchConfig::from_settings(&snapshot.server))
            .await
        {
            Ok(instance) => info!("auto started server (pid={:?})", instance.pid),
            Err(err) => warn!("auto start failed: {}", err),
        }
    }

    let mut gs = GracefulShutdown::new();
    gs.add_driver(WsDriver::new(state.clone()));
    gs.watch(state.stop_notify.clone()).await;

    update_watch.abort();
    let instance = state.supervisor.status().await;
    if instance.status.is_running() {
        info!("stopping server (pid={:?}) before exit", instance.pid);
    }
    state.supervisor.shutdown().await;
    telemetry.abort();
    info!(
        "Bye. (up since {})",
        get_start_time().format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}
