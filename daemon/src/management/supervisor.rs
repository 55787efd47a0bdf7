use crate::management::comm::{
    ExitCode, ExitWatch, InstanceProcess, OutputRelay, OutputSink, ProcessHelper,
};
use crate::management::config::LaunchConfig;
use crate::management::history::{
    ConsoleHistory, HistoryPersister, DEFAULT_CAPACITY, DEFAULT_FLUSH_EVERY,
};
use crate::management::parser::parse_line;
use crate::management::state::{InstanceState, Outbox};
use crate::utils::{Broadcaster, Observer};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::sync::Mutex;
use tokio::time::timeout;
use warden_protocol::management::console::ConsoleEntry;
use warden_protocol::management::instance::{
    InstanceStatus, ServerInstance, StatusReport, TelemetrySample,
};

pub const STARTED_NOTICE: &str = "Server started successfully";
pub const STOPPED_NOTICE: &str = "Server stopped";
pub const CRASHED_NOTICE: &str = "Server process ended unexpectedly";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("{0}")]
    Launch(String),
    #[error("server is not running")]
    NotRunning,
    #[error("server is already running")]
    AlreadyRunning,
    #[error("command is empty")]
    EmptyCommand,
    #[error("could not write to server: {0}")]
    Io(String),
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub history_capacity: usize,
    pub flush_every: usize,
    pub replay_limit: usize,
    pub tps_window: Duration,
    pub stop_grace: Duration,
    pub stop_term: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            flush_every: DEFAULT_FLUSH_EVERY,
            replay_limit: 100,
            tps_window: Duration::from_secs(60),
            stop_grace: Duration::from_secs(30),
            stop_term: Duration::from_secs(5),
        }
    }
}

/// Handle to the running child owned by the supervisor.
struct RunHandle {
    run_id: u64,
    pid: u32,
    /// writers queue here, not on the `process` lock
    stdin: Arc<Mutex<ChildStdin>>,
    exit: ExitWatch,
}

/// Inputs the telemetry sampler needs from one consistent view of the state.
#[derive(Debug, Clone)]
pub struct TelemetryInputs {
    pub pid: Option<u32>,
    pub running: bool,
    pub player_count: usize,
    pub uptime_seconds: u64,
    pub measured_tps: Option<f64>,
}

/// Owns the single server process and everything derived from it.
pub struct ProcessSupervisor {
    options: SupervisorOptions,
    state: Mutex<InstanceState>,
    /// serializes start / stop / restart
    control: Mutex<()>,
    process: Mutex<Option<RunHandle>>,
    last_launch: Mutex<Option<LaunchConfig>>,
    broadcaster: Arc<Broadcaster>,
    persister: HistoryPersister,
}

impl ProcessSupervisor {
    pub fn new(
        options: SupervisorOptions,
        history: Vec<ConsoleEntry>,
        broadcaster: Arc<Broadcaster>,
        persister: HistoryPersister,
    ) -> Arc<Self> {
        let history =
            ConsoleHistory::with_entries(history, options.history_capacity, options.flush_every);
        Arc::new(Self {
            state: Mutex::new(InstanceState::new(history, options.tps_window)),
            options,
            control: Mutex::new(()),
            process: Mutex::new(None),
            last_launch: Mutex::new(None),
            broadcaster,
            persister,
        })
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    fn deliver(&self, outbox: Outbox) {
        if let Some((version, snapshot)) = outbox.flush {
            self.persister.submit(version, snapshot);
        }
        for event in outbox.events {
            self.broadcaster.publish(event);
        }
    }

    async fn notice(&self, text: impl Into<String>) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock().await;
            outbox.entry(&mut state, ConsoleEntry::notice(text));
        }
        self.deliver(outbox);
    }

    pub async fn status(&self) -> ServerInstance {
        self.state.lock().await.instance.clone()
    }

    pub async fn report(&self, max_players: u32) -> StatusReport {
        let state = self.state.lock().await;
        let mut players: Vec<String> = state.players.iter().cloned().collect();
        players.sort();
        StatusReport {
            instance: state.instance.clone(),
            performance: state.latest_sample.clone(),
            players,
            max_players,
        }
    }

    pub async fn console_history(&self, limit: usize) -> Vec<ConsoleEntry> {
        self.state.lock().await.history.snapshot(limit)
    }

    /// Attaches a new observer. The replay is taken under the state lock so that
    /// no entry appended afterwards can be missing from both replay and stream.
    pub async fn attach_observer(&self) -> Observer {
        let state = self.state.lock().await;
        self.broadcaster
            .attach(state.history.snapshot(self.options.replay_limit))
    }

    pub async fn start(self: &Arc<Self>, launch: LaunchConfig) -> Result<ServerInstance, SupervisorError> {
        let _control = self.control.lock().await;
        self.start_locked(launch).await
    }

    async fn start_locked(
        self: &Arc<Self>,
        launch: LaunchConfig,
    ) -> Result<ServerInstance, SupervisorError> {
        if !self.state.lock().await.instance.status.can_start() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let start_info = launch.start_info()?;
        let command_line = start_info.command_line();
        let (process, output) = InstanceProcess::spawn(&start_info).map_err(|err| {
            warn!("could not launch `{}`: {}", start_info.target, err);
            SupervisorError::Launch(err.to_string())
        })?;
        let pid = process.pid;
        let exit = process.exit.clone();

        let mut outbox = Outbox::default();
        let (run_id, instance) = {
            let mut state = self.state.lock().await;
            state.run_id += 1;
            let run_id = state.run_id;

            *self.process.lock().await = Some(RunHandle {
                run_id,
                pid,
                stdin: Arc::new(Mutex::new(process.stdin)),
                exit: process.exit,
            });

            state.reset_run();
            state.instance = ServerInstance {
                status: InstanceStatus::Running,
                pid: Some(pid),
                started_at: Some(chrono::Utc::now()),
                command_line,
            };
            outbox.entry(&mut state, ConsoleEntry::notice(STARTED_NOTICE));
            outbox.status(&state);
            (run_id, state.instance.clone())
        };
        *self.last_launch.lock().await = Some(launch);
        self.deliver(outbox);

        info!("server started (pid={})", pid);
        OutputRelay::spawn(self.clone(), run_id, output, exit);
        Ok(instance)
    }

    pub async fn stop(&self) -> Result<ServerInstance, SupervisorError> {
        self.stop_with(self.options.stop_grace, self.options.stop_term)
            .await
    }

    pub async fn stop_with(
        &self,
        grace: Duration,
        term: Duration,
    ) -> Result<ServerInstance, SupervisorError> {
        let _control = self.control.lock().await;
        self.stop_locked(grace, term).await
    }

    async fn stop_locked(
        &self,
        grace: Duration,
        term: Duration,
    ) -> Result<ServerInstance, SupervisorError> {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock().await;
            if !state.instance.status.is_running() {
                return Err(SupervisorError::NotRunning);
            }
            state.instance.status = InstanceStatus::Stopping;
            outbox.status(&state);
        }
        self.deliver(outbox);

        let running = self
            .process
            .lock()
            .await
            .as_ref()
            .map(|handle| (handle.pid, handle.stdin.clone(), handle.exit.clone()));
        let Some((pid, stdin, mut exit)) = running else {
            // the relay saw the exit while we were switching to stopping
            return Ok(self.finish_stop().await);
        };

        // a server that stopped reading stdin must not hold up the escalation
        let graceful = timeout(grace, async {
            match write_line(&stdin, "stop").await {
                Ok(()) => self.notice("Stop command sent to server").await,
                Err(err) => warn!("could not send stop command: {}", err),
            }
            exit.wait().await
        })
        .await;

        if graceful.is_err() {
            self.notice(format!(
                "Server did not stop within {}s, sending termination signal",
                grace.as_secs()
            ))
            .await;
            if let Err(err) = ProcessHelper::stop(pid) {
                warn!("could not signal server process (pid={}): {}", pid, err);
            }

            if timeout(term, exit.wait()).await.is_err() {
                self.notice("Server ignored termination signal, killing process")
                    .await;
                if let Err(err) = ProcessHelper::kill(pid) {
                    error!("could not kill server process (pid={}): {}", pid, err);
                }
                exit.wait().await;
            }
        }

        Ok(self.finish_stop().await)
    }

    async fn finish_stop(&self) -> ServerInstance {
        self.process.lock().await.take();

        let mut outbox = Outbox::default();
        let instance = {
            let mut state = self.state.lock().await;
            state.reset_run();
            state.instance.status = InstanceStatus::Stopped;
            state.instance.pid = None;
            outbox.entry(&mut state, ConsoleEntry::notice(STOPPED_NOTICE));
            outbox.status(&state);
            state.instance.clone()
        };
        self.deliver(outbox);
        info!("server stopped");
        instance
    }

    /// Stops the server and launches it again with the previous launch config.
    pub async fn restart(self: &Arc<Self>) -> Result<ServerInstance, SupervisorError> {
        let _control = self.control.lock().await;
        let launch = self
            .last_launch
            .lock()
            .await
            .clone()
            .ok_or(SupervisorError::NotRunning)?;

        self.stop_locked(self.options.stop_grace, self.options.stop_term)
            .await?;
        self.start_locked(launch).await
    }

    pub async fn send_command(&self, command: &str) -> Result<(), SupervisorError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        if !self.state.lock().await.instance.status.is_running() {
            return Err(SupervisorError::NotRunning);
        }

        let stdin = self
            .process
            .lock()
            .await
            .as_ref()
            .map(|handle| handle.stdin.clone())
            .ok_or(SupervisorError::NotRunning)?;
        write_line(&stdin, command)
            .await
            .map_err(|err| SupervisorError::Io(err.to_string()))?;

        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock().await;
            outbox.entry(&mut state, ConsoleEntry::command(command));
        }
        self.deliver(outbox);
        Ok(())
    }

    pub async fn telemetry_inputs(&self) -> TelemetryInputs {
        let mut state = self.state.lock().await;
        let running = state.instance.status.is_running();
        TelemetryInputs {
            pid: state.instance.pid.filter(|_| running),
            running,
            player_count: state.players.len(),
            uptime_seconds: state.instance.uptime_seconds(chrono::Utc::now()),
            measured_tps: if running {
                state.measured_tps(Instant::now())
            } else {
                None
            },
        }
    }

    pub async fn record_sample(&self, sample: TelemetrySample) {
        self.state.lock().await.latest_sample = Some(sample);
    }

    /// Stops a running server and writes the history out one last time.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(_) | Err(SupervisorError::NotRunning) => {}
            Err(err) => error!("could not stop server during shutdown: {}", err),
        }
        let (version, snapshot) = self.state.lock().await.history.versioned();
        self.persister.flush(version, snapshot).await;
    }
}

async fn write_line(stdin: &Mutex<ChildStdin>, line: &str) -> std::io::Result<()> {
    let mut stdin = stdin.lock().await;
    stdin.write_all(format!("{}\n", line).as_bytes()).await?;
    stdin.flush().await
}

#[async_trait::async_trait]
impl OutputSink for ProcessSupervisor {
    async fn on_line(&self, run_id: u64, line: String) {
        let event = parse_line(&line);
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock().await;
            if let Some(event) = event {
                // a relay from an older run may still be draining
                let live = state.run_id == run_id
                    && matches!(
                        state.instance.status,
                        InstanceStatus::Running | InstanceStatus::Stopping
                    );
                if live {
                    state.apply(event, Instant::now());
                }
            }
            outbox.entry(&mut state, ConsoleEntry::output(line));
        }
        self.deliver(outbox);
    }

    async fn on_closed(&self, run_id: u64, exit_code: ExitCode) {
        let mut outbox = Outbox::default();
        {
            let mut state = self.state.lock().await;
            // while stopping, the stop in flight owns the transition
            if state.run_id != run_id || !state.instance.status.is_running() {
                return;
            }

            state.reset_run();
            state.instance.status = InstanceStatus::Crashed;
            state.instance.pid = None;
            let text = match exit_code {
                Some(code) => format!("{} (exit code {})", CRASHED_NOTICE, code),
                None => CRASHED_NOTICE.to_string(),
            };
            outbox.entry(&mut state, ConsoleEntry::notice(text));
            outbox.status(&state);
        }

        let mut process = self.process.lock().await;
        if process.as_ref().is_some_and(|handle| handle.run_id == run_id) {
            process.take();
        }
        drop(process);

        warn!("server process ended unexpectedly ({:?})", exit_code);
        self.deliver(outbox);
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;
    use warden_protocol::management::console::ConsoleSource;

    /// A stand-in for `java`: prints a banner, echoes stdin, exits on `stop`.
    pub const OBEDIENT_SERVER: &str = r#"#!/bin/sh
echo "[00:00:00] [Server thread/INFO]: Done (0.100s)! For help, type \"help\""
while read line; do
  if [ "$line" = "stop" ]; then
    echo "Stopping the server"
    exit 0
  fi
  echo "$line"
done
"#;

    pub fn fake_java(dir: &Path, script: &str) -> LaunchConfig {
        let java = dir.join("java.sh");
        std::fs::write(&java, script).unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        let jar = dir.join("server.jar");
        std::fs::write(&jar, b"").unwrap();

        LaunchConfig {
            java_path: java.to_string_lossy().to_string(),
            jar_path: jar,
            min_memory: "1G".into(),
            max_memory: "2G".into(),
            port: None,
            extra_flags: vec![],
            use_optimized_flags: false,
        }
    }

    pub fn supervisor(options: SupervisorOptions) -> Arc<ProcessSupervisor> {
        ProcessSupervisor::new(
            options,
            vec![],
            Arc::new(Broadcaster::default()),
            HistoryPersister::disabled(),
        )
    }

    /// Freshly written scripts can briefly be "text file busy" while another
    /// test is forking.
    pub async fn start_retrying(
        supervisor: &Arc<ProcessSupervisor>,
        launch: &LaunchConfig,
    ) -> ServerInstance {
        for _ in 0..20 {
            match supervisor.start(launch.clone()).await {
                Ok(instance) => return instance,
                Err(SupervisorError::Launch(msg)) if msg.contains("busy") => {
                    tokio::time::sleep(Duration::from_millis(50)).await
                }
                Err(err) => panic!("start failed: {}", err),
            }
        }
        panic!("start kept failing with text file busy");
    }

    pub async fn wait_until<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("condition not reached in time");
    }

    impl ProcessSupervisor {
        pub(crate) async fn player_count(&self) -> usize {
            self.state.lock().await.players.len()
        }
    }

    fn texts(entries: &[ConsoleEntry], source: ConsoleSource) -> Vec<String> {
        entries
            .iter()
            .filter(|e| e.source == source)
            .map(|e| e.text.clone())
            .collect()
    }

    fn quick_options() -> SupervisorOptions {
        SupervisorOptions {
            stop_grace: Duration::from_secs(5),
            stop_term: Duration::from_secs(2),
            ..SupervisorOptions::default()
        }
    }

    #[tokio::test]
    async fn start_reports_running_with_notice() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        let instance = start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        assert_eq!(instance.status, InstanceStatus::Running);
        assert!(instance.pid.is_some());
        assert!(instance.started_at.is_some());
        assert_eq!(instance.command_line[1], "-Xms1G");

        let history = sup.console_history(100).await;
        assert!(texts(&history, ConsoleSource::SystemNotice).contains(&STARTED_NOTICE.into()));

        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn start_while_running_keeps_the_process() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        let launch = fake_java(dir.path(), OBEDIENT_SERVER);
        let first = start_retrying(&sup, &launch).await;

        assert_eq!(
            sup.start(launch).await.unwrap_err(),
            SupervisorError::AlreadyRunning
        );
        assert_eq!(sup.status().await.pid, first.pid);

        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn missing_jar_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        let mut launch = fake_java(dir.path(), OBEDIENT_SERVER);
        launch.jar_path = dir.path().join("nope.jar");

        assert!(matches!(
            sup.start(launch).await,
            Err(SupervisorError::Launch(_))
        ));
        assert_eq!(sup.status().await, ServerInstance::default());
    }

    #[tokio::test]
    async fn graceful_stop_and_idempotence() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        let stopped = sup.stop().await.unwrap();
        assert_eq!(stopped.status, InstanceStatus::Stopped);
        assert_eq!(stopped.pid, None);

        let history_len = sup.console_history(1000).await.len();
        assert_eq!(sup.stop().await.unwrap_err(), SupervisorError::NotRunning);
        assert_eq!(sup.status().await.status, InstanceStatus::Stopped);
        assert_eq!(sup.console_history(1000).await.len(), history_len);

        let notices = texts(&sup.console_history(1000).await, ConsoleSource::SystemNotice);
        assert_eq!(
            notices.iter().filter(|n| *n == STOPPED_NOTICE).count(),
            1
        );
    }

    #[tokio::test]
    async fn stop_escalates_to_kill_when_ignored() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(SupervisorOptions {
            stop_grace: Duration::from_millis(300),
            stop_term: Duration::from_millis(300),
            ..SupervisorOptions::default()
        });
        let stubborn = "#!/bin/sh\ntrap '' TERM\nwhile read line; do echo \"$line\"; done\n";
        start_retrying(&sup, &fake_java(dir.path(), stubborn)).await;

        let stopped = sup.stop().await.unwrap();
        assert_eq!(stopped.status, InstanceStatus::Stopped);

        let notices = texts(&sup.console_history(1000).await, ConsoleSource::SystemNotice);
        assert!(notices.iter().any(|n| n.contains("sending termination signal")));
        assert!(notices.iter().any(|n| n.contains("killing process")));
        assert_eq!(notices.last().map(String::as_str), Some(STOPPED_NOTICE));
    }

    #[tokio::test]
    async fn stop_escalates_when_stdin_is_never_read() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(SupervisorOptions {
            stop_grace: Duration::from_millis(300),
            stop_term: Duration::from_millis(300),
            ..SupervisorOptions::default()
        });
        start_retrying(&sup, &fake_java(dir.path(), "#!/bin/sh\nexec sleep 1000\n")).await;

        // keep writing until the pipe is full and a writer is parked on it
        let flooder = {
            let sup = sup.clone();
            tokio::spawn(async move {
                let command = format!("say {}", "x".repeat(4000));
                while sup.send_command(&command).await.is_ok() {}
            })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;

        let stopped = timeout(Duration::from_secs(5), sup.stop())
            .await
            .expect("stop did not finish")
            .unwrap();
        assert_eq!(stopped.status, InstanceStatus::Stopped);
        assert_eq!(sup.status().await.status, InstanceStatus::Stopped);

        let notices = texts(&sup.console_history(1000).await, ConsoleSource::SystemNotice);
        assert!(notices.iter().any(|n| n.contains("sending termination signal")));

        timeout(Duration::from_secs(5), flooder)
            .await
            .expect("writer still blocked after the process died")
            .unwrap();
    }

    #[tokio::test]
    async fn send_command_requires_running_server() {
        let sup = supervisor(quick_options());
        assert_eq!(
            sup.send_command("say hi").await.unwrap_err(),
            SupervisorError::NotRunning
        );
        assert!(sup.console_history(100).await.is_empty());
        assert_eq!(
            sup.send_command("   ").await.unwrap_err(),
            SupervisorError::EmptyCommand
        );
    }

    #[tokio::test]
    async fn commands_reach_the_process_and_the_history() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        sup.send_command("say hello").await.unwrap();
        let history = sup.console_history(100).await;
        assert!(texts(&history, ConsoleSource::OperatorCommand).contains(&"> say hello".into()));

        wait_until(|| async {
            texts(&sup.console_history(100).await, ConsoleSource::ProcessOutput)
                .contains(&"say hello".to_string())
        })
        .await;

        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unexpected_exit_marks_crashed() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        let mut observer = sup.attach_observer().await;
        start_retrying(&sup, &fake_java(dir.path(), "#!/bin/sh\necho booting\nexit 3\n")).await;

        wait_until(|| async { sup.status().await.status == InstanceStatus::Crashed }).await;
        let instance = sup.status().await;
        assert_eq!(instance.pid, None);
        assert_eq!(sup.player_count().await, 0);

        let notices = texts(&sup.console_history(100).await, ConsoleSource::SystemNotice);
        assert!(notices.contains(&format!("{} (exit code 3)", CRASHED_NOTICE)));

        let mut saw_crash = false;
        while let Some(payload) = observer.try_recv() {
            saw_crash |= payload.contains("\"status\":\"crashed\"");
        }
        assert!(saw_crash);

        // crashed servers can be started again
        start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;
        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn join_lines_fill_the_sorted_player_list() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        sup.send_command("[12:00:00] [Server thread/INFO]: Steve joined the game")
            .await
            .unwrap();
        sup.send_command("[12:00:01] [Server thread/INFO]: Alex joined the game")
            .await
            .unwrap();
        wait_until(|| async { sup.player_count().await == 2 }).await;

        let report = sup.report(20).await;
        assert_eq!(report.players, vec!["Alex".to_string(), "Steve".to_string()]);
        assert_eq!(report.max_players, 20);

        sup.stop().await.unwrap();
        assert_eq!(sup.player_count().await, 0);
        assert!(sup.report(20).await.players.is_empty());
    }

    #[tokio::test]
    async fn restart_keeps_command_line() {
        let dir = TempDir::new().unwrap();
        let sup = supervisor(quick_options());
        let before = start_retrying(&sup, &fake_java(dir.path(), OBEDIENT_SERVER)).await;

        let after = sup.restart().await.unwrap();
        assert_eq!(after.status, InstanceStatus::Running);
        assert_eq!(after.command_line, before.command_line);

        sup.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_without_previous_launch_is_not_running() {
        let sup = supervisor(quick_options());
        assert_eq!(
            sup.restart().await.unwrap_err(),
            SupervisorError::NotRunning
        );
    }

    #[tokio::test]
    async fn stale_relay_output_does_not_touch_players() {
        let sup = supervisor(quick_options());
        sup.on_line(42, "Steve joined the game".into()).await;
        assert_eq!(sup.player_count().await, 0);
        assert_eq!(sup.console_history(10).await.len(), 1);

        sup.on_closed(42, Some(1)).await;
        assert_eq!(sup.status().await.status, InstanceStatus::Stopped);
    }
}
