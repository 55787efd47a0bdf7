use crate::management::supervisor::SupervisorError;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{self, Path, PathBuf};
use warden_protocol::management::instance::ServerSettings;

lazy_static! {
    static ref MEMORY_SIZE: Regex =
        Regex::new(r"^[1-9]\d*[KkMmGgTt]?$").expect("Failed to compile MEMORY_SIZE regex");
}

/// `-Xms`/`-Xmx` style size such as `512M` or `2G`.
pub fn is_memory_size(value: &str) -> bool {
    MEMORY_SIZE.is_match(value)
}

/// G1 tuning widely used for Minecraft servers (Aikar's flags).
pub const OPTIMIZED_JVM_FLAGS: &[&str] = &[
    "-XX:+UseG1GC",
    "-XX:+ParallelRefProcEnabled",
    "-XX:MaxGCPauseMillis=200",
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+DisableExplicitGC",
    "-XX:+AlwaysPreTouch",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:G1HeapWastePercent=5",
    "-XX:G1MixedGCCountTarget=4",
    "-XX:InitiatingHeapOccupancyPercent=15",
    "-XX:G1MixedGCLiveThresholdPercent=90",
    "-XX:G1RSetUpdatingPauseTimePercent=5",
    "-XX:SurvivorRatio=32",
    "-XX:+PerfDisableSharedMem",
    "-XX:MaxTenuringThreshold=1",
    "-Dusing.aikars.flags=https://mcflags.emc.gs",
    "-Daikars.new.flags=true",
];

pub struct ProcessStartInfo {
    pub target: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ProcessStartInfo {
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.target.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Everything needed to launch the server once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub java_path: String,
    pub jar_path: PathBuf,
    pub min_memory: String,
    pub max_memory: String,
    pub port: Option<u16>,
    pub extra_flags: Vec<String>,
    pub use_optimized_flags: bool,
}

impl LaunchConfig {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            java_path: settings.java_path.clone(),
            jar_path: PathBuf::from(&settings.server_jar_path),
            min_memory: settings.min_memory.clone(),
            max_memory: settings.max_memory.clone(),
            port: Some(settings.port),
            extra_flags: settings
                .additional_args
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            use_optimized_flags: settings.use_optimized_flags,
        }
    }

    fn check_memory(name: &str, value: &str) -> Result<(), SupervisorError> {
        if is_memory_size(value) {
            Ok(())
        } else {
            Err(SupervisorError::Launch(format!(
                "invalid {} memory size `{}`",
                name, value
            )))
        }
    }

    /// Validates the config and resolves it into the concrete command to spawn.
    ///
    /// The server runs from the jar's directory, so the jar is passed by absolute path.
    pub fn start_info(&self) -> Result<ProcessStartInfo, SupervisorError> {
        if self.jar_path.as_os_str().is_empty() {
            return Err(SupervisorError::Launch("no server jar configured".into()));
        }
        if !self.jar_path.is_file() {
            return Err(SupervisorError::Launch(format!(
                "server jar not found: {}",
                self.jar_path.display()
            )));
        }
        if self.java_path.trim().is_empty() {
            return Err(SupervisorError::Launch("no java executable configured".into()));
        }
        Self::check_memory("minimum", &self.min_memory)?;
        Self::check_memory("maximum", &self.max_memory)?;

        let jar = path::absolute(&self.jar_path)
            .map_err(|err| SupervisorError::Launch(err.to_string()))?;
        let working_dir = jar
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut args = vec![
            format!("-Xms{}", self.min_memory),
            format!("-Xmx{}", self.max_memory),
        ];
        if self.use_optimized_flags {
            args.extend(OPTIMIZED_JVM_FLAGS.iter().map(|flag| flag.to_string()));
        }
        args.extend(self.extra_flags.iter().cloned());
        args.push("-jar".into());
        args.push(jar.to_string_lossy().to_string());
        args.push("nogui".into());
        if let Some(port) = self.port {
            args.push("--port".into());
            args.push(port.to_string());
        }

        Ok(ProcessStartInfo {
            target: self.java_path.clone(),
            args,
            working_dir,
        })
    }
}
