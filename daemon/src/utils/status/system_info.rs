use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

pub fn get_os_info() -> (&'static str, &'static str) {
    (std::env::consts::OS, std::env::consts::ARCH)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub process: Option<ProcessUsage>,
}

/// Long lived sysinfo handle; cpu figures are deltas between two refreshes.
pub struct HostProbe {
    system: System,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe {
    pub fn new() -> Self {
        let mut system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        system.refresh_cpu_usage();
        Self { system }
    }

    pub fn refresh(&mut self, pid: Option<u32>) -> HostUsage {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        let memory_percent = if total == 0 {
            0.0
        } else {
            self.system.used_memory() as f64 / total as f64 * 100.0
        };

        let process = pid.and_then(|pid| {
            let pid = Pid::from_u32(pid);
            self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_cpu().with_memory(),
            );
            self.system.process(pid).map(|process| ProcessUsage {
                cpu_percent: process.cpu_usage() as f64,
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            })
        });

        HostUsage {
            cpu_percent: self.system.global_cpu_usage() as f64,
            memory_percent,
            process,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_os_info() {
        let (name, arch) = get_os_info();
        assert!(!name.is_empty());
        assert!(!arch.is_empty());
    }

    #[test]
    fn host_usage_is_within_bounds() {
        let mut probe = HostProbe::new();
        let usage = probe.refresh(None);
        assert!(usage.cpu_percent >= 0.0);
        assert!((0.0..=100.0).contains(&usage.memory_percent));
        assert!(usage.process.is_none());
    }

    #[test]
    fn own_process_is_visible() {
        let mut probe = HostProbe::new();
        let usage = probe.refresh(Some(std::process::id()));
        let process = usage.process.unwrap();
        assert!(process.memory_mb > 0.0);
    }
}
