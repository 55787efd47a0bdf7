use std::io;
#[cfg(windows)]
use winapi::shared::minwindef::FALSE;
#[cfg(windows)]
use winapi::um::handleapi::CloseHandle;
#[cfg(windows)]
use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
#[cfg(windows)]
use winapi::um::winnt::PROCESS_TERMINATE;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

pub struct ProcessHelper;

impl ProcessHelper {
    #[cfg(unix)]
    fn signal(pid: u32, signal: Signal) -> io::Result<()> {
        kill(Pid::from_raw(pid as i32), signal).map_err(io::Error::from)
    }

    #[cfg(windows)]
    fn terminate(pid: u32) -> io::Result<()> {
        let handle = unsafe { OpenProcess(PROCESS_TERMINATE, FALSE, pid) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        let result = unsafe { TerminateProcess(handle, 1) };
        unsafe { CloseHandle(handle) };
        if result == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Sends SIGTERM to the process (Unix). Windows has no polite signal for a
    /// console child, so the process is terminated.
    pub fn stop(pid: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            Self::signal(pid, Signal::SIGTERM)
        }
        #[cfg(windows)]
        {
            Self::terminate(pid)
        }
    }

    /// Forcefully kills the process: SIGKILL on Unix, TerminateProcess on Windows.
    pub fn kill(pid: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            Self::signal(pid, Signal::SIGKILL)
        }
        #[cfg(windows)]
        {
            Self::terminate(pid)
        }
    }
}
