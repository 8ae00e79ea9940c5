//! Graceful termination for the encoder process.

use std::io;
use tokio::process::Child;

/// Ask the process to finish up. The encoder finalises its container on
/// SIGTERM; on other platforms this falls back to a hard kill.
#[cfg(unix)]
pub(super) fn request_termination(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        // Already reaped.
        return Ok(());
    };

    // SAFETY: `libc::kill` takes plain integer pid/signal values and touches no
    // memory; errno is read immediately after the call on this thread.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err)
}

#[cfg(not(unix))]
pub(super) fn request_termination(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
