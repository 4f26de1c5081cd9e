//! Manual double-fork daemonisation, since nothing in the dependency stack
//! provides it: fork twice, detach from the controlling terminal, drop the
//! working directory, close inherited descriptors, and write a pid-file.

use crate::error::{CoreError, Result};
use std::ffi::CString;
use std::fs;
use std::io;

fn fork() -> io::Result<libc::pid_t> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(pid)
    }
}

/// Forks twice so the daemon is reparented to init and can never reacquire
/// a controlling terminal, then writes its pid to `pid_file`. Returns in the
/// final grandchild process only; the parent and intermediate child exit
/// immediately via `std::process::exit`.
pub fn daemonize(pid_file: &str) -> Result<()> {
    match fork().map_err(|e| CoreError::ConfigError(format!("first fork failed: {e}")))? {
        0 => {}
        _ => std::process::exit(0),
    }

    if unsafe { libc::setsid() } < 0 {
        return Err(CoreError::ConfigError("setsid failed".into()));
    }

    match fork().map_err(|e| CoreError::ConfigError(format!("second fork failed: {e}")))? {
        0 => {}
        _ => std::process::exit(0),
    }

    unsafe {
        libc::umask(0o027);
    }

    let root = CString::new("/").unwrap();
    unsafe {
        libc::chdir(root.as_ptr());
    }

    close_inherited_fds();

    let pid = std::process::id();
    fs::write(pid_file, format!("{pid}\n"))
        .map_err(|e| CoreError::ConfigError(format!("failed to write pid file {pid_file}: {e}")))?;

    Ok(())
}

fn close_inherited_fds() {
    unsafe {
        for fd in 0..3 {
            libc::close(fd);
        }
        let devnull = CString::new("/dev/null").unwrap();
        let null_fd = libc::open(devnull.as_ptr(), libc::O_RDWR);
        if null_fd >= 0 {
            libc::dup2(null_fd, 0);
            libc::dup2(null_fd, 1);
            libc::dup2(null_fd, 2);
            if null_fd > 2 {
                libc::close(null_fd);
            }
        }
    }
}
