use crate::domain::HostIdentity;
use std::ffi::CStr;
use std::path::PathBuf;

pub fn read_host_identity() -> HostIdentity {
    HostIdentity {
        name: host_name(),
        home_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
        inside_tmux: std::env::var_os("TMUX").is_some_and(|value| !value.is_empty()),
    }
}

fn host_name() -> String {
    system_host_name()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn system_host_name() -> Option<String> {
    let mut buf = [0 as libc::c_char; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return None;
    }
    // Truncated names are not guaranteed to be terminated.
    buf[buf.len() - 1] = 0;
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}
