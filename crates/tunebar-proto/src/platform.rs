use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/tunebar/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("tunebar")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunebar")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("tunebar")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunebar")
    }
}

/// IPC endpoint name for one playback worker.  Every worker gets its own so a
/// dying mpv can never be confused with its successor.
#[cfg(unix)]
pub fn mpv_socket_name(worker_id: u64) -> String {
    format!(
        "{}/tunebar-mpv-{}-{}.sock",
        std::env::temp_dir().display(),
        std::process::id(),
        worker_id
    )
}

#[cfg(windows)]
pub fn mpv_socket_name(worker_id: u64) -> String {
    format!("tunebar-mpv-{}-{}", std::process::id(), worker_id)
}

#[cfg(unix)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server={}", socket_name)
}

#[cfg(windows)]
pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", socket_name)
}

fn mpv_binary_name() -> &'static str {
    #[cfg(windows)]
    {
        "mpv.exe"
    }
    #[cfg(not(windows))]
    {
        "mpv"
    }
}

/// Find mpv: beside the current exe first, then on PATH.
pub fn find_mpv_binary() -> Option<PathBuf> {
    let exe_name = mpv_binary_name();

    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let local_mpv = dir.join(exe_name);
            if local_mpv.exists() {
                return Some(local_mpv);
            }
        }
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(exe_name))
        .find(|candidate| candidate.exists())
}
