//! Locating a solver: resolve the connection target, decide whether it's a
//! process to spawn or a URL to connect to, before a session ever opens a
//! transport.

use std::path::{Path, PathBuf};

use crate::error::{OptalcpError, Result};

/// Installable package names to probe on `PATH`, in preference order, per
/// platform. The solver ships a native binary per platform under one of
/// these names; only the first one found on `PATH` is used.
#[cfg(target_os = "windows")]
const KNOWN_PACKAGES: &[&str] = &["optalcp-win32-x64", "optalcp-win32-arm64"];
#[cfg(target_os = "macos")]
const KNOWN_PACKAGES: &[&str] = &["optalcp-darwin-arm64", "optalcp-darwin-x64"];
#[cfg(all(unix, not(target_os = "macos")))]
const KNOWN_PACKAGES: &[&str] = &["optalcp-linux-x64", "optalcp-linux-arm64"];

const ENV_VAR: &str = "OPTALCP_SOLVER";
const BARE_NAME: &str = "optalcp";

/// Where to reach a resolved solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Spawn this executable (with no extra args; the session adds its own).
    Process(PathBuf),
    /// Connect to this `ws(s)://` or `http(s)://` URL.
    Url(String),
}

/// Resolve a solver endpoint using, in order: an explicit path/URL, the
/// `OPTALCP_SOLVER` environment variable, a platform-specific list of
/// installable package names on `PATH`, then the bare `optalcp` executable
/// name on `PATH`.
pub fn resolve(explicit: Option<&str>) -> Result<Endpoint> {
    if let Some(value) = explicit {
        return classify(value);
    }
    if let Ok(value) = std::env::var(ENV_VAR) {
        if !value.is_empty() {
            return classify(&value);
        }
    }
    for candidate in KNOWN_PACKAGES {
        if let Some(path) = find_on_path(candidate) {
            return Ok(Endpoint::Process(path));
        }
    }
    if let Some(path) = find_on_path(BARE_NAME) {
        return Ok(Endpoint::Process(path));
    }
    Err(OptalcpError::SolverNotFound)
}

fn classify(value: &str) -> Result<Endpoint> {
    if is_url(value) {
        return Ok(Endpoint::Url(value.to_string()));
    }
    let path = Path::new(value);
    if path.is_absolute() || value.contains('/') || value.contains('\\') {
        return Ok(Endpoint::Process(with_platform_suffix(path)));
    }
    match find_on_path(value) {
        Some(found) => Ok(Endpoint::Process(found)),
        None => Ok(Endpoint::Process(with_platform_suffix(path))),
    }
}

/// Invoke the resolved solver binary with `--version` and return its
/// trimmed stdout. A WebSocket endpoint has no local binary to invoke.
pub async fn query_version(endpoint: &Endpoint) -> Result<String> {
    match endpoint {
        Endpoint::Process(path) => {
            let output = tokio::process::Command::new(path)
                .arg("--version")
                .output()
                .await
                .map_err(OptalcpError::SpawnFailed)?;
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Endpoint::Url(_) => Err(OptalcpError::VersionQueryUnsupported),
    }
}

fn is_url(value: &str) -> bool {
    value.starts_with("ws://")
        || value.starts_with("wss://")
        || value.starts_with("http://")
        || value.starts_with("https://")
}

#[cfg(target_os = "windows")]
fn with_platform_suffix(path: &Path) -> PathBuf {
    match path.extension() {
        Some(_) => path.to_path_buf(),
        None => path.with_extension("exe"),
    }
}

#[cfg(not(target_os = "windows"))]
fn with_platform_suffix(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Search `PATH` for an executable named `name`, honoring `PATHEXT` on
/// Windows and the executable bit on POSIX.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(target_os = "windows")]
        {
            let with_exe = candidate.with_extension("exe");
            if with_exe.is_file() {
                return Some(with_exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
