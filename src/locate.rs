//! Locating the wkhtmltoimage executable
//!
//! Search order, stopping at the first hit:
//! 1. the path cached by an earlier lookup (or set with [`BinaryResolver::set_path`])
//! 2. the directory holding the running program
//! 3. `PATH` (plus `PATHEXT` on Windows)
//! 4. the directory named by `WKHTMLTOIMAGE_PATH`
//!
//! A `PATH` hit reached through a relative entry (such as `.` or an empty
//! entry) is rejected outright instead of falling through to step 4.
//!
//! Once cached the path is never re-validated, so moving the executable
//! while the program runs is not noticed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use log::debug;

use crate::{Error, Result};

/// Name of the executable and the environment variable used as a last resort
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub executable: String,
    pub env_var: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            executable: "wkhtmltoimage".to_string(),
            env_var: "WKHTMLTOIMAGE_PATH".to_string(),
        }
    }
}

/// Resolves and caches the path of the rendering executable.
///
/// Generators share [`BinaryResolver::global`] unless handed their own
/// resolver, which keeps tests from leaking state into each other.
#[derive(Debug, Default)]
pub struct BinaryResolver {
    config: ResolverConfig,
    cached: Mutex<Option<PathBuf>>,
}

static GLOBAL: OnceLock<std::sync::Arc<BinaryResolver>> = OnceLock::new();

impl BinaryResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            cached: Mutex::new(None),
        }
    }

    /// A resolver that starts out with `path` already cached
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let r = Self::default();
        r.set_path(path);
        r
    }

    /// The process-wide resolver
    pub fn global() -> std::sync::Arc<BinaryResolver> {
        GLOBAL
            .get_or_init(|| std::sync::Arc::new(BinaryResolver::default()))
            .clone()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Override the cached path
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let mut g = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *g = Some(path.into());
    }

    pub fn cached_path(&self) -> Option<PathBuf> {
        self.cached.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Resolve the executable, consulting the cache first.
    ///
    /// The lock is held across the whole search so concurrent first lookups
    /// resolve once.
    pub fn find(&self) -> Result<PathBuf> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(path) = cached.as_ref() {
            return Ok(path.clone());
        }

        let found = self.search()?;
        debug!("resolved {} to {}", self.config.executable, found.display());
        *cached = Some(found.clone());
        Ok(found)
    }

    fn search(&self) -> Result<PathBuf> {
        let exe = self.config.executable.as_str();

        let exe_dir = std::env::current_exe()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if let Some(path) = executable_at(&exe_dir.join(exe)) {
            return Ok(path);
        }
        debug!("{} not next to the running program ({})", exe, exe_dir.display());

        if let Some(path) = look_path(exe, std::env::var_os("PATH"))? {
            return Ok(path);
        }
        debug!("{} not found in PATH", exe);

        match std::env::var_os(&self.config.env_var) {
            Some(dir) if !dir.is_empty() => {
                let candidate = PathBuf::from(dir).join(exe);
                executable_at(&candidate).ok_or_else(|| Error::BinaryNotFound(exe.to_string()))
            }
            _ => Err(Error::BinaryNotFound(exe.to_string())),
        }
    }
}

/// Search `path_var` (a `PATH`-style list) for `name`.
///
/// Returns `UnsafeBinaryReference` when the only match lives under a
/// relative entry.
pub fn look_path(name: &str, path_var: Option<OsString>) -> Result<Option<PathBuf>> {
    let Some(path_var) = path_var else {
        return Ok(None);
    };
    for dir in std::env::split_paths(&path_var) {
        let relative = dir.as_os_str().is_empty() || dir.is_relative();
        let dir = if dir.as_os_str().is_empty() { PathBuf::from(".") } else { dir };
        if let Some(found) = executable_at(&dir.join(name)) {
            if relative {
                return Err(Error::UnsafeBinaryReference(found.display().to_string()));
            }
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// The runnable file at `candidate`, trying `PATHEXT` suffixes on Windows
fn executable_at(candidate: &Path) -> Option<PathBuf> {
    if cfg!(windows) && candidate.extension().is_none() {
        let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
        return exts
            .split(';')
            .filter(|e| !e.is_empty())
            .map(|ext| {
                let mut p = candidate.as_os_str().to_owned();
                p.push(ext.to_lowercase());
                PathBuf::from(p)
            })
            .find(|p| is_executable(p));
    }
    is_executable(candidate).then(|| candidate.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
