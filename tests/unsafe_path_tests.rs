//! Relative `PATH` entries through the full resolver search.
//!
//! Lives in its own test binary because it rewrites `PATH` for the process.

#![cfg(unix)]

mod common;

use std::ffi::OsString;

use common::{fake_script, write_executable};
use wkimage::{BinaryResolver, Error, ResolverConfig};

struct RestorePath(Option<OsString>);

impl Drop for RestorePath {
    fn drop(&mut self) {
        match self.0.take() {
            Some(v) => std::env::set_var("PATH", v),
            None => std::env::remove_var("PATH"),
        }
    }
}

#[test]
fn test_relative_path_match_stops_search_before_env_dir() {
    let exe = format!("wkimage-relative-render_{}", std::process::id());

    // reachable only through a relative PATH entry
    let cwd = std::env::current_dir().unwrap();
    let local = tempfile::tempdir_in(&cwd).unwrap();
    write_executable(&local.path().join(&exe), fake_script());
    let relative = local.path().strip_prefix(&cwd).unwrap().to_path_buf();
    assert!(relative.is_relative());

    // a valid fallback the search must never reach
    let env_dir = tempfile::tempdir().unwrap();
    write_executable(&env_dir.path().join(&exe), fake_script());
    let env_var = format!("WKIMAGE_RELATIVE_FALLBACK_{}", std::process::id());
    std::env::set_var(&env_var, env_dir.path());

    let _restore = RestorePath(std::env::var_os("PATH"));
    let mut entries = vec![relative];
    entries.extend(std::env::split_paths(&std::env::var_os("PATH").unwrap_or_default()));
    std::env::set_var("PATH", std::env::join_paths(entries).unwrap());

    let resolver = BinaryResolver::new(ResolverConfig {
        executable: exe.clone(),
        env_var,
    });
    let err = resolver.find().unwrap_err();
    assert!(matches!(err, Error::UnsafeBinaryReference(ref p) if p.ends_with(&exe)), "{err:?}");
    assert_eq!(resolver.cached_path(), None);
}
