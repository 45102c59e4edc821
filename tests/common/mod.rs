//! Shared helpers: a shell-script stand-in for wkhtmltoimage.
//!
//! The fake binary prefixes its input with `PNG|` and writes it to the
//! output token (stdout for `-`). A missing input file makes it print a
//! wkhtmltoimage-style error on stderr and exit 1. `--javascript-delay N`
//! makes it sleep N/1000 seconds instead of rendering.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use wkimage::{BinaryResolver, ImageGenerator};

const FAKE_SCRIPT: &str = r#"#!/bin/sh
delay=0
prev=""
for arg in "$@"; do
  if [ "$prev" = "--javascript-delay" ]; then delay=$((arg / 1000)); fi
  prev="$arg"
done
n=$#
eval "input=\${$((n - 1))}"
eval "output=\${$n}"

if [ "$delay" -gt 0 ]; then exec sleep "$delay"; fi

if [ "$input" = "-" ]; then
  src=/dev/stdin
elif [ -f "$input" ]; then
  src="$input"
else
  echo "Loading page (1/2)" >&2
  echo "Error: Failed loading page $input (sometimes it will work just to ignore this error with --load-error-handling ignore)" >&2
  echo "Exit with code 1 due to network error: ContentNotFoundError" >&2
  exit 1
fi

if [ "$output" = "-" ]; then
  printf 'PNG|'; cat < "$src"
else
  { printf 'PNG|'; cat < "$src"; } > "$output"
fi
"#;

static FAKE_BIN: OnceLock<PathBuf> = OnceLock::new();

/// Path of the fake executable, written once per test binary
pub fn fake_binary() -> PathBuf {
    FAKE_BIN
        .get_or_init(|| {
            let dir = std::env::temp_dir().join(format!("wkimage-fake-{}", std::process::id()));
            std::fs::create_dir_all(&dir).expect("create fake bin dir");
            write_executable(&dir.join("wkhtmltoimage"), FAKE_SCRIPT)
        })
        .clone()
}

pub fn write_executable(path: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, body).expect("write fake binary");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod fake binary");
    path.to_path_buf()
}

pub fn fake_script() -> &'static str {
    FAKE_SCRIPT
}

/// A generator wired to the fake binary through its own resolver
pub fn fake_generator() -> ImageGenerator {
    ImageGenerator::with_resolver(Arc::new(BinaryResolver::with_path(fake_binary())))
}

pub fn testdata(name: &str) -> String {
    format!("{}/tests/testdata/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Cloneable in-memory writer for inspecting redirected streams
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
