//! wkimage
//!
//! Drive the `wkhtmltoimage` command-line tool from Rust: build its argument
//! list from typed options, find the executable, run it, and collect the
//! image or the error text it printed.
//!
//! # Features
//!
//! - **Typed options**: every wkhtmltoimage flag is a tri-state [`options::Opt`]
//!   that only reaches the command line once set
//! - **Discovery**: the executable is looked up once per process (next to the
//!   running program, in `PATH`, then in `WKHTMLTOIMAGE_PATH`) and cached
//! - **Cancellation**: runs accept a [`Context`] with a deadline or an explicit
//!   cancel; a fired context always wins over the process error
//! - **Async** (default feature `async`): [`ImageGenerator::create_async`]
//!
//! # Example
//!
//! ```no_run
//! use wkimage::ImageGenerator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gen = ImageGenerator::new()?;
//! gen.options.format.set("png".to_string());
//! gen.options.quality.set(90);
//!
//! gen.create_from_reader(std::io::Cursor::new("<h1>Hello</h1>"))?;
//! std::fs::write("hello.png", gen.bytes())?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Cancellation, Error, Result};

pub mod context;
pub use context::Context;

pub mod options;
pub use options::{ImageOptions, Opt};

pub mod locate;
pub use locate::{BinaryResolver, ResolverConfig};

pub mod generator;
pub use generator::{ImageGenerator, Input};

// Async facade over the blocking run (worker-thread backed)
#[cfg(feature = "async")]
pub mod async_api;

/// Set the wkhtmltoimage path used by every generator sharing the global resolver
pub fn set_image_path(path: impl Into<PathBuf>) {
    BinaryResolver::global().set_path(path);
}

/// The wkhtmltoimage path cached by the global resolver, if any
pub fn image_path() -> Option<PathBuf> {
    BinaryResolver::global().cached_path()
}
