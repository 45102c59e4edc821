//! The image generator: argument assembly and subprocess execution
//!
//! An [`ImageGenerator`] owns an [`ImageOptions`], an input source, and an
//! output destination. Each `create_*` call validates the options, resolves
//! the executable, runs it to completion (or until its [`Context`] fires),
//! and leaves the image in the configured sink.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::locate::BinaryResolver;
use crate::options::ImageOptions;
use crate::{Error, Result};

/// Token telling wkhtmltoimage to use stdin or stdout
pub const STDIO_PLACEHOLDER: &str = "-";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

type BoxedReader = Box<dyn Read + Send>;
type BoxedWriter = Box<dyn Write + Send>;

/// Where the HTML comes from
#[derive(Default)]
pub enum Input {
    /// Read from the child's stdin, which is left empty
    #[default]
    Stdin,
    /// A local path or a URL, passed through verbatim
    File(String),
    /// Bytes piped into the child's stdin
    Reader(BoxedReader),
}

impl Input {
    fn token(&self) -> &str {
        match self {
            Input::File(name) => name,
            Input::Stdin | Input::Reader(_) => STDIO_PLACEHOLDER,
        }
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => write!(f, "Stdin"),
            Input::File(name) => f.debug_tuple("File").field(name).finish(),
            Input::Reader(_) => write!(f, "Reader(..)"),
        }
    }
}

/// Saved form of a generator, see [`ImageGenerator::to_json`]
#[derive(Debug, Serialize, Deserialize)]
struct SavedGenerator {
    #[serde(default)]
    options: ImageOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_file: Option<PathBuf>,
}

/// Drives one wkhtmltoimage executable.
///
/// Options are public; mutate them directly before calling one of the
/// `create_*` methods.
///
/// ```no_run
/// use wkimage::ImageGenerator;
///
/// # fn main() -> wkimage::Result<()> {
/// let mut gen = ImageGenerator::new()?;
/// gen.options.format.set("png".to_string());
/// gen.options.width.set(1024);
/// gen.create_from_file("https://example.com")?;
/// gen.write_file("example.png")?;
/// # Ok(())
/// # }
/// ```
///
/// A generator is not meant to be shared between concurrent invocations;
/// the internal buffer is reset on every call.
pub struct ImageGenerator {
    pub options: ImageOptions,

    input: Input,
    output_file: Option<PathBuf>,

    pub(crate) resolver: Arc<BinaryResolver>,
    bin_path: Option<PathBuf>,
    out_buf: Vec<u8>,
    out_writer: Option<BoxedWriter>,
    err_writer: Option<BoxedWriter>,
}

impl std::fmt::Debug for ImageGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGenerator")
            .field("options", &self.options)
            .field("input", &self.input)
            .field("output_file", &self.output_file)
            .field("bin_path", &self.bin_path)
            .field("buffered", &self.out_buf.len())
            .finish()
    }
}

impl ImageGenerator {
    /// Create a generator and resolve the executable with the shared resolver
    pub fn new() -> Result<Self> {
        let mut g = Self::preparer();
        g.find_path()?;
        Ok(g)
    }

    /// Create a generator without looking for the executable.
    ///
    /// Useful to build up options and save them with [`to_json`](Self::to_json).
    /// The executable is resolved on the first `create_*` call instead.
    pub fn preparer() -> Self {
        Self::with_resolver(BinaryResolver::global())
    }

    /// Create a generator that resolves the executable through `resolver`
    pub fn with_resolver(resolver: Arc<BinaryResolver>) -> Self {
        Self {
            options: ImageOptions::default(),
            input: Input::Stdin,
            output_file: None,
            resolver,
            bin_path: None,
            out_buf: Vec::new(),
            out_writer: None,
            err_writer: None,
        }
    }

    /// Restore options and file names saved by [`to_json`](Self::to_json),
    /// then resolve the executable
    pub fn from_json(json: &str) -> Result<Self> {
        let saved: SavedGenerator = serde_json::from_str(json)?;
        let mut g = Self::preparer();
        g.options = saved.options;
        g.input = saved.input_file.map(Input::File).unwrap_or_default();
        g.output_file = saved.output_file;
        g.find_path()?;
        Ok(g)
    }

    /// Serialize options and file names. Readers and writers are not saved.
    pub fn to_json(&self) -> Result<String> {
        let saved = SavedGenerator {
            options: self.options.clone(),
            input_file: match &self.input {
                Input::File(name) => Some(name.clone()),
                _ => None,
            },
            output_file: self.output_file.clone(),
        };
        Ok(serde_json::to_string_pretty(&saved)?)
    }

    /// The resolved executable, if resolution has happened
    pub fn bin_path(&self) -> Option<&Path> {
        self.bin_path.as_deref()
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn set_input(&mut self, input: Input) {
        self.input = input;
    }

    /// Let wkhtmltoimage write the image to `path` instead of stdout.
    pub fn set_output_file(&mut self, path: impl Into<PathBuf>) {
        self.output_file = Some(path.into());
    }

    pub fn clear_output_file(&mut self) {
        self.output_file = None;
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Send stdout to `w` instead of the internal buffer.
    ///
    /// Once set, [`bytes`](Self::bytes), [`buffer`](Self::buffer) and
    /// [`write_file`](Self::write_file) see nothing new.
    pub fn set_output(&mut self, w: impl Write + Send + 'static) {
        self.out_writer = Some(Box::new(w));
    }

    /// Send stderr to `w` instead of capturing it.
    ///
    /// Captured stderr is folded into the error on failure. With a writer set,
    /// failures only report the exit status.
    pub fn set_stderr(&mut self, w: impl Write + Send + 'static) {
        self.err_writer = Some(Box::new(w));
    }

    /// The output of the last run when it went to the internal buffer
    pub fn bytes(&self) -> &[u8] {
        &self.out_buf
    }

    pub fn buffer(&mut self) -> &mut Vec<u8> {
        &mut self.out_buf
    }

    /// Write the internal buffer to `path`
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.out_buf)?;
        Ok(())
    }

    /// Full argument vector: options, then input, then output.
    ///
    /// Always turns `quiet` on, since progress output on stderr would end up
    /// in error messages.
    pub fn args(&mut self) -> Vec<String> {
        self.options.quiet.set(true);

        let mut args = self.options.args();
        args.push(self.input.token().to_string());
        args.push(
            self.output_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| STDIO_PLACEHOLDER.to_string()),
        );
        args
    }

    /// [`args`](Self::args) joined by spaces, for logging only (no quoting)
    pub fn arg_string(&mut self) -> String {
        self.args().join(" ")
    }

    fn find_path(&mut self) -> Result<&Path> {
        let path = self.resolver.find()?;
        Ok(self.bin_path.insert(path).as_path())
    }

    fn check_duplicate_flags(&self) -> Result<()> {
        match self.options.first_duplicate_flag() {
            Some(flag) => Err(Error::DuplicateArgument(flag)),
            None => Ok(()),
        }
    }

    /// Render from a local file or URL into the configured output
    pub fn create_from_file(&mut self, filename: impl Into<String>) -> Result<()> {
        self.input = Input::File(filename.into());
        self.run(&Context::background())
    }

    /// Render HTML read from `reader` into the configured output
    pub fn create_from_reader(&mut self, reader: impl Read + Send + 'static) -> Result<()> {
        self.input = Input::Reader(Box::new(reader));
        self.run(&Context::background())
    }

    /// Render the current input, aborting when `ctx` is done.
    ///
    /// A reader input is consumed by the run.
    pub fn create_with_context(&mut self, ctx: &Context) -> Result<()> {
        self.run(ctx)
    }

    pub(crate) fn run(&mut self, ctx: &Context) -> Result<()> {
        // quiet is part of the launched argv, so it takes part in the scan
        self.options.quiet.set(true);
        self.check_duplicate_flags()?;
        let bin = match self.bin_path.clone() {
            Some(p) => p,
            None => self.find_path()?.to_path_buf(),
        };
        if let Some(reason) = ctx.err() {
            return Err(Error::Cancelled(reason));
        }

        let args = self.args();
        debug!("running {} {}", bin.display(), args.join(" "));

        let reader = match std::mem::take(&mut self.input) {
            Input::Reader(r) => Some(r),
            other => {
                self.input = other;
                None
            }
        };

        let mut cmd = Command::new(&bin);
        cmd.args(&args)
            .stdin(if reader.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(source) => {
                if let Some(reason) = ctx.err() {
                    return Err(Error::Cancelled(reason));
                }
                return Err(Error::ProcessLaunchFailure {
                    path: bin.display().to_string(),
                    source,
                });
            }
        };

        let mut err_buf = Vec::new();
        let captured = self.err_writer.is_none();
        let err_sink: &mut (dyn Write + Send) = match self.err_writer.as_mut() {
            Some(w) => &mut **w,
            None => &mut err_buf,
        };
        let out_sink: &mut (dyn Write + Send) = match self.out_writer.as_mut() {
            Some(w) => &mut **w,
            None => {
                self.out_buf.clear();
                &mut self.out_buf
            }
        };

        let (status, pumped) = supervise(child, reader, out_sink, err_sink, ctx)?;

        if !status.success() {
            if let Some(reason) = ctx.err() {
                return Err(Error::Cancelled(reason));
            }
            let diagnostics = if captured {
                let text = String::from_utf8_lossy(&err_buf).into_owned();
                (!text.trim().is_empty()).then_some(text)
            } else {
                None
            };
            return Err(Error::ProcessExitFailure {
                status,
                diagnostics,
                output_error: pumped.err(),
            });
        }
        pumped?;
        Ok(())
    }
}

/// Wire the child's stdio to the sinks and wait for it to exit or for `ctx`
/// to fire, killing it in the latter case.
///
/// The outer result fails only when waiting on the child fails; the inner
/// one carries stdout/stderr copy errors.
fn supervise(
    mut child: Child,
    reader: Option<BoxedReader>,
    out_sink: &mut (dyn Write + Send),
    err_sink: &mut (dyn Write + Send),
    ctx: &Context,
) -> Result<(ExitStatus, io::Result<()>)> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|s| {
        if let (Some(mut pipe), Some(mut reader)) = (stdin, reader) {
            s.spawn(move || {
                // The child may exit before reading everything; that is its call.
                if let Err(e) = io::copy(&mut reader, &mut pipe) {
                    debug!("stdin feed stopped: {}", e);
                }
            });
        }
        let out_pump = stdout.map(|mut pipe| s.spawn(move || io::copy(&mut pipe, out_sink).map(drop)));
        let err_pump = stderr.map(|mut pipe| s.spawn(move || io::copy(&mut pipe, err_sink).map(drop)));

        let status = wait_or_kill(&mut child, ctx)?;

        let mut pumped = Ok(());
        for pump in [out_pump, err_pump].into_iter().flatten() {
            let res = pump
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "output pump panicked")));
            if let Err(e) = res {
                warn!("failed to copy process output: {}", e);
                if pumped.is_ok() {
                    pumped = Err(e);
                }
            }
        }
        Ok((status, pumped))
    })
}

fn wait_or_kill(child: &mut Child, ctx: &Context) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if let Some(reason) = ctx.err() {
            warn!("killing wkhtmltoimage (pid {}): {}", child.id(), reason);
            // kill fails if the child exited in the meantime; wait reaps either way
            let _ = child.kill();
            return Ok(child.wait()?);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
