//! Generator behaviour against a fake wkhtmltoimage

#![cfg(unix)]

mod common;

use std::io::{Cursor, Write};
use std::time::{Duration, Instant};

use common::{fake_generator, testdata, SharedBuf};
use wkimage::{Cancellation, Context, Error, Input};

fn page() -> Vec<u8> {
    std::fs::read(testdata("htmlsimple.html")).unwrap()
}

fn expected_image() -> Vec<u8> {
    let mut v = b"PNG|".to_vec();
    v.extend(page());
    v
}

#[test]
fn test_args_for_sample_options() {
    let mut gen = fake_generator();
    gen.options.format.set("png".to_string());
    gen.options.height.set(100);
    gen.options.width.set(100);
    gen.options.quality.set(100);
    assert_eq!(
        gen.args(),
        vec!["--format", "png", "--height", "100", "--width", "100", "--quality", "100", "--quiet", "-", "-"]
    );
}

#[test]
fn test_create_from_file_fills_buffer() {
    let mut gen = fake_generator();
    gen.create_from_file(testdata("htmlsimple.html")).expect("render failed");
    assert_eq!(gen.bytes(), expected_image().as_slice());
}

#[test]
fn test_create_from_reader_pipes_stdin() {
    let mut gen = fake_generator();
    gen.create_from_reader(Cursor::new(page())).expect("render failed");
    assert_eq!(gen.bytes(), expected_image().as_slice());
    // the reader is consumed, the next args fall back to stdin
    assert!(matches!(gen.input(), Input::Stdin));
}

#[test]
fn test_buffer_is_reset_between_runs() {
    let mut gen = fake_generator();
    gen.create_from_reader(Cursor::new(b"first".to_vec())).unwrap();
    gen.create_from_reader(Cursor::new(b"second".to_vec())).unwrap();
    assert_eq!(gen.bytes(), b"PNG|second");
}

#[test]
fn test_missing_input_reports_captured_stderr() {
    let mut gen = fake_generator();
    let err = gen.create_from_file("testdata/does-not-exist.html").unwrap_err();
    match &err {
        Error::ProcessExitFailure { status, diagnostics, .. } => {
            assert_eq!(status.code(), Some(1));
            let text = diagnostics.as_deref().expect("stderr should be captured");
            assert!(text.contains("ContentNotFoundError"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let msg = err.to_string();
    let (head, tail) = msg.rsplit_once('\n').unwrap();
    assert!(head.contains("Failed loading page"));
    assert!(tail.contains('1'), "{tail}");
}

#[test]
fn test_redirected_stderr_is_not_folded_into_error() {
    let mut gen = fake_generator();
    let sink = SharedBuf::default();
    gen.set_stderr(sink.clone());
    let err = gen.create_from_file("testdata/does-not-exist.html").unwrap_err();
    assert!(matches!(err, Error::ProcessExitFailure { diagnostics: None, .. }), "{err:?}");
    assert!(sink.text().contains("ContentNotFoundError"));
}

#[test]
fn test_output_writer_bypasses_buffer() {
    let mut gen = fake_generator();
    let out = SharedBuf::default();
    gen.set_output(out.clone());
    gen.create_from_file(testdata("htmlsimple.html")).unwrap();
    assert!(gen.bytes().is_empty());
    assert_eq!(out.contents(), expected_image());
}

#[test]
fn test_output_file_matches_buffered_output() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("page.png");

    let mut buffered = fake_generator();
    buffered.create_from_file(testdata("htmlsimple.html")).unwrap();

    let mut to_file = fake_generator();
    to_file.set_output_file(&target);
    to_file.create_from_file(testdata("htmlsimple.html")).unwrap();
    assert!(to_file.bytes().is_empty());

    assert_eq!(std::fs::read(&target).unwrap(), buffered.bytes());

    let copy = dir.path().join("copy.png");
    buffered.write_file(&copy).unwrap();
    assert_eq!(std::fs::read(&copy).unwrap(), std::fs::read(&target).unwrap());
}

#[test]
fn test_duplicate_flags_prevent_launch() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never.png");

    let mut gen = fake_generator();
    gen.options.width.set(100);
    gen.options.custom_args.set(vec!["--width".to_string(), "200".to_string()]);
    gen.set_output_file(&target);
    let err = gen.create_from_file(testdata("htmlsimple.html")).unwrap_err();
    assert!(matches!(err, Error::DuplicateArgument(ref f) if f == "--width"), "{err:?}");
    assert!(!target.exists());
}

#[test]
fn test_list_flag_from_custom_args_prevents_launch() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never.png");

    let mut gen = fake_generator();
    gen.options.cookie.push(("session".to_string(), "abc".to_string()));
    gen.options
        .custom_args
        .set(vec!["--cookie".to_string(), "session".to_string(), "xyz".to_string()]);
    gen.set_output_file(&target);
    let err = gen.create_from_file(testdata("htmlsimple.html")).unwrap_err();
    assert!(matches!(err, Error::DuplicateArgument(ref f) if f == "--cookie"), "{err:?}");
    assert!(!target.exists());
}

#[test]
fn test_forced_quiet_collides_with_custom_quiet_on_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never.png");

    let mut gen = fake_generator();
    gen.options.custom_args.set(vec!["--quiet".to_string()]);
    gen.set_output_file(&target);
    let err = gen.create_from_file(testdata("htmlsimple.html")).unwrap_err();
    assert!(matches!(err, Error::DuplicateArgument(ref f) if f == "--quiet"), "{err:?}");
    assert!(!target.exists());
}

struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failed_process_keeps_stderr_copy_error() {
    let mut gen = fake_generator();
    gen.set_stderr(BrokenWriter);
    let err = gen.create_from_file("testdata/does-not-exist.html").unwrap_err();
    match &err {
        Error::ProcessExitFailure {
            diagnostics,
            output_error,
            ..
        } => {
            assert!(diagnostics.is_none());
            let copy_err = output_error.as_ref().expect("copy error should be attached");
            assert_eq!(copy_err.kind(), std::io::ErrorKind::BrokenPipe);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_expired_context_beats_process_error() {
    let mut gen = fake_generator();
    gen.set_input(Input::File("testdata/does-not-exist.html".to_string()));
    let ctx = Context::with_timeout(Duration::ZERO);
    let err = gen.create_with_context(&ctx).unwrap_err();
    assert!(matches!(err, Error::Cancelled(Cancellation::DeadlineExceeded)), "{err:?}");
}

#[test]
fn test_deadline_kills_running_process() {
    let mut gen = fake_generator();
    gen.options.javascript_delay.set(5000);
    let started = Instant::now();
    let ctx = Context::with_timeout(Duration::from_millis(200));
    let err = gen.create_with_context(&ctx).unwrap_err();
    assert!(matches!(err, Error::Cancelled(Cancellation::DeadlineExceeded)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(4), "process was not killed");
}

#[test]
fn test_cancel_from_another_thread() {
    let mut gen = fake_generator();
    gen.options.javascript_delay.set(5000);
    let ctx = Context::background();
    let canceller = ctx.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });
    let err = gen.create_with_context(&ctx).unwrap_err();
    handle.join().unwrap();
    assert!(matches!(err, Error::Cancelled(Cancellation::Cancelled)), "{err:?}");
}

#[test]
fn test_finished_run_ignores_later_cancel() {
    let mut gen = fake_generator();
    let ctx = Context::background();
    gen.set_input(Input::File(testdata("htmlsimple.html")));
    gen.create_with_context(&ctx).unwrap();
    ctx.cancel();
    assert_eq!(gen.bytes(), expected_image().as_slice());
}
