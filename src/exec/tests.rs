//! Tests for the command runners and the tee writer.

use super::*;
use rstest::rstest;
use std::fmt::Write as _;
use std::io::Write as _;

fn shell(script: &str) -> CommandSpec {
    CommandSpec::new("sh").arg("-c").arg(script)
}

/// Runs a shell script via `StreamingCommandRunner` and returns the captured
/// output plus whatever reached the sink.
fn run_streaming(script: &str) -> (CommandOutput, String) {
    let mut sink = Vec::new();
    let output = StreamingCommandRunner
        .run(&shell(script), &mut sink)
        .expect("command should execute successfully");
    (output, String::from_utf8_lossy(&sink).into_owned())
}

#[rstest]
#[case::success("printf out && printf err 1>&2", Some(0))]
#[case::failure("printf out && printf err 1>&2; exit 42", Some(42))]
fn streaming_runner_captures_streams_separately(
    #[case] script: &str,
    #[case] expected_code: Option<i32>,
) {
    let (output, forwarded) = run_streaming(script);

    assert_eq!(output.code, expected_code);
    assert_eq!(output.stdout, "out");
    assert_eq!(output.stderr, "err");
    assert!(forwarded.contains("out"), "sink missing stdout: {forwarded}");
    assert!(forwarded.contains("err"), "sink missing stderr: {forwarded}");
}

#[rstest]
fn streaming_runner_handles_no_output() {
    let (output, forwarded) = run_streaming("exit 7");

    assert_eq!(output.code, Some(7));
    assert!(!output.is_success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert!(forwarded.is_empty());
}

#[rstest]
fn streaming_runner_captures_large_interleaved_output() {
    let (output, forwarded) = run_streaming(
        "for i in $(seq 1 200); do printf \"out-%03d\\n\" $i; printf \"err-%03d\\n\" $i 1>&2; done",
    );

    let mut expected_out = String::new();
    let mut expected_err = String::new();
    for i in 1..=200 {
        writeln!(expected_out, "out-{i:03}").expect("write to string");
        writeln!(expected_err, "err-{i:03}").expect("write to string");
    }
    assert_eq!(output.stdout, expected_out);
    assert_eq!(output.stderr, expected_err);
    assert_eq!(forwarded.len(), expected_out.len() + expected_err.len());
}

#[rstest]
fn streaming_runner_honours_working_directory_and_environment() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let dir = camino::Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 path");
    let command = shell("pwd; printf \"$CLUSTERFORM_MARKER\"")
        .current_dir(dir.clone())
        .envs([(String::from("CLUSTERFORM_MARKER"), String::from("marker-value"))]);

    let output = StreamingCommandRunner
        .run(&command, &mut std::io::sink())
        .expect("command should execute successfully");

    let canonical = std::fs::canonicalize(&dir).expect("canonicalize");
    assert!(
        output.stdout.starts_with(&*canonical.to_string_lossy()),
        "unexpected cwd in {}",
        output.stdout
    );
    assert!(output.stdout.ends_with("marker-value"));
}

#[rstest]
fn streaming_runner_reports_spawn_failures() {
    let command = CommandSpec::new("/nonexistent/clusterform-missing-binary");
    let mut sink = Vec::new();

    let result = StreamingCommandRunner.run(&command, &mut sink);

    let Err(ExecError::Spawn { program, .. }) = result else {
        panic!("expected spawn failure, got {result:?}");
    };
    assert_eq!(program, "/nonexistent/clusterform-missing-binary");
}

#[rstest]
fn command_line_escapes_arguments() {
    let command = CommandSpec::new("terraform")
        .args(["plan", "-out=demo"])
        .arg("path with space");

    assert_eq!(command.command_line(), "terraform plan -out=demo 'path with space'");
}

#[rstest]
fn status_text_describes_missing_code() {
    let output = CommandOutput::default();

    assert_eq!(output.status_text(), "unknown");
    assert_eq!(
        CommandOutput {
            code: Some(3),
            ..CommandOutput::default()
        }
        .status_text(),
        "3"
    );
}

#[rstest]
fn tee_writer_duplicates_every_write() {
    let mut tee = TeeWriter::new(Vec::new(), Vec::new());

    tee.write_all(b"first ").expect("write");
    tee.write_all(b"second").expect("write");
    tee.flush().expect("flush");

    let (primary, secondary) = tee.into_inner();
    assert_eq!(primary, b"first second");
    assert_eq!(secondary, primary);
}
