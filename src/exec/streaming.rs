//! Runner that relays child output while the process is still running.

use std::io::{self, Read, Write};
use std::process::Stdio;
use std::sync::mpsc;
use std::thread;

use tracing::debug;

use super::types::{CommandOutput, CommandRunner, CommandSpec, ExecError};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Copy, Debug)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, Vec<u8>);

/// Command runner that forwards stdout and stderr to the sink as they
/// arrive, so long-running tools show progress.
///
/// Both streams are read on helper threads and written to the sink in
/// arrival order. The captured copies are still returned separately.
#[derive(Clone, Debug, Default)]
pub struct StreamingCommandRunner;

impl CommandRunner for StreamingCommandRunner {
    fn run(
        &self,
        command: &CommandSpec,
        sink: &mut dyn Write,
    ) -> Result<CommandOutput, ExecError> {
        let io_error = |err: &io::Error| ExecError::Io {
            program: command.program.clone(),
            message: err.to_string(),
        };

        debug!(command = %command.command_line(), "spawning child process");
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ExecError::Spawn {
                program: command.program.clone(),
                message: err.to_string(),
            })?;

        let (sender, receiver) = mpsc::channel::<Chunk>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Stream::Stdout, sender.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Stream::Stderr, sender.clone()));
        }
        drop(sender);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut forward_failure = None;
        for (stream, chunk) in receiver {
            // Keep draining after a sink failure so the child never blocks on a full pipe.
            if forward_failure.is_none()
                && let Err(err) = sink.write_all(&chunk).and_then(|()| sink.flush())
            {
                forward_failure = Some(err);
            }
            match stream {
                Stream::Stdout => stdout.extend_from_slice(&chunk),
                Stream::Stderr => stderr.extend_from_slice(&chunk),
            }
        }

        for reader in readers {
            let outcome = reader.join().map_err(|_| ExecError::Io {
                program: command.program.clone(),
                message: String::from("output reader thread panicked"),
            })?;
            outcome.map_err(|err| io_error(&err))?;
        }

        let status = child.wait().map_err(|err| io_error(&err))?;
        if let Some(err) = forward_failure {
            return Err(io_error(&err));
        }

        Ok(CommandOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

fn spawn_reader<R>(
    mut source: R,
    stream: Stream,
    sender: mpsc::Sender<Chunk>,
) -> thread::JoinHandle<io::Result<()>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = [0_u8; CHUNK_SIZE];
        loop {
            let read = match source.read(&mut buffer) {
                Ok(0) => return Ok(()),
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            let chunk = buffer.get(..read).map(<[u8]>::to_vec).unwrap_or_default();
            if sender.send((stream, chunk)).is_err() {
                return Ok(());
            }
        }
    })
}
