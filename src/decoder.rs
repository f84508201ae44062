// Bounded invocation of the external decoder (ffmpeg).
//
// stderr is drained on its own thread so a chatty decoder can never block on
// a full pipe, while the calling thread polls for exit against a deadline.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to start decoder {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("decoder did not finish within {0:?} and was killed")]
    Timeout(Duration),
    #[error("decoder exited with {0}")]
    Exit(ExitStatus),
    #[error("decoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Decoder {
    program: PathBuf,
    timeout: Duration,
}

impl Decoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run the decoder with `args` and return the stderr lines accepted by
    /// `keep`, in emission order. Everything else on stderr is discarded as
    /// it is read.
    pub fn run<I, S>(
        &self,
        args: I,
        keep: impl Fn(&str) -> bool + Send + 'static,
    ) -> Result<Vec<String>, DecoderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DecoderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("decoder stderr was not captured"))?;

        let reader = std::thread::Builder::new()
            .name("decoder-log".into())
            .spawn(move || collect_lines(stderr, keep))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    "{} still running after {:?}, killing it",
                    self.program.display(),
                    self.timeout
                );
                let _ = child.kill();
                let _ = child.wait();
                // The reader thread is left to finish on its own; a
                // descendant may still hold the pipe open.
                return Err(DecoderError::Timeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let lines = reader
            .join()
            .map_err(|_| std::io::Error::other("decoder log reader panicked"))??;

        if !status.success() {
            return Err(DecoderError::Exit(status));
        }
        Ok(lines)
    }
}

fn collect_lines(
    stream: impl std::io::Read,
    keep: impl Fn(&str) -> bool,
) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(stream);
    let mut kept = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        if keep(line) {
            kept.push(line.to_string());
        }
    }
    Ok(kept)
}
