use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Executes one trial and hands back whatever the child wrote to stdout.
pub trait TrialRunner {
    fn run_trial(&mut self, test: &str, args: &[u64]) -> Result<String>;
}

impl<R: TrialRunner + ?Sized> TrialRunner for &mut R {
    fn run_trial(&mut self, test: &str, args: &[u64]) -> Result<String> {
        (**self).run_trial(test, args)
    }
}

/// Spawns `<bin_dir>/<test> <args...>` and waits for it, without a timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    bin_dir: PathBuf,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ProcessRunner {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self { bin_dir: bin_dir.into() }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn program_path(&self, test: &str) -> PathBuf {
        self.bin_dir.join(test)
    }
}

impl TrialRunner for ProcessRunner {
    fn run_trial(&mut self, test: &str, args: &[u64]) -> Result<String> {
        let program = self.program_path(test);
        let output = Command::new(&program)
            .args(args.iter().map(u64::to_string))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute '{}'", program.display()))?;
        // Exit status never decides success; only the TIME token does.
        debug!(test, ?args, status = %output.status, "trial finished");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Writes each command line it would run to `out` instead of spawning it.
/// Every trial reports empty output.
///
/// The harness folds trial errors into report lines, so a failed write is
/// also kept here and surfaced by [`DryRunRunner::finish`].
pub struct DryRunRunner<W: Write> {
    bin_dir: PathBuf,
    out: W,
    write_error: Option<io::Error>,
}

impl<W: Write> DryRunRunner<W> {
    pub fn new(bin_dir: impl Into<PathBuf>, out: W) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            out,
            write_error: None,
        }
    }

    /// Flush and hand back the writer, or the first write error seen.
    pub fn finish(mut self) -> Result<W> {
        if let Some(err) = self.write_error.take() {
            return Err(err).context("write dry-run command");
        }
        self.out.flush().context("flush dry-run output")?;
        Ok(self.out)
    }
}

impl<W: Write> TrialRunner for DryRunRunner<W> {
    fn run_trial(&mut self, test: &str, args: &[u64]) -> Result<String> {
        if self.write_error.is_some() {
            bail!("dry-run output already failed");
        }
        let mut line = self.bin_dir.join(test).display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string());
        }
        if let Err(err) = writeln!(self.out, "{}", line) {
            let message = err.to_string();
            self.write_error = Some(err);
            bail!("write dry-run command: {}", message);
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_path_is_relative_to_bin_dir() {
        let runner = ProcessRunner::default();
        assert_eq!(runner.program_path("pipe-copy"), PathBuf::from("./pipe-copy"));
        let runner = ProcessRunner::new("/opt/bench");
        assert_eq!(runner.program_path("shm-1buf"), PathBuf::from("/opt/bench/shm-1buf"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut runner = ProcessRunner::new(dir.path());
        let err = runner.run_trial("does-not-exist", &[1]).unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn dry_run_records_commands() {
        let mut runner = DryRunRunner::new("bin", Vec::new());
        let out = runner.run_trial("uds-copy-pull", &[50_000_000, 50_000]).expect("dry run");
        assert!(out.is_empty());
        let written = String::from_utf8(runner.finish().expect("finish")).expect("utf8");
        assert_eq!(written, format!("{} 50000000 50000\n", Path::new("bin").join("uds-copy-pull").display()));
    }

    /// Accepts nothing, like stdout redirected to a full device.
    struct FullWriter {
        attempts: usize,
    }

    impl Write for FullWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dry_run_keeps_first_write_error() {
        let mut runner = DryRunRunner::new("bin", FullWriter { attempts: 0 });
        assert!(runner.run_trial("pipe-copy", &[1]).is_err());
        assert!(runner.run_trial("pipe-copy", &[2]).is_err());
        assert_eq!(runner.out.attempts, 1);

        let err = runner.finish().err().expect("write failure surfaces");
        assert!(format!("{:#}", err).contains("no space left on device"));
    }
}
