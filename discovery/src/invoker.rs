//! Running the external tool.
//!
//! [`ProcessInvoker`] is the seam between parsing and process execution:
//! it takes a full argument vector and returns captured stdout, failing
//! with [`InvocationError`] on a non-zero exit. [`SystemInvoker`] spawns real
//! processes; tests substitute scripted invokers.
//!
//! [`Runner`] builds argument vectors in the tool's order
//! (`executable options... operator inputs... output`) and delegates to an
//! invoker.
//!
//! # Example
//!
//! ```
//! use cdo_schema_discovery::config::CdoConfig;
//! use cdo_schema_discovery::invoker::{RunRequest, Runner};
//!
//! let runner = Runner::new(CdoConfig::default());
//! let request = RunRequest::operator("remapbil,r360x180")
//!     .with_inputs(["in.nc"])
//!     .with_output("out.nc")
//!     .with_options(["-f", "nc4"]);
//! assert_eq!(
//!     runner.command_line(&request),
//!     ["cdo", "-f", "nc4", "remapbil,r360x180", "in.nc", "out.nc"]
//! );
//! ```

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};
use wait_timeout::ChildExt;

use crate::config::CdoConfig;
use crate::error::InvocationError;

/// Runs a command line and returns its captured standard output.
pub trait ProcessInvoker: Send + Sync {
    fn invoke(&self, argv: &[String]) -> Result<String, InvocationError>;
}

/// Spawns child processes with optional timeout enforcement.
#[derive(Debug, Clone, Default)]
pub struct SystemInvoker {
    timeout: Option<Duration>,
}

impl SystemInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ProcessInvoker for SystemInvoker {
    fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
        let (program, args) = argv.split_first().ok_or(InvocationError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain both pipes in the background so a full pipe buffer cannot
        // block the child before it exits.
        let stdout_thread = child.stdout.take().map(drain_pipe);
        let stderr_thread = child.stderr.take().map(drain_pipe);

        let waited = match self.timeout {
            Some(timeout) => child.wait_timeout(timeout),
            None => child.wait().map(Some),
        };
        let status = settle_wait(&mut child, waited, self.timeout).inspect_err(|err| {
            debug!(argv = ?argv, error = %err, "Command did not complete");
        })?;

        let stdout = join_pipe(stdout_thread)?;
        let stderr = join_pipe(stderr_thread)?;

        if !status.success() {
            return Err(InvocationError::NonZeroExit {
                status: status.code(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Resolves the outcome of waiting on `child`.
///
/// When the wait timed out or failed, the child is killed and reaped before
/// the error is returned; its pipe readers then see end-of-file.
fn settle_wait(
    child: &mut Child,
    waited: std::io::Result<Option<ExitStatus>>,
    timeout: Option<Duration>,
) -> Result<ExitStatus, InvocationError> {
    match waited {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
            reap(child);
            let timeout_ms = timeout.map_or(0, |timeout| {
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
            });
            Err(InvocationError::Timeout { timeout_ms })
        }
        Err(err) => {
            reap(child);
            Err(InvocationError::Io(err))
        }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain_pipe<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_pipe(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> std::io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("pipe reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

/// One tool invocation: options, operator token, input files and output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub options: Vec<String>,
    pub operator: Option<String>,
    pub inputs: Vec<String>,
    pub output: Option<String>,
    /// Log the command line at `info` level instead of `debug`.
    pub verbose: bool,
}

impl RunRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operator(token: &str) -> Self {
        Self {
            operator: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn with_options<S: AsRef<str>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options
            .extend(options.into_iter().map(|o| o.as_ref().to_string()));
        self
    }

    pub fn with_inputs<S: AsRef<str>>(mut self, inputs: impl IntoIterator<Item = S>) -> Self {
        self.inputs
            .extend(inputs.into_iter().map(|i| i.as_ref().to_string()));
        self
    }

    pub fn with_output(mut self, output: &str) -> Self {
        self.output = Some(output.to_string());
        self
    }
}

/// Builds tool command lines and runs them through a [`ProcessInvoker`].
#[derive(Clone)]
pub struct Runner {
    config: CdoConfig,
    invoker: Arc<dyn ProcessInvoker>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner that spawns real processes.
    pub fn new(config: CdoConfig) -> Self {
        let timeout = config.timeout_ms.map(Duration::from_millis);
        Self::with_invoker(config, Arc::new(SystemInvoker::new(timeout)))
    }

    pub fn with_invoker(config: CdoConfig, invoker: Arc<dyn ProcessInvoker>) -> Self {
        Self { config, invoker }
    }

    pub fn config(&self) -> &CdoConfig {
        &self.config
    }

    pub fn invoker(&self) -> Arc<dyn ProcessInvoker> {
        Arc::clone(&self.invoker)
    }

    /// Full argument vector for `request`, executable first.
    pub fn command_line(&self, request: &RunRequest) -> Vec<String> {
        let mut argv = Vec::with_capacity(
            1 + self.config.default_options.len()
                + request.options.len()
                + request.inputs.len()
                + 2,
        );
        argv.push(self.config.executable.clone());
        argv.extend(self.config.default_options.iter().cloned());
        argv.extend(request.options.iter().cloned());
        argv.extend(request.operator.iter().cloned());
        argv.extend(request.inputs.iter().cloned());
        argv.extend(request.output.iter().cloned());
        argv
    }

    /// Runs `request` and returns captured stdout.
    pub fn run(&self, request: &RunRequest) -> Result<String, InvocationError> {
        let argv = self.command_line(request);
        if request.verbose {
            info!(argv = ?argv, "Executing");
        } else {
            debug!(argv = ?argv, "Executing");
        }
        self.invoker.invoke(&argv)
    }

    /// Output of `<executable> --operators`.
    pub fn operators_listing(&self) -> Result<String, InvocationError> {
        self.run(&RunRequest::new().with_options(["--operators"]))
    }

    /// Output of `<executable> -h <operator>`.
    pub fn operator_help(&self, operator: &str) -> Result<String, InvocationError> {
        self.run(&RunRequest::operator(operator).with_options(["-h"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ProcessInvoker for Recorder {
        fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            Ok("ok".to_string())
        }
    }

    #[test]
    fn test_command_line_order() {
        let config = CdoConfig {
            default_options: vec!["-s".into()],
            ..CdoConfig::default()
        };
        let runner = Runner::new(config);
        let request = RunRequest::operator("sinfo")
            .with_options(["-O"])
            .with_inputs(["a.nc", "b.nc"]);
        assert_eq!(
            runner.command_line(&request),
            vec!["cdo", "-s", "-O", "sinfo", "a.nc", "b.nc"]
        );
    }

    #[test]
    fn test_help_and_listing_requests() {
        let recorder = Arc::new(Recorder::default());
        let runner = Runner::with_invoker(CdoConfig::default(), recorder.clone());

        runner.operators_listing().unwrap();
        runner.operator_help("remapbil").unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0], vec!["cdo", "--operators"]);
        assert_eq!(calls[1], vec!["cdo", "-h", "remapbil"]);
    }

    #[test]
    fn test_empty_argv_is_rejected() {
        let err = SystemInvoker::default().invoke(&[]).unwrap_err();
        assert!(matches!(err, InvocationError::EmptyCommand));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let argv = vec!["cdo-bind-test-no-such-program".to_string()];
        let err = SystemInvoker::default().invoke(&argv).unwrap_err();
        assert!(matches!(err, InvocationError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let argv = ["sh", "-c", "echo boom >&2; exit 3"].map(String::from);
        let err = SystemInvoker::default().invoke(&argv).unwrap_err();
        match err {
            InvocationError::NonZeroExit { status, ref stderr } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string().trim(), "boom");
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let argv = ["sh", "-c", "printf hello"].map(String::from);
        assert_eq!(SystemInvoker::default().invoke(&argv).unwrap(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_wait_kills_and_reaps_child() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 5"])
            .spawn()
            .unwrap();
        let waited = Err(std::io::Error::other("wait interrupted"));

        let err = settle_wait(&mut child, waited, None).unwrap_err();
        assert!(matches!(err, InvocationError::Io(_)));
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let argv = ["sh", "-c", "sleep 5"].map(String::from);
        let invoker = SystemInvoker::new(Some(Duration::from_millis(50)));
        let err = invoker.invoke(&argv).unwrap_err();
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: 50 }));
    }
}
