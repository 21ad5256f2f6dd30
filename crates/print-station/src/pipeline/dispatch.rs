//! Durable delivery of finalized documents to an output device.
//!
//! The backend trait is the only seam that touches a print subsystem; the
//! dispatcher wraps any backend with device resolution, per-attempt
//! timeouts, and a bounded retry loop. Business code never branches on
//! which backend is wired in.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{PrintConfig, PrintMode};

/// Interface to a concrete print subsystem.
#[async_trait]
pub trait PrintBackend: Send + Sync {
    /// Short identifier for status surfaces and logs.
    fn kind(&self) -> &'static str;

    fn default_device(&self) -> Option<String>;

    fn available_devices(&self) -> Vec<String>;

    /// One delivery attempt; must finish (or fail) within `timeout`.
    async fn deliver(
        &self,
        document: &Path,
        device: &str,
        timeout: Duration,
    ) -> Result<(), DeliveryError>;
}

/// Failure of a single delivery attempt. Every variant is retryable;
/// fatal conditions are reported by the dispatcher itself.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("print job timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("could not run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} failed: {detail}")]
    Command { command: String, detail: String },
}

/// Terminal outcome when no document was delivered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No printer available. Please configure a printer on this host.")]
    NoDevice,
    #[error("Failed to print after {attempts} attempts: {cause}")]
    Exhausted { attempts: u32, cause: String },
}

/// Successful dispatch summary.
#[derive(Debug, Clone)]
pub struct PrintReport {
    pub device: String,
    pub attempts: u32,
}

/// Retry and resolution policy around a backend.
#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub device: Option<String>,
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_delay: Duration,
}

impl From<&PrintConfig> for PrintOptions {
    fn from(config: &PrintConfig) -> Self {
        Self {
            device: config.device.clone(),
            attempts: config.attempts,
            attempt_timeout: config.attempt_timeout,
            retry_delay: config.retry_delay,
        }
    }
}

pub struct PrintDispatcher {
    backend: Arc<dyn PrintBackend>,
    options: PrintOptions,
}

impl PrintDispatcher {
    pub fn new(backend: Arc<dyn PrintBackend>, options: PrintOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &dyn PrintBackend {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &PrintOptions {
        &self.options
    }

    /// Whether a dispatch could currently reach any device.
    pub fn device_available(&self) -> bool {
        self.resolve_device().is_some()
    }

    fn resolve_device(&self) -> Option<String> {
        self.options
            .device
            .clone()
            .or_else(|| self.backend.default_device())
            .or_else(|| self.backend.available_devices().into_iter().next())
    }

    /// Deliver `document`, retrying with a fixed delay until the attempt
    /// budget is exhausted. Success and terminal failure are the only
    /// outcomes; there is no cancellation once dispatch starts.
    pub async fn dispatch(&self, document: &Path) -> Result<PrintReport, DispatchError> {
        let attempts = self.options.attempts.max(1);
        let mut last_cause = String::new();

        for attempt in 1..=attempts {
            let device = self.resolve_device().ok_or(DispatchError::NoDevice)?;

            match self
                .backend
                .deliver(document, &device, self.options.attempt_timeout)
                .await
            {
                Ok(()) => {
                    info!(
                        document = %document.display(),
                        device = %device,
                        attempt,
                        "document delivered"
                    );
                    return Ok(PrintReport { device, attempts: attempt });
                }
                Err(err) => {
                    warn!(
                        document = %document.display(),
                        device = %device,
                        attempt,
                        attempts,
                        error = %err,
                        "print attempt failed"
                    );
                    last_cause = err.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.options.retry_delay).await;
                    }
                }
            }
        }

        Err(DispatchError::Exhausted {
            attempts,
            cause: last_cause,
        })
    }
}

/// CUPS-backed delivery: devices come from `lpstat`, jobs go out through
/// `lp` first and `lpr` as the fallback spooler front-end.
#[derive(Debug, Default)]
pub struct CupsBackend;

impl CupsBackend {
    pub fn new() -> Self {
        Self
    }

    /// True when the local scheduler answers `lpstat -r`.
    pub fn spooler_reachable() -> bool {
        std::process::Command::new("lpstat")
            .arg("-r")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn lpstat(args: &[&str]) -> Option<String> {
        let output = std::process::Command::new("lpstat")
            .args(args)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_spool_command(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let waited = tokio::time::timeout(timeout, command.output()).await;
        let output = match waited {
            Ok(result) => result.map_err(|source| DeliveryError::Spawn {
                command: program.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(DeliveryError::Timeout {
                    seconds: timeout.as_secs(),
                })
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(DeliveryError::Command {
                command: program.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl PrintBackend for CupsBackend {
    fn kind(&self) -> &'static str {
        "cups"
    }

    fn default_device(&self) -> Option<String> {
        // "system default destination: <name>" or a no-default notice.
        let output = Self::lpstat(&["-d"])?;
        let name = output.rsplit(':').next()?.trim();
        if name.is_empty() || name.contains("no system default") {
            return None;
        }
        Some(name.to_string())
    }

    fn available_devices(&self) -> Vec<String> {
        Self::lpstat(&["-e"])
            .map(|output| {
                output
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn deliver(
        &self,
        document: &Path,
        device: &str,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let path = document.to_string_lossy();

        // Ordered strategy list; the first front-end that accepts the job
        // ends the attempt.
        let mut last_error = None;
        for (program, args) in [
            ("lp", vec!["-d", device, path.as_ref()]),
            ("lpr", vec!["-P", device, path.as_ref()]),
        ] {
            match Self::run_spool_command(program, &args, timeout).await {
                Ok(()) => {
                    info!(%device, program, document = %document.display(), "spooled print job");
                    return Ok(());
                }
                Err(err) => {
                    warn!(%device, program, error = %err, "spool front-end failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(DeliveryError::Command {
            command: "lp".to_string(),
            detail: "no delivery strategy was attempted".to_string(),
        }))
    }
}

/// Stand-in backend for hosts without a print subsystem: logs the intended
/// action and reports success.
#[derive(Debug, Default)]
pub struct SimulatedBackend;

#[async_trait]
impl PrintBackend for SimulatedBackend {
    fn kind(&self) -> &'static str {
        "simulated"
    }

    fn default_device(&self) -> Option<String> {
        Some("Simulated Printer".to_string())
    }

    fn available_devices(&self) -> Vec<String> {
        vec!["Simulated Printer".to_string()]
    }

    async fn deliver(
        &self,
        document: &Path,
        device: &str,
        _timeout: Duration,
    ) -> Result<(), DeliveryError> {
        info!(document = %document.display(), %device, "simulated print");
        Ok(())
    }
}

/// Pick the backend once at startup; business logic never branches on it.
pub fn select_backend(mode: PrintMode) -> Arc<dyn PrintBackend> {
    match mode {
        PrintMode::Cups => Arc::new(CupsBackend::new()),
        PrintMode::Simulated => Arc::new(SimulatedBackend),
        PrintMode::Auto => {
            if CupsBackend::spooler_reachable() {
                Arc::new(CupsBackend::new())
            } else {
                warn!("print spooler unreachable; printing will be simulated");
                Arc::new(SimulatedBackend)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend scripted to fail a fixed number of times before succeeding.
    struct ScriptedBackend {
        failures_before_success: u32,
        calls: AtomicU32,
        devices: Vec<String>,
        delivered: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedBackend {
        fn failing(failures_before_success: u32) -> Self {
            Self {
                failures_before_success,
                calls: AtomicU32::new(0),
                devices: vec!["Scripted".to_string()],
                delivered: Mutex::new(Vec::new()),
            }
        }

        fn without_devices() -> Self {
            Self {
                failures_before_success: 0,
                calls: AtomicU32::new(0),
                devices: Vec::new(),
                delivered: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PrintBackend for ScriptedBackend {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn default_device(&self) -> Option<String> {
            self.devices.first().cloned()
        }

        fn available_devices(&self) -> Vec<String> {
            self.devices.clone()
        }

        async fn deliver(
            &self,
            document: &Path,
            _device: &str,
            _timeout: Duration,
        ) -> Result<(), DeliveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(DeliveryError::Command {
                    command: "scripted".to_string(),
                    detail: "injected failure".to_string(),
                });
            }
            self.delivered
                .lock()
                .expect("delivered mutex poisoned")
                .push(document.to_path_buf());
            Ok(())
        }
    }

    fn options(attempts: u32) -> PrintOptions {
        PrintOptions {
            device: None,
            attempts,
            attempt_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_on_a_later_attempt() {
        let backend = Arc::new(ScriptedBackend::failing(2));
        let dispatcher = PrintDispatcher::new(backend.clone(), options(3));

        let report = dispatcher
            .dispatch(Path::new("solution.pdf"))
            .await
            .expect("third attempt succeeds");
        assert_eq!(report.attempts, 3);
        assert_eq!(report.device, "Scripted");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_reports_last_cause() {
        let backend = Arc::new(ScriptedBackend::failing(u32::MAX));
        let dispatcher = PrintDispatcher::new(backend.clone(), options(3));

        let err = dispatcher
            .dispatch(Path::new("solution.pdf"))
            .await
            .expect_err("all attempts fail");
        match err {
            DispatchError::Exhausted { attempts, cause } => {
                assert_eq!(attempts, 3);
                assert!(cause.contains("injected failure"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn missing_device_is_fatal_without_retries() {
        let backend = Arc::new(ScriptedBackend::without_devices());
        let dispatcher = PrintDispatcher::new(backend.clone(), options(3));

        let err = dispatcher
            .dispatch(Path::new("solution.pdf"))
            .await
            .expect_err("no device");
        assert!(matches!(err, DispatchError::NoDevice));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn explicit_device_override_wins() {
        let backend = Arc::new(ScriptedBackend::failing(0));
        let mut opts = options(1);
        opts.device = Some("FrontDesk".to_string());
        let dispatcher = PrintDispatcher::new(backend, opts);

        let report = dispatcher
            .dispatch(Path::new("solution.pdf"))
            .await
            .expect("delivery succeeds");
        assert_eq!(report.device, "FrontDesk");
    }

    #[test]
    fn simulated_backend_always_has_a_device() {
        let backend = SimulatedBackend;
        assert_eq!(backend.default_device().as_deref(), Some("Simulated Printer"));
        assert_eq!(backend.kind(), "simulated");
    }
}
