//! Generic driver process service
//!
//! Spawns a WebDriver executable, waits until it accepts connections on its
//! port and tears it down again.

use eyre::{Context, ContextCompat, bail, ensure};
use log::{debug, error, info};
use std::{
    collections::HashMap,
    io::ErrorKind,
    net::TcpListener,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tokio::{
    net::TcpStream,
    process::{Child, Command},
};

use crate::Result;

mod log_output;
mod settings;

pub use log_output::LogOutput;
pub use settings::ServiceSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Loopback address the driver is reached on
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Command line rendering for a specific driver
///
/// Each driver takes its port and options in its own syntax
pub trait CommandLine {
    /// Arguments passed to the driver executable, in order
    fn command_line_args(&self) -> Vec<String>;
}

/// Process Service Struct
///
/// Owns the driver subprocess and the sink its output is written to
#[derive(Debug)]
pub struct ProcessService {
    path: PathBuf,
    port: u16,
    log_output: LogOutput,
    env: Option<HashMap<String, String>>,
    settings: ServiceSettings,

    process: Option<Child>,
}

impl ProcessService {
    /// Create a new, not yet started, service
    ///
    /// A `port` of 0 is replaced by a free port picked by the OS
    pub fn new(
        path: impl Into<PathBuf>,
        port: u16,
        log_output: LogOutput,
        env: Option<HashMap<String, String>>,
        settings: ServiceSettings,
    ) -> Result<Self> {
        let port = match port {
            0 => free_port().wrap_err("Failed to find a free port for the driver")?,
            port => port,
        };

        Ok(Self {
            path: path.into(),
            port,
            log_output,
            env,
            settings,

            process: None,
        })
    }

    /// Path (or bare name looked up on `PATH`) of the driver executable
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Port the driver listens on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Environment of the driver, `None` meaning inherited from this process
    pub fn env(&self) -> Option<&HashMap<String, String>> {
        self.env.as_ref()
    }

    /// Sink receiving the driver's stdout and stderr
    pub fn log_output(&self) -> &LogOutput {
        &self.log_output
    }

    /// Lifecycle tunables
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Base URL of the WebDriver endpoint
    pub fn service_url(&self) -> String {
        format!("http://{}:{}", LOOPBACK_HOST, self.port)
    }

    /// Whether a driver process was started and has not exited yet
    pub fn is_running(&mut self) -> bool {
        matches!(
            self.process.as_mut().map(Child::try_wait),
            Some(Ok(None))
        )
    }

    fn executable_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    fn spawn(&self, args: &[String]) -> Result<Child> {
        let mut command = Command::new(&self.path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(
                self.log_output
                    .stdio()
                    .wrap_err("Failed to prepare driver stdout")?,
            )
            .stderr(
                self.log_output
                    .stdio()
                    .wrap_err("Failed to prepare driver stderr")?,
            )
            .kill_on_drop(true);

        if let Some(env) = &self.env {
            command.env_clear().envs(env);
        }

        debug!("Spawning {:?} with args {:?}", self.path, args);

        let name = self.executable_name();
        match command.spawn() {
            Ok(child) => Ok(child),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(e).wrap_err_with(|| format!("'{}' executable needs to be in PATH.", name))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(e)
                .wrap_err_with(|| format!("'{}' executable may have wrong permissions.", name)),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to start '{}'", name)),
        }
    }

    /// Start the driver and wait until it accepts connections
    pub async fn start(&mut self, args: &[String]) -> Result<()> {
        ensure!(
            !self.is_running(),
            "Service {} is already running",
            self.path.display()
        );

        if let Some(Ok(Some(status))) = self.process.take().as_mut().map(Child::try_wait) {
            debug!(
                "Discarding exited driver {} (status: {})",
                self.path.display(),
                status
            );
        }

        self.process = Some(self.spawn(args)?);

        let ready =
            tokio::time::timeout(self.settings.start_timeout, self.wait_until_connectable()).await;

        match ready {
            Ok(Ok(())) => {
                info!(
                    "Service {} is accepting connections on {}",
                    self.path.display(),
                    self.service_url()
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.process = None;
                Err(e)
            }
            Err(_) => {
                if let Some(mut child) = self.process.take() {
                    if let Err(e) = child.kill().await {
                        error!(
                            "Failed to kill unresponsive service {}: {}",
                            self.path.display(),
                            e
                        );
                    }
                }
                bail!("Can not connect to the Service {}", self.path.display())
            }
        }
    }

    async fn wait_until_connectable(&mut self) -> Result<()> {
        loop {
            self.assert_process_still_running()?;

            if self.is_connectable().await {
                return Ok(());
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Fail if the driver process has already exited
    pub fn assert_process_still_running(&mut self) -> Result<()> {
        let path = self.path.display().to_string();
        let child = self
            .process
            .as_mut()
            .wrap_err_with(|| format!("Service {} was never started", path))?;

        if let Some(status) = child
            .try_wait()
            .wrap_err("Failed to get driver process status")?
        {
            bail!(
                "Service {} unexpectedly exited. Status code was: {}",
                path,
                status
            );
        }

        Ok(())
    }

    /// Whether something accepts TCP connections on the service port
    pub async fn is_connectable(&self) -> bool {
        matches!(
            tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((LOOPBACK_HOST, self.port)))
                .await,
            Ok(Ok(_))
        )
    }

    /// Wait for the driver process to exit on its own
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        let child = self
            .process
            .as_mut()
            .wrap_err("Service was never started")?;

        child
            .wait()
            .await
            .wrap_err("Failed to get driver process status")
    }

    /// Kill the driver process and close the log output
    pub async fn stop(&mut self) -> Result<()> {
        let _log_output = std::mem::take(&mut self.log_output);

        let Some(mut child) = self.process.take() else {
            return Ok(());
        };

        match child
            .try_wait()
            .wrap_err("Failed to get driver process status")?
        {
            Some(status) => debug!(
                "Service {} had already exited with status: {}",
                self.path.display(),
                status
            ),
            None => {
                tokio::time::timeout(self.settings.stop_timeout, child.kill())
                    .await
                    .wrap_err_with(|| {
                        format!("Timed out stopping service {}", self.path.display())
                    })?
                    .wrap_err("Failed to kill driver process")?;
            }
        }

        info!("Stopped service {}", self.path.display());

        Ok(())
    }
}

fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind((LOOPBACK_HOST, 0))?;
    Ok(listener.local_addr()?.port())
}
