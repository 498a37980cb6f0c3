//! `WebKitWebDriver` service
//!
//! Configures the WebKitGTK driver executable and renders its command line
//! for the generic [`ProcessService`].

use eyre::Context;
use log::warn;
use std::{path::Path, process::ExitStatus};

mod config;

pub use config::{DEFAULT_EXECUTABLE_PATH, WebKitGtkConfig};

use crate::{
    Result,
    process_service::{CommandLine, LogOutput, ProcessService},
};

/// WebKitGTK Service Struct
///
/// Responsible for starting and stopping `WebKitWebDriver`
#[derive(Debug)]
pub struct WebKitGtkService {
    service: ProcessService,
    service_args: Vec<String>,
}

impl WebKitGtkService {
    /// Build the service, opening the log file if one is configured
    ///
    /// When both `log_path` and `log_output` are set, both files are created
    /// but only `log_path` receives the driver's output.
    pub fn new(config: WebKitGtkConfig) -> Result<Self> {
        let WebKitGtkConfig {
            executable_path,
            port,
            log_path,
            log_output,
            service_args,
            env,
            settings,
        } = config;

        let log_path = log_path
            .map(|path| {
                warn!(
                    "log_path is deprecated, use log_output instead: {}",
                    path.display()
                );
                open_log(&path)
            })
            .transpose()?;

        let log_output = log_output
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| open_log(&path))
            .transpose()?;

        let service = ProcessService::new(
            executable_path,
            port,
            log_path.or(log_output).unwrap_or_default(),
            env,
            settings,
        )?;

        Ok(Self {
            service,
            service_args,
        })
    }

    /// Extra arguments passed after the port flag
    pub fn service_args(&self) -> &[String] {
        &self.service_args
    }

    /// Port the driver listens on
    pub fn port(&self) -> u16 {
        self.service.port()
    }

    /// Base URL of the driver's WebDriver endpoint
    pub fn service_url(&self) -> String {
        self.service.service_url()
    }

    /// The underlying process service
    pub fn process(&self) -> &ProcessService {
        &self.service
    }

    /// Mutable access to the underlying process service
    pub fn process_mut(&mut self) -> &mut ProcessService {
        &mut self.service
    }

    /// Spawn the driver and wait until it accepts connections
    pub async fn start(&mut self) -> Result<()> {
        let args = self.command_line_args();
        self.service.start(&args).await
    }

    /// Wait for the driver to exit on its own
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.service.wait().await
    }

    /// Stop the driver and close its log file
    pub async fn stop(&mut self) -> Result<()> {
        self.service.stop().await
    }
}

impl CommandLine for WebKitGtkService {
    fn command_line_args(&self) -> Vec<String> {
        ["-p".to_string(), self.port().to_string()]
            .into_iter()
            .chain(self.service_args.iter().cloned())
            .collect()
    }
}

fn open_log(path: &Path) -> Result<LogOutput> {
    LogOutput::open(path).wrap_err_with(|| format!("Failed to open driver log file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::{
        io::{self, Write},
        sync::{Mutex, Once},
    };

    static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct CapturedWarnings;

    impl Log for CapturedWarnings {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Warn
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                WARNINGS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    fn capture_warnings() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = log::set_logger(&CapturedWarnings);
            log::set_max_level(LevelFilter::Warn);
        });
    }

    fn warned_about(path: &Path) -> bool {
        let needle = path.display().to_string();
        WARNINGS
            .lock()
            .unwrap()
            .iter()
            .any(|warning| warning.contains("deprecated") && warning.contains(&needle))
    }

    fn write_through(service: &WebKitGtkService, bytes: &[u8]) {
        let mut file = service.process().log_output().as_file().unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn defaults_to_webkit_webdriver_on_path() {
        let service = WebKitGtkService::new(WebKitGtkConfig::default()).unwrap();

        assert_eq!(service.process().path(), Path::new("WebKitWebDriver"));
        assert!(service.service_args().is_empty());
        assert!(service.process().env().is_none());
    }

    #[test]
    fn command_line_starts_with_port_flag() {
        let service = WebKitGtkService::new(WebKitGtkConfig {
            port: 8123,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(service.command_line_args(), vec!["-p", "8123"]);
    }

    #[test]
    fn command_line_keeps_service_args_order() {
        let service = WebKitGtkService::new(WebKitGtkConfig {
            port: 4444,
            service_args: vec![
                "--host=127.0.0.1".to_string(),
                "--replace-on-new-session".to_string(),
                "-v".to_string(),
            ],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            service.command_line_args(),
            vec![
                "-p",
                "4444",
                "--host=127.0.0.1",
                "--replace-on-new-session",
                "-v"
            ]
        );
    }

    #[test]
    fn zero_port_renders_the_picked_port() {
        let service = WebKitGtkService::new(WebKitGtkConfig::default()).unwrap();
        let args = service.command_line_args();

        assert_ne!(service.port(), 0);
        assert_eq!(args, vec!["-p".to_string(), service.port().to_string()]);
    }

    #[test]
    fn no_log_arguments_opens_nothing() {
        let service = WebKitGtkService::new(WebKitGtkConfig::default()).unwrap();

        assert!(matches!(service.process().log_output(), LogOutput::Null));
    }

    #[test]
    fn log_output_is_handed_to_the_process_service() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("x.log");

        let service = WebKitGtkService::new(WebKitGtkConfig {
            log_output: Some(log.clone()),
            ..Default::default()
        })
        .unwrap();
        write_through(&service, b"driver output");

        assert_eq!(std::fs::read(&log).unwrap(), b"driver output");
    }

    #[test]
    fn empty_log_output_is_ignored() {
        let service = WebKitGtkService::new(WebKitGtkConfig {
            log_output: Some(Default::default()),
            ..Default::default()
        })
        .unwrap();

        assert!(service.process().log_output().as_file().is_none());
    }

    #[test]
    fn legacy_log_path_warns_and_is_used() {
        capture_warnings();
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("y.log");

        let service = WebKitGtkService::new(WebKitGtkConfig {
            log_path: Some(log.clone()),
            ..Default::default()
        })
        .unwrap();
        write_through(&service, b"legacy");

        assert!(warned_about(&log));
        assert_eq!(std::fs::read(&log).unwrap(), b"legacy");
    }

    #[test]
    fn legacy_log_path_wins_over_log_output() {
        capture_warnings();
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("y.log");
        let current = dir.path().join("x.log");

        let service = WebKitGtkService::new(WebKitGtkConfig {
            log_path: Some(legacy.clone()),
            log_output: Some(current.clone()),
            ..Default::default()
        })
        .unwrap();
        write_through(&service, b"legacy wins");

        assert!(warned_about(&legacy));
        assert_eq!(std::fs::read(&legacy).unwrap(), b"legacy wins");
        assert_eq!(std::fs::read(&current).unwrap(), b"");
    }

    #[test]
    fn log_output_alone_does_not_warn() {
        capture_warnings();
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("x.log");

        WebKitGtkService::new(WebKitGtkConfig {
            log_output: Some(log.clone()),
            ..Default::default()
        })
        .unwrap();

        assert!(!warned_about(&log));
    }

    #[test]
    fn unwritable_log_location_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = WebKitGtkService::new(WebKitGtkConfig {
            log_output: Some(dir.path().join("missing").join("x.log")),
            ..Default::default()
        })
        .unwrap_err();

        let io_err = err.root_cause().downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn config_reads_camel_case_json() {
        let config: WebKitGtkConfig = serde_json::from_str(
            r#"{
                "executablePath": "/usr/libexec/webkit2gtk-4.1/WebKitWebDriver",
                "port": 4444,
                "serviceArgs": ["--replace-on-new-session"],
                "env": {"DISPLAY": ":99"},
                "settings": {"startTimeout": 2000}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.executable_path,
            Path::new("/usr/libexec/webkit2gtk-4.1/WebKitWebDriver")
        );
        assert_eq!(config.port, 4444);
        assert_eq!(config.service_args, vec!["--replace-on-new-session"]);
        assert_eq!(config.env.unwrap()["DISPLAY"], ":99");
        assert_eq!(config.settings.start_timeout.as_millis(), 2000);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn empty_json_is_the_default_config() {
        let config: WebKitGtkConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, WebKitGtkConfig::default());
    }
}
