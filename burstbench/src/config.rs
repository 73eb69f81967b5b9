//! Configuration for the benchmark harness.
//!
//! Configuration is loaded from the following sources, with later sources taking precedence:
//!
//! 1. Defaults
//! 2. YAML configuration file (specified via `-c` or `--config`)
//! 3. Environment variables (prefixed with `BB__`)
//!
//! Environment variables use double underscores (`__`) to denote nested structures, for example
//! `BB__LOGGING__LEVEL=debug` or `BB__HTTP__REQUEST_TIMEOUT=30s`.
//!
//! # YAML Configuration File
//!
//! ```yaml
//! targets:
//!   - name: app-service
//!     url: https://as-example.azurewebsites.net/api/prime/between/{from}/{to}
//!   - name: function-consumption
//!     url: https://fa-example.azurewebsites.net/api/between/{from}/{to}?code=...
//!
//! report:
//!   output_dir: ./reports
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::target::TargetSpec;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "BB__";

/// Errors loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One of the sources could not be read or parsed.
    #[error("failed to load configuration")]
    Load(#[from] Box<figment::Error>),
    /// No targets are configured.
    #[error("no targets configured")]
    NoTargets,
    /// Two targets share the same name.
    #[error("duplicate target name `{0}`")]
    DuplicateTarget(String),
}

/// Settings of the HTTP client used to send requests.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Http {
    /// Timeout applied by the HTTP client to every request.
    ///
    /// Unset by default, which leaves requests without a timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for Http {
    fn default() -> Self {
        Self {
            request_timeout: None,
            user_agent: concat!("burstbench/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Which reports are rendered at the end of a session.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Report {
    /// Directory for CSV files. Defaults to a new directory below the system temp dir.
    pub output_dir: Option<PathBuf>,

    /// Write CSV files.
    pub csv: bool,

    /// Print a latency summary to the console.
    pub summary: bool,
}

impl Default for Report {
    fn default() -> Self {
        Self {
            output_dir: None,
            csv: true,
            summary: true,
        }
    }
}

/// The output format of log messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty output when attached to a terminal, simplified otherwise.
    Auto,
    /// Human readable, colored output.
    Pretty,
    /// Compact output without colors.
    Simplified,
    /// One JSON object per line.
    Json,
}

/// Error parsing a [`LogFormat`].
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::error::Error for FormatParseError {}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs go to stderr so they do not interleave with prompts and results on stdout.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum level of log messages. Overridden by `RUST_LOG` if set.
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Output format of log messages.
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the benchmark harness.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The catalog of targets a session can choose from.
    ///
    /// Defaults to a single `local` target pointing at the demo workload on port 8080.
    pub targets: Vec<TargetSpec>,

    /// HTTP client settings.
    pub http: Http,

    /// Report settings.
    pub report: Report,

    /// Logging settings.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: vec![TargetSpec {
                name: "local".into(),
                url: "http://127.0.0.1:8080/api/prime/between/{from}/{to}".into(),
            }],
            http: Http::default(),
            report: Report::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional YAML file, and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that targets exist and have unique names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if !names.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
        }

        Ok(())
    }

    /// Builds the HTTP client shared by all requests of a session.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.http.user_agent);
        if let Some(timeout) = self.http.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.targets.len(), 1);
            assert_eq!(config.targets[0].name, "local");
            assert_eq!(config.http.request_timeout, None);
            assert!(config.report.csv);
            assert!(config.report.summary);
            assert_eq!(config.logging.level, LevelFilter::WARN);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BB__HTTP__REQUEST_TIMEOUT", "30s");
            jail.set_env("BB__LOGGING__LEVEL", "debug");
            jail.set_env("BB__LOGGING__FORMAT", "json");
            jail.set_env("BB__REPORT__CSV", "false");
            jail.set_env(
                "BB__TARGETS",
                r#"[{name="a",url="http://a.test/primes"},{name="b",url="http://b.test/"}]"#,
            );

            let config = Config::load(None).unwrap();

            assert_eq!(config.http.request_timeout, Some(Duration::from_secs(30)));
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            assert_eq!(config.logging.format, LogFormat::Json);
            assert!(!config.report.csv);
            let names: Vec<_> = config.targets.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, ["a", "b"]);

            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            targets:
              - name: app-service
                url: https://app.test/api/prime/between/{from}/{to}
              - name: function
                url: https://fn.test/api/between/{from}/{to}?code=abc
            report:
              output_dir: /tmp/reports
              summary: false
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("BB__REPORT__OUTPUT_DIR", "/tmp/elsewhere");

            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.targets.len(), 2);
            assert_eq!(
                config.targets[1].url,
                "https://fn.test/api/between/{from}/{to}?code=abc"
            );
            assert!(!config.report.summary);
            // Env should overwrite the yaml config
            assert_eq!(
                config.report.output_dir.as_deref(),
                Some(Path::new("/tmp/elsewhere"))
            );

            Ok(())
        });
    }

    #[test]
    fn rejects_duplicate_targets() {
        let config = Config {
            targets: vec![
                TargetSpec {
                    name: "a".into(),
                    url: "http://a.test/".into(),
                },
                TargetSpec {
                    name: "a".into(),
                    url: "http://b.test/".into(),
                },
            ],
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTarget(name)) if name == "a"
        ));
    }

    #[test]
    fn rejects_empty_targets() {
        let config = Config {
            targets: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoTargets)));
    }

    #[test]
    fn parses_log_format() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Auto);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
