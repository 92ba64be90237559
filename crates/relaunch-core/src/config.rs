use crate::error::{RelaunchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/relaunch/relaunch.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SupervisorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Control binary, resolved through `PATH` when not absolute.
    #[serde(default = "default_supervisor_command")]
    pub command: String,
    /// Extra arguments placed before every subcommand (e.g. `-c /etc/supervisord.conf`).
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_supervisor_command() -> String {
    "supervisorctl".to_string()
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: default_supervisor_command(),
            args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkersConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Supervisor group holding the queue workers.
    #[serde(default = "default_worker_group")]
    pub group: String,
    /// Worker programs that only some deployment versions define. They are
    /// handled only when the supervisor reports them.
    #[serde(default)]
    pub optional: Vec<String>,
}

fn default_worker_group() -> String {
    "app-workers".to_string()
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            group: default_worker_group(),
            optional: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PushConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_program")]
    pub program: String,
    #[serde(default = "default_push_ports")]
    pub ports: Vec<u16>,
}

fn default_push_program() -> String {
    "push".to_string()
}

fn default_push_ports() -> Vec<u16> {
    vec![9800]
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            program: default_push_program(),
            ports: default_push_ports(),
        }
    }
}

// ---------------------------------------------------------------------------
// WebConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// False on hosts that only run workers; push shards are skipped too.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_unit")]
    pub unit: String,
    /// Reload the web tier through its control channel instead of restarting it.
    #[serde(default)]
    pub rolling_restart: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_web_unit() -> String {
    "app-web".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            unit: default_web_unit(),
            rolling_restart: false,
            control_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SsoConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_sso_process")]
    pub process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

fn default_sso_process() -> String {
    "apache2".to_string()
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            process: default_sso_process(),
            user: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// When set, runs under any other user are refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_user: Option<String>,
    /// Directory holding the `current` and `last` deployment symlinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments_dir: Option<PathBuf>,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub web: WebConfig,
    /// Side services that are never stopped, only started when found down.
    #[serde(default)]
    pub auxiliary: Vec<String>,
    #[serde(default)]
    pub sso: SsoConfig,
    /// Shell commands run in the deploy path before anything is touched.
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_cache: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            required_user: None,
            deployments_dir: None,
            supervisor: SupervisorConfig::default(),
            workers: WorkersConfig::default(),
            push: PushConfig::default(),
            web: WebConfig::default(),
            auxiliary: Vec::new(),
            sso: SsoConfig::default(),
            checks: Vec::new(),
            fill_cache: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RelaunchError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        // An empty file is a valid all-defaults config.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Push ports, ascending and deduplicated.
    pub fn push_ports(&self) -> Vec<u16> {
        self.push
            .ports
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// True when the rolling reload path is configured at all. Whether the
    /// control file exists is decided at run time.
    pub fn rolling_restart_configured(&self) -> bool {
        self.web.rolling_restart && self.web.control_file.is_some()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.web.enabled && self.push.ports.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "push.ports is empty but the web tier is enabled".to_string(),
            });
        }

        if self.push_ports().len() != self.push.ports.len() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "push.ports contains duplicate ports".to_string(),
            });
        }

        if self.web.rolling_restart && self.web.control_file.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "web.rolling_restart is set without web.control_file; \
                          the web tier will be restarted normally"
                    .to_string(),
            });
        }

        for check in &self.checks {
            if check.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "checks contains an empty command".to_string(),
                });
            }
        }

        if self.workers.group.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "workers.group must not be empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.supervisor.command, "supervisorctl");
        assert_eq!(cfg.workers.group, "app-workers");
        assert_eq!(cfg.push.ports, vec![9800]);
        assert!(cfg.web.enabled);
        assert!(!cfg.web.rolling_restart);
        assert!(!cfg.sso.enabled);
    }

    #[test]
    fn full_config_parses() {
        let yaml = r#"
required_user: root
deployments_dir: /srv/app/deployments
supervisor:
  command: /usr/bin/supervisorctl
  args: ["-c", "/etc/supervisor/supervisord.conf"]
workers:
  group: queue
  optional: [deliver_scheduled_emails]
push:
  program: realtime
  ports: [9801, 9800]
web:
  unit: django
  rolling_restart: true
  control_file: /srv/app/deployments/web-control
auxiliary: [camo, smokescreen]
sso:
  enabled: true
  user: app
checks:
  - ./manage.py check
fill_cache: ./manage.py fill_caches
"#;
        let cfg = Config::parse(yaml).unwrap();
        assert_eq!(cfg.required_user.as_deref(), Some("root"));
        assert_eq!(cfg.supervisor.args.len(), 2);
        assert_eq!(cfg.workers.optional, vec!["deliver_scheduled_emails"]);
        assert_eq!(cfg.push_ports(), vec![9800, 9801]);
        assert!(cfg.rolling_restart_configured());
        assert_eq!(cfg.auxiliary.len(), 2);
        assert_eq!(cfg.sso.process, "apache2");
        assert_eq!(cfg.fill_cache.as_deref(), Some("./manage.py fill_caches"));
    }

    #[test]
    fn load_missing_file_is_config_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, RelaunchError::ConfigNotFound(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relaunch.yaml");
        std::fs::write(&path, "push:\n  ports: [9900]\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.push_ports(), vec![9900]);
    }

    #[test]
    fn unknown_shape_is_yaml_error() {
        let err = Config::parse("push:\n  ports: not-a-list\n").unwrap_err();
        assert!(matches!(err, RelaunchError::Yaml(_)));
    }

    #[test]
    fn validate_default_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_duplicate_ports() {
        let mut cfg = Config::default();
        cfg.push.ports = vec![9800, 9800];
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert_eq!(cfg.push_ports(), vec![9800]);
    }

    #[test]
    fn validate_rolling_without_control_file() {
        let mut cfg = Config::default();
        cfg.web.rolling_restart = true;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("without web.control_file")));
        assert!(!cfg.rolling_restart_configured());
    }

    #[test]
    fn validate_empty_ports_is_error() {
        let mut cfg = Config::default();
        cfg.push.ports.clear();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Error));
    }

    #[test]
    fn config_roundtrip_omits_unset_options() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(!yaml.contains("required_user"));
        assert!(!yaml.contains("fill_cache"));
        let parsed = Config::parse(&yaml).unwrap();
        assert_eq!(parsed.web.unit, "app-web");
    }
}
