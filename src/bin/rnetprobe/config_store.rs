use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rnetprobe::OutputMode;
use toml::Value;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "filesystem error: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid config file: {}", err),
            ConfigError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(value: io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

/// `[defaults]` table of the config file. Every key is optional and loses
/// to the matching command-line flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    pub timeout: Option<f64>,
    pub jobs: Option<usize>,
    pub mode: Option<OutputMode>,
    pub path: Option<PathBuf>,
    pub file_name: Option<String>,
    pub transport: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_port: Option<u16>,
}

pub struct ConfigStore {
    path: PathBuf,
    pub defaults: Defaults,
}

impl ConfigStore {
    /// Load the config file; a missing file yields empty defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if !path.exists() {
            return Ok(Self {
                path,
                defaults: Defaults::default(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let defaults = parse_str(&content)?;
        Ok(Self { path, defaults })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn default_path() -> PathBuf {
    resolve_config_dir().join("config.toml")
}

fn parse_str(content: &str) -> Result<Defaults, ConfigError> {
    let root: Value = content.parse::<Value>()?;
    parse_value(root)
}

fn parse_value(root: Value) -> Result<Defaults, ConfigError> {
    let mut data = Defaults::default();
    let Some(defaults) = root.get("defaults").and_then(|val| val.as_table()) else {
        return Ok(data);
    };
    if let Some(timeout_value) = defaults.get("timeout") {
        if let Some(timeout) = timeout_value.as_float() {
            data.timeout = Some(timeout);
        } else if let Some(int_timeout) = timeout_value.as_integer() {
            data.timeout = Some(int_timeout as f64);
        }
    }
    if let Some(jobs) = defaults.get("jobs").and_then(Value::as_integer) {
        if jobs < 1 {
            return Err(ConfigError::Invalid(format!(
                "defaults.jobs must be at least 1, got {jobs}"
            )));
        }
        data.jobs = Some(jobs as usize);
    }
    if let Some(mode) = defaults.get("mode").and_then(Value::as_str) {
        let mode = mode
            .parse::<OutputMode>()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        data.mode = Some(mode);
    }
    if let Some(path) = defaults.get("path").and_then(Value::as_str) {
        data.path = Some(PathBuf::from(path));
    }
    if let Some(name) = defaults.get("file_name").and_then(Value::as_str) {
        data.file_name = Some(name.to_string());
    }
    if let Some(transport) = defaults.get("transport").and_then(Value::as_str) {
        data.transport = Some(transport.to_string());
    }
    if let Some(user) = defaults.get("ssh_user").and_then(Value::as_str) {
        data.ssh_user = Some(user.to_string());
    }
    if let Some(port) = defaults.get("ssh_port").and_then(Value::as_integer) {
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::Invalid(format!("defaults.ssh_port out of range: {port}")))?;
        data.ssh_port = Some(port);
    }
    Ok(data)
}

fn resolve_config_dir() -> PathBuf {
    if let Some(val) = env::var_os("RNETPROBE_CONFIG_DIR") {
        let path = PathBuf::from(val);
        if path.is_absolute() {
            return path;
        }
        return env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| PathBuf::from("."));
    }
    if let Some(base) = dirs::config_dir() {
        return base.join("rnetprobe");
    }
    PathBuf::from(".rnetprobe")
}
