use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, net::IpAddr, path::PathBuf, str::FromStr};

pub const DEFAULT_PORT: u16 = 8501;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordVisits {
    Off,
    Memory,
}

impl FromStr for RecordVisits {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "0" | "false" => Ok(RecordVisits::Off),
            "memory" => Ok(RecordVisits::Memory),
            other => bail!("RECORD_VISITS must be 'off' or 'memory', got '{}'", other),
        }
    }
}

/// Optional JSON config file; every key can also come from the environment.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct FileConfig {
    model_path: Option<PathBuf>,
    scaler_path: Option<PathBuf>,
    meta_path: Option<PathBuf>,
    port: Option<u16>,
    bind_addr: Option<IpAddr>,
    record_visits: Option<RecordVisits>,
    log_pred: Option<bool>,
}

impl FileConfig {
    fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("config file not found at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub scaler_path: Option<PathBuf>,
    pub meta_path: Option<PathBuf>,
    pub port: u16,
    pub bind_addr: IpAddr,
    pub record_visits: RecordVisits,
    pub log_pred: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Environment variables win over the file named by `CONFIG_PATH`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let file = match var("CONFIG_PATH") {
            Some(p) => FileConfig::load(&p)?,
            None => FileConfig::default(),
        };

        let model_path = var("MODEL_PATH")
            .map(PathBuf::from)
            .or(file.model_path)
            .context("MODEL_PATH not set")?;
        let port = match var("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT '{}'", p))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };
        let bind_addr = match var("BIND_ADDR") {
            Some(a) => a.parse().with_context(|| format!("invalid BIND_ADDR '{}'", a))?,
            None => file.bind_addr.unwrap_or(IpAddr::from([0, 0, 0, 0])),
        };
        let record_visits = match var("RECORD_VISITS") {
            Some(r) => r.parse()?,
            None => file.record_visits.unwrap_or(RecordVisits::Off),
        };

        Ok(Self {
            model_path,
            scaler_path: var("SCALER_PATH").map(PathBuf::from).or(file.scaler_path),
            meta_path: var("META_PATH").map(PathBuf::from).or(file.meta_path),
            port,
            bind_addr,
            record_visits,
            log_pred: var("LOG_PRED").map(|v| v == "1").or(file.log_pred).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_from_env() {
        let cfg = Config::from_lookup(lookup(&[("MODEL_PATH", "model.json")])).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("model.json"));
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.bind_addr, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(cfg.record_visits, RecordVisits::Off);
        assert!(cfg.scaler_path.is_none());
        assert!(!cfg.log_pred);
    }

    #[test]
    fn model_path_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("MODEL_PATH"));
    }

    #[test]
    fn env_overrides_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"model_path": "file_model.json", "scaler_path": "scaler.json", "port": 9000, "record_visits": "memory"}}"#
        )
        .unwrap();
        let path = f.path().to_str().unwrap().to_string();
        let cfg = Config::from_lookup(lookup(&[("CONFIG_PATH", path.as_str()), ("PORT", "9100"), ("LOG_PRED", "1")])).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("file_model.json"));
        assert_eq!(cfg.scaler_path, Some(PathBuf::from("scaler.json")));
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.record_visits, RecordVisits::Memory);
        assert!(cfg.log_pred);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(Config::from_lookup(lookup(&[("MODEL_PATH", "m.json"), ("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MODEL_PATH", "m.json"), ("RECORD_VISITS", "mysql")])).is_err());
    }
}
