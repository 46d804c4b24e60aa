use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::GatewayConfig;

/// Standard config file name, checked project-local then user-global.
const CONFIG_FILENAME: &str = "omnigate.toml";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load config from the given TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: GatewayConfig = toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate().map_err(|reason| Error::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(cfg)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./omnigate.toml` (project-local)
/// 2. `~/.config/omnigate/omnigate.toml` (user-global)
///
/// Returns `GatewayConfig::default()` if no config file is found or the file
/// fails to load.
pub fn discover_and_load() -> GatewayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    GatewayConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

/// Returns the user-global config directory (`~/.config/omnigate/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "omnigate").map(|d| d.config_dir().to_path_buf())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write, tempfile::NamedTempFile};

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dispatchTimeoutMs = 1234").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.dispatch_timeout_ms, 1_234);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/omnigate.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_load_rejects_negative_refill_rate() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[channels.slack.bucket]\nrefillRate = -1.0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::Invalid { .. }));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "dispatchTimeoutMs = \"not a number\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
