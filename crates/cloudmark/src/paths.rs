use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "CLOUDMARK_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "cloudmark";
const APPLICATION: &str = "cloudmark";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

/// Where the configuration file comes from, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Passed with `--config` or `CLOUDMARK_CONFIG`; must exist.
    Explicit(PathBuf),
    /// `config.toml` under the config directory; exists.
    Default(PathBuf),
    /// No file; built-in defaults only.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Default(path) => Some(path),
            ConfigSource::Defaults => None,
        }
    }
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// An explicit path wins and must point at a file. Otherwise the
    /// default file is used when present.
    pub fn config_source(&self, explicit: Option<&Path>) -> Result<ConfigSource> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            return Ok(ConfigSource::Explicit(path.to_path_buf()));
        }
        let default = self.config_file();
        if default.is_file() {
            Ok(ConfigSource::Default(default))
        } else {
            Ok(ConfigSource::Defaults)
        }
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    /// Runs `body` with `ENV_CONFIG_DIR` set to `value` (or unset), then
    /// restores the previous value.
    fn with_config_dir<T>(value: Option<&Path>, body: impl FnOnce() -> T) -> T {
        let _guard = env_lock().lock().unwrap();
        let previous = env::var_os(ENV_CONFIG_DIR);
        match value {
            Some(value) => env::set_var(ENV_CONFIG_DIR, value),
            None => env::remove_var(ENV_CONFIG_DIR),
        }
        let result = body();
        match previous {
            Some(previous) => env::set_var(ENV_CONFIG_DIR, previous),
            None => env::remove_var(ENV_CONFIG_DIR),
        }
        result
    }

    #[test]
    fn env_override_takes_precedence() {
        let root = TempDir::new().unwrap();
        let paths = with_config_dir(Some(root.path()), AppPaths::discover).unwrap();
        assert_eq!(paths.config_dir(), root.path());
        assert_eq!(paths.config_file(), root.path().join("config.toml"));
    }

    #[test]
    fn default_config_dir_is_named_after_the_application() {
        if let Ok(paths) = with_config_dir(None, AppPaths::discover) {
            assert!(paths
                .config_dir()
                .to_string_lossy()
                .to_ascii_lowercase()
                .contains("cloudmark"));
        }
    }

    #[test]
    fn missing_default_file_means_defaults_only() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        let source = paths.config_source(None).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert!(source.path().is_none());
    }

    #[test]
    fn present_default_file_is_used() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("config.toml"), "").unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        assert!(matches!(
            paths.config_source(None).unwrap(),
            ConfigSource::Default(_)
        ));
    }

    #[test]
    fn explicit_path_must_exist() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::from_raw(root.path().to_path_buf());
        assert!(paths
            .config_source(Some(&root.path().join("absent.toml")))
            .is_err());

        let explicit = root.path().join("other.toml");
        fs::write(&explicit, "").unwrap();
        assert_eq!(
            paths.config_source(Some(&explicit)).unwrap(),
            ConfigSource::Explicit(explicit)
        );
    }
}
