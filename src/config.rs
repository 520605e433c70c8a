use crate::providers::ProviderKind;
use crate::storage::StorageKind;
use failure::{Error, ResultExt};
use serde_derive::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The environment variable which overrides `general.storage`.
pub const STORAGE_ENV_VAR: &str = "REPO_SHELF_STORAGE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub general: General,
    pub rest: Rest,
    /// Self-hosted instances to register on top of the built-in providers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<CustomProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct General {
    /// Which storage driver to use.
    pub storage: StorageKind,
    /// Where the local storage driver keeps its data.
    pub data_dir: String,
    /// Start empty stores off with a handful of sample repos.
    pub seed_sample: bool,
}

impl Default for General {
    fn default() -> General {
        General {
            storage: StorageKind::default(),
            data_dir: String::from("~/.repo-shelf"),
            seed_sample: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Rest {
    pub base_url: String,
}

impl Default for Rest {
    fn default() -> Rest {
        Rest {
            base_url: String::from("http://localhost:3000"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomProvider {
    pub kind: ProviderKind,
    pub domain: String,
}

impl Config {
    /// Load the config from a TOML file, falling back to the defaults when
    /// the file doesn't exist.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();

        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} doesn't exist, using the defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|_| format!("Unable to read {}", path.display()))
                    .map_err(Error::from);
            }
        };

        Config::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Config, Error> {
        let cfg = toml::from_str(raw).context("Invalid config")?;
        Ok(cfg)
    }

    /// The storage driver to use, letting the environment override the
    /// config file.
    pub fn storage_kind(&self) -> Result<StorageKind, Error> {
        match env::var(STORAGE_ENV_VAR) {
            Ok(value) => {
                let kind = value
                    .parse::<StorageKind>()
                    .with_context(|_| format!("Invalid ${}", STORAGE_ENV_VAR))?;
                Ok(kind)
            }
            Err(_) => Ok(self.general.storage),
        }
    }

    /// The data directory with `~` and environment variables expanded.
    pub fn data_dir(&self) -> Result<PathBuf, Error> {
        let expanded = shellexpand::full(&self.general.data_dir)
            .context("Unable to expand the data directory")?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn example() -> Config {
        Config {
            general: General {
                seed_sample: true,
                ..Default::default()
            },
            rest: Rest::default(),
            providers: vec![CustomProvider {
                kind: ProviderKind::GitLab,
                domain: String::from("git.example.com"),
            }],
        }
    }

    pub fn as_toml(&self) -> String {
        match toml::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => unreachable!("Serializing to TOML should never fail: {}", e),
        }
    }
}
