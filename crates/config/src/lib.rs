//! Layered configuration for dsfind.
//!
//! Values are merged in increasing order of precedence:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file: the one passed explicitly, otherwise
//!    `config.toml` in the user's config directory if it exists. TOML, YAML
//!    and JSON are recognised by extension.
//! 3. Environment variables prefixed with `DSFIND_`, with `__` separating
//!    nested keys (`DSFIND_SCAN__CONCURRENCY=4`).
//!
//! Command-line flags are applied by the binary on top of the result.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "DSFIND_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogConfig>,
    pub scan: ScanConfig,
}

/// Which catalog backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogConfig {
    /// Every subdirectory of `root` is a volume.
    Local {
        root: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Volumes searched at the same time.
    pub concurrency: usize,
    pub progress_interval_ms: u64,
    /// How long in-flight calls may run on after cancellation.
    pub grace_period_ms: u64,
    pub recursive: bool,
    pub case_sensitive: bool,
    pub details: DetailsConfig,
}
impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 11,
            progress_interval_ms: 100,
            grace_period_ms: 5_000,
            recursive: true,
            case_sensitive: false,
            details: DetailsConfig::default(),
        }
    }
}
impl ScanConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// File attributes to request from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailsConfig {
    pub size: bool,
    pub modified: bool,
    pub owner: bool,
    pub file_type: bool,
}
impl Default for DetailsConfig {
    fn default() -> Self {
        Self { size: true, modified: true, owner: false, file_type: false }
    }
}

impl Config {
    /// Load configuration from defaults, `path` (or the default location),
    /// and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Missing(path.display().to_string()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = default_path()
                    && path.is_file()
                {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("scan.concurrency must be at least 1".to_string()));
        }
        if self.scan.progress_interval_ms == 0 {
            exn::bail!(ErrorKind::Invalid("scan.progress_interval_ms must be at least 1".to_string()));
        }
        if let Some(CatalogConfig::Local { root, .. }) = &self.catalog
            && root.as_os_str().is_empty()
        {
            exn::bail!(ErrorKind::Invalid("catalog.root must not be empty".to_string()));
        }
        Ok(())
    }
}

/// `config.toml` in the platform's config directory for dsfind.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dsfind").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    tracing::debug!(path = %path.display(), "Loading configuration file");
    Ok(match extension.as_str() {
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        "json" => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = Config::from_figment(Figment::from(Serialized::defaults(Config::default()))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scan.concurrency, 11);
        assert_eq!(config.scan.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.scan.grace_period(), Duration::from_secs(5));
        assert!(config.scan.recursive);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dsfind.toml",
                r#"
                    [catalog]
                    type = "local"
                    root = "/srv/datastores"

                    [scan]
                    concurrency = 3
                    case_sensitive = true

                    [scan.details]
                    owner = true
                "#,
            )?;
            jail.set_env("DSFIND_SCAN__CONCURRENCY", "7");

            let config = Config::load(Some(Path::new("dsfind.toml"))).unwrap();
            assert_eq!(config.catalog, Some(CatalogConfig::Local { root: "/srv/datastores".into(), name: None }));
            assert_eq!(config.scan.concurrency, 7);
            assert!(config.scan.case_sensitive);
            assert!(config.scan.details.owner);
            assert!(config.scan.details.size);
            Ok(())
        });
    }

    #[rstest]
    #[case("dsfind.yaml", "scan:\n  grace_period_ms: 250\n")]
    #[case("dsfind.json", r#"{"scan": {"grace_period_ms": 250}}"#)]
    fn test_other_formats(#[case] file: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(file, contents)?;
            let config = Config::load(Some(Path::new(file))).unwrap();
            assert_eq!(config.scan.grace_period(), Duration::from_millis(250));
            Ok(())
        });
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        Jail::expect_with(|jail| {
            jail.create_file("dsfind.toml", "[scan]\nconcurrency = 0\n")?;
            let err = Config::load(Some(Path::new("dsfind.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn test_bad_value_fails_to_load() {
        Jail::expect_with(|jail| {
            jail.create_file("dsfind.toml", "[scan]\nconcurrency = \"lots\"\n")?;
            let err = Config::load(Some(Path::new("dsfind.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Missing(_)));

        let ini = dir.path().join("dsfind.ini");
        std::fs::write(&ini, "concurrency=3").unwrap();
        let err = Config::load(Some(&ini)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }
}
