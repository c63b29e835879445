use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::error::PortalError;
use crate::fixtures::DEFAULT_RETRIES;
use crate::portal::DEFAULT_BASE_URL;

pub const DEFAULT_FIXTURES: &str = "data";
pub const DEFAULT_STATE_DIR: &str = ".cabin/state";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub portal: PortalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Directory or `http(s)://` base URL holding the fixture JSON.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            source: None,
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Values given on the command line, which beat everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub json: bool,
    pub fixtures: Option<String>,
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub fixtures: String,
    pub state_dir: PathBuf,
    pub resolved_output: String,
}

/// Parse `path` as TOML, or `T::default()` when the file is absent.
/// Unreadable or malformed files surface as [`PortalError::Config`].
fn read_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let config_error = |message: String| PortalError::Config {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
    Ok(toml::from_str(&content).map_err(|err| config_error(err.message().to_string()))?)
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    read_toml(&project_root.join(".cabin/config.toml"))
}

/// `~/.config/cabin/config.toml` or the platform equivalent.
pub fn load_user_config() -> Result<UserConfig> {
    dirs::config_dir().map_or_else(
        || Ok(UserConfig::default()),
        |dir| read_toml(&dir.join("cabin/config.toml")),
    )
}

pub fn resolve_config(project_root: &Path, overrides: &Overrides) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let fixtures = first_of(
        overrides.fixtures.clone(),
        env::var("CABIN_FIXTURES").ok(),
        project.fixtures.source.clone(),
    )
    .unwrap_or_else(|| DEFAULT_FIXTURES.to_string());
    let fixtures = if is_url(&fixtures) {
        fixtures
    } else {
        anchor(project_root, PathBuf::from(fixtures)).display().to_string()
    };

    let state_dir = first_of(
        overrides.state_dir.clone(),
        env::var_os("CABIN_STATE_DIR").map(PathBuf::from),
        project.storage.dir.clone(),
    )
    .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));
    let state_dir = anchor(project_root, state_dir);

    let env_format = env::var("FORMAT").ok();
    let resolved_output =
        resolve_output(overrides.json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        fixtures,
        state_dir,
        resolved_output,
    })
}

fn first_of<T>(cli: Option<T>, env: Option<T>, config: Option<T>) -> Option<T> {
    cli.or(env).or(config)
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Relative paths are taken from the project root.
fn anchor(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// `--json`, then `FORMAT`, then the user config, then TTY detection.
fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    let chosen = if cli_json {
        Some("json")
    } else {
        env_format
            .and_then(normalize_output_mode)
            .or_else(|| user_output.and_then(normalize_output_mode))
    };
    let mode = chosen.unwrap_or(if std::io::stdout().is_terminal() {
        "pretty"
    } else {
        "text"
    });
    mode.to_string()
}

const fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("tempdir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.fixtures.source, None);
        assert_eq!(cfg.fixtures.retries, 1);
        assert_eq!(cfg.storage.dir, None);
        assert_eq!(cfg.portal.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn project_config_parses_sections() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join(".cabin")).expect("mkdir");
        std::fs::write(
            root.path().join(".cabin/config.toml"),
            r#"
[fixtures]
source = "https://cabins.example/data"
retries = 3

[storage]
dir = "/var/lib/cabin"

[portal]
base_url = "https://cabins.example/"
"#,
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("parse");
        assert_eq!(cfg.fixtures.source.as_deref(), Some("https://cabins.example/data"));
        assert_eq!(cfg.fixtures.retries, 3);
        assert_eq!(cfg.storage.dir, Some(PathBuf::from("/var/lib/cabin")));
        assert_eq!(cfg.portal.base_url, "https://cabins.example/");
    }

    #[test]
    fn broken_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(root.path().join(".cabin")).expect("mkdir");
        std::fs::write(root.path().join(".cabin/config.toml"), "[fixtures\n").expect("write");
        let err = load_project_config(root.path()).expect_err("must fail");
        let portal_err = err.downcast_ref::<PortalError>().expect("typed config error");
        assert_eq!(portal_err.code(), crate::ErrorCode::ConfigParseError);
        assert!(portal_err.hint().is_some());
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn cli_beats_env_beats_config() {
        assert_eq!(first_of(Some(1), Some(2), Some(3)), Some(1));
        assert_eq!(first_of(None, Some(2), Some(3)), Some(2));
        assert_eq!(first_of(None, None, Some(3)), Some(3));
        assert_eq!(first_of::<u8>(None, None, None), None);
    }

    #[test]
    fn relative_paths_anchor_at_project_root() {
        let root = Path::new("/srv/portal");
        assert_eq!(anchor(root, PathBuf::from("data")), PathBuf::from("/srv/portal/data"));
        assert_eq!(anchor(root, PathBuf::from("/tmp/x")), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_format_beats_user_config() {
        assert_eq!(resolve_output(false, Some("json"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("plain"), Some("bogus")), "text");
    }
}
