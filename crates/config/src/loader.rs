use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::MsghubConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["msghub.toml", "msghub.yaml", "msghub.yml", "msghub.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<MsghubConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./msghub.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/msghub/msghub.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MsghubConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> MsghubConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return MsghubConfig::default();
    };

    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        MsghubConfig::default()
    })
}

/// First existing config file in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// The user-global config directory (`~/.config/msghub/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "msghub").map(|d| d.config_dir().to_path_buf())
}

/// Parse raw config text, choosing the format from the file extension.
pub fn parse_config(raw: &str, path: &Path) -> Result<MsghubConfig> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .context("config path has no extension")?;

    match extension {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::time::Duration};

    #[rstest]
    #[case("msghub.toml", "[listener]\nauto_notify = false\ndrain_timeout_secs = 5\n")]
    #[case("msghub.yaml", "listener:\n  auto_notify: false\n  drain_timeout_secs: 5\n")]
    #[case(
        "msghub.json",
        r#"{"listener": {"auto_notify": false, "drain_timeout_secs": 5}}"#
    )]
    fn loads_each_format(#[case] file_name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, body).unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.listener.auto_notify);
        assert_eq!(config.listener.drain_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = parse_config("", Path::new("msghub.toml")).unwrap();
        assert_eq!(config, MsghubConfig::default());
        assert!(config.listener.auto_notify);
        assert_eq!(config.listener.drain_timeout_secs, 30);
    }

    #[test]
    fn env_fallback_applies_before_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msghub.toml");
        std::fs::write(
            &path,
            "[listener]\ndrain_timeout_secs = ${MSGHUB_UNSET_DRAIN_TIMEOUT_FOR_TEST:-12}\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.drain_timeout_secs, 12);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse_config("", Path::new("msghub.ini")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "ini"));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/msghub.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/msghub.toml"));
    }
}
