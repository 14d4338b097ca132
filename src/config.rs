use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use confique::Config as _;

use crate::prelude::*;


/// The locations where we look for a configuration file. The first existing
/// file in this list is used.
const DEFAULT_PATHS: &[&str] = &["config.toml", "/etc/social-api/config.toml"];

const CONFIG_PATH_ENV: &str = "SOCIAL_CONFIG_PATH";

/// Configuration for the social API server.
///
/// Every value can be given in the configuration file. Some values can also
/// be set via environment variables, which take precedence over the file.
#[derive(Debug, confique::Config)]
pub(crate) struct Config {
    #[config(nested)]
    pub(crate) db: crate::db::DbConfig,

    #[config(nested)]
    pub(crate) http: crate::http::HttpConfig,

    #[config(nested)]
    pub(crate) log: crate::logger::LogConfig,
}

impl Config {
    /// Loads the configuration from the file named by `SOCIAL_CONFIG_PATH` or
    /// the first existing default location. If there is no such file, the
    /// configuration is built from environment variables and defaults alone.
    pub(crate) fn from_env_or_default_locations() -> Result<(Self, Option<PathBuf>)> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => DEFAULT_PATHS.iter().map(PathBuf::from).find(|p| p.exists()),
        };

        let config = match &path {
            Some(path) => Self::load_from(path)?,
            None => Self::builder()
                .env()
                .load()
                .context(format!(
                    "failed to load configuration from environment (no configuration \
                        file found, we checked: {})",
                    DEFAULT_PATHS.join(", "),
                ))?,
        };

        Ok((config, path))
    }

    pub(crate) fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        anyhow::ensure!(path.exists(), "config file '{}' does not exist", path.display());

        Self::builder()
            .env()
            .file(path)
            .load()
            .context(format!("failed to load configuration from '{}'", path.display()))
    }
}

pub(crate) fn write_template(path: Option<&PathBuf>) -> Result<()> {
    use confique::toml::FormatOptions;

    info!(
        "Writing configuration template to '{}'",
        path.map(|p| p.display().to_string()).unwrap_or("<stdout>".into()),
    );

    let mut options = FormatOptions::default();
    options.general.nested_field_gap = 2;
    let template = confique::toml::template::<Config>(options);
    match path {
        Some(path) => fs::write(path, template)?,
        None => io::stdout().write_all(template.as_bytes())?,
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("social-api-{}-{name}.toml", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_are_filled_in() {
        let path = write_temp("defaults", r#"
            [db]
            uri = "mongodb://localhost:27017"
        "#);
        let config = Config::load_from(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.db.database, "SocialMedia");
        assert_eq!(config.http.port, 4000);
        assert_eq!(config.http.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(config.log.stdout);
        assert!(!config.log.log_http_headers);
    }

    #[test]
    fn file_values_are_used() {
        let path = write_temp("values", r#"
            [db]
            uri = "mongodb://db.example:27017"
            database = "Tests"

            [http]
            port = 8080
            address = "0.0.0.0"

            [log]
            filters.social_api = "trace"
            filters.hyper = "warn"
        "#);
        let config = Config::load_from(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.db.database, "Tests");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let path = write_temp("level", r#"
            [db]
            uri = "mongodb://localhost:27017"

            [log]
            filters.social_api = "loud"
        "#);
        let result = Config::load_from(&path);
        fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("social-api-this-file-does-not-exist.toml");
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn template_mentions_all_sections() {
        let template = confique::toml::template::<Config>(Default::default());
        assert!(template.contains("[db]"));
        assert!(template.contains("MONGO_URL"));
        assert!(template.contains("[http]"));
        assert!(template.contains("[log]"));
    }
}
