//! Configuration parser for cloud credentials and tag tasks.
//!
//! Cloud settings come from `clouds.yaml`, overridden by `OS_*` environment
//! variables (optionally loaded from a `.env` file). Tag tasks come from
//! YAML files whose keys mirror the command-line parameters.

use crate::error::{ConfigError, Result, TagError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{CloudConfig, CloudsFile, TagTask};

/// Environment variable naming an explicit clouds.yaml.
pub const CLOUDS_FILE_ENV: &str = "OS_CLIENT_CONFIG_FILE";

/// File name searched for in the standard locations.
pub const CLOUDS_FILE_NAME: &str = "clouds.yaml";

/// System-wide clouds.yaml location.
const SYSTEM_CLOUDS_FILE: &str = "/etc/openstack/clouds.yaml";

/// Configuration parser for loading cloud and task configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a clouds.yaml file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_clouds_file(&self, path: impl AsRef<Path>) -> Result<CloudsFile> {
        let path = path.as_ref();
        info!("Loading clouds from: {}", path.display());

        let content = read_file(path)?;
        self.parse_clouds_yaml(&content, Some(path))
    }

    /// Parses clouds.yaml content.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_clouds_yaml(&self, content: &str, source: Option<&Path>) -> Result<CloudsFile> {
        debug!("Parsing clouds YAML");
        parse_yaml(content, source)
    }

    /// Resolves the settings of one cloud.
    ///
    /// The clouds file is taken from `clouds_file` or the standard search
    /// path. When `cloud_name` is `None` and the file defines exactly one
    /// cloud, that cloud is used; otherwise the environment alone must
    /// supply the settings. `env` looks up environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a named cloud or explicit file does not exist, or
    /// if a file cannot be parsed.
    pub fn resolve_cloud<F>(
        &self,
        clouds_file: Option<&Path>,
        cloud_name: Option<&str>,
        env: F,
    ) -> Result<CloudConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = clouds_file
            .map(Path::to_path_buf)
            .or_else(|| env(CLOUDS_FILE_ENV).map(PathBuf::from));

        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound { path }.into());
            }
            Some(path) => Some(path),
            None => self.find_clouds_file(),
        };

        let mut cloud = match (path, cloud_name) {
            (Some(path), name) => {
                let mut file = self.load_clouds_file(&path)?;
                match name {
                    Some(name) => file.clouds.remove(name).ok_or_else(|| {
                        TagError::from(ConfigError::UnknownCloud {
                            name: name.to_string(),
                            path: path.clone(),
                        })
                    })?,
                    None if file.clouds.len() == 1 => {
                        file.clouds.into_values().next().unwrap_or_default()
                    }
                    None => {
                        debug!(
                            "{} defines {} clouds and none was selected; using environment",
                            path.display(),
                            file.clouds.len()
                        );
                        CloudConfig::default()
                    }
                }
            }
            (None, Some(name)) => {
                return Err(ConfigError::UnknownCloud {
                    name: name.to_string(),
                    path: PathBuf::from(CLOUDS_FILE_NAME),
                }
                .into());
            }
            (None, None) => {
                debug!("No clouds.yaml found; using environment");
                CloudConfig::default()
            }
        };

        Self::apply_env_overrides(&mut cloud, env);
        Ok(cloud)
    }

    /// Searches the standard clouds.yaml locations.
    #[must_use]
    pub fn find_clouds_file(&self) -> Option<PathBuf> {
        let local = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(CLOUDS_FILE_NAME), |p| p.join(CLOUDS_FILE_NAME));
        let user = dirs::config_dir().map(|d| d.join("openstack").join(CLOUDS_FILE_NAME));

        [Some(local), user, Some(PathBuf::from(SYSTEM_CLOUDS_FILE))]
            .into_iter()
            .flatten()
            .find(|candidate| candidate.exists())
            .inspect(|found| info!("Found clouds file: {}", found.display()))
    }

    /// Applies `OS_*` environment variable overrides.
    fn apply_env_overrides<F>(cloud: &mut CloudConfig, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth = &mut cloud.auth;
        let overrides: [(&str, &mut Option<String>); 7] = [
            ("OS_AUTH_URL", &mut auth.auth_url),
            ("OS_USERNAME", &mut auth.username),
            ("OS_PASSWORD", &mut auth.password),
            ("OS_PROJECT_NAME", &mut auth.project_name),
            ("OS_PROJECT_ID", &mut auth.project_id),
            ("OS_USER_DOMAIN_NAME", &mut auth.user_domain_name),
            ("OS_PROJECT_DOMAIN_NAME", &mut auth.project_domain_name),
        ];
        for (var, field) in overrides {
            if let Some(value) = env(var) {
                debug!("Overriding {var} from environment");
                *field = Some(value);
            }
        }

        if let Some(region) = env("OS_REGION_NAME") {
            debug!("Overriding OS_REGION_NAME from environment");
            cloud.region_name = Some(region);
        }

        if let Some(interface) = env("OS_INTERFACE") {
            debug!("Overriding OS_INTERFACE from environment");
            cloud.interface = Some(interface);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Loads a tag task file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_task(&self, path: impl AsRef<Path>) -> Result<TagTask> {
        let path = path.as_ref();
        info!("Loading tag task from: {}", path.display());

        let content = read_file(path)?;
        self.parse_task_yaml(&content, Some(path))
    }

    /// Parses a tag task from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a server or volume task.
    pub fn parse_task_yaml(&self, content: &str, source: Option<&Path>) -> Result<TagTask> {
        debug!("Parsing tag task YAML");
        let task: TagTask = parse_yaml(content, source)?;
        debug!("Parsed tag task for: {}", task.reference());
        Ok(task)
    }
}

/// Reads a configuration file.
fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to read file: {e}"),
        location: Some(path.display().to_string()),
    })?;
    Ok(content)
}

/// Deserializes YAML, tagging errors with their source.
fn parse_yaml<T: serde::de::DeserializeOwned>(content: &str, source: Option<&Path>) -> Result<T> {
    let value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
        message: format!("YAML parse error: {e}"),
        location: source.map(|p| p.display().to_string()),
    })?;
    Ok(value)
}
