//! Configuration: database connection and declared tables.
//!
//! ```toml
//! [database]
//! url = "sqlite://app.db"
//! max_connections = 5
//!
//! [[tables]]
//! name = "users"
//! columns = [
//!     { name = "id", spec = ["int", "pk"] },
//!     { name = "username", spec = ["varchar(255)"] },
//! ]
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::DEFAULT_MAX_CONNECTIONS;
use crate::error::OrmResult;
use crate::schema::TableDecl;

/// File looked up in the working directory.
pub const LOCAL_CONFIG: &str = "orm-lite.toml";

/// Main configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrmConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Declared tables, in file order.
    #[serde(default)]
    pub tables: Vec<TableDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl OrmConfig {
    /// Create a new configuration builder
    pub fn builder() -> OrmConfigBuilder {
        OrmConfigBuilder::default()
    }

    pub fn from_toml(content: &str) -> OrmResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> OrmResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), tables = config.tables.len(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else the first of `./orm-lite.toml` and
    /// `<config dir>/orm-lite/config.toml` that exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> OrmResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match candidate_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("orm-lite").join("config.toml"));
    }
    paths
}

/// Builder for OrmConfig
#[derive(Debug, Default)]
pub struct OrmConfigBuilder {
    config: OrmConfig,
}

impl OrmConfigBuilder {
    /// Set the database URL
    pub fn database(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.database.max_connections = n;
        self
    }

    pub fn table(mut self, decl: TableDecl) -> Self {
        self.config.tables.push(decl);
        self
    }

    /// Build the configuration
    pub fn build(self) -> OrmConfig {
        self.config
    }
}
