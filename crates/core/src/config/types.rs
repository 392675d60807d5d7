use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::catalog::WellKnownContainer;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Commit (true) or roll back (false) an active transaction when a new one begins.
    #[serde(default = "default_auto_commit")]
    pub auto_commit: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            auto_commit: default_auto_commit(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediacat.db")
}

fn default_auto_commit() -> bool {
    true
}

/// Catalog behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Well-known containers suppressed in browse results.
    #[serde(default)]
    pub hidden_subtrees: Vec<WellKnownContainer>,
    /// Seconds between maintenance passes (default: 300)
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
    /// EPG items that ended more than this many seconds ago are swept (default: 3600)
    #[serde(default = "default_epg_retention")]
    pub epg_retention_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            hidden_subtrees: Vec::new(),
            maintenance_interval_secs: default_maintenance_interval(),
            epg_retention_secs: default_epg_retention(),
        }
    }
}

fn default_maintenance_interval() -> u64 {
    300
}

fn default_epg_retention() -> u64 {
    3600
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}
