use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

use crate::models::UserWithRoles;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Unset means demo mode against the in-memory backend.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub default_user_role: String,
    /// Users always listed first on the users screen, whatever the backend says.
    pub pinned_users: Vec<UserWithRoles>,
    pub demo_admin_email: String,
    pub demo_admin_password: String,
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            database_url: None,
            db_max_connections: 5,
            db_acquire_timeout_secs: 5,
            default_user_role: "user".to_string(),
            pinned_users: Vec::new(),
            demo_admin_email: "admin@example.com".to_string(),
            demo_admin_password: "admin".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let ip = match get("BIND_ADDR") {
            Some(raw) => raw.trim().parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: raw,
            })?,
            None => defaults.bind_addr.ip(),
        };
        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => defaults.bind_addr.port(),
        };
        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    name: "DB_MAX_CONNECTIONS",
                    value: raw,
                })?,
            None => defaults.db_max_connections,
        };
        let db_acquire_timeout_secs = match get("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "DB_ACQUIRE_TIMEOUT_SECS",
                value: raw,
            })?,
            None => defaults.db_acquire_timeout_secs,
        };
        let pinned_users = match get("PINNED_USERS") {
            Some(raw) => parse_pinned_users(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            database_url: get("DATABASE_URL"),
            db_max_connections,
            db_acquire_timeout_secs,
            default_user_role: get("DEFAULT_USER_ROLE").unwrap_or(defaults.default_user_role),
            pinned_users,
            demo_admin_email: get("DEMO_ADMIN_EMAIL").unwrap_or(defaults.demo_admin_email),
            demo_admin_password: get("DEMO_ADMIN_PASSWORD")
                .unwrap_or(defaults.demo_admin_password),
            static_dir: get("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
        })
    }
}

/// Parses `email=role|role,email=role` into user rows. Roles are optional.
pub fn parse_pinned_users(raw: &str) -> Result<Vec<UserWithRoles>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (email, roles) = entry.split_once('=').unwrap_or((entry, ""));
            let email = email.trim();
            if email.is_empty() || !email.contains('@') {
                return Err(ConfigError::Invalid {
                    name: "PINNED_USERS",
                    value: entry.to_string(),
                });
            }

            let roles = roles
                .split('|')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect();
            Ok(UserWithRoles::new(email, roles))
        })
        .collect()
}
