//! Server configuration from environment variables.
//!
//! Variables:
//!   DATABASE_URL             - PostgreSQL connection string (required)
//!   CHANFIND_BIND            - listen address (default 0.0.0.0:8080)
//!   CHANFIND_CHANNEL_GROUPS  - comma-separated groups holding the channel role
//!   CHANFIND_PROPERTY_GROUPS - comma-separated groups holding the property role
//!   CHANFIND_TAG_GROUPS      - comma-separated groups holding the tag role
//!   CHANFIND_ADMIN_GROUPS    - comma-separated admin groups
//!   CHANFIND_USERS           - user directory, "alice:teamA|teamB,bob:teamB"

use std::collections::HashMap;
use std::net::SocketAddr;

use chanfind_core::{AuthorizationService, Error, Principal, Result};

/// Maps authenticated user names to their group memberships.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, Vec<String>>,
}

impl UserDirectory {
    pub fn new(users: HashMap<String, Vec<String>>) -> Self {
        Self { users }
    }

    /// Parse the `CHANFIND_USERS` format: comma-separated entries of
    /// `name:group|group|...`. Entries without groups are allowed.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut users = HashMap::new();
        for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
            let entry = entry.trim();
            let (name, groups) = match entry.split_once(':') {
                Some((name, groups)) => (name, groups),
                None => (entry, ""),
            };
            if name.is_empty() {
                return Err(Error::Config(format!("empty user name in entry '{entry}'")));
            }
            let groups: Vec<String> = groups
                .split('|')
                .filter(|g| !g.is_empty())
                .map(|g| g.to_string())
                .collect();
            users.insert(name.to_string(), groups);
        }
        Ok(Self { users })
    }

    /// Resolve a user name to a principal; unknown users authenticate with
    /// no groups.
    pub fn resolve(&self, name: &str) -> Principal {
        let groups = self.users.get(name).cloned().unwrap_or_default();
        Principal::new(name, groups)
    }
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub channel_groups: Vec<String>,
    pub property_groups: Vec<String>,
    pub tag_groups: Vec<String>,
    pub admin_groups: Vec<String>,
    pub users: UserDirectory,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;

        let bind_addr: SocketAddr = std::env::var("CHANFIND_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("invalid CHANFIND_BIND: {e}")))?;

        let users = match std::env::var("CHANFIND_USERS") {
            Ok(spec) => UserDirectory::parse(&spec)?,
            Err(_) => UserDirectory::default(),
        };

        Ok(Self {
            database_url,
            bind_addr,
            channel_groups: group_list("CHANFIND_CHANNEL_GROUPS"),
            property_groups: group_list("CHANFIND_PROPERTY_GROUPS"),
            tag_groups: group_list("CHANFIND_TAG_GROUPS"),
            admin_groups: group_list("CHANFIND_ADMIN_GROUPS"),
            users,
        })
    }

    pub fn authorization(&self) -> AuthorizationService {
        AuthorizationService::new(
            self.channel_groups.clone(),
            self.property_groups.clone(),
            self.tag_groups.clone(),
            self.admin_groups.clone(),
        )
    }
}

fn group_list(var: &str) -> Vec<String> {
    std::env::var(var)
        .unwrap_or_default()
        .split(',')
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}
