//! Identity and storage configuration supplied to the library services

use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8724";
pub const DEFAULT_STORAGE_DIR: &str = "./squadov-storage/VOD";
pub const UNKNOWN_USER: &str = "unknown";

/// Who is using the library, and from which device
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> String;
    fn device_id(&self) -> String;
}

/// Fixed identity, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    pub user_id: String,
    pub device_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> String {
        self.user_id.clone()
    }

    fn device_id(&self) -> String {
        self.device_id.clone()
    }
}

/// Startup configuration for the library server
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub storage_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub identity: StaticIdentity,
    /// The one browser origin allowed to call the API; none when unset
    pub allowed_origin: Option<String>,
}

impl LibraryConfig {
    /// Build the configuration from `SQUADOV_*` environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_dir = lookup("SQUADOV_VOD_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let bind_addr = lookup("SQUADOV_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid SQUADOV_BIND_ADDR {:?}: {}", bind_addr, e))?;

        let user_id = lookup("SQUADOV_USER_ID")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        let device_id = lookup("SQUADOV_DEVICE_ID")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let allowed_origin = lookup("SQUADOV_ALLOWED_ORIGIN").filter(|v| !v.is_empty());
        if let Some(origin) = &allowed_origin {
            if !(origin.starts_with("http://") || origin.starts_with("https://"))
                || origin.ends_with('/')
            {
                return Err(format!(
                    "Invalid SQUADOV_ALLOWED_ORIGIN {:?}: expected scheme://host[:port]",
                    origin
                ));
            }
        }

        Ok(Self {
            storage_dir,
            bind_addr,
            identity: StaticIdentity::new(user_id, device_id),
            allowed_origin,
        })
    }
}
