//! Core types for users-core

use chrono::{DateTime, Utc};
use iotp_auth_core::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }
}

/// Physical endpoint owned by exactly one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_id: String,
    #[serde(rename = "user_id")]
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// `device_` followed by 12 hex characters.
    pub fn generate_device_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("device_{}", &hex[..12])
    }
}

/// Row to insert into the principal store.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Row to insert into the device store.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_id: String,
    pub name: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `name` is checked after trimming by `validation::validate_device_name`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamTokenRequest {
    /// Omitted only when the legacy broad grant is enabled.
    #[serde(default)]
    pub device_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_device_id_shape() {
        let id = Device::generate_device_id();
        assert!(id.starts_with("device_"));
        assert_eq!(id.len(), "device_".len() + 12);
        assert!(id["device_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, Device::generate_device_id());
    }

    #[test]
    fn test_principal_hides_hash() {
        let principal = Principal {
            id: 1,
            email: "user@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&principal).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(principal.role(), Role::Admin);
    }
}
