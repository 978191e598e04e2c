//! Persistence seams for principals and devices

use async_trait::async_trait;

use crate::types::{Device, NewDevice, NewPrincipal, Principal};
use crate::Result;

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Principal storage trait
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Fails with `EmailAlreadyRegistered` when the email is taken.
    async fn create_principal(&self, principal: NewPrincipal) -> Result<Principal>;
    async fn find_principal(&self, id: i64) -> Result<Option<Principal>>;
    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>>;
    async fn count_devices(&self, owner_id: i64) -> Result<i64>;
}

/// Device storage trait. Every lookup is filtered by owner.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fails with `DeviceIdTaken` when `device_id` exists for any owner.
    async fn create_device(&self, device: NewDevice) -> Result<Device>;
    async fn find_owned_device(&self, id: i64, owner_id: i64) -> Result<Option<Device>>;
    async fn find_owned_device_by_device_id(&self, device_id: &str, owner_id: i64) -> Result<Option<Device>>;
    async fn list_owned_devices(&self, owner_id: i64) -> Result<Vec<Device>>;
    /// Returns whether a row was removed.
    async fn delete_owned_device(&self, id: i64, owner_id: i64) -> Result<bool>;
}
