//! # User Types
//!
//! Customer and admin accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ShopError, ShopResult};
use crate::validate;

/// Account role
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Account status; `Inactive` marks a soft-deleted customer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    pub name: String,

    /// Stored lowercased; unique across users
    pub email: String,

    /// Argon2 PHC string, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub status: UserStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Gateway-side customer id used to list saved cards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with generated ID
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: validate::normalize_email(&email.into()),
            password_hash: password_hash.into(),
            role,
            status: UserStatus::Active,
            address: None,
            phone_number: None,
            stripe_customer_id: None,
            deactivated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Mark the account inactive, keeping it for order history
    pub fn deactivate(&mut self) {
        let now = Utc::now();
        self.status = UserStatus::Inactive;
        self.deactivated_at = Some(now);
        self.updated_at = now;
    }

    pub fn promote(&mut self) {
        self.role = Role::Admin;
        self.updated_at = Utc::now();
    }

    /// Apply a profile update. Email uniqueness is checked by the caller,
    /// which has access to the store.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = validate::normalize_email(&email);
        }
        if let Some(address) = update.address {
            self.address = Some(address);
        }
        if let Some(phone) = update.phone_number {
            self.phone_number = Some(phone);
        }
        self.updated_at = Utc::now();
    }
}

/// Fields a customer (or an admin on their behalf) may change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone_number: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> ShopResult<()> {
        if let Some(name) = &self.name {
            validate::require_non_empty("name", name)?;
        }
        if let Some(email) = &self.email {
            validate::email(email)?;
        }
        Ok(())
    }
}

/// Admin-or-owner rule shared by every customer-scoped handler
pub fn ensure_owner_or_admin(caller: &User, owner_id: &str) -> ShopResult<()> {
    if caller.is_admin() || caller.id == owner_id {
        Ok(())
    } else {
        Err(ShopError::AccessDenied)
    }
}

/// Admin-only rule
pub fn ensure_admin(caller: &User) -> ShopResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ShopError::AccessDenied)
    }
}
