// snapcart/apps/api/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Seller,
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::Customer => "customer",
      Role::Seller => "seller",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Customers, sellers and admins share one table. Password accounts have an
/// email; OTP accounts have a phone. `store_name` is the seller profile.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub role: Role,
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: Option<String>,
  pub store_name: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub role: Role,
  pub name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub password_hash: Option<String>,
  pub store_name: Option<String>,
}

impl NewUser {
  pub fn into_user(self) -> User {
    let now = Utc::now();
    User {
      id: Uuid::new_v4(),
      role: self.role,
      name: self.name,
      email: self.email,
      phone: self.phone,
      password_hash: self.password_hash,
      store_name: self.store_name,
      is_active: true,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub name: Option<String>,
  pub phone: Option<String>,
  pub store_name: Option<String>,
}
