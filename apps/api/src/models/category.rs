// snapcart/apps/api/src/models/category.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub description: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Lower-case, ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_dash = false;
  for ch in name.trim().chars() {
    if ch.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(ch.to_ascii_lowercase());
    } else {
      pending_dash = true;
    }
  }
  slug
}

#[cfg(test)]
mod tests {
  use super::slugify;

  #[test]
  fn slug_collapses_separators() {
    assert_eq!(slugify("  Home & Kitchen "), "home-kitchen");
    assert_eq!(slugify("Men's T-Shirts"), "men-s-t-shirts");
    assert_eq!(slugify("***"), "");
  }
}
