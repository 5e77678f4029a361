// snapcart/apps/api/src/web/extractors.rs

//! Request identity. The access token comes from `Authorization: Bearer` or the
//! `access_token` cookie; the user is reloaded so deactivation takes effect
//! immediately.

use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::token_service::TokenKind;
use crate::state::AppState;
use crate::web::cookies::ACCESS_COOKIE;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::ops::Deref;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
}

impl AuthenticatedUser {
  pub fn id(&self) -> uuid::Uuid {
    self.user.id
  }

  pub fn role(&self) -> Role {
    self.user.role
  }
}

fn access_token(req: &HttpRequest) -> Option<String> {
  let bearer = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty());
  bearer.or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = access_token(req);

    Box::pin(async move {
      let app_state =
        app_state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let token = token.ok_or_else(|| AppError::Auth("Authentication required.".to_string()))?;

      let claims = app_state.tokens.verify(&token, TokenKind::Access)?;
      let user = app_state
        .repos
        .users
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;
      if !user.is_active {
        warn!(user_id = %user.id, "Request from a deactivated account.");
        return Err(AppError::Forbidden("This account has been deactivated.".to_string()));
      }
      Ok(AuthenticatedUser { user })
    })
  }
}

/// Declares an extractor that only admits callers with one of the listed roles.
macro_rules! role_guard {
  ($(#[$meta:meta])* $name:ident, [$($role:path),+], $denied:literal) => {
    $(#[$meta])*
    #[derive(Debug, Clone)]
    pub struct $name(pub AuthenticatedUser);

    impl Deref for $name {
      type Target = AuthenticatedUser;

      fn deref(&self) -> &AuthenticatedUser {
        &self.0
      }
    }

    impl FromRequest for $name {
      type Error = AppError;
      type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

      fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let authenticated = AuthenticatedUser::from_request(req, payload);
        Box::pin(async move {
          let auth = authenticated.await?;
          if matches!(auth.role(), $($role)|+) {
            Ok($name(auth))
          } else {
            warn!(user_id = %auth.id(), role = %auth.role(), "Role guard rejected request.");
            Err(AppError::Forbidden($denied.to_string()))
          }
        })
      }
    }
  };
}

role_guard!(
  /// Only customers own carts and place orders.
  CustomerUser,
  [Role::Customer],
  "Only customers can do this."
);
role_guard!(SellerUser, [Role::Seller], "Seller account required.");
role_guard!(AdminUser, [Role::Admin], "Admin access required.");
role_guard!(
  /// Product management is open to sellers and admins.
  CatalogManager,
  [Role::Seller, Role::Admin],
  "Seller or admin access required."
);
