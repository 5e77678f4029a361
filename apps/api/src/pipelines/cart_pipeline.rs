// snapcart/apps/api/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::pricing;
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound for a single cart line.
pub const MAX_LINE_QUANTITY: i32 = 99;

pub fn register_add_to_cart_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("load_product", false, None),
    ("merge_with_existing_line", false, None),
    ("persist_cart_line", false, None),
  ]);

  p.on_root("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let quantity = ctx_data.read().quantity;
      if quantity <= 0 {
        warn!(quantity, "Add to cart with a non-positive quantity.");
        return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_product", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (product_id, variant_id, catalog) = {
        let guard = ctx_data.read();
        (guard.product_id, guard.variant_id, guard.app_state.repos.catalog.clone())
      };

      let product = catalog
        .find_product(product_id)
        .await?
        .filter(|p| p.product.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))?;

      if product.variants.is_empty() && variant_id.is_some() {
        return Err(AppError::Validation("This product has no variants.".to_string()));
      }
      if !product.variants.is_empty() && variant_id.is_none() {
        return Err(AppError::Validation("Choose a variant of this product.".to_string()));
      }

      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Quantity accumulates on the existing line, and stock is checked against the total.
  p.on_root("merge_with_existing_line", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (user_id, product_id, variant_id, quantity, carts) = {
        let guard = ctx_data.read();
        (
          guard.user_id,
          guard.product_id,
          guard.variant_id,
          guard.quantity,
          guard.app_state.repos.carts.clone(),
        )
      };

      let existing = carts
        .find_cart_line(user_id, product_id, variant_id)
        .await?
        .map_or(0, |line| line.quantity);
      let merged = existing.saturating_add(quantity);
      if merged > MAX_LINE_QUANTITY {
        return Err(AppError::Validation(format!(
          "At most {} of an item can be in the cart.",
          MAX_LINE_QUANTITY
        )));
      }

      {
        let guard = ctx_data.read();
        let product = guard
          .product
          .as_ref()
          .ok_or_else(|| AppError::Internal("Product missing before stock check.".to_string()))?;
        pricing::resolve_line(None, product, variant_id, merged)?;
      }

      ctx_data.write().merged_quantity = merged;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_cart_line", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (user_id, product_id, variant_id, merged, carts) = {
        let guard = ctx_data.read();
        (
          guard.user_id,
          guard.product_id,
          guard.variant_id,
          guard.merged_quantity,
          guard.app_state.repos.carts.clone(),
        )
      };

      let item = carts.upsert_cart_line(user_id, product_id, variant_id, merged).await?;
      info!(item_id = %item.id, quantity = item.quantity, "Cart line saved.");
      ctx_data.write().cart_item = Some(item);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Add-to-cart pipeline registered.");
}
