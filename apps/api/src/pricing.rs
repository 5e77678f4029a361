// snapcart/apps/api/src/pricing.rs

//! Checkout pricing as pure functions over already-loaded records.
//!
//! Order of application: each line gets its single best offer, the coupon is
//! validated and applied to the post-offer subtotal, then shipping is decided on
//! what is left. All amounts are integer paise and every division rounds down.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::{CartItem, Coupon, DiscountType, Offer, ProductWithVariants};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PricingConfig {
  pub currency: String,
  pub shipping_fee_paise: i64,
  pub free_shipping_threshold_paise: i64,
}

impl From<&AppConfig> for PricingConfig {
  fn from(config: &AppConfig) -> Self {
    Self {
      currency: config.currency.clone(),
      shipping_fee_paise: config.shipping_fee_paise,
      free_shipping_threshold_paise: config.free_shipping_threshold_paise,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
  pub cart_item_id: Option<Uuid>,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub seller_id: Uuid,
  pub category_id: Uuid,
  pub name: String,
  pub image_url: Option<String>,
  pub unit_price_paise: i64,
  pub quantity: i32,
  pub subtotal_paise: i64,
  pub offer_id: Option<Uuid>,
  pub offer_discount_paise: i64,
  pub line_total_paise: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
  pub lines: Vec<PricedLine>,
  pub item_count: i64,
  pub subtotal_paise: i64,
  pub offer_discount_paise: i64,
  pub coupon_code: Option<String>,
  pub coupon_discount_paise: i64,
  pub shipping_paise: i64,
  pub total_paise: i64,
  pub currency: String,
  /// Cart lines that could not be priced. Only the cart view fills this.
  pub unavailable: Vec<UnavailableLine>,
}

impl Quote {
  /// The quote of an empty cart.
  pub fn empty(config: &PricingConfig) -> Self {
    Self {
      lines: Vec::new(),
      item_count: 0,
      subtotal_paise: 0,
      offer_discount_paise: 0,
      coupon_code: None,
      coupon_discount_paise: 0,
      shipping_paise: 0,
      total_paise: 0,
      currency: config.currency.clone(),
      unavailable: Vec::new(),
    }
  }
}

/// A cart line left out of the totals, with the reason it cannot be bought.
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableLine {
  pub cart_item_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub quantity: i32,
  pub reason: String,
}

/// Renders paise as rupees without digit grouping: `₹1234.50`.
pub fn display_amount(paise: i64) -> String {
  let sign = if paise < 0 { "-" } else { "" };
  let abs = paise.unsigned_abs();
  format!("{}₹{}.{:02}", sign, abs / 100, abs % 100)
}

/// Turns cart lines into priced lines using the loaded catalog entries.
///
/// Price and stock come from the variant when the line names one. Fails on
/// missing or inactive products, unknown variants, non-positive quantities and
/// quantities above stock.
pub fn resolve_lines(items: &[CartItem], catalog: &HashMap<Uuid, ProductWithVariants>) -> Result<Vec<PricedLine>> {
  items
    .iter()
    .map(|item| {
      let entry = catalog
        .get(&item.product_id)
        .filter(|p| p.product.is_active)
        .ok_or_else(|| AppError::Validation(format!("Product {} is no longer available", item.product_id)))?;
      resolve_line(Some(item.id), entry, item.variant_id, item.quantity)
    })
    .collect()
}

/// Like [`resolve_lines`], but a line that fails to resolve is set aside with
/// its reason instead of failing the whole cart.
pub fn partition_lines(
  items: &[CartItem],
  catalog: &HashMap<Uuid, ProductWithVariants>,
) -> (Vec<PricedLine>, Vec<UnavailableLine>) {
  let mut priced = Vec::with_capacity(items.len());
  let mut unavailable = Vec::new();
  for item in items {
    let resolved = catalog
      .get(&item.product_id)
      .filter(|p| p.product.is_active)
      .ok_or_else(|| AppError::Validation(format!("Product {} is no longer available", item.product_id)))
      .and_then(|entry| resolve_line(Some(item.id), entry, item.variant_id, item.quantity));
    match resolved {
      Ok(line) => priced.push(line),
      Err(err) => unavailable.push(UnavailableLine {
        cart_item_id: item.id,
        product_id: item.product_id,
        variant_id: item.variant_id,
        quantity: item.quantity,
        reason: match err {
          AppError::Validation(reason) => reason,
          other => other.to_string(),
        },
      }),
    }
  }
  (priced, unavailable)
}

/// Prices a single product/variant at `quantity`.
pub fn resolve_line(
  cart_item_id: Option<Uuid>,
  entry: &ProductWithVariants,
  variant_id: Option<Uuid>,
  quantity: i32,
) -> Result<PricedLine> {
  let product = &entry.product;
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be at least 1".to_string()));
  }
  let (name, unit_price_paise, stock) = match variant_id {
    Some(vid) => {
      let variant = entry
        .variant(vid)
        .ok_or_else(|| AppError::Validation(format!("Variant {} does not belong to '{}'", vid, product.name)))?;
      (format!("{} ({})", product.name, variant.label), variant.price_paise, variant.stock)
    }
    None => (product.name.clone(), product.price_paise, product.stock),
  };
  if quantity > stock {
    return Err(AppError::Validation(format!(
      "Only {} left in stock for '{}'",
      stock.max(0),
      name
    )));
  }
  let subtotal_paise = unit_price_paise * i64::from(quantity);
  Ok(PricedLine {
    cart_item_id,
    product_id: product.id,
    variant_id,
    seller_id: product.seller_id,
    category_id: product.category_id,
    name,
    image_url: product.image_url.clone(),
    unit_price_paise,
    quantity,
    subtotal_paise,
    offer_id: None,
    offer_discount_paise: 0,
    line_total_paise: subtotal_paise,
  })
}

fn discount_amount(
  discount_type: DiscountType,
  value: i64,
  cap: Option<i64>,
  base_paise: i64,
  units: i64,
) -> i64 {
  let raw = match discount_type {
    DiscountType::Percentage => base_paise * value.clamp(0, 100) / 100,
    DiscountType::Flat => value.max(0) * units,
  };
  let capped = match cap {
    Some(cap) => raw.min(cap.max(0)),
    None => raw,
  };
  capped.clamp(0, base_paise.max(0))
}

/// The live offer giving `line` the largest discount, with that discount.
/// On equal discounts the earliest-created offer wins, whatever the order of
/// `offers`. Offers never stack on one line.
pub fn best_offer_for_line(line: &PricedLine, offers: &[Offer], now: DateTime<Utc>) -> Option<(Uuid, i64)> {
  offers
    .iter()
    .filter(|o| o.is_live(now) && o.targets(line.product_id, line.category_id))
    .map(|o| {
      let amount = discount_amount(
        o.discount_type,
        o.value,
        o.max_discount_paise,
        line.subtotal_paise,
        i64::from(line.quantity),
      );
      (o, amount)
    })
    .filter(|(_, amount)| *amount > 0)
    .fold(None, |best: Option<(&Offer, i64)>, (offer, amount)| match best {
      Some((held, held_amount))
        if held_amount > amount || (held_amount == amount && held.created_at <= offer.created_at) =>
      {
        Some((held, held_amount))
      }
      _ => Some((offer, amount)),
    })
    .map(|(offer, amount)| (offer.id, amount))
}

/// Applies [`best_offer_for_line`] to every line in place.
pub fn apply_offers(lines: &mut [PricedLine], offers: &[Offer], now: DateTime<Utc>) {
  for line in lines.iter_mut() {
    let (offer_id, discount) = match best_offer_for_line(line, offers, now) {
      Some((id, amount)) => (Some(id), amount),
      None => (None, 0),
    };
    line.offer_id = offer_id;
    line.offer_discount_paise = discount;
    line.line_total_paise = line.subtotal_paise - discount;
  }
}

/// Checks, in order: exists, active, inside its window, minimum order against
/// `post_offer_subtotal`, global usage limit, and the caller's own usage.
pub fn validate_coupon<'a>(
  coupon: Option<&'a Coupon>,
  code: &str,
  now: DateTime<Utc>,
  post_offer_subtotal: i64,
  user_usage_count: i64,
) -> Result<&'a Coupon> {
  let coupon = coupon.ok_or_else(|| AppError::NotFound(format!("Coupon '{}' not found", code.trim())))?;
  if !coupon.is_active {
    return Err(AppError::Validation(format!("Coupon '{}' is not active", coupon.code)));
  }
  if coupon.starts_at.is_some_and(|starts| now < starts) {
    return Err(AppError::Validation(format!("Coupon '{}' is not valid yet", coupon.code)));
  }
  if coupon.ends_at.is_some_and(|ends| now > ends) {
    return Err(AppError::Validation(format!("Coupon '{}' has expired", coupon.code)));
  }
  if post_offer_subtotal < coupon.min_order_paise {
    return Err(AppError::Validation(format!(
      "Coupon '{}' needs a minimum order of {}",
      coupon.code,
      display_amount(coupon.min_order_paise)
    )));
  }
  if coupon.usage_limit.is_some_and(|limit| coupon.used_count >= limit) {
    return Err(AppError::Validation(format!("Coupon '{}' has reached its usage limit", coupon.code)));
  }
  if coupon
    .per_user_limit
    .is_some_and(|limit| user_usage_count >= i64::from(limit))
  {
    return Err(AppError::Validation(format!("You have already used coupon '{}'", coupon.code)));
  }
  Ok(coupon)
}

/// Discount of an already validated coupon on `post_offer_subtotal`.
pub fn coupon_discount(coupon: &Coupon, post_offer_subtotal: i64) -> i64 {
  discount_amount(
    coupon.discount_type,
    coupon.value,
    coupon.max_discount_paise,
    post_offer_subtotal,
    1,
  )
}

/// Totals for offer-adjusted `lines` and an optional validated coupon.
pub fn quote(lines: Vec<PricedLine>, coupon: Option<&Coupon>, config: &PricingConfig) -> Result<Quote> {
  if lines.is_empty() {
    return Err(AppError::Validation("Cart is empty".to_string()));
  }
  let subtotal_paise: i64 = lines.iter().map(|l| l.subtotal_paise).sum();
  let offer_discount_paise: i64 = lines.iter().map(|l| l.offer_discount_paise).sum();
  let item_count: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
  let post_offer = subtotal_paise - offer_discount_paise;

  let coupon_discount_paise = coupon.map_or(0, |c| coupon_discount(c, post_offer));
  let discounted = post_offer - coupon_discount_paise;
  let shipping_paise = if discounted >= config.free_shipping_threshold_paise {
    0
  } else {
    config.shipping_fee_paise.max(0)
  };

  Ok(Quote {
    lines,
    item_count,
    subtotal_paise,
    offer_discount_paise,
    coupon_code: coupon.map(|c| c.code.clone()),
    coupon_discount_paise,
    shipping_paise,
    total_paise: discounted + shipping_paise,
    currency: config.currency.clone(),
    unavailable: Vec::new(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Product, ProductVariant};
  use chrono::Duration;

  fn product(price: i64, stock: i32) -> ProductWithVariants {
    let now = Utc::now();
    ProductWithVariants {
      product: Product {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        category_id: Uuid::new_v4(),
        name: "Kettle".to_string(),
        description: None,
        price_paise: price,
        stock,
        image_url: None,
        is_active: true,
        created_at: now,
        updated_at: now,
      },
      variants: vec![],
    }
  }

  fn cart_item(p: &ProductWithVariants, variant_id: Option<Uuid>, quantity: i32) -> CartItem {
    let now = Utc::now();
    CartItem {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      product_id: p.product.id,
      variant_id,
      quantity,
      created_at: now,
      updated_at: now,
    }
  }

  fn catalog(entries: &[&ProductWithVariants]) -> HashMap<Uuid, ProductWithVariants> {
    entries.iter().map(|p| (p.product.id, (*p).clone())).collect()
  }

  fn offer(discount_type: DiscountType, value: i64, product_id: Option<Uuid>, category_id: Option<Uuid>) -> Offer {
    let now = Utc::now();
    Offer {
      id: Uuid::new_v4(),
      title: "Sale".to_string(),
      discount_type,
      value,
      max_discount_paise: None,
      product_id,
      category_id,
      starts_at: now - Duration::days(1),
      ends_at: now + Duration::days(1),
      is_active: true,
      created_at: now,
    }
  }

  fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
    Coupon {
      id: Uuid::new_v4(),
      code: "SAVE10".to_string(),
      description: None,
      discount_type,
      value,
      max_discount_paise: None,
      min_order_paise: 0,
      usage_limit: None,
      per_user_limit: None,
      used_count: 0,
      starts_at: None,
      ends_at: None,
      is_active: true,
      created_at: Utc::now(),
    }
  }

  fn config() -> PricingConfig {
    PricingConfig {
      currency: "INR".to_string(),
      shipping_fee_paise: 4_900,
      free_shipping_threshold_paise: 49_900,
    }
  }

  #[test]
  fn variant_price_and_stock_take_precedence() {
    let mut p = product(10_000, 1);
    let variant = ProductVariant {
      id: Uuid::new_v4(),
      product_id: p.product.id,
      sku: "KET-1L".to_string(),
      label: "1 L".to_string(),
      price_paise: 12_500,
      stock: 5,
    };
    p.variants.push(variant.clone());

    let lines = resolve_lines(&[cart_item(&p, Some(variant.id), 3)], &catalog(&[&p])).unwrap();
    assert_eq!(lines[0].unit_price_paise, 12_500);
    assert_eq!(lines[0].subtotal_paise, 37_500);
    assert_eq!(lines[0].name, "Kettle (1 L)");
  }

  #[test]
  fn resolve_rejects_bad_lines() {
    let p = product(10_000, 2);
    let cat = catalog(&[&p]);
    assert!(matches!(
      resolve_lines(&[cart_item(&p, None, 3)], &cat),
      Err(AppError::Validation(m)) if m.contains("Only 2 left")
    ));
    assert!(resolve_lines(&[cart_item(&p, Some(Uuid::new_v4()), 1)], &cat).is_err());
    assert!(resolve_lines(&[cart_item(&p, None, 0)], &cat).is_err());

    let mut inactive = p.clone();
    inactive.product.is_active = false;
    assert!(resolve_lines(&[cart_item(&p, None, 1)], &catalog(&[&inactive])).is_err());
  }

  #[test]
  fn best_offer_picks_largest_single_discount() {
    let p = product(20_000, 10);
    let line = resolve_line(None, &p, None, 2).unwrap();
    let offers = vec![
      offer(DiscountType::Percentage, 10, None, None),
      offer(DiscountType::Flat, 3_000, Some(p.product.id), None),
      offer(DiscountType::Percentage, 50, None, Some(Uuid::new_v4())),
    ];
    let (id, amount) = best_offer_for_line(&line, &offers, Utc::now()).unwrap();
    assert_eq!(id, offers[1].id);
    assert_eq!(amount, 6_000);
  }

  #[test]
  fn equal_offers_go_to_the_earliest_created() {
    let p = product(10_000, 10);
    let line = resolve_line(None, &p, None, 1).unwrap();
    let mut older = offer(DiscountType::Percentage, 10, None, None);
    older.created_at = Utc::now() - Duration::hours(2);
    let newer = offer(DiscountType::Percentage, 10, None, None);

    // Repositories list offers newest first.
    let newest_first = vec![newer.clone(), older.clone()];
    assert_eq!(best_offer_for_line(&line, &newest_first, Utc::now()), Some((older.id, 1_000)));
    let oldest_first = vec![older.clone(), newer];
    assert_eq!(best_offer_for_line(&line, &oldest_first, Utc::now()), Some((older.id, 1_000)));
  }

  #[test]
  fn partition_sets_aside_unbuyable_lines() {
    let kept = product(10_000, 5);
    let short = product(2_000, 1);
    let mut gone = product(3_000, 5);
    gone.product.is_active = false;
    let items = [cart_item(&kept, None, 2), cart_item(&short, None, 3), cart_item(&gone, None, 1)];

    let (priced, unavailable) = partition_lines(&items, &catalog(&[&kept, &short, &gone]));
    assert_eq!(priced.len(), 1);
    assert_eq!(priced[0].product_id, kept.product.id);
    assert_eq!(unavailable.len(), 2);
    assert_eq!(unavailable[0].cart_item_id, items[1].id);
    assert!(unavailable[0].reason.contains("Only 1 left"));
    assert!(unavailable[1].reason.contains("no longer available"));
  }

  #[test]
  fn offers_respect_window_cap_and_subtotal() {
    let p = product(1_000, 10);
    let line = resolve_line(None, &p, None, 1).unwrap();
    let now = Utc::now();

    let mut expired = offer(DiscountType::Percentage, 90, None, None);
    expired.ends_at = now - Duration::hours(1);
    assert!(best_offer_for_line(&line, &[expired], now).is_none());

    let mut capped = offer(DiscountType::Percentage, 50, None, None);
    capped.max_discount_paise = Some(200);
    assert_eq!(best_offer_for_line(&line, &[capped], now).map(|b| b.1), Some(200));

    let huge_flat = offer(DiscountType::Flat, 5_000, None, None);
    assert_eq!(best_offer_for_line(&line, &[huge_flat], now).map(|b| b.1), Some(1_000));
  }

  #[test]
  fn coupon_validation_order() {
    let now = Utc::now();
    assert!(matches!(validate_coupon(None, "nope", now, 10_000, 0), Err(AppError::NotFound(_))));

    let mut c = coupon(DiscountType::Percentage, 10);
    c.is_active = false;
    c.min_order_paise = 1_000_000;
    assert!(matches!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 0), Err(AppError::Validation(m)) if m.contains("not active")));

    c.is_active = true;
    c.ends_at = Some(now - Duration::minutes(1));
    assert!(matches!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 0), Err(AppError::Validation(m)) if m.contains("expired")));

    c.ends_at = None;
    assert!(matches!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 0), Err(AppError::Validation(m)) if m.contains("minimum order")));

    c.min_order_paise = 0;
    c.usage_limit = Some(3);
    c.used_count = 3;
    assert!(matches!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 0), Err(AppError::Validation(m)) if m.contains("usage limit")));

    c.used_count = 0;
    c.per_user_limit = Some(1);
    assert!(matches!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 1), Err(AppError::Validation(m)) if m.contains("already used")));
    assert!(validate_coupon(Some(&c), "SAVE10", now, 10_000, 0).is_ok());
  }

  #[test]
  fn coupon_discount_is_capped() {
    let mut c = coupon(DiscountType::Percentage, 20);
    assert_eq!(coupon_discount(&c, 10_000), 2_000);
    c.max_discount_paise = Some(500);
    assert_eq!(coupon_discount(&c, 10_000), 500);

    let flat = coupon(DiscountType::Flat, 50_000);
    assert_eq!(coupon_discount(&flat, 10_000), 10_000);
  }

  #[test]
  fn total_is_subtotals_minus_discounts_plus_shipping() {
    let a = product(30_000, 10);
    let b = product(15_050, 10);
    let mut lines = resolve_lines(&[cart_item(&a, None, 2), cart_item(&b, None, 1)], &catalog(&[&a, &b])).unwrap();
    apply_offers(&mut lines, &[offer(DiscountType::Percentage, 10, Some(a.product.id), None)], Utc::now());
    let c = coupon(DiscountType::Flat, 1_000);

    let q = quote(lines, Some(&c), &config()).unwrap();
    let line_sum: i64 = q.lines.iter().map(|l| l.subtotal_paise).sum();
    assert_eq!(q.subtotal_paise, line_sum);
    assert_eq!(q.offer_discount_paise, 6_000);
    assert_eq!(q.coupon_discount_paise, 1_000);
    assert_eq!(q.shipping_paise, 0);
    assert_eq!(
      q.total_paise,
      line_sum - q.offer_discount_paise - q.coupon_discount_paise + q.shipping_paise
    );
    assert_eq!(q.total_paise, 68_050);
    assert_eq!(q.item_count, 3);
  }

  #[test]
  fn shipping_charged_below_threshold_and_empty_cart_rejected() {
    let p = product(10_000, 5);
    let lines = vec![resolve_line(None, &p, None, 1).unwrap()];
    let q = quote(lines, None, &config()).unwrap();
    assert_eq!(q.shipping_paise, 4_900);
    assert_eq!(q.total_paise, 14_900);

    assert!(matches!(quote(vec![], None, &config()), Err(AppError::Validation(m)) if m == "Cart is empty"));
  }

  #[test]
  fn amounts_render_in_rupees() {
    assert_eq!(display_amount(49_900), "₹499.00");
    assert_eq!(display_amount(5), "₹0.05");
  }
}
