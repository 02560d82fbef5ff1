//! Backend-neutral catalog types.
//!
//! Both adapters convert their wire formats into these shapes so routes and
//! the cart never see backend-specific JSON.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souq_core::cart::CartLine;
use souq_core::{CurrencyCode, Email, PaymentMethod};

use super::CatalogError;

/// A product as shown in listings and detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend identifier (numeric id or global id).
    pub id: String,
    /// URL-friendly handle.
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Lowest price across variants.
    pub price: Decimal,
    /// Original price when the product is on sale.
    pub compare_at_price: Option<Decimal>,
    pub available: bool,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
    /// Category or collection slugs the product belongs to.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub available: bool,
    pub options: Vec<SelectedOption>,
}

/// One `name: value` option of a variant (e.g. `Size: M`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

impl Product {
    /// Build a cart line for this product.
    ///
    /// A named variant must exist on the product. Without one the first
    /// variant is used when the backend models every product as variants;
    /// products without variants are added as-is.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown variant and
    /// `CatalogError::Rejected` for an unavailable one.
    pub fn cart_line(
        &self,
        variant_id: Option<&str>,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<CartLine, CatalogError> {
        let variant = match variant_id {
            Some(id) => Some(
                self.variants
                    .iter()
                    .find(|v| v.id == id)
                    .ok_or_else(|| CatalogError::NotFound(format!("variant {id}")))?,
            ),
            None => self.variants.first(),
        };

        if let Some(variant) = variant
            && !variant.available
        {
            return Err(CatalogError::Rejected(format!(
                "{} is out of stock",
                variant.title
            )));
        }

        let size = size.map(str::to_string).or_else(|| {
            variant.and_then(|v| {
                v.options
                    .iter()
                    .find(|o| o.name.eq_ignore_ascii_case("size"))
                    .map(|o| o.value.clone())
            })
        });
        let title = match variant {
            Some(v) if self.variants.len() > 1 => format!("{} - {}", self.title, v.title),
            _ => self.title.clone(),
        };

        Ok(CartLine {
            product_id: self.id.clone(),
            variant_id: variant.map(|v| v.id.clone()),
            size,
            title,
            image_url: self.images.first().map(|i| i.url.clone()),
            unit_price: variant.map_or(self.price, |v| v.price),
            quantity,
        })
    }
}

/// A product category (REST) or collection (headless).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub product_count: Option<u32>,
}

/// Listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// 1-based page number (REST backend).
    #[serde(default = "first_page")]
    pub page: u32,
    /// Opaque cursor from a previous page (headless backend).
    pub after: Option<String>,
}

const fn first_page() -> u32 {
    1
}

impl ProductQuery {
    /// Number of products per page.
    pub const PAGE_SIZE: u32 = 24;

    /// Whether this is an unfiltered query whose result may be cached.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.search.is_none()
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub has_next_page: bool,
    pub next_cursor: Option<String>,
}

/// A postal address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl PostalAddress {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// One line of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: u32,
}

/// Everything a backend needs to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub lines: Vec<OrderLine>,
    pub billing: PostalAddress,
    pub shipping: PostalAddress,
    pub payment_method: PaymentMethod,
    pub email: Email,
    pub currency: CurrencyCode,
}

/// The backend's answer to a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: String,
    /// Human-facing order number; absent until the headless checkout completes.
    pub order_number: Option<String>,
    pub total: Decimal,
    /// Hosted checkout page to finish the order (headless backend).
    pub checkout_url: Option<String>,
}

/// An order as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub number: String,
    pub status: String,
    pub total: Decimal,
    pub currency: String,
    pub created_at: Option<String>,
    pub lines: Vec<RemoteOrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrderLine {
    pub title: String,
    pub quantity: u32,
    pub total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variant(id: &str, size: &str, available: bool) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            title: size.to_string(),
            price: Decimal::new(4500, 2),
            available,
            options: vec![SelectedOption {
                name: "Size".to_string(),
                value: size.to_string(),
            }],
        }
    }

    fn product(variants: Vec<ProductVariant>) -> Product {
        Product {
            id: "p1".to_string(),
            slug: "linen-shirt".to_string(),
            title: "Linen Shirt".to_string(),
            description: String::new(),
            price: Decimal::from(40),
            compare_at_price: None,
            available: true,
            images: vec![ProductImage {
                url: "https://cdn.test/shirt.jpg".to_string(),
                alt: None,
            }],
            variants,
            categories: vec![],
        }
    }

    #[test]
    fn test_cart_line_without_variants_uses_product_price() {
        let line = product(vec![]).cart_line(None, Some("L"), 2).unwrap();
        assert_eq!(line.variant_id, None);
        assert_eq!(line.size.as_deref(), Some("L"));
        assert_eq!(line.unit_price, Decimal::from(40));
        assert_eq!(line.image_url.as_deref(), Some("https://cdn.test/shirt.jpg"));
    }

    #[test]
    fn test_cart_line_picks_named_variant_and_its_size() {
        let p = product(vec![variant("v-s", "S", true), variant("v-m", "M", true)]);
        let line = p.cart_line(Some("v-m"), None, 1).unwrap();
        assert_eq!(line.variant_id.as_deref(), Some("v-m"));
        assert_eq!(line.size.as_deref(), Some("M"));
        assert_eq!(line.title, "Linen Shirt - M");
        assert_eq!(line.unit_price, Decimal::new(4500, 2));
    }

    #[test]
    fn test_cart_line_rejects_unknown_or_unavailable_variant() {
        let p = product(vec![variant("v-s", "S", false)]);
        assert!(matches!(
            p.cart_line(Some("v-x"), None, 1),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            p.cart_line(None, None, 1),
            Err(CatalogError::Rejected(_))
        ));
    }

    #[test]
    fn test_missing_address_fields() {
        let address = PostalAddress {
            first_name: "Mona".to_string(),
            last_name: " ".to_string(),
            address1: "12 Nile St".to_string(),
            address2: None,
            city: String::new(),
            state: None,
            postcode: None,
            country: "EG".to_string(),
            phone: None,
        };
        assert_eq!(address.missing_fields(), vec!["last_name", "city"]);
    }
}
