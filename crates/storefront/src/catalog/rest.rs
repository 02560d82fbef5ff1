//! REST catalog/order API client.
//!
//! Speaks the `wc/v3` JSON dialect: numeric ids, prices as strings, paging
//! via `page`/`per_page` with the page count in `X-WP-TotalPages`. Every
//! request carries the consumer key/secret as basic auth.

use std::str::FromStr;
use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use souq_core::PaymentMethod;
use souq_core::cart::{CartLine, LineItem};
use tracing::{debug, instrument};

use super::cache::{self, CacheKey, CacheValue};
use super::types::{
    Category, OrderRequest, PlacedOrder, PostalAddress, Product, ProductImage, ProductPage,
    ProductQuery, RemoteOrder, RemoteOrderLine,
};
use super::{CatalogAdapter, CatalogError, OrderSink, snippet};
use crate::config::RestCatalogConfig;

// =============================================================================
// RestCatalog
// =============================================================================

/// Client for the REST catalog/order API.
#[derive(Clone)]
pub struct RestCatalog {
    inner: Arc<RestCatalogInner>,
}

struct RestCatalogInner {
    client: reqwest::Client,
    base_url: String,
    cart_url: Option<String>,
    consumer_key: String,
    consumer_secret: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl RestCatalog {
    /// Create a new REST catalog client.
    #[must_use]
    pub fn new(config: &RestCatalogConfig) -> Self {
        Self {
            inner: Arc::new(RestCatalogInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cart_url: config.cart_url.clone(),
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                cache: cache::build(),
            }),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            )
            .header("Accept", "application/json")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode the JSON body, returning the headers too.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(T, HeaderMap), CatalogError> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = headers
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(what.to_string()));
        }

        let body = response.text().await?;
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(CatalogError::Rejected(rejection_message(&body)));
        }
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(&body, 500),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: snippet(&body, 200),
            });
        }

        let value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %snippet(&body, 500), "Failed to parse catalog response");
            CatalogError::Parse(e)
        })?;
        Ok((value, headers))
    }

    async fn fetch_products(
        &self,
        params: &[(&str, String)],
    ) -> Result<(Vec<Product>, HeaderMap), CatalogError> {
        let request = self
            .request(reqwest::Method::GET, &self.url("/products"))
            .query(params);
        let (wire, headers): (Vec<WireProduct>, _) = self.send(request, "products").await?;
        Ok((wire.into_iter().map(WireProduct::into_product).collect(), headers))
    }

    async fn fetch_product(&self, id: &str) -> Result<(Product, Vec<u64>), CatalogError> {
        let request = self.request(reqwest::Method::GET, &self.url(&format!("/products/{id}")));
        let (wire, _): (WireProduct, _) = self.send(request, &format!("product {id}")).await?;
        let related = wire.related_ids.clone();
        Ok((wire.into_product(), related))
    }

    // =========================================================================
    // Remote cart sub-API
    // =========================================================================

    fn cart_url(&self, path: &str) -> Result<String, CatalogError> {
        self.inner
            .cart_url
            .as_deref()
            .map(|base| format!("{base}{path}"))
            .ok_or(CatalogError::Unsupported("remote cart"))
    }

    /// Mirror a cart addition to the backend's cart sub-API.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Unsupported` when no cart URL is configured.
    #[instrument(skip(self, line), fields(product_id = %line.product_id))]
    pub async fn add_remote_cart_item(
        &self,
        cart_key: &str,
        line: &CartLine,
    ) -> Result<(), CatalogError> {
        let url = self.cart_url("/cart/add-item")?;
        let mut body = json!({
            "id": line.product_id,
            "quantity": line.quantity().to_string(),
        });
        if let Some(variant_id) = &line.variant_id {
            body["variation_id"] = json!(variant_id);
        }
        if let Some(size) = &line.size {
            body["item_data"] = json!({ "size": size });
        }

        let request = self
            .request(reqwest::Method::POST, &url)
            .query(&[("cart_key", cart_key)])
            .json(&body);
        let _: (serde_json::Value, _) = self.send(request, "cart").await?;
        Ok(())
    }

    /// The backend's copy of a cart, as returned by its cart sub-API.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Unsupported` when no cart URL is configured.
    #[instrument(skip(self))]
    pub async fn remote_cart(&self, cart_key: &str) -> Result<serde_json::Value, CatalogError> {
        let url = self.cart_url("/cart")?;
        let request = self
            .request(reqwest::Method::GET, &url)
            .query(&[("cart_key", cart_key)]);
        let (cart, _) = self.send(request, "cart").await?;
        Ok(cart)
    }
}

impl CatalogAdapter for RestCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let key = CacheKey::products(query);
        if query.is_cacheable()
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page = query.page.max(1);
        let mut params = vec![
            ("page", page.to_string()),
            ("per_page", ProductQuery::PAGE_SIZE.to_string()),
            ("status", "publish".to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let (products, headers) = self.fetch_products(&params).await?;
        let total_pages = headers
            .get("X-WP-TotalPages")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(page);
        let result = ProductPage {
            products,
            page,
            has_next_page: page < total_pages,
            next_cursor: None,
        };

        if query.is_cacheable() {
            self.inner
                .cache
                .insert(key, CacheValue::Products(result.clone()))
                .await;
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let (product, _) = self.fetch_product(id).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        let key = CacheKey::ProductBySlug(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let (products, _) = self.fetch_products(&[("slug", slug.to_string())]).await?;
        let product = products
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound(format!("product {slug}")))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn related_products(&self, id: &str) -> Result<Vec<Product>, CatalogError> {
        let key = CacheKey::Related(id.to_string());
        if let Some(CacheValue::Related(products)) = self.inner.cache.get(&key).await {
            return Ok(products);
        }

        let (_, related_ids) = self.fetch_product(id).await?;
        let products = if related_ids.is_empty() {
            Vec::new()
        } else {
            let include = related_ids
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.fetch_products(&[("include", include)]).await?.0
        };

        self.inner
            .cache
            .insert(key, CacheValue::Related(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let request = self
            .request(reqwest::Method::GET, &self.url("/products/categories"))
            .query(&[("per_page", "100"), ("hide_empty", "true")]);
        let (wire, _): (Vec<WireCategory>, _) = self.send(request, "categories").await?;
        let categories: Vec<Category> = wire.into_iter().map(Category::from).collect();

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: &str) -> Result<RemoteOrder, CatalogError> {
        let request = self.request(reqwest::Method::GET, &self.url(&format!("/orders/{id}")));
        let (wire, _): (WireOrder, _) = self.send(request, &format!("order {id}")).await?;
        Ok(wire.into())
    }

    #[instrument(skip(self))]
    async fn customer_orders(&self, customer: &str) -> Result<Vec<RemoteOrder>, CatalogError> {
        let request = self
            .request(reqwest::Method::GET, &self.url("/orders"))
            .query(&[("customer", customer)]);
        let (wire, _): (Vec<WireOrder>, _) = self.send(request, "orders").await?;
        Ok(wire.into_iter().map(RemoteOrder::from).collect())
    }
}

impl OrderSink for RestCatalog {
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, CatalogError> {
        let body = order_body(request)?;
        let http = self
            .request(reqwest::Method::POST, &self.url("/orders"))
            .json(&body);
        let (wire, _): (WireOrder, _) = self.send(http, "order").await?;

        tracing::info!(order_id = wire.id, number = %wire.number, "Order created");
        Ok(PlacedOrder {
            order_id: wire.id.to_string(),
            order_number: Some(wire.number),
            total: decimal(&wire.total),
            checkout_url: None,
        })
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireProduct {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    short_description: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    regular_price: String,
    #[serde(default)]
    on_sale: bool,
    #[serde(default)]
    stock_status: Option<String>,
    #[serde(default)]
    images: Vec<WireImage>,
    #[serde(default)]
    categories: Vec<WireCategoryRef>,
    #[serde(default)]
    related_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    src: String,
    #[serde(default)]
    alt: String,
}

#[derive(Debug, Deserialize)]
struct WireCategoryRef {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    id: u64,
    name: String,
    slug: String,
    #[serde(default)]
    count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    id: u64,
    number: String,
    status: String,
    total: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    date_created: Option<String>,
    #[serde(default)]
    line_items: Vec<WireOrderLine>,
}

#[derive(Debug, Deserialize)]
struct WireOrderLine {
    name: String,
    quantity: u32,
    #[serde(default)]
    total: String,
}

impl WireProduct {
    fn into_product(self) -> Product {
        let price = decimal(&self.price);
        let regular = decimal(&self.regular_price);
        let description = if self.description.is_empty() {
            self.short_description
        } else {
            self.description
        };

        Product {
            id: self.id.to_string(),
            slug: self.slug,
            title: self.name,
            description,
            price,
            compare_at_price: (self.on_sale && regular > price).then_some(regular),
            available: self.stock_status.as_deref() != Some("outofstock"),
            images: self
                .images
                .into_iter()
                .map(|i| ProductImage {
                    url: i.src,
                    alt: (!i.alt.is_empty()).then_some(i.alt),
                })
                .collect(),
            variants: Vec::new(),
            categories: self.categories.into_iter().map(|c| c.slug).collect(),
        }
    }
}

impl From<WireCategory> for Category {
    fn from(wire: WireCategory) -> Self {
        Self {
            id: wire.id.to_string(),
            slug: wire.slug,
            name: wire.name,
            product_count: wire.count,
        }
    }
}

impl From<WireOrder> for RemoteOrder {
    fn from(wire: WireOrder) -> Self {
        Self {
            id: wire.id.to_string(),
            number: wire.number,
            status: wire.status,
            total: decimal(&wire.total),
            currency: wire.currency,
            created_at: wire.date_created,
            lines: wire
                .line_items
                .into_iter()
                .map(|l| RemoteOrderLine {
                    title: l.name,
                    quantity: l.quantity,
                    total: decimal(&l.total),
                })
                .collect(),
        }
    }
}

/// Prices arrive as strings; blanks mean zero.
fn decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or_default()
}

/// Gateway id the backend expects for each payment label.
const fn gateway_id(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::CashOnDelivery => "cod",
        PaymentMethod::MobileWallet => "mobile_wallet",
        PaymentMethod::BankTransfer => "bacs",
    }
}

fn address_json(address: &PostalAddress, email: Option<&str>) -> serde_json::Value {
    let mut value = json!({
        "first_name": address.first_name,
        "last_name": address.last_name,
        "address_1": address.address1,
        "address_2": address.address2.as_deref().unwrap_or_default(),
        "city": address.city,
        "state": address.state.as_deref().unwrap_or_default(),
        "postcode": address.postcode.as_deref().unwrap_or_default(),
        "country": address.country,
        "phone": address.phone.as_deref().unwrap_or_default(),
    });
    if let Some(email) = email {
        value["email"] = json!(email);
    }
    value
}

/// Request body for `POST /orders`. Line ids must be numeric.
fn order_body(request: &OrderRequest) -> Result<serde_json::Value, CatalogError> {
    let line_items = request
        .lines
        .iter()
        .map(|line| {
            let product_id = line.product_id.parse::<u64>().map_err(|_| {
                CatalogError::Rejected(format!("invalid product id {}", line.product_id))
            })?;
            let mut item = json!({ "product_id": product_id, "quantity": line.quantity });
            if let Some(variant) = &line.variant_id {
                let variation_id = variant.parse::<u64>().map_err(|_| {
                    CatalogError::Rejected(format!("invalid variation id {variant}"))
                })?;
                item["variation_id"] = json!(variation_id);
            }
            Ok(item)
        })
        .collect::<Result<Vec<_>, CatalogError>>()?;

    Ok(json!({
        "payment_method": gateway_id(request.payment_method),
        "payment_method_title": request.payment_method.title(),
        "set_paid": false,
        "currency": request.currency.code(),
        "billing": address_json(&request.billing, Some(request.email.as_str())),
        "shipping": address_json(&request.shipping, None),
        "line_items": line_items,
    }))
}

/// The `message` field of an error body, or the body itself.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| snippet(body, 200))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::types::OrderLine;
    use souq_core::{CurrencyCode, Email};

    fn address() -> PostalAddress {
        PostalAddress {
            first_name: "Nour".to_string(),
            last_name: "Saleh".to_string(),
            address1: "5 Tahrir Sq".to_string(),
            address2: None,
            city: "Cairo".to_string(),
            state: None,
            postcode: Some("11511".to_string()),
            country: "EG".to_string(),
            phone: Some("+201000000000".to_string()),
        }
    }

    fn request(lines: Vec<OrderLine>) -> OrderRequest {
        OrderRequest {
            lines,
            billing: address(),
            shipping: address(),
            payment_method: PaymentMethod::BankTransfer,
            email: Email::parse("nour@example.com").unwrap(),
            currency: CurrencyCode::EGP,
        }
    }

    #[test]
    fn test_wire_product_conversion() {
        let wire: WireProduct = serde_json::from_value(json!({
            "id": 42,
            "name": "Cotton Abaya",
            "slug": "cotton-abaya",
            "description": "",
            "short_description": "Soft cotton.",
            "price": "850.00",
            "regular_price": "1000.00",
            "on_sale": true,
            "stock_status": "instock",
            "images": [{ "src": "https://cdn.test/abaya.jpg", "alt": "" }],
            "categories": [{ "id": 7, "name": "Women", "slug": "women" }],
            "related_ids": [43, 44]
        }))
        .unwrap();
        assert_eq!(wire.related_ids, vec![43, 44]);

        let product = wire.into_product();
        assert_eq!(product.id, "42");
        assert_eq!(product.description, "Soft cotton.");
        assert_eq!(product.price, Decimal::from(850));
        assert_eq!(product.compare_at_price, Some(Decimal::from(1000)));
        assert!(product.available);
        assert_eq!(product.images[0].alt, None);
        assert_eq!(product.categories, vec!["women"]);
    }

    #[test]
    fn test_out_of_stock_and_blank_price() {
        let wire: WireProduct = serde_json::from_value(json!({
            "id": 1, "name": "Scarf", "slug": "scarf", "price": "", "stock_status": "outofstock"
        }))
        .unwrap();
        let product = wire.into_product();
        assert!(!product.available);
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.compare_at_price, None);
    }

    #[test]
    fn test_order_body_shape() {
        let body = order_body(&request(vec![
            OrderLine {
                product_id: "42".to_string(),
                variant_id: Some("420".to_string()),
                quantity: 2,
            },
            OrderLine {
                product_id: "7".to_string(),
                variant_id: None,
                quantity: 1,
            },
        ]))
        .unwrap();

        assert_eq!(body["payment_method"], "bacs");
        assert_eq!(body["set_paid"], false);
        assert_eq!(body["currency"], "EGP");
        assert_eq!(body["billing"]["email"], "nour@example.com");
        assert!(body["shipping"].get("email").is_none());
        assert_eq!(body["line_items"][0]["variation_id"], 420);
        assert!(body["line_items"][1].get("variation_id").is_none());
    }

    #[test]
    fn test_order_body_rejects_non_numeric_ids() {
        let result = order_body(&request(vec![OrderLine {
            product_id: "gid://shop/Product/1".to_string(),
            variant_id: None,
            quantity: 1,
        }]));
        assert!(matches!(result, Err(CatalogError::Rejected(_))));
    }

    #[test]
    fn test_wire_order_conversion() {
        let wire: WireOrder = serde_json::from_value(json!({
            "id": 901,
            "number": "1042",
            "status": "processing",
            "total": "250.00",
            "currency": "EGP",
            "line_items": [{ "name": "Scarf", "quantity": 2, "total": "250.00" }]
        }))
        .unwrap();
        let order = RemoteOrder::from(wire);
        assert_eq!(order.id, "901");
        assert_eq!(order.total, Decimal::from(250));
        assert_eq!(order.lines[0].quantity, 2);
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(
            rejection_message(r#"{"code":"invalid","message":"Invalid product"}"#),
            "Invalid product"
        );
        assert_eq!(rejection_message("plain failure"), "plain failure");
    }

    #[test]
    fn test_requests_carry_query_and_basic_auth() {
        let catalog = RestCatalog::new(&RestCatalogConfig {
            base_url: "https://catalog.test/wp-json/wc/v3".to_string(),
            consumer_key: "ck_live".to_string(),
            consumer_secret: SecretString::from("cs_live".to_string()),
            cart_url: None,
        });

        let request = catalog
            .request(reqwest::Method::GET, &catalog.url("/products"))
            .query(&[("slug", "kaftan"), ("per_page", "1")])
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://catalog.test/wp-json/wc/v3/products?slug=kaftan&per_page=1"
        );
        let auth = request.headers().get("authorization").unwrap();
        assert!(auth.to_str().unwrap().starts_with("Basic "));
    }
}
