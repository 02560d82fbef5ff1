//! Headless storefront (GraphQL) client.
//!
//! Queries are plain GraphQL documents posted as JSON. Responses use the
//! connection/edge shape (`{ edges: [{ node }] , pageInfo }`), unwrapped here
//! into flat lists.

use std::sync::Arc;

use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::cache::{self, CacheKey, CacheValue};
use super::types::{
    Category, OrderRequest, PlacedOrder, Product, ProductImage, ProductPage, ProductQuery,
    ProductVariant, RemoteOrder, SelectedOption,
};
use super::{CatalogAdapter, CatalogError, OrderSink, snippet};
use crate::config::HeadlessCatalogConfig;

// =============================================================================
// Queries
// =============================================================================

const PRODUCT_FIELDS: &str = r"
fragment ProductFields on Product {
  id
  handle
  title
  description
  availableForSale
  priceRange { minVariantPrice { amount currencyCode } }
  compareAtPriceRange { minVariantPrice { amount currencyCode } }
  images(first: 10) { edges { node { url altText } } }
  variants(first: 50) {
    edges {
      node {
        id
        title
        availableForSale
        price { amount currencyCode }
        selectedOptions { name value }
      }
    }
  }
  collections(first: 5) { edges { node { handle } } }
}
";

const PRODUCT_BY_ID: &str = r"
query ProductById($id: ID!) {
  product(id: $id) { ...ProductFields }
}
";

const PRODUCT_BY_HANDLE: &str = r"
query ProductByHandle($handle: String!) {
  productByHandle(handle: $handle) { ...ProductFields }
}
";

const PRODUCTS: &str = r"
query Products($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query) {
    edges { node { ...ProductFields } }
    pageInfo { hasNextPage endCursor }
  }
}
";

const COLLECTION_PRODUCTS: &str = r"
query CollectionProducts($handle: String!, $first: Int!, $after: String) {
  collection(handle: $handle) {
    products(first: $first, after: $after) {
      edges { node { ...ProductFields } }
      pageInfo { hasNextPage endCursor }
    }
  }
}
";

const RECOMMENDATIONS: &str = r"
query ProductRecommendations($productId: ID!) {
  productRecommendations(productId: $productId) { ...ProductFields }
}
";

const COLLECTIONS: &str = r"
query Collections($first: Int!) {
  collections(first: $first) { edges { node { id handle title } } }
}
";

const CART_CREATE: &str = r"
mutation CartCreate($input: CartInput!) {
  cartCreate(input: $input) {
    cart {
      id
      checkoutUrl
      cost { totalAmount { amount currencyCode } }
    }
    userErrors { field message }
  }
}
";

// =============================================================================
// HeadlessCatalog
// =============================================================================

/// Client for the headless storefront GraphQL API.
#[derive(Clone)]
pub struct HeadlessCatalog {
    inner: Arc<HeadlessCatalogInner>,
}

struct HeadlessCatalogInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl HeadlessCatalog {
    /// Create a new headless catalog client.
    #[must_use]
    pub fn new(config: &HeadlessCatalogConfig) -> Self {
        Self {
            inner: Arc::new(HeadlessCatalogInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint(),
                access_token: config.access_token.clone(),
                cache: cache::build(),
            }),
        }
    }

    /// Execute a GraphQL document with variables.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, CatalogError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(
                "X-Shopify-Storefront-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(&body, 500),
                "Storefront API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: snippet(&body, 200),
            });
        }

        decode_response(&body)
    }

    async fn product_page(
        &self,
        query: &ProductQuery,
    ) -> Result<(Connection<WireProduct>, u32), CatalogError> {
        let page = query.page.max(1);
        if let Some(handle) = &query.category {
            let data: CollectionProductsData = self
                .execute(
                    &with_fragment(COLLECTION_PRODUCTS),
                    json!({
                        "handle": handle,
                        "first": ProductQuery::PAGE_SIZE,
                        "after": query.after,
                    }),
                )
                .await?;
            let collection = data
                .collection
                .ok_or_else(|| CatalogError::NotFound(format!("collection {handle}")))?;
            return Ok((collection.products, page));
        }

        let data: ProductsData = self
            .execute(
                &with_fragment(PRODUCTS),
                json!({
                    "first": ProductQuery::PAGE_SIZE,
                    "after": query.after,
                    "query": query.search,
                }),
            )
            .await?;
        Ok((data.products, page))
    }
}

impl CatalogAdapter for HeadlessCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let key = CacheKey::products(query);
        if query.is_cacheable()
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let (connection, page) = self.product_page(query).await?;
        let page_info = connection.page_info.clone().unwrap_or_default();
        let mut products: Vec<Product> = connection
            .into_nodes()
            .into_iter()
            .map(WireProduct::into_product)
            .collect();

        // Collections cannot be searched server-side.
        if query.category.is_some()
            && let Some(search) = &query.search
        {
            let needle = search.to_lowercase();
            products.retain(|p| p.title.to_lowercase().contains(&needle));
        }

        let result = ProductPage {
            products,
            page,
            has_next_page: page_info.has_next_page,
            next_cursor: page_info.end_cursor,
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

        let data: ProductByIdData = self
            .execute(&with_fragment(PRODUCT_BY_ID), json!({ "id": id }))
            .await?;
        let product = data
            .product
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))?
            .into_product();

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

        let data: ProductByHandleData = self
            .execute(&with_fragment(PRODUCT_BY_HANDLE), json!({ "handle": slug }))
            .await?;
        let product = data
            .product_by_handle
            .ok_or_else(|| CatalogError::NotFound(format!("product {slug}")))?
            .into_product();

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

        let data: RecommendationsData = self
            .execute(&with_fragment(RECOMMENDATIONS), json!({ "productId": id }))
            .await?;
        let products: Vec<Product> = data
            .product_recommendations
            .unwrap_or_default()
            .into_iter()
            .map(WireProduct::into_product)
            .collect();

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

        let data: CollectionsData = self.execute(COLLECTIONS, json!({ "first": 100 })).await?;
        let categories: Vec<Category> = data
            .collections
            .into_nodes()
            .into_iter()
            .map(|c| Category {
                id: c.id,
                slug: c.handle,
                name: c.title,
                product_count: None,
            })
            .collect();

        self.inner
            .cache
            .insert(CacheKey::Categories, CacheValue::Categories(categories.clone()))
            .await;
        Ok(categories)
    }

    async fn get_order(&self, _id: &str) -> Result<RemoteOrder, CatalogError> {
        Err(CatalogError::Unsupported("order lookup"))
    }

    async fn customer_orders(&self, _customer: &str) -> Result<Vec<RemoteOrder>, CatalogError> {
        Err(CatalogError::Unsupported("customer order history"))
    }
}

impl OrderSink for HeadlessCatalog {
    /// Creates a platform cart carrying the buyer and lines; the customer
    /// finishes payment on the returned checkout URL.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, CatalogError> {
        let input = cart_input(request)?;
        let data: CartCreateData = self.execute(CART_CREATE, json!({ "input": input })).await?;

        if let Some(error) = data.cart_create.user_errors.first() {
            return Err(CatalogError::Rejected(error.message.clone()));
        }
        let cart = data
            .cart_create
            .cart
            .ok_or_else(|| CatalogError::GraphQL("cartCreate returned no cart".to_string()))?;

        tracing::info!(cart_id = %cart.id, "Checkout cart created");
        Ok(PlacedOrder {
            order_id: cart.id,
            order_number: None,
            total: cart.cost.total_amount.amount,
            checkout_url: Some(cart.checkout_url),
        })
    }
}

fn with_fragment(query: &str) -> String {
    format!("{query}\n{PRODUCT_FIELDS}")
}

/// `CartInput` for `cartCreate`. Every line needs a variant id.
fn cart_input(request: &OrderRequest) -> Result<serde_json::Value, CatalogError> {
    let lines = request
        .lines
        .iter()
        .map(|line| {
            let merchandise_id = line.variant_id.as_ref().ok_or_else(|| {
                CatalogError::Rejected(format!("product {} needs a variant", line.product_id))
            })?;
            Ok(json!({ "merchandiseId": merchandise_id, "quantity": line.quantity }))
        })
        .collect::<Result<Vec<_>, CatalogError>>()?;

    let shipping = &request.shipping;
    Ok(json!({
        "lines": lines,
        "buyerIdentity": {
            "email": request.email.as_str(),
            "countryCode": shipping.country.to_ascii_uppercase(),
            "deliveryAddressPreferences": [{
                "deliveryAddress": {
                    "firstName": shipping.first_name,
                    "lastName": shipping.last_name,
                    "address1": shipping.address1,
                    "address2": shipping.address2,
                    "city": shipping.city,
                    "province": shipping.state,
                    "zip": shipping.postcode,
                    "country": shipping.country,
                    "phone": shipping.phone,
                }
            }],
        },
        "attributes": [
            { "key": "payment_method", "value": request.payment_method.as_str() },
            { "key": "currency", "value": request.currency.code() },
        ],
    }))
}

/// Decode a GraphQL response body, surfacing `errors` before `data`.
fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, CatalogError> {
    let response: GraphQLResponse<T> = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, body = %snippet(body, 500), "Failed to parse storefront response");
        CatalogError::Parse(e)
    })?;

    if !response.errors.is_empty() {
        let messages = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CatalogError::GraphQL(messages));
    }

    response
        .data
        .ok_or_else(|| CatalogError::GraphQL("No data in response".to_string()))
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    edges: Vec<Edge<T>>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl<T> Connection<T> {
    fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyV2 {
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceRange {
    min_variant_price: MoneyV2,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: String,
    handle: String,
    title: String,
    #[serde(default)]
    description: String,
    available_for_sale: bool,
    price_range: PriceRange,
    #[serde(default)]
    compare_at_price_range: Option<PriceRange>,
    images: Connection<WireImage>,
    variants: Connection<WireVariant>,
    #[serde(default)]
    collections: Option<Connection<WireCollectionRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireImage {
    url: String,
    alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVariant {
    id: String,
    title: String,
    available_for_sale: bool,
    price: MoneyV2,
    #[serde(default)]
    selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Deserialize)]
struct WireCollectionRef {
    handle: String,
}

#[derive(Debug, Deserialize)]
struct WireCollection {
    id: String,
    handle: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ProductByIdData {
    product: Option<WireProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductByHandleData {
    product_by_handle: Option<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct CollectionProductsData {
    collection: Option<CollectionProducts>,
}

#[derive(Debug, Deserialize)]
struct CollectionProducts {
    products: Connection<WireProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsData {
    product_recommendations: Option<Vec<WireProduct>>,
}

#[derive(Debug, Deserialize)]
struct CollectionsData {
    collections: Connection<WireCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartCreateData {
    cart_create: CartCreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartCreatePayload {
    cart: Option<WireCart>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCart {
    id: String,
    checkout_url: String,
    cost: WireCartCost,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCartCost {
    total_amount: MoneyV2,
}

#[derive(Debug, Deserialize)]
struct UserError {
    message: String,
}

impl WireProduct {
    fn into_product(self) -> Product {
        let price = self.price_range.min_variant_price.amount;
        let compare_at = self
            .compare_at_price_range
            .map(|r| r.min_variant_price.amount)
            .filter(|amount| *amount > price);

        Product {
            id: self.id,
            slug: self.handle,
            title: self.title,
            description: self.description,
            price,
            compare_at_price: compare_at,
            available: self.available_for_sale,
            images: self
                .images
                .into_nodes()
                .into_iter()
                .map(|i| ProductImage {
                    url: i.url,
                    alt: i.alt_text,
                })
                .collect(),
            variants: self
                .variants
                .into_nodes()
                .into_iter()
                .map(|v| ProductVariant {
                    id: v.id,
                    title: v.title,
                    price: v.price.amount,
                    available: v.available_for_sale,
                    options: v.selected_options,
                })
                .collect(),
            categories: self
                .collections
                .map(|c| c.into_nodes().into_iter().map(|n| n.handle).collect())
                .unwrap_or_default(),
        }
    }
}
