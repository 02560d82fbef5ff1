//! Catalog adapters for the external commerce backends.
//!
//! # Architecture
//!
//! - [`CatalogAdapter`] covers browsing and order lookups, [`OrderSink`]
//!   covers order creation. Checkout only depends on `OrderSink`.
//! - [`RestCatalog`] talks to a REST catalog/order API with basic auth.
//! - [`HeadlessCatalog`] talks to a GraphQL storefront API and unwraps its
//!   connection/edge shapes.
//! - [`Catalog`] is the configured backend; routes hold one of these.
//! - Product and category reads are cached in memory via `moka` (5 minute TTL).
//!   Orders are never cached.

mod cache;
mod headless;
mod rest;
pub mod types;

use std::future::Future;

use thiserror::Error;

pub use headless::HeadlessCatalog;
pub use rest::RestCatalog;
pub use types::*;

use crate::config::CatalogConfig;

/// Errors that can occur when talking to a catalog backend.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend refused the request (invalid line, out of stock, ...).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The active backend has no such operation.
    #[error("Not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Read side of a catalog backend.
pub trait CatalogAdapter: Send + Sync {
    /// A page of products, optionally filtered by category and search text.
    fn list_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<ProductPage, CatalogError>> + Send;

    /// A product by backend identifier.
    fn get_product(&self, id: &str) -> impl Future<Output = Result<Product, CatalogError>> + Send;

    /// A product by slug/handle.
    fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Product, CatalogError>> + Send;

    /// Products related to the given one.
    fn related_products(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<Product>, CatalogError>> + Send;

    /// All categories/collections.
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, CatalogError>> + Send;

    /// An order by backend identifier.
    fn get_order(&self, id: &str) -> impl Future<Output = Result<RemoteOrder, CatalogError>> + Send;

    /// Orders placed by a customer.
    fn customer_orders(
        &self,
        customer: &str,
    ) -> impl Future<Output = Result<Vec<RemoteOrder>, CatalogError>> + Send;
}

/// Write side of a catalog backend: order creation.
pub trait OrderSink: Send + Sync {
    /// Create an order. Called exactly once per checkout submission.
    fn create_order(
        &self,
        request: &OrderRequest,
    ) -> impl Future<Output = Result<PlacedOrder, CatalogError>> + Send;
}

/// The configured catalog backend.
#[derive(Clone)]
pub enum Catalog {
    Rest(RestCatalog),
    Headless(HeadlessCatalog),
}

impl Catalog {
    /// Build the backend selected by configuration.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        match config {
            CatalogConfig::Rest(rest) => Self::Rest(RestCatalog::new(rest)),
            CatalogConfig::Headless(headless) => Self::Headless(HeadlessCatalog::new(headless)),
        }
    }

    /// Backend name for logs and health output.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Rest(_) => "rest",
            Self::Headless(_) => "headless",
        }
    }

    /// The REST backend, when active. Only it has a remote cart sub-API.
    #[must_use]
    pub const fn as_rest(&self) -> Option<&RestCatalog> {
        match self {
            Self::Rest(rest) => Some(rest),
            Self::Headless(_) => None,
        }
    }
}

impl CatalogAdapter for Catalog {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        match self {
            Self::Rest(c) => c.list_products(query).await,
            Self::Headless(c) => c.list_products(query).await,
        }
    }

    async fn get_product(&self, id: &str) -> Result<Product, CatalogError> {
        match self {
            Self::Rest(c) => c.get_product(id).await,
            Self::Headless(c) => c.get_product(id).await,
        }
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        match self {
            Self::Rest(c) => c.get_product_by_slug(slug).await,
            Self::Headless(c) => c.get_product_by_slug(slug).await,
        }
    }

    async fn related_products(&self, id: &str) -> Result<Vec<Product>, CatalogError> {
        match self {
            Self::Rest(c) => c.related_products(id).await,
            Self::Headless(c) => c.related_products(id).await,
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        match self {
            Self::Rest(c) => c.list_categories().await,
            Self::Headless(c) => c.list_categories().await,
        }
    }

    async fn get_order(&self, id: &str) -> Result<RemoteOrder, CatalogError> {
        match self {
            Self::Rest(c) => c.get_order(id).await,
            Self::Headless(c) => c.get_order(id).await,
        }
    }

    async fn customer_orders(&self, customer: &str) -> Result<Vec<RemoteOrder>, CatalogError> {
        match self {
            Self::Rest(c) => c.customer_orders(customer).await,
            Self::Headless(c) => c.customer_orders(customer).await,
        }
    }
}

impl OrderSink for Catalog {
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, CatalogError> {
        match self {
            Self::Rest(c) => c.create_order(request).await,
            Self::Headless(c) => c.create_order(request).await,
        }
    }
}

/// Truncate a response body for logs and error messages.
fn snippet(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
