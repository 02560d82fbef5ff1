//! Cache types for catalog responses.

use std::time::Duration;

use moka::future::Cache;

use super::types::{Category, Product, ProductPage, ProductQuery};

/// Cache key for products and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    ProductBySlug(String),
    Related(String),
    Products {
        category: Option<String>,
        page: u32,
        after: Option<String>,
    },
    Categories,
}

impl CacheKey {
    /// Key for an unfiltered-by-search listing.
    pub fn products(query: &ProductQuery) -> Self {
        Self::Products {
            category: query.category.clone(),
            page: query.page,
            after: query.after.clone(),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Related(Vec<Product>),
    Categories(Vec<Category>),
}

/// A catalog cache: 1000 entries, 5 minute TTL.
pub fn build() -> Cache<CacheKey, CacheValue> {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(300))
        .build()
}
