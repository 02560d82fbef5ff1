//! Shopper context.
//!
//! `ShopContext` is the only code that reads or writes the per-visitor state
//! kept in the session: cart, display currency, interface language and the
//! guest wishlist. Every write is persisted to the session immediately and
//! published as a [`ContextChange`]; `subscribe` streams the changes made
//! under the caller's own session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_sessions::Session;
use uuid::Uuid;

use souq_core::cart::{CartLine, CartStore, PricingPolicy, Totals};
use souq_core::{CurrencyCode, LanguageCode};

use crate::error::AppError;
use crate::models::{WishlistEntry, session_keys};
use crate::state::AppState;

/// Session key holding the stable ID used to route context events.
const CLIENT_ID_KEY: &str = "client_id";

/// Which part of the context changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Cart,
    Currency,
    Language,
    Wishlist,
}

impl ContextKind {
    /// SSE event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Currency => "currency",
            Self::Language => "language",
            Self::Wishlist => "wishlist",
        }
    }
}

/// A context mutation, broadcast to subscribers of the same session.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChange {
    #[serde(skip)]
    pub client_id: String,
    pub kind: ContextKind,
    pub value: serde_json::Value,
}

/// Cart as returned by the API and published on change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub item_count: usize,
    pub total_quantity: u64,
    pub currency: CurrencyCode,
    pub totals: Totals,
}

impl CartSnapshot {
    #[must_use]
    pub fn new(cart: &CartStore<CartLine>, policy: &PricingPolicy, currency: CurrencyCode) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            currency,
            totals: Totals::for_cart(cart, policy),
        }
    }
}

/// Per-request handle on the shopper context.
pub struct ShopContext {
    session: Session,
    client_id: String,
    default_currency: CurrencyCode,
    pricing: PricingPolicy,
    events: broadcast::Sender<ContextChange>,
}

impl FromRequestParts<AppState> for ShopContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let client_id = match session.get::<String>(CLIENT_ID_KEY).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                session.insert(CLIENT_ID_KEY, &id).await?;
                id
            }
        };

        Ok(Self {
            session,
            client_id,
            default_currency: state.config().store_currency,
            pricing: state.config().pricing,
            events: state.context_events().clone(),
        })
    }
}

impl ShopContext {
    /// The underlying session, for login/logout.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Stable per-session identifier, also used as the remote cart key.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Pricing rules for cart totals.
    #[must_use]
    pub const fn pricing(&self) -> &PricingPolicy {
        &self.pricing
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The session cart. A missing or unreadable cart is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn cart(&self) -> Result<CartStore<CartLine>, AppError> {
        Ok(self.get(session_keys::CART).await?.unwrap_or_default())
    }

    /// Persist the cart and publish the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_cart(&self, cart: &CartStore<CartLine>) -> Result<CartSnapshot, AppError> {
        self.session.insert(session_keys::CART, cart).await?;
        let snapshot = self.snapshot(cart).await?;
        self.publish(ContextKind::Cart, &snapshot);
        Ok(snapshot)
    }

    /// Snapshot of a cart in the current display currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn snapshot(&self, cart: &CartStore<CartLine>) -> Result<CartSnapshot, AppError> {
        Ok(CartSnapshot::new(cart, &self.pricing, self.currency().await?))
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    /// Display currency, defaulting to the store currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn currency(&self) -> Result<CurrencyCode, AppError> {
        Ok(self
            .get(session_keys::CURRENCY)
            .await?
            .unwrap_or(self.default_currency))
    }

    /// Change the display currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_currency(&self, currency: CurrencyCode) -> Result<(), AppError> {
        self.session.insert(session_keys::CURRENCY, currency).await?;
        self.publish(ContextKind::Currency, &currency);
        Ok(())
    }

    /// Interface language.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn language(&self) -> Result<LanguageCode, AppError> {
        Ok(self.get(session_keys::LANGUAGE).await?.unwrap_or_default())
    }

    /// Change the interface language.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_language(&self, language: LanguageCode) -> Result<(), AppError> {
        self.session.insert(session_keys::LANGUAGE, language).await?;
        self.publish(ContextKind::Language, &language);
        Ok(())
    }

    // =========================================================================
    // Guest wishlist
    // =========================================================================

    /// Wishlist kept in the session for guests.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn wishlist(&self) -> Result<Vec<WishlistEntry>, AppError> {
        Ok(self.get(session_keys::WISHLIST).await?.unwrap_or_default())
    }

    /// Replace the guest wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_wishlist(&self, entries: &[WishlistEntry]) -> Result<(), AppError> {
        self.session.insert(session_keys::WISHLIST, entries).await?;
        self.publish(ContextKind::Wishlist, &entries);
        Ok(())
    }

    /// Empty the guest wishlist and return what it held.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn take_wishlist(&self) -> Result<Vec<WishlistEntry>, AppError> {
        match self
            .session
            .remove::<Vec<WishlistEntry>>(session_keys::WISHLIST)
            .await
        {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable guest wishlist");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Changes made under this session from now on.
    #[must_use]
    pub fn subscribe(&self) -> impl Stream<Item = ContextChange> + Send + use<> {
        let mut rx = self.events.subscribe();
        let client_id = self.client_id.clone();

        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(change) if change.client_id == client_id => yield change,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Context subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    fn publish(&self, kind: ContextKind, value: &impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        // No subscribers is the normal case.
        let _ = self.events.send(ContextChange {
            client_id: self.client_id.clone(),
            kind,
            value,
        });
    }

    /// Read a session value, treating undecodable data as absent.
    async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.session.get::<T>(key).await {
            Ok(value) => Ok(value),
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                tracing::warn!(key, error = %e, "Discarding unreadable session value");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
