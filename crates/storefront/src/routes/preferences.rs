//! Display preferences and the live context event stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use souq_core::{CurrencyCode, LanguageCode};

use crate::context::ShopContext;
use crate::error::Result;

/// Current display preferences.
#[derive(Debug, Serialize)]
pub struct Preferences {
    pub currency: CurrencyCode,
    pub language: LanguageCode,
    pub rtl: bool,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub language: Option<LanguageCode>,
}

/// GET /api/preferences
pub async fn show(ctx: ShopContext) -> Result<Json<Preferences>> {
    preferences(&ctx).await
}

/// PUT /api/preferences
pub async fn update(
    ctx: ShopContext,
    Json(body): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>> {
    if let Some(currency) = body.currency {
        ctx.set_currency(currency).await?;
    }
    if let Some(language) = body.language {
        ctx.set_language(language).await?;
    }
    preferences(&ctx).await
}

async fn preferences(ctx: &ShopContext) -> Result<Json<Preferences>> {
    let language = ctx.language().await?;
    Ok(Json(Preferences {
        currency: ctx.currency().await?,
        language,
        rtl: language.is_rtl(),
    }))
}

/// GET /api/context/events
///
/// Server-sent events for cart, currency, language and wishlist changes
/// made under the caller's session (for example, in another tab).
pub async fn events(ctx: ShopContext) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = ctx.subscribe().map(|change| {
        let event = Event::default()
            .event(change.kind.as_str())
            .json_data(&change)
            .unwrap_or_else(|_| Event::default().comment("unserializable change"));
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
