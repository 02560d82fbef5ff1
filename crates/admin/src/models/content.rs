//! Site content: hero slides and key/value settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_core::HeroSlideId;

/// A homepage hero slide.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HeroSlide {
    pub id: HeroSlideId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for a hero slide.
#[derive(Debug, Clone, Deserialize)]
pub struct HeroSlideInput {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    /// Omitted on create to append after the last slide.
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

/// A site setting.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
