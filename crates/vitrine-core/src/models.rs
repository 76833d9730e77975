//! Domain models shared by all processing units.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Kind of media, derived from the declared content type at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(anyhow::anyhow!("Invalid media type: {}", s)),
        }
    }
}

/// A media item as carried on the bus and returned by ingest.
///
/// `url` is the storage key of the primary artifact and is never reassigned.
/// `timestamp` is the creation time in seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Media {
    pub id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Media {
    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }
}

/// Transient description of a generated thumbnail, only carried in `ThumbnailCreated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub product_id: String,
    pub media_id: String,
    pub url: String,
    pub height: u32,
    pub width: u32,
}

/// Persisted row keyed by (`product_id`, `media_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub product_id: String,
    pub media_id: String,
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: i64,
}

impl MediaRecord {
    /// Build the record an upsert of `media` would produce on an empty slot.
    pub fn from_media(media: &Media) -> Self {
        Self {
            product_id: media.product_id.clone(),
            media_id: media.id.clone(),
            media_type: media.media_type,
            url: media.url.clone(),
            thumbnail_url: None,
            created_at: media.timestamp,
        }
    }

    pub fn artifact_keys(&self) -> ArtifactKeys {
        ArtifactKeys {
            media_type: self.media_type,
            url: self.url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// Projection read by the Removal Unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
}

impl ArtifactKeys {
    /// Non-empty keys in a stable order: primary artifact first.
    pub fn keys(&self) -> Vec<String> {
        std::iter::once(self.url.as_str())
            .chain(self.thumbnail_url.as_deref())
            .filter(|k| !k.trim().is_empty())
            .map(String::from)
            .collect()
    }

    /// Key a `width x height` thumbnail will be stored under when an image has none
    /// recorded yet. Its generation may still be in flight when the media is removed.
    pub fn pending_thumbnail(&self, width: u32, height: u32) -> Option<String> {
        let recorded = self
            .thumbnail_url
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        (self.media_type == MediaType::Image && !recorded)
            .then(|| crate::keys::thumbnail_key(&self.url, width, height))
    }
}

/// One entry of a product listing, with URLs already prefixed by the static base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MediaSummary {
    pub media_id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
}
