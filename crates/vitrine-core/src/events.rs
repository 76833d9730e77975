//! Pipeline events and their wire representation.
//!
//! Every message on the bus carries the attribute `event = <discriminant>`; subscriptions
//! filter on it. The body is the JSON payload for media and thumbnail events and the bare
//! storage key for `RemoveObject`.

use crate::models::{Media, Thumbnail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use thiserror::Error;

/// Message attribute carrying the event discriminant.
pub const EVENT_ATTRIBUTE: &str = "event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MediaUploaded,
    CreateThumbnail,
    ThumbnailCreated,
    RemoveObject,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::MediaUploaded,
        EventKind::CreateThumbnail,
        EventKind::ThumbnailCreated,
        EventKind::RemoveObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MediaUploaded => "MediaUploaded",
            EventKind::CreateThumbnail => "CreateThumbnail",
            EventKind::ThumbnailCreated => "ThumbnailCreated",
            EventKind::RemoveObject => "RemoveObject",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EventError::UnknownKind(s.to_string()))
    }
}

/// Errors raised while encoding or decoding a bus message.
///
/// A decode failure means the message can never be processed; consumers treat it as a
/// poison message.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Message has no 'event' attribute")]
    MissingAttribute,

    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    #[error("Malformed {kind} payload: {reason}")]
    MalformedPayload { kind: EventKind, reason: String },

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },
}

/// Transport-neutral message: string attributes plus a text body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub attributes: BTreeMap<String, String>,
    pub body: String,
}

impl EventMessage {
    pub fn new(kind: EventKind, body: String) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(EVENT_ATTRIBUTE.to_string(), kind.as_str().to_string());
        Self { attributes, body }
    }

    /// Raw value of the `event` attribute, if present.
    pub fn event_attribute(&self) -> Option<&str> {
        self.attributes.get(EVENT_ATTRIBUTE).map(String::as_str)
    }

    pub fn kind(&self) -> Result<EventKind, EventError> {
        self.event_attribute()
            .ok_or(EventError::MissingAttribute)?
            .parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MediaUploaded(Media),
    CreateThumbnail(Media),
    ThumbnailCreated(Thumbnail),
    RemoveObject(String),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MediaUploaded(_) => EventKind::MediaUploaded,
            Event::CreateThumbnail(_) => EventKind::CreateThumbnail,
            Event::ThumbnailCreated(_) => EventKind::ThumbnailCreated,
            Event::RemoveObject(_) => EventKind::RemoveObject,
        }
    }

    pub fn product_id(&self) -> Option<&str> {
        match self {
            Event::MediaUploaded(m) | Event::CreateThumbnail(m) => Some(&m.product_id),
            Event::ThumbnailCreated(t) => Some(&t.product_id),
            Event::RemoveObject(_) => None,
        }
    }

    pub fn media_id(&self) -> Option<&str> {
        match self {
            Event::MediaUploaded(m) | Event::CreateThumbnail(m) => Some(&m.id),
            Event::ThumbnailCreated(t) => Some(&t.media_id),
            Event::RemoveObject(_) => None,
        }
    }

    pub fn to_message(&self) -> Result<EventMessage, EventError> {
        let kind = self.kind();
        let body = match self {
            Event::MediaUploaded(media) | Event::CreateThumbnail(media) => {
                serde_json::to_string(media).map_err(|e| EventError::MalformedPayload {
                    kind,
                    reason: e.to_string(),
                })?
            }
            Event::ThumbnailCreated(thumbnail) => {
                serde_json::to_string(thumbnail).map_err(|e| EventError::MalformedPayload {
                    kind,
                    reason: e.to_string(),
                })?
            }
            Event::RemoveObject(key) => key.clone(),
        };
        Ok(EventMessage::new(kind, body))
    }

    /// Decode and validate a bus message.
    pub fn from_message(message: &EventMessage) -> Result<Self, EventError> {
        let kind = message.kind()?;
        let event = match kind {
            EventKind::MediaUploaded => Event::MediaUploaded(parse_json(kind, &message.body)?),
            EventKind::CreateThumbnail => Event::CreateThumbnail(parse_json(kind, &message.body)?),
            EventKind::ThumbnailCreated => {
                Event::ThumbnailCreated(parse_json(kind, &message.body)?)
            }
            EventKind::RemoveObject => Event::RemoveObject(message.body.clone()),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), EventError> {
        let kind = self.kind();
        let invalid = |reason: &str| EventError::InvalidPayload {
            kind,
            reason: reason.to_string(),
        };

        match self {
            Event::MediaUploaded(media) | Event::CreateThumbnail(media) => {
                if media.id.trim().is_empty() {
                    return Err(invalid("id is empty"));
                }
                if media.product_id.trim().is_empty() {
                    return Err(invalid("product_id is empty"));
                }
                if media.url.trim().is_empty() {
                    return Err(invalid("url is empty"));
                }
            }
            Event::ThumbnailCreated(thumbnail) => {
                if thumbnail.product_id.trim().is_empty() || thumbnail.media_id.trim().is_empty()
                {
                    return Err(invalid("product_id and media_id are required"));
                }
                if thumbnail.url.trim().is_empty() {
                    return Err(invalid("url is empty"));
                }
                if thumbnail.width == 0 || thumbnail.height == 0 {
                    return Err(invalid("dimensions must be positive"));
                }
            }
            Event::RemoveObject(key) => {
                if key.trim().is_empty() {
                    return Err(invalid("storage key is empty"));
                }
                if key.contains("..") || key.starts_with('/') {
                    return Err(invalid("storage key escapes the bucket"));
                }
            }
        }
        Ok(())
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(kind: EventKind, body: &str) -> Result<T, EventError> {
    serde_json::from_str(body).map_err(|e| EventError::MalformedPayload {
        kind,
        reason: e.to_string(),
    })
}
