use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::ids::{CourseId, TestId, UnitId};

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitValidationError {
    #[error("media reference cannot be empty")]
    EmptyMediaRef,

    #[error("could not extract a media id from URL: {0}")]
    UnrecognizedMediaUrl(String),

    #[error("unit title cannot be empty")]
    EmptyTitle,

    #[error("reference resource cannot be empty")]
    EmptyResource,
}

//
// ─── MEDIA REFERENCE ───────────────────────────────────────────────────────────
//

/// Opaque reference to a video on the external embed provider.
///
/// The provider only needs the bare media id; authors usually paste full
/// URLs, so `from_url` accepts the common share/watch/embed forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef(String);

impl MediaRef {
    /// Wraps a bare media id.
    ///
    /// # Errors
    ///
    /// Returns `UnitValidationError::EmptyMediaRef` for blank input.
    pub fn from_id(id: impl AsRef<str>) -> Result<Self, UnitValidationError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(UnitValidationError::EmptyMediaRef);
        }
        Ok(Self(id.to_owned()))
    }

    /// Extracts the media id from a share, watch or embed URL.
    ///
    /// # Errors
    ///
    /// Returns `UnitValidationError::UnrecognizedMediaUrl` when no id can be
    /// derived from the URL.
    pub fn from_url(raw: impl AsRef<str>) -> Result<Self, UnitValidationError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(UnitValidationError::EmptyMediaRef);
        }
        let url = Url::parse(raw)
            .map_err(|_| UnitValidationError::UnrecognizedMediaUrl(raw.to_owned()))?;

        // Short-link form: the id is the whole path.
        if url.host_str().is_some_and(|host| host.contains("youtu.be")) {
            let id = url.path().trim_start_matches('/');
            return Self::from_id(id)
                .map_err(|_| UnitValidationError::UnrecognizedMediaUrl(raw.to_owned()));
        }

        // Watch form: ?v=<id>
        if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
            return Self::from_id(id.as_ref())
                .map_err(|_| UnitValidationError::UnrecognizedMediaUrl(raw.to_owned()));
        }

        // Embed form: /embed/<id>
        if let Some(id) = url.path().strip_prefix("/embed/") {
            return Self::from_id(id)
                .map_err(|_| UnitValidationError::UnrecognizedMediaUrl(raw.to_owned()));
        }

        Err(UnitValidationError::UnrecognizedMediaUrl(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//
// ─── CONTENT UNIT ──────────────────────────────────────────────────────────────
//

/// Type-specific payload of a content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    /// External embedded video plus the duration reported at authoring time.
    Video {
        media: MediaRef,
        duration_seconds: u32,
    },
    /// Linked test, taken through the attempt flow.
    Test { test_id: TestId },
    /// Static display-only material; never gates progression.
    Reference { resource: String },
}

impl UnitKind {
    /// True for kinds whose completion counts toward course percentage.
    #[must_use]
    pub fn is_gradable(&self) -> bool {
        matches!(self, UnitKind::Video { .. } | UnitKind::Test { .. })
    }

    /// Stable lowercase tag, used by storage and wire formats.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Video { .. } => "video",
            UnitKind::Test { .. } => "test",
            UnitKind::Reference { .. } => "reference",
        }
    }
}

/// One addressable learning item in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    id: UnitId,
    course_id: CourseId,
    title: String,
    order_index: u32,
    is_required: bool,
    kind: UnitKind,
    created_at: DateTime<Utc>,
}

impl ContentUnit {
    /// Builds a unit after validating its title and payload.
    ///
    /// # Errors
    ///
    /// Returns `UnitValidationError` for a blank title or a blank reference
    /// resource.
    pub fn new(
        id: UnitId,
        course_id: CourseId,
        title: impl Into<String>,
        order_index: u32,
        is_required: bool,
        kind: UnitKind,
        created_at: DateTime<Utc>,
    ) -> Result<Self, UnitValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(UnitValidationError::EmptyTitle);
        }
        if let UnitKind::Reference { resource } = &kind {
            if resource.trim().is_empty() {
                return Err(UnitValidationError::EmptyResource);
            }
        }
        Ok(Self {
            id,
            course_id,
            title,
            order_index,
            is_required,
            kind,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    #[must_use]
    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Required units are the gradable kinds flagged as required; reference
    /// material never counts even when marked required by mistake.
    #[must_use]
    pub fn counts_toward_completion(&self) -> bool {
        self.is_required && self.kind.is_gradable()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn video_kind() -> UnitKind {
        UnitKind::Video {
            media: MediaRef::from_id("abc123").unwrap(),
            duration_seconds: 600,
        }
    }

    #[test]
    fn media_ref_from_watch_url() {
        let media = MediaRef::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(media.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn media_ref_from_short_url() {
        let media = MediaRef::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(media.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn media_ref_from_embed_url() {
        let media = MediaRef::from_url("https://www.youtube.com/embed/dQw4w9WgXcQ").unwrap();
        assert_eq!(media.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn media_ref_rejects_unrecognized_url() {
        let err = MediaRef::from_url("https://example.com/nothing-here").unwrap_err();
        assert!(matches!(err, UnitValidationError::UnrecognizedMediaUrl(_)));
    }

    #[test]
    fn media_ref_rejects_blank_id() {
        let err = MediaRef::from_id("   ").unwrap_err();
        assert_eq!(err, UnitValidationError::EmptyMediaRef);
    }

    #[test]
    fn unit_rejects_blank_title() {
        let err = ContentUnit::new(
            UnitId::new(1),
            CourseId::new(1),
            "  ",
            0,
            true,
            video_kind(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, UnitValidationError::EmptyTitle);
    }

    #[test]
    fn reference_units_never_count_toward_completion() {
        let unit = ContentUnit::new(
            UnitId::new(1),
            CourseId::new(1),
            "Reading",
            0,
            true,
            UnitKind::Reference {
                resource: "chapter-1.md".into(),
            },
            fixed_now(),
        )
        .unwrap();
        assert!(!unit.counts_toward_completion());
    }

    #[test]
    fn required_video_counts_toward_completion() {
        let unit = ContentUnit::new(
            UnitId::new(1),
            CourseId::new(1),
            "Intro",
            0,
            true,
            video_kind(),
            fixed_now(),
        )
        .unwrap();
        assert!(unit.counts_toward_completion());
    }
}
