use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, UnitId};
use crate::model::unit::ContentUnit;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("unit {unit} does not belong to course {course}")]
    ForeignUnit { course: CourseId, unit: UnitId },

    #[error("duplicate order index {order_index} within course {course}")]
    DuplicateOrderIndex { course: CourseId, order_index: u32 },
}

/// The ordered, typed sequence of units belonging to one course.
///
/// Construction sorts by `order_index` and enforces that the order is a
/// total one, so every consumer can rely on the sequence being stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    units: Vec<ContentUnit>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Assembles a course from its units.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ForeignUnit` if a unit carries a different
    /// course id, and `CourseError::DuplicateOrderIndex` if two units share
    /// an order index.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        mut units: Vec<ContentUnit>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        for unit in &units {
            if unit.course_id() != id {
                return Err(CourseError::ForeignUnit {
                    course: id,
                    unit: unit.id(),
                });
            }
        }

        units.sort_by_key(ContentUnit::order_index);
        for pair in units.windows(2) {
            if pair[0].order_index() == pair[1].order_index() {
                return Err(CourseError::DuplicateOrderIndex {
                    course: id,
                    order_index: pair[0].order_index(),
                });
            }
        }

        Ok(Self {
            id,
            title,
            units,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Units ordered by `order_index`.
    #[must_use]
    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    /// The units whose completion counts toward course percentage.
    #[must_use]
    pub fn required_units(&self) -> Vec<&ContentUnit> {
        self.units
            .iter()
            .filter(|unit| unit.counts_toward_completion())
            .collect()
    }

    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&ContentUnit> {
        self.units.iter().find(|unit| unit.id() == id)
    }
}
