//! Course-level completion math.
//!
//! Everything here is a pure function of the ordered unit list and the
//! status map. Other sessions and graders can change statuses at any time,
//! so callers recompute on every access instead of caching the result.

use std::collections::HashMap;

use crate::model::{ContentUnit, UnitId, UnitStatus, round2};

/// Derived course progress. Never persisted; recomputed on demand and
/// discarded after use.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgress {
    pub completed_required_count: usize,
    pub total_required_count: usize,
    pub percentage: f64,
    pub next_required_unit: Option<UnitId>,
}

/// Advisory lock state for one unit in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitAccess {
    pub unit_id: UnitId,
    pub is_locked: bool,
}

fn status_of<'a>(
    statuses: &'a HashMap<UnitId, UnitStatus>,
    unit: &ContentUnit,
) -> Option<&'a UnitStatus> {
    statuses.get(&unit.id())
}

fn is_completed(statuses: &HashMap<UnitId, UnitStatus>, unit: &ContentUnit) -> bool {
    status_of(statuses, unit).is_some_and(UnitStatus::is_completed)
}

/// Computes completion counts, percentage and the next required unit.
///
/// A course with units but no required ones reads as fully complete; an
/// empty course reads as zero. Missing status records mean "not started".
#[must_use]
pub fn course_progress(
    units: &[ContentUnit],
    statuses: &HashMap<UnitId, UnitStatus>,
) -> CourseProgress {
    let required: Vec<&ContentUnit> = units
        .iter()
        .filter(|unit| unit.counts_toward_completion())
        .collect();

    let completed_required_count = required
        .iter()
        .filter(|unit| is_completed(statuses, unit))
        .count();

    let percentage = if required.is_empty() {
        if units.is_empty() { 0.0 } else { 100.0 }
    } else {
        #[allow(clippy::cast_precision_loss)]
        let ratio = completed_required_count as f64 / required.len() as f64;
        round2(ratio * 100.0).min(100.0)
    };

    let next_required_unit = required
        .iter()
        .find(|unit| !is_completed(statuses, unit))
        .map(|unit| unit.id());

    CourseProgress {
        completed_required_count,
        total_required_count: required.len(),
        percentage,
        next_required_unit,
    }
}

/// Computes the advisory lock state for every unit in sequence order.
///
/// Forward progression past the first incomplete required unit is blocked:
/// that unit itself stays open, everything after it is locked. Units the
/// student already completed remain freely re-enterable wherever they sit.
#[must_use]
pub fn unit_access(
    units: &[ContentUnit],
    statuses: &HashMap<UnitId, UnitStatus>,
) -> Vec<UnitAccess> {
    let gate = units
        .iter()
        .find(|unit| unit.counts_toward_completion() && !is_completed(statuses, unit))
        .map(ContentUnit::order_index);

    units
        .iter()
        .map(|unit| {
            let past_gate = gate.is_some_and(|gate| unit.order_index() > gate);
            UnitAccess {
                unit_id: unit.id(),
                is_locked: past_gate && !is_completed(statuses, unit),
            }
        })
        .collect()
}

/// Lock check for a single unit; unknown ids are treated as locked.
#[must_use]
pub fn is_unit_unlocked(
    units: &[ContentUnit],
    statuses: &HashMap<UnitId, UnitStatus>,
    unit_id: UnitId,
) -> bool {
    unit_access(units, statuses)
        .iter()
        .find(|access| access.unit_id == unit_id)
        .is_some_and(|access| !access.is_locked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, MediaRef, TestId, UnitKind};
    use crate::time::fixed_now;

    fn video_unit(id: u64, order: u32, required: bool) -> ContentUnit {
        ContentUnit::new(
            UnitId::new(id),
            CourseId::new(1),
            format!("Video {id}"),
            order,
            required,
            UnitKind::Video {
                media: MediaRef::from_id(format!("media-{id}")).unwrap(),
                duration_seconds: 600,
            },
            fixed_now(),
        )
        .unwrap()
    }

    fn test_unit(id: u64, order: u32) -> ContentUnit {
        ContentUnit::new(
            UnitId::new(id),
            CourseId::new(1),
            format!("Test {id}"),
            order,
            true,
            UnitKind::Test {
                test_id: TestId::new(id),
            },
            fixed_now(),
        )
        .unwrap()
    }

    fn reference_unit(id: u64, order: u32) -> ContentUnit {
        ContentUnit::new(
            UnitId::new(id),
            CourseId::new(1),
            format!("Reading {id}"),
            order,
            false,
            UnitKind::Reference {
                resource: "notes.md".into(),
            },
            fixed_now(),
        )
        .unwrap()
    }

    fn completed() -> UnitStatus {
        UnitStatus::completed_at(fixed_now())
    }

    #[test]
    fn half_complete_course_reports_fifty_percent_and_third_unit_next() {
        let units = vec![
            video_unit(1, 0, true),
            video_unit(2, 1, true),
            video_unit(3, 2, true),
            test_unit(4, 3),
        ];
        let mut statuses = HashMap::new();
        statuses.insert(UnitId::new(1), completed());
        statuses.insert(UnitId::new(2), completed());

        let progress = course_progress(&units, &statuses);
        assert_eq!(progress.completed_required_count, 2);
        assert_eq!(progress.total_required_count, 4);
        assert_eq!(progress.percentage, 50.0);
        assert_eq!(progress.next_required_unit, Some(UnitId::new(3)));
    }

    #[test]
    fn course_without_required_units_is_complete() {
        let units = vec![reference_unit(1, 0)];
        let progress = course_progress(&units, &HashMap::new());
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.next_required_unit, None);
    }

    #[test]
    fn empty_course_is_zero_percent() {
        let progress = course_progress(&[], &HashMap::new());
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.total_required_count, 0);
    }

    #[test]
    fn missing_status_reads_as_not_started() {
        let units = vec![video_unit(1, 0, true)];
        let progress = course_progress(&units, &HashMap::new());
        assert_eq!(progress.completed_required_count, 0);
        assert_eq!(progress.next_required_unit, Some(UnitId::new(1)));
    }

    #[test]
    fn units_past_an_incomplete_required_unit_are_locked() {
        let units = vec![video_unit(1, 0, true), video_unit(2, 1, true), test_unit(3, 2)];
        let mut statuses = HashMap::new();
        statuses.insert(UnitId::new(1), completed());

        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(1)));
        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(2)));
        assert!(!is_unit_unlocked(&units, &statuses, UnitId::new(3)));

        statuses.insert(UnitId::new(2), completed());
        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(3)));
    }

    #[test]
    fn completed_units_stay_reenterable() {
        let units = vec![video_unit(1, 0, true), video_unit(2, 1, true), video_unit(3, 2, true)];
        let mut statuses = HashMap::new();
        // Unit 3 was completed before a grader reopened unit 2.
        statuses.insert(UnitId::new(1), completed());
        statuses.insert(UnitId::new(3), completed());

        let access = unit_access(&units, &statuses);
        assert!(!access[0].is_locked);
        assert!(!access[1].is_locked);
        assert!(!access[2].is_locked);
    }

    #[test]
    fn optional_units_do_not_gate_progression() {
        let units = vec![
            video_unit(1, 0, true),
            video_unit(2, 1, false),
            reference_unit(3, 2),
            test_unit(4, 3),
        ];
        let mut statuses = HashMap::new();
        statuses.insert(UnitId::new(1), completed());

        // Optional video and reference material sit before the next
        // required unit; none of them block it.
        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(2)));
        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(3)));
        assert!(is_unit_unlocked(&units, &statuses, UnitId::new(4)));
    }

    #[test]
    fn unknown_unit_is_locked() {
        let units = vec![video_unit(1, 0, true)];
        assert!(!is_unit_unlocked(&units, &HashMap::new(), UnitId::new(9)));
    }
}
