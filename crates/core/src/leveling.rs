//! Experience-to-level mapping.
//!
//! Levels use a flat threshold: every `XP_PER_LEVEL` points of experience is
//! one level, starting at level 1 with zero experience.

use serde::Serialize;

use crate::model::ProgressError;

/// Experience needed to advance one level.
pub const XP_PER_LEVEL: u64 = 100;

/// Level for a non-negative experience total.
#[must_use]
pub fn level_for_experience(experience: u64) -> u32 {
    let tier = experience / XP_PER_LEVEL;
    u32::try_from(tier).map_or(u32::MAX, |t| t.saturating_add(1))
}

/// Level for an experience value arriving from an untyped boundary.
///
/// # Errors
///
/// Returns `ProgressError::NegativeExperience` if `experience` is negative.
pub fn level_for(experience: i64) -> Result<u32, ProgressError> {
    let experience =
        u64::try_from(experience).map_err(|_| ProgressError::NegativeExperience(experience))?;
    Ok(level_for_experience(experience))
}

/// Experience at which `level` begins.
#[must_use]
pub fn level_floor(level: u32) -> u64 {
    u64::from(level.saturating_sub(1)) * XP_PER_LEVEL
}

/// Where a learner sits inside their current level, for badges and progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub experience: u64,
    pub level_floor: u64,
    pub next_level_at: u64,
}

impl LevelProgress {
    #[must_use]
    pub fn for_experience(experience: u64) -> Self {
        let level = level_for_experience(experience);
        let floor = level_floor(level);
        Self {
            level,
            experience,
            level_floor: floor,
            next_level_at: floor.saturating_add(XP_PER_LEVEL),
        }
    }

    #[must_use]
    pub fn xp_into_level(&self) -> u64 {
        self.experience - self.level_floor
    }

    #[must_use]
    pub fn xp_to_next_level(&self) -> u64 {
        self.next_level_at.saturating_sub(self.experience)
    }

    /// Fraction of the current level already earned (0.0 - 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_to_next(&self) -> f32 {
        self.xp_into_level() as f32 / XP_PER_LEVEL as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn level_formula_matches_thresholds() {
        assert_eq!(level_for(0).unwrap(), 1);
        assert_eq!(level_for(99).unwrap(), 1);
        assert_eq!(level_for(100).unwrap(), 2);
        assert_eq!(level_for(250).unwrap(), 3);
    }

    #[test]
    fn negative_experience_is_rejected() {
        let err = level_for(-1).unwrap_err();
        assert!(matches!(err, ProgressError::NegativeExperience(-1)));
    }

    #[test]
    fn huge_experience_saturates() {
        assert_eq!(level_for_experience(u64::MAX), u32::MAX);
    }

    #[test]
    fn level_progress_reports_position_in_level() {
        let p = LevelProgress::for_experience(175);
        assert_eq!(p.level, 2);
        assert_eq!(p.level_floor, 100);
        assert_eq!(p.next_level_at, 200);
        assert_eq!(p.xp_into_level(), 75);
        assert_eq!(p.xp_to_next_level(), 25);
        assert!((p.fraction_to_next() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn level_floor_inverts_the_formula() {
        assert_eq!(level_floor(1), 0);
        assert_eq!(level_floor(3), 200);
        assert_eq!(level_for_experience(level_floor(7)), 7);
    }

    proptest! {
        #[test]
        fn level_is_monotonic(a in 0_i64..10_000_000, b in 0_i64..10_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for(lo).unwrap() <= level_for(hi).unwrap());
        }

        #[test]
        fn level_range_contains_experience(xp in 0_u64..10_000_000) {
            let level = level_for_experience(xp);
            prop_assert!(level_floor(level) <= xp);
            prop_assert!(xp < level_floor(level) + XP_PER_LEVEL);
        }
    }
}
