//! Life-progress insights derived from an age breakdown and a target lifespan.

use shared::{AgeBreakdown, LifeInsights, TargetAge};

/// Derive life-progress figures for `age` against `target_age`.
///
/// `TargetAge` is at least one year, so the percentage is always finite.
pub fn compute_insights(age: &AgeBreakdown, target_age: TargetAge) -> LifeInsights {
    let total_target_weeks = i64::from(target_age.total_weeks());
    let weeks_lived = age.total_weeks;
    let current_week = weeks_lived + 1;
    let weeks_remaining = (total_target_weeks - weeks_lived).max(0);
    let years_remaining = (i64::from(target_age.years()) - i64::from(age.years)).max(0);

    // one weekend per remaining week
    let weekends_remaining = weeks_remaining;

    let percent_complete = (weeks_lived as f64 / total_target_weeks as f64 * 100.0).min(100.0);

    LifeInsights {
        percent_complete,
        weeks_lived,
        current_week,
        weeks_remaining,
        years_remaining,
        weekends_remaining,
    }
}
