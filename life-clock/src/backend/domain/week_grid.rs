//! Life-in-weeks grid projection.
//!
//! The grid is a flat, ordered sequence of week cells; grouping into rows of
//! 52 is a view over that sequence.

use shared::{LifeInsights, TargetAge, WeekCell, WeekState, MAX_GRID_WEEKS, WEEKS_PER_YEAR};
use std::slice::Chunks;

/// Rows between year labels on the grid
pub const YEAR_LABEL_EVERY: usize = 10;

/// Projected grid of week cells for one lifespan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    cells: Vec<WeekCell>,
}

impl WeekGrid {
    pub fn cells(&self) -> &[WeekCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Rows of 52 consecutive weeks, one row per year of life
    pub fn rows(&self) -> Chunks<'_, WeekCell> {
        self.cells.chunks(WEEKS_PER_YEAR as usize)
    }

    pub fn row_count(&self) -> usize {
        self.cells.len().div_ceil(WEEKS_PER_YEAR as usize)
    }

    pub fn count(&self, state: WeekState) -> usize {
        self.cells.iter().filter(|cell| cell.state == state).count()
    }
}

/// Year label shown in front of a row, if any
pub fn row_label(row_index: usize) -> Option<usize> {
    (row_index % YEAR_LABEL_EVERY == 0).then_some(row_index)
}

/// Number of cells the grid shows for `target_age`
pub fn grid_week_count(target_age: TargetAge) -> u32 {
    target_age.total_weeks().min(MAX_GRID_WEEKS)
}

/// Classify a single 1-indexed week against the current week
pub fn classify_week(week_number: u32, current_week: i64) -> WeekState {
    let week = i64::from(week_number);
    if week == current_week {
        WeekState::Current
    } else if week < current_week {
        WeekState::Lived
    } else {
        WeekState::Remaining
    }
}

/// Project `insights` onto a grid capped at [`MAX_GRID_WEEKS`] cells
pub fn project(insights: &LifeInsights, target_age: TargetAge) -> WeekGrid {
    let cells = (1..=grid_week_count(target_age))
        .map(|week_number| WeekCell {
            week_number,
            state: classify_week(week_number, insights.current_week),
        })
        .collect();

    WeekGrid { cells }
}
