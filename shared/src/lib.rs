use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weeks in one row of the life grid (one row per year)
pub const WEEKS_PER_YEAR: u32 = 52;

/// Hard display cap for the life grid: 80 years of weeks
pub const MAX_GRID_WEEKS: u32 = 4160;

/// The fixed moment all age calculations are anchored to.
///
/// Stored as a naive local date-time; the observer's timezone is applied at
/// computation time, never at storage time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BirthInstant(NaiveDateTime);

impl BirthInstant {
    pub fn new(local: NaiveDateTime) -> Self {
        Self(local)
    }

    /// Birth at local midnight of the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Resolve this wall-clock instant in `tz`.
    ///
    /// Ambiguous times (DST fall-back) take the earlier reading. Times inside a
    /// DST gap slide forward by an hour, and as a last resort the naive value
    /// is read as UTC.
    pub fn resolve<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        if let Some(dt) = tz.from_local_datetime(&self.0).earliest() {
            return dt;
        }
        if let Some(dt) = tz.from_local_datetime(&(self.0 + Duration::hours(1))).earliest() {
            return dt;
        }
        tz.from_utc_datetime(&self.0)
    }
}

impl From<NaiveDate> for BirthInstant {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

/// Lifespan horizon used for every percent/remaining calculation.
///
/// Only 1..=150 is representable, so insight math never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TargetAge(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("target age must be between {min} and {max}, got {value}", min = TargetAge::MIN, max = TargetAge::MAX)]
pub struct TargetAgeOutOfRange {
    pub value: i64,
}

impl TargetAge {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 150;

    pub fn new(years: u32) -> Result<Self, TargetAgeOutOfRange> {
        if (Self::MIN..=Self::MAX).contains(&years) {
            Ok(Self(years))
        } else {
            Err(TargetAgeOutOfRange { value: years as i64 })
        }
    }

    pub fn years(self) -> u32 {
        self.0
    }

    /// Total weeks in the target lifespan (`years * 52`)
    pub fn total_weeks(self) -> u32 {
        self.0 * WEEKS_PER_YEAR
    }
}

impl Default for TargetAge {
    fn default() -> Self {
        Self(80)
    }
}

impl TryFrom<u32> for TargetAge {
    type Error = TargetAgeOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetAge> for u32 {
    fn from(value: TargetAge) -> Self {
        value.0
    }
}

impl fmt::Display for TargetAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Age since birth, recomputed on every tick.
///
/// `years`/`months`/`days` are a calendar decomposition with borrow; the
/// `total_*` counters are flat durations and are not derived from them.
/// Time-of-day fields are the observer's wall clock at `now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBreakdown {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
    pub total_days: i64,
    pub total_weeks: i64,
    pub total_milliseconds: i64,
}

/// Life-progress figures derived from an [`AgeBreakdown`] and a [`TargetAge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeInsights {
    /// 0.0 to 100.0, clamped at the top
    pub percent_complete: f64,
    pub weeks_lived: i64,
    /// 1-indexed, always `weeks_lived + 1`
    pub current_week: i64,
    pub weeks_remaining: i64,
    pub years_remaining: i64,
    /// One weekend per remaining week
    pub weekends_remaining: i64,
}

/// Classification of one week in the life grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekState {
    Lived,
    Current,
    Remaining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCell {
    /// 1-indexed position in the lifespan
    pub week_number: u32,
    pub state: WeekState,
}

/// A tracked person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    /// ISO date (YYYY-MM-DD), never in the future when created
    pub date_of_birth: NaiveDate,
    pub target_age: TargetAge,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn birth_instant(&self) -> BirthInstant {
        BirthInstant::from_date(self.date_of_birth)
    }
}

/// A single goal for one profile on one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub id: String,
    pub profile_id: String,
    /// Local calendar day the goal belongs to (YYYY-MM-DD)
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub goal: String,
    pub completed: bool,
}

/// Profiles, the active selection and all goals, persisted as one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesState {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub active_profile_id: Option<String>,
    #[serde(default)]
    pub goals: Vec<DailyGoal>,
}

/// Milestone grouping; unknown labels read back as `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MilestoneCategory {
    Career,
    Travel,
    Health,
    Education,
    Relationships,
    Other,
}

impl MilestoneCategory {
    pub const ALL: [MilestoneCategory; 6] = [
        MilestoneCategory::Career,
        MilestoneCategory::Travel,
        MilestoneCategory::Health,
        MilestoneCategory::Education,
        MilestoneCategory::Relationships,
        MilestoneCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MilestoneCategory::Career => "Career",
            MilestoneCategory::Travel => "Travel",
            MilestoneCategory::Health => "Health",
            MilestoneCategory::Education => "Education",
            MilestoneCategory::Relationships => "Relationships",
            MilestoneCategory::Other => "Other",
        }
    }

    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(MilestoneCategory::Other)
    }
}

impl From<String> for MilestoneCategory {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<MilestoneCategory> for String {
    fn from(value: MilestoneCategory) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for MilestoneCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A dated event counted down to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub target_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MilestoneCategory>,
}

impl Milestone {
    pub fn category_or_default(&self) -> MilestoneCategory {
        self.category.unwrap_or(MilestoneCategory::Other)
    }
}

/// A reflection written against the quote of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub quote_text: String,
    pub quote_author: String,
    pub reflection: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStatus {
    Pending,
    Achieved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketListItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: BucketStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => f.write_str("dark"),
            Theme::Light => f.write_str("light"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Quote of the day cached for one local calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCache {
    pub date: NaiveDate,
    pub quote: Quote,
}
