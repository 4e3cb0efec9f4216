//! Domain-level command and result types.
//!
//! Inputs arrive as loosely typed values (dates as text, optional fields) and
//! are validated by the services before anything is stored.

pub mod profile {
    use shared::Profile;

    /// Input for creating a new profile.
    #[derive(Debug, Clone)]
    pub struct CreateProfileCommand {
        pub name: String,
        /// `YYYY-MM-DD`
        pub date_of_birth: String,
        /// Defaults to 80 when absent
        pub target_age: Option<u32>,
    }

    /// Partial profile update; `None` fields are left as they are.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateProfileCommand {
        pub profile_id: String,
        pub name: Option<String>,
        pub date_of_birth: Option<String>,
        pub target_age: Option<u32>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteProfileResult {
        pub deleted: Profile,
        pub removed_goals: usize,
        /// Active profile after the delete
        pub active_profile_id: Option<String>,
    }
}

pub mod milestone {
    use chrono::{DateTime, Utc};
    use shared::MilestoneCategory;

    #[derive(Debug, Clone)]
    pub struct CreateMilestoneCommand {
        pub title: String,
        pub target_date: DateTime<Utc>,
        pub category: MilestoneCategory,
        pub icon: Option<String>,
        pub color: Option<String>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct UpdateMilestoneCommand {
        pub milestone_id: String,
        pub title: Option<String>,
        pub target_date: Option<DateTime<Utc>>,
        pub category: Option<MilestoneCategory>,
        pub icon: Option<String>,
        pub color: Option<String>,
    }

    /// Outcome of a bulk text import.
    #[derive(Debug, Clone, Default)]
    pub struct ImportMilestonesResult {
        pub imported: Vec<shared::Milestone>,
        /// Non-blank lines that were not understood
        pub skipped_lines: Vec<String>,
    }
}

pub mod bucket_list {
    #[derive(Debug, Clone)]
    pub struct AddBucketItemCommand {
        pub title: String,
        pub image_url: Option<String>,
    }
}
