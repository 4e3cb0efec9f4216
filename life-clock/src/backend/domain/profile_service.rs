//! # Profile Service
//!
//! Profiles, the active profile pointer and daily goals all live in one
//! document (`memento-profiles`) so a single write keeps them consistent.

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::clock::TimeSource;
use crate::backend::domain::commands::profile::{CreateProfileCommand, DeleteProfileResult, UpdateProfileCommand};
use crate::backend::domain::models::profile::{
    approximate_age_years, ProfileValidationError, DATE_OF_BIRTH_FORMAT, MAX_NAME_LENGTH,
};
use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::{Profile, ProfilesState, TargetAge};

pub const PROFILES_KEY: &str = "memento-profiles";

#[derive(Clone)]
pub struct ProfileService {
    document: Arc<StoredDocument<ProfilesState>>,
    time_source: Arc<dyn TimeSource>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            document: Arc::new(StoredDocument::open(PROFILES_KEY, store, feed)),
            time_source,
        }
    }

    /// Shared document, also used by the goal service
    pub(crate) fn document(&self) -> Arc<StoredDocument<ProfilesState>> {
        Arc::clone(&self.document)
    }

    pub(crate) fn time_source(&self) -> Arc<dyn TimeSource> {
        Arc::clone(&self.time_source)
    }

    /// Create a profile. The first profile becomes active.
    pub fn add_profile(&self, command: CreateProfileCommand) -> Result<Profile> {
        info!("Creating profile: name={}, date_of_birth={}", command.name, command.date_of_birth);

        let name = validate_name(&command.name)?;
        let date_of_birth = self.validate_date_of_birth(&command.date_of_birth)?;
        let target_age = self.validate_target_age(command.target_age, date_of_birth)?;

        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            name,
            date_of_birth,
            target_age,
            created_at: self.time_source.now(),
        };

        let stored = profile.clone();
        self.document.update(move |prev| {
            let mut next = prev.clone();
            if next.active_profile_id.is_none() {
                next.active_profile_id = Some(stored.id.clone());
            }
            next.profiles.push(stored);
            next
        })?;

        info!("Created profile: {} with ID: {}", profile.name, profile.id);
        Ok(profile)
    }

    pub fn update_profile(&self, command: UpdateProfileCommand) -> Result<Profile> {
        info!("Updating profile: {}", command.profile_id);

        let existing = self
            .get_profile(&command.profile_id)
            .ok_or_else(|| ProfileValidationError::ProfileNotFound(command.profile_id.clone()))?;

        let mut updated = existing;
        if let Some(name) = &command.name {
            updated.name = validate_name(name)?;
        }
        if let Some(date_of_birth) = &command.date_of_birth {
            updated.date_of_birth = self.validate_date_of_birth(date_of_birth)?;
        }
        if command.target_age.is_some() || command.date_of_birth.is_some() {
            let requested = command.target_age.unwrap_or_else(|| updated.target_age.years());
            updated.target_age = self.validate_target_age(Some(requested), updated.date_of_birth)?;
        }

        let stored = updated.clone();
        self.document.update_with(move |prev| {
            let mut next = prev.clone();
            let slot = next
                .profiles
                .iter_mut()
                .find(|p| p.id == stored.id)
                .ok_or_else(|| ProfileValidationError::ProfileNotFound(stored.id.clone()))?;
            *slot = stored;
            Ok((next, ()))
        })?;

        info!("Updated profile: {} with ID: {}", updated.name, updated.id);
        Ok(updated)
    }

    /// Delete a profile and its goals. If it was active, the first remaining
    /// profile becomes active.
    pub fn delete_profile(&self, profile_id: &str) -> Result<DeleteProfileResult> {
        info!("Deleting profile: {}", profile_id);

        let result = self.document.update_with(|prev| {
            let deleted = prev
                .profiles
                .iter()
                .find(|p| p.id == profile_id)
                .cloned()
                .ok_or_else(|| ProfileValidationError::ProfileNotFound(profile_id.to_string()))?;

            let mut next = prev.clone();
            next.profiles.retain(|p| p.id != profile_id);
            let goals_before = next.goals.len();
            next.goals.retain(|g| g.profile_id != profile_id);
            let removed_goals = goals_before - next.goals.len();

            if next.active_profile_id.as_deref() == Some(profile_id) {
                next.active_profile_id = next.profiles.first().map(|p| p.id.clone());
            }

            let result = DeleteProfileResult {
                deleted,
                removed_goals,
                active_profile_id: next.active_profile_id.clone(),
            };
            Ok((next, result))
        })?;

        info!(
            "Deleted profile: {} ({} goals removed), active now {:?}",
            result.deleted.name, result.removed_goals, result.active_profile_id
        );
        Ok(result)
    }

    pub fn set_active_profile(&self, profile_id: &str) -> Result<Profile> {
        info!("Setting active profile: {}", profile_id);

        let profile = self.document.update_with(|prev| {
            let profile = prev
                .profiles
                .iter()
                .find(|p| p.id == profile_id)
                .cloned()
                .ok_or_else(|| ProfileValidationError::ProfileNotFound(profile_id.to_string()))?;
            let mut next = prev.clone();
            next.active_profile_id = Some(profile.id.clone());
            Ok((next, profile))
        })?;

        Ok(profile)
    }

    pub fn active_profile(&self) -> Option<Profile> {
        let state = self.document.get();
        let active_id = state.active_profile_id.as_deref()?;
        let profile = state.profiles.iter().find(|p| p.id == active_id).cloned();
        if profile.is_none() {
            warn!("Active profile {} does not exist", active_id);
        }
        profile
    }

    pub fn get_profile(&self, profile_id: &str) -> Option<Profile> {
        self.document.get().profiles.iter().find(|p| p.id == profile_id).cloned()
    }

    pub fn list_profiles(&self) -> Vec<Profile> {
        let profiles = self.document.get().profiles.clone();
        debug!("Found {} profiles", profiles.len());
        profiles
    }

    pub fn has_profiles(&self) -> bool {
        !self.document.get().profiles.is_empty()
    }

    /// Pull in changes written elsewhere
    pub fn sync(&self) -> usize {
        self.document.sync()
    }

    fn validate_date_of_birth(&self, input: &str) -> Result<NaiveDate, ProfileValidationError> {
        let date_of_birth = NaiveDate::parse_from_str(input.trim(), DATE_OF_BIRTH_FORMAT)
            .map_err(|_| ProfileValidationError::InvalidDateOfBirth(input.to_string()))?;
        if date_of_birth > self.time_source.today() {
            return Err(ProfileValidationError::BirthInFuture);
        }
        Ok(date_of_birth)
    }

    fn validate_target_age(
        &self,
        requested: Option<u32>,
        date_of_birth: NaiveDate,
    ) -> Result<TargetAge, ProfileValidationError> {
        let target_age = match requested {
            Some(years) => {
                TargetAge::new(years).map_err(|e| ProfileValidationError::TargetAgeOutOfRange(e.value))?
            }
            None => TargetAge::default(),
        };

        let current_age = approximate_age_years(date_of_birth, self.time_source.today());
        if i64::from(target_age.years()) < current_age {
            return Err(ProfileValidationError::TargetBelowCurrentAge {
                target_age: target_age.years(),
                current_age,
            });
        }
        Ok(target_age)
    }
}

fn validate_name(input: &str) -> Result<String, ProfileValidationError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(ProfileValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ProfileValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::clock::FixedTimeSource;
    use crate::backend::storage::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};
    use shared::DailyGoal;

    fn setup() -> (ProfileService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let time_source = Arc::new(FixedTimeSource(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()));
        let service = ProfileService::new(store.clone(), ChangeFeed::new(), time_source);
        (service, store)
    }

    fn create(name: &str, dob: &str) -> CreateProfileCommand {
        CreateProfileCommand {
            name: name.to_string(),
            date_of_birth: dob.to_string(),
            target_age: None,
        }
    }

    fn validation_error(err: anyhow::Error) -> ProfileValidationError {
        match err.downcast::<ProfileValidationError>() {
            Ok(e) => e,
            Err(other) => panic!("expected validation error, got {:#}", other),
        }
    }

    #[test]
    fn test_first_profile_becomes_active() {
        let (service, _store) = setup();
        assert!(!service.has_profiles());
        assert!(service.active_profile().is_none());

        let alice = service.add_profile(create("  Alice ", "1990-06-15")).unwrap();
        let bob = service.add_profile(create("Bob", "1985-01-01")).unwrap();

        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.target_age, TargetAge::default());
        assert!(service.has_profiles());
        assert_eq!(service.active_profile().unwrap().id, alice.id);
        assert_eq!(service.list_profiles().len(), 2);
        assert_ne!(alice.id, bob.id);
    }

    #[test]
    fn test_document_shape_is_camel_case() {
        let (service, store) = setup();
        service.add_profile(create("Alice", "1990-06-15")).unwrap();

        let raw = store.get(PROFILES_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(json["activeProfileId"].is_string());
        assert_eq!(json["profiles"][0]["dateOfBirth"], "1990-06-15");
        assert_eq!(json["profiles"][0]["targetAge"], 80);
        assert!(json["goals"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_add_profile_validation() {
        let (service, _store) = setup();

        let err = service.add_profile(create("   ", "1990-06-15")).unwrap_err();
        assert_eq!(validation_error(err), ProfileValidationError::EmptyName);

        let err = service.add_profile(create(&"x".repeat(51), "1990-06-15")).unwrap_err();
        assert_eq!(validation_error(err), ProfileValidationError::NameTooLong);
        assert!(service.add_profile(create(&"x".repeat(50), "1990-06-15")).is_ok());

        let err = service.add_profile(create("Alice", "15/06/1990")).unwrap_err();
        assert!(matches!(validation_error(err), ProfileValidationError::InvalidDateOfBirth(_)));

        let tomorrow = (Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap().with_timezone(&chrono::Local)
            + Duration::days(1))
        .date_naive();
        let err = service
            .add_profile(create("Alice", &tomorrow.format("%Y-%m-%d").to_string()))
            .unwrap_err();
        assert_eq!(validation_error(err), ProfileValidationError::BirthInFuture);
    }

    #[test]
    fn test_target_age_rules() {
        let (service, _store) = setup();

        let mut command = create("Alice", "1990-06-15");
        command.target_age = Some(0);
        assert_eq!(
            validation_error(service.add_profile(command.clone()).unwrap_err()),
            ProfileValidationError::TargetAgeOutOfRange(0)
        );

        command.target_age = Some(151);
        assert_eq!(
            validation_error(service.add_profile(command.clone()).unwrap_err()),
            ProfileValidationError::TargetAgeOutOfRange(151)
        );

        command.target_age = Some(30);
        assert!(matches!(
            validation_error(service.add_profile(command.clone()).unwrap_err()),
            ProfileValidationError::TargetBelowCurrentAge { target_age: 30, current_age: 33 | 34 }
        ));

        command.target_age = Some(34);
        let profile = service.add_profile(command).unwrap();
        assert_eq!(profile.target_age.years(), 34);
    }

    #[test]
    fn test_update_profile() {
        let (service, _store) = setup();
        let alice = service.add_profile(create("Alice", "1990-06-15")).unwrap();

        let updated = service
            .update_profile(UpdateProfileCommand {
                profile_id: alice.id.clone(),
                name: Some("Alicia".to_string()),
                target_age: Some(95),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.target_age.years(), 95);
        assert_eq!(updated.date_of_birth, alice.date_of_birth);
        assert_eq!(updated.created_at, alice.created_at);
        assert_eq!(service.get_profile(&alice.id).unwrap(), updated);

        let err = service
            .update_profile(UpdateProfileCommand {
                profile_id: "missing".to_string(),
                name: Some("Nobody".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(validation_error(err), ProfileValidationError::ProfileNotFound(_)));
    }

    #[test]
    fn test_delete_profile_cascades_and_reassigns_active() {
        let (service, _store) = setup();
        let alice = service.add_profile(create("Alice", "1990-06-15")).unwrap();
        let bob = service.add_profile(create("Bob", "1985-01-01")).unwrap();

        let goal_for = |profile_id: &str| DailyGoal {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            created_at: None,
            goal: "walk".to_string(),
            completed: false,
        };
        let (alice_goal, bob_goal) = (goal_for(&alice.id), goal_for(&bob.id));
        service
            .document()
            .update(move |prev| {
                let mut next = prev.clone();
                next.goals.push(alice_goal);
                next.goals.push(bob_goal);
                next
            })
            .unwrap();

        let result = service.delete_profile(&alice.id).unwrap();
        assert_eq!(result.deleted.id, alice.id);
        assert_eq!(result.removed_goals, 1);
        assert_eq!(result.active_profile_id.as_deref(), Some(bob.id.as_str()));
        assert_eq!(service.active_profile().unwrap().id, bob.id);
        assert_eq!(service.document().get().goals.len(), 1);

        let result = service.delete_profile(&bob.id).unwrap();
        assert_eq!(result.active_profile_id, None);
        assert!(!service.has_profiles());
        assert!(service.active_profile().is_none());
    }

    #[test]
    fn test_delete_inactive_profile_keeps_active() {
        let (service, _store) = setup();
        let alice = service.add_profile(create("Alice", "1990-06-15")).unwrap();
        let bob = service.add_profile(create("Bob", "1985-01-01")).unwrap();

        service.delete_profile(&bob.id).unwrap();
        assert_eq!(service.active_profile().unwrap().id, alice.id);

        assert!(service.delete_profile(&bob.id).is_err());
    }

    #[test]
    fn test_set_active_profile() {
        let (service, _store) = setup();
        service.add_profile(create("Alice", "1990-06-15")).unwrap();
        let bob = service.add_profile(create("Bob", "1985-01-01")).unwrap();

        service.set_active_profile(&bob.id).unwrap();
        assert_eq!(service.active_profile().unwrap().id, bob.id);

        let err = service.set_active_profile("missing").unwrap_err();
        assert!(matches!(validation_error(err), ProfileValidationError::ProfileNotFound(_)));
        assert_eq!(service.active_profile().unwrap().id, bob.id);
    }

    #[test]
    fn test_second_service_sees_changes_after_sync() {
        let store = Arc::new(MemoryStore::new());
        let feed = ChangeFeed::new();
        let time_source: Arc<dyn TimeSource> =
            Arc::new(FixedTimeSource(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()));
        let first = ProfileService::new(store.clone(), feed.clone(), time_source.clone());
        let second = ProfileService::new(store, feed, time_source);

        first.add_profile(create("Alice", "1990-06-15")).unwrap();
        assert!(!second.has_profiles());
        assert_eq!(second.sync(), 1);
        assert!(second.has_profiles());
    }
}
