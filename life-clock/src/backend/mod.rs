//! # Backend Module
//!
//! Wires storage, configuration and every domain service together for the
//! terminal front end (or any other presentation layer).

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod config;
pub mod domain;
pub mod storage;

use config::AppConfig;
use domain::clock::{ClockError, MonotonicTimeSource, TimeSource};
use domain::live_age::{derive_live_age, LiveAgeController};
use domain::quote_service::{HttpQuoteSource, QuoteSource};
use domain::week_grid::{project, WeekGrid};
use storage::{ChangeFeed, FileStore, FileWatcher, KeyValueStore, MemoryStore};

/// Main backend struct that owns all services
pub struct Backend {
    pub config: AppConfig,
    pub profile_service: domain::ProfileService,
    pub goal_service: domain::GoalService,
    pub milestone_service: domain::MilestoneService,
    pub journal_service: domain::JournalService,
    pub bucket_list_service: domain::BucketListService,
    pub theme_service: domain::ThemeService,
    pub quote_service: domain::QuoteService,
    data_directory: Option<PathBuf>,
    store: Arc<dyn KeyValueStore>,
    feed: ChangeFeed,
    time_source: Arc<dyn TimeSource>,
    watcher: Option<FileWatcher>,
}

impl Backend {
    /// Open the backend on a data directory, loading or creating its config
    pub fn open(data_directory: &Path) -> Result<Self> {
        let store = Arc::new(FileStore::new(data_directory)?);
        let config = AppConfig::load_or_create(data_directory)?;
        let quote_source = Arc::new(HttpQuoteSource::new(&config.quote_api_url, config.quote_timeout())?);
        let time_source = Arc::new(MonotonicTimeSource::new());

        info!("Opening backend in {}", data_directory.display());
        let mut backend = Self::with_store(store, config, time_source, quote_source);
        backend.data_directory = Some(data_directory.to_path_buf());
        Ok(backend)
    }

    /// Backend that keeps everything in memory
    pub fn in_memory(config: AppConfig, time_source: Arc<dyn TimeSource>) -> Result<Self> {
        let quote_source = Arc::new(HttpQuoteSource::new(&config.quote_api_url, config.quote_timeout())?);
        Ok(Self::with_store(Arc::new(MemoryStore::new()), config, time_source, quote_source))
    }

    pub fn with_store(
        store: Arc<dyn KeyValueStore>,
        config: AppConfig,
        time_source: Arc<dyn TimeSource>,
        quote_source: Arc<dyn QuoteSource>,
    ) -> Self {
        let feed = ChangeFeed::new();

        let profile_service = domain::ProfileService::new(store.clone(), feed.clone(), time_source.clone());
        let goal_service = domain::GoalService::new(&profile_service);
        let milestone_service = domain::MilestoneService::new(store.clone(), feed.clone(), time_source.clone());
        let journal_service = domain::JournalService::new(store.clone(), feed.clone(), time_source.clone());
        let bucket_list_service = domain::BucketListService::new(store.clone(), feed.clone(), time_source.clone());
        let theme_service = domain::ThemeService::new(store.clone(), feed.clone());
        let quote_service = domain::QuoteService::new(store.clone(), feed.clone(), quote_source);

        Backend {
            config,
            profile_service,
            goal_service,
            milestone_service,
            journal_service,
            bucket_list_service,
            theme_service,
            quote_service,
            data_directory: None,
            store,
            feed,
            time_source,
            watcher: None,
        }
    }

    pub fn data_directory(&self) -> Option<&Path> {
        self.data_directory.as_deref()
    }

    pub fn change_feed(&self) -> ChangeFeed {
        self.feed.clone()
    }

    pub fn time_source(&self) -> Arc<dyn TimeSource> {
        self.time_source.clone()
    }

    /// Start reporting writes made by other processes. Needs a tokio runtime.
    pub fn start_watching(&mut self) -> Result<()> {
        if self.watcher.is_none() {
            let watcher = FileWatcher::spawn(self.store.clone(), self.feed.clone(), self.config.watch_poll())?;
            self.watcher = Some(watcher);
        }
        Ok(())
    }

    /// Apply pending changes to every service. Returns how many were applied.
    pub fn sync(&self) -> usize {
        self.profile_service.sync()
            + self.milestone_service.sync()
            + self.journal_service.sync()
            + self.bucket_list_service.sync()
            + self.theme_service.sync()
    }

    /// Controller already following the active profile, idle if there is none
    pub fn live_age_for_active_profile(&self, interval_ms: u64) -> Result<LiveAgeController, ClockError> {
        let mut controller = LiveAgeController::new(self.time_source.clone()).with_interval(interval_ms);
        self.follow_active_profile(&mut controller)?;
        Ok(controller)
    }

    /// Apply pending changes, then point `controller` at the active profile's
    /// birth and target age. Returns true when the controller was restarted.
    pub fn follow_active_profile(&self, controller: &mut LiveAgeController) -> Result<bool, ClockError> {
        self.sync();

        let wanted = self
            .profile_service
            .active_profile()
            .map(|profile| (profile.birth_instant(), profile.target_age));
        let current = controller.birth().map(|birth| (birth, controller.target_age()));
        if wanted == current {
            return Ok(false);
        }

        match wanted {
            Some((birth, target_age)) => {
                if controller.target_age() != target_age {
                    controller.set_target_age(target_age)?;
                }
                if controller.birth() != Some(birth) {
                    controller.set_birth(Some(birth))?;
                }
                info!("Live age now follows birth={} target_age={}", birth.naive(), target_age);
            }
            None => {
                controller.set_birth(None)?;
                info!("No active profile, live age cleared");
            }
        }
        Ok(true)
    }

    /// Week grid of the active profile at this moment
    pub fn week_grid_now(&self) -> Option<WeekGrid> {
        let profile = self.profile_service.active_profile()?;
        let live = derive_live_age(&profile.birth_instant(), profile.target_age, self.time_source.now());
        Some(project(&live.insights, profile.target_age))
    }
}
