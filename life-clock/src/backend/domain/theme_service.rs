//! Light/dark preference, persisted under `memento-theme`.

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::Theme;

pub const THEME_KEY: &str = "memento-theme";

#[derive(Clone)]
pub struct ThemeService {
    document: Arc<StoredDocument<Theme>>,
}

impl ThemeService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed) -> Self {
        Self {
            document: Arc::new(StoredDocument::open(THEME_KEY, store, feed)),
        }
    }

    pub fn theme(&self) -> Theme {
        *self.document.get()
    }

    pub fn is_dark(&self) -> bool {
        self.theme() == Theme::Dark
    }

    pub fn set_theme(&self, theme: Theme) -> Result<Theme> {
        self.document.replace(theme)?;
        info!("Theme set to {}", theme);
        Ok(theme)
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let theme = *self.document.update(|prev| prev.toggled())?;
        info!("Theme toggled to {}", theme);
        Ok(theme)
    }

    pub fn sync(&self) -> usize {
        self.document.sync()
    }
}
