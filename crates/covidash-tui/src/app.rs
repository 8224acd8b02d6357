//! Application state for the terminal front-end.
//!
//! `App` wraps the core [`Dashboard`] with the bits only a terminal needs:
//! overlay state, the last drawn screen area (for mouse hit-testing) and the
//! scroll position of the province table.

use std::sync::Arc;

use anyhow::Result;
use covidash_core::search::{Accent, ComboboxConfig};
use covidash_core::{ApiClient, CacheManager, Config, Dashboard, DashboardSettings};
use ratatui::layout::Rect;
use tracing::{debug, info, warn};

/// Number of rows to jump in the province table on PgUp/PgDn
pub const PAGE_SCROLL_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

pub fn region_combobox_config() -> ComboboxConfig {
    ComboboxConfig {
        label: "Country".to_string(),
        placeholder: "Search countries...".to_string(),
        icon: "◎".to_string(),
        accent: Accent::Primary,
    }
}

pub fn location_combobox_config() -> ComboboxConfig {
    ComboboxConfig {
        label: "Province / City".to_string(),
        placeholder: "Search provinces and cities...".to_string(),
        icon: "⌖".to_string(),
        accent: Accent::Secondary,
    }
}

pub struct App {
    pub dashboard: Dashboard,
    pub state: AppState,
    pub config: Config,
    /// Area of the last drawn frame
    pub screen: Rect,
    pub province_selection: usize,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        }
        .with_env_overrides();
        debug!(api = config.api_base_url(), "Config loaded");

        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");
        let cache = Arc::new(CacheManager::open(cache_dir)?);
        let client = ApiClient::new(config.api_base_url(), config.request_timeout())?;

        let mut settings = DashboardSettings::from_config(&config);
        settings.region_combobox = region_combobox_config();
        settings.location_combobox = location_combobox_config();

        let dashboard = Dashboard::new(Arc::new(client), cache, settings);
        Ok(Self::with_dashboard(dashboard, config))
    }

    pub fn with_dashboard(dashboard: Dashboard, config: Config) -> Self {
        Self {
            dashboard,
            state: AppState::Normal,
            config,
            screen: Rect::default(),
            province_selection: 0,
        }
    }

    /// Kick off the initial loads and restore the last selected country.
    pub fn start(&mut self) {
        self.dashboard.load_initial();
        if let Some(iso) = self.config.last_region_iso.clone() {
            self.dashboard.restore_region(iso);
        }
    }

    /// Apply completed fetches. Called once per event-loop tick.
    pub fn tick(&mut self) {
        let applied = self.dashboard.poll();
        if applied > 0 {
            let rows = self.dashboard.reports().len();
            if self.province_selection >= rows {
                self.province_selection = rows.saturating_sub(1);
            }
        }
    }

    pub fn refresh(&mut self) {
        info!("Refreshing all data");
        self.dashboard.refresh();
    }

    pub fn select_next_province(&mut self, step: usize) {
        let rows = self.dashboard.reports().len();
        if rows > 0 {
            self.province_selection = (self.province_selection + step).min(rows - 1);
        }
    }

    pub fn select_prev_province(&mut self, step: usize) {
        self.province_selection = self.province_selection.saturating_sub(step);
    }

    /// Remember the current country for the next start.
    pub fn save_selection(&mut self) {
        let iso = self.dashboard.selected_region().map(|r| r.iso.clone());
        if self.config.last_region_iso == iso {
            return;
        }
        self.config.last_region_iso = iso;
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}
