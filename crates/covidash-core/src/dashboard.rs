//! Page-level controller.
//!
//! `Dashboard` owns the cached summary and region list, the reports for the
//! selected country, and the two search-select controls (country, then
//! province/city). Fetches run in spawned tasks and report back over a
//! channel that the UI drains with [`Dashboard::poll`] once per tick.
//!
//! Every country-reports request is tagged with a sequence number and the
//! ISO code it was issued for. A response is applied only while that tag is
//! still the current one, so a slow response for a previously selected
//! country can never overwrite the current country's data.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ReportSource};
use crate::cache::{CacheManager, REGIONS_CACHE_KEY, SUMMARY_CACHE_KEY};
use crate::config::Config;
use crate::models::{dedup_by_iso, CountryReport, GlobalStats, Region};
use crate::search::{
    build_index, filter, Combobox, ComboboxConfig, IndexCounts, SearchableItem,
};
use crate::utils::cmp_ignore_case;

/// Buffer size for the fetch result channel.
/// At most three fetches are in flight in normal use.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// The most specific thing the user has selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    Region(&'a Region),
    Location(&'a SearchableItem),
}

/// Which search-select control is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Region,
    Location,
}

/// Tunables and presentation parameters for a dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub region_ttl: Duration,
    pub summary_ttl: Duration,
    pub request_timeout: Duration,
    pub region_combobox: ComboboxConfig,
    pub location_combobox: ComboboxConfig,
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            region_ttl: config.region_ttl(),
            summary_ttl: config.summary_ttl(),
            request_timeout: config.request_timeout(),
            region_combobox: ComboboxConfig::default(),
            location_combobox: ComboboxConfig::default(),
        }
    }
}

/// Results sent back from fetch tasks.
enum FetchResult {
    Summary(Result<GlobalStats, ApiError>),
    Regions(Result<Vec<Region>, ApiError>),
    CountryReports {
        seq: u64,
        iso: String,
        result: Result<Vec<CountryReport>, ApiError>,
    },
}

/// Which fetch an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Summary,
    Regions,
    CountryReports,
}

impl FetchKind {
    fn label(self) -> &'static str {
        match self {
            FetchKind::Summary => "Summary",
            FetchKind::Regions => "Regions",
            FetchKind::CountryReports => "Country reports",
        }
    }
}

/// Tag of the country-reports request whose answer is still wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReportsRequest {
    seq: u64,
    iso: String,
}

pub struct Dashboard {
    source: Arc<dyn ReportSource>,
    cache: Arc<CacheManager>,
    settings: DashboardSettings,

    tx: mpsc::Sender<FetchResult>,
    rx: mpsc::Receiver<FetchResult>,

    global: Option<GlobalStats>,
    regions: Vec<Region>,
    reports: Vec<CountryReport>,
    index: Vec<SearchableItem>,

    region_select: Combobox<Region>,
    location_select: Combobox<SearchableItem>,

    summary_loading: bool,
    regions_loading: bool,
    request_seq: u64,
    current_request: Option<ReportsRequest>,
    pending_restore: Option<String>,

    last_error: Option<(FetchKind, String)>,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn ReportSource>,
        cache: Arc<CacheManager>,
        settings: DashboardSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let region_select = Combobox::new(settings.region_combobox.clone(), None);
        let location_select = Combobox::new(settings.location_combobox.clone(), None);

        Self {
            source,
            cache,
            settings,
            tx,
            rx,
            global: None,
            regions: Vec::new(),
            reports: Vec::new(),
            index: Vec::new(),
            region_select,
            location_select,
            summary_loading: false,
            regions_loading: false,
            request_seq: 0,
            current_request: None,
            pending_restore: None,
            last_error: None,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Start loading the worldwide totals and the region list through the
    /// cache. Must be called inside a Tokio runtime.
    pub fn load_initial(&mut self) {
        info!("Loading summary and regions");
        self.summary_loading = true;
        self.regions_loading = true;

        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let ttl = self.settings.summary_ttl;
        let timeout = self.settings.request_timeout;
        tokio::spawn(async move {
            let result = cache
                .get(SUMMARY_CACHE_KEY, ttl, || {
                    with_timeout(timeout, source.global_summary())
                })
                .await;
            send_result(&tx, FetchResult::Summary(result)).await;
        });

        let cache = Arc::clone(&self.cache);
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let ttl = self.settings.region_ttl;
        tokio::spawn(async move {
            let result = cache
                .get(REGIONS_CACHE_KEY, ttl, || async {
                    let raw = with_timeout(timeout, source.regions()).await?;
                    let dedup = dedup_by_iso(raw);
                    if dedup.dropped > 0 {
                        warn!(dropped = dedup.dropped, "Dropped regions with duplicate ISO codes");
                    }
                    Ok::<_, ApiError>(dedup.regions)
                })
                .await;
            send_result(&tx, FetchResult::Regions(result)).await;
        });
    }

    /// Drop both cached lists and load them again.
    pub fn refresh(&mut self) {
        self.cache.clear(SUMMARY_CACHE_KEY);
        self.cache.clear(REGIONS_CACHE_KEY);
        self.last_error = None;
        self.load_initial();
        if let Some(region) = self.region_select.selected().cloned() {
            self.start_reports_fetch(&region);
        }
    }

    /// Select the country with this ISO code once the region list is
    /// available (immediately if it already is).
    pub fn restore_region(&mut self, iso: impl Into<String>) {
        let iso = iso.into();
        if self.regions.is_empty() {
            self.pending_restore = Some(iso);
        } else {
            self.apply_restore(&iso);
        }
    }

    fn apply_restore(&mut self, iso: &str) {
        match self.regions.iter().find(|r| r.iso == iso).cloned() {
            Some(region) => {
                debug!(iso, "Restoring last selected region");
                self.on_region_selected(region);
            }
            None => debug!(iso, "Last selected region no longer listed"),
        }
    }

    fn start_reports_fetch(&mut self, region: &Region) {
        self.request_seq += 1;
        let request = ReportsRequest {
            seq: self.request_seq,
            iso: region.iso.clone(),
        };
        info!(iso = %request.iso, seq = request.seq, "Fetching country reports");
        self.current_request = Some(request.clone());

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let timeout = self.settings.request_timeout;
        tokio::spawn(async move {
            let result = with_timeout(timeout, source.country_reports(&request.iso)).await;
            send_result(
                &tx,
                FetchResult::CountryReports {
                    seq: request.seq,
                    iso: request.iso,
                    result,
                },
            )
            .await;
        });
    }

    /// Apply every fetch that has completed since the last call.
    /// Returns how many results were applied (stale ones excluded).
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.rx.try_recv() {
            if self.apply(result) {
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, result: FetchResult) -> bool {
        match result {
            FetchResult::Summary(result) => {
                self.summary_loading = false;
                match result {
                    Ok(global) => self.global = Some(global),
                    Err(e) => self.report_error(FetchKind::Summary, e),
                }
            }
            FetchResult::Regions(result) => {
                self.regions_loading = false;
                match result {
                    Ok(mut regions) => {
                        regions.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
                        info!(count = regions.len(), "Regions loaded");
                        self.regions = regions;
                        if let Some(iso) = self.pending_restore.take() {
                            self.apply_restore(&iso);
                        }
                    }
                    Err(e) => self.report_error(FetchKind::Regions, e),
                }
            }
            FetchResult::CountryReports { seq, iso, result } => {
                let tag = ReportsRequest { seq, iso };
                if self.current_request.as_ref() != Some(&tag) {
                    debug!(iso = %tag.iso, seq = tag.seq, "Discarding stale country reports");
                    return false;
                }
                self.current_request = None;
                match result {
                    Ok(reports) => {
                        info!(iso = %tag.iso, count = reports.len(), "Country reports loaded");
                        self.index = build_index(&reports);
                        self.reports = reports;
                    }
                    Err(e) => self.report_error(FetchKind::CountryReports, e),
                }
            }
        }
        true
    }

    fn report_error(&mut self, kind: FetchKind, e: ApiError) {
        error!(error = %e, "{} fetch failed", kind.label());
        self.last_error = Some((kind, e.user_message()));
    }

    // =========================================================================
    // Selection events
    // =========================================================================

    /// A country was chosen: reset the location search and fetch its reports.
    pub fn on_region_selected(&mut self, region: Region) {
        self.location_select.clear();
        self.location_select.dismiss();
        self.reports.clear();
        self.index.clear();
        // Summary and region failures stay visible until a refresh
        if matches!(self.last_error, Some((FetchKind::CountryReports, _))) {
            self.last_error = None;
        }
        self.start_reports_fetch(&region);
        self.region_select.pick(region);
    }

    pub fn on_location_selected(&mut self, item: SearchableItem) {
        debug!(name = item.name(), "Location selected");
        self.location_select.pick(item);
    }

    /// Clear the most specific selection: the location if one is chosen,
    /// otherwise the country.
    pub fn on_clear_selection(&mut self) {
        if self.location_select.selected().is_some() {
            self.clear_location();
        } else {
            self.clear_region();
        }
    }

    pub fn clear_location(&mut self) -> bool {
        self.location_select.clear()
    }

    /// Drop the country and everything derived from it. Any in-flight
    /// reports request becomes stale.
    pub fn clear_region(&mut self) -> bool {
        let had_region = self.region_select.clear();
        self.location_select.clear();
        self.location_select.dismiss();
        self.reports.clear();
        self.index.clear();
        self.current_request = None;
        had_region
    }

    // =========================================================================
    // Search-select routing
    // =========================================================================

    /// Open one control. Opening a control is an interaction outside the
    /// other one, so that one is dismissed.
    pub fn open_search(&mut self, target: SearchTarget) {
        match target {
            SearchTarget::Region => {
                self.location_select.dismiss();
                self.region_select.activate();
            }
            SearchTarget::Location => {
                if !self.location_search_available() {
                    return;
                }
                self.region_select.dismiss();
                self.location_select.activate();
            }
        }
    }

    pub fn open_target(&self) -> Option<SearchTarget> {
        if self.region_select.is_open() {
            Some(SearchTarget::Region)
        } else if self.location_select.is_open() {
            Some(SearchTarget::Location)
        } else {
            None
        }
    }

    /// Close whichever control is open, keeping its selection.
    pub fn dismiss_search(&mut self) {
        self.region_select.dismiss();
        self.location_select.dismiss();
    }

    pub fn type_char(&mut self, c: char) {
        match self.open_target() {
            Some(SearchTarget::Region) => self.region_select.push_char(c),
            Some(SearchTarget::Location) => self.location_select.push_char(c),
            None => {}
        }
    }

    pub fn backspace(&mut self) {
        self.region_select.pop_char();
        self.location_select.pop_char();
    }

    pub fn highlight_next(&mut self) {
        match self.open_target() {
            Some(SearchTarget::Region) => {
                let count = self.filtered_regions().len();
                self.region_select.highlight_next(count);
            }
            Some(SearchTarget::Location) => {
                let count = self.filtered_search_results().len();
                self.location_select.highlight_next(count);
            }
            None => {}
        }
    }

    pub fn highlight_prev(&mut self) {
        self.region_select.highlight_prev();
        self.location_select.highlight_prev();
    }

    /// Pick the highlighted entry of the open control.
    pub fn confirm_highlighted(&mut self) {
        let index = match self.open_target() {
            Some(SearchTarget::Region) => self.region_select.highlighted(),
            Some(SearchTarget::Location) => self.location_select.highlighted(),
            None => return,
        };
        self.pick_result(index);
    }

    /// Pick entry `index` of the list the open control is showing.
    /// Returns false when nothing is listed there.
    pub fn pick_result(&mut self, index: usize) -> bool {
        match self.open_target() {
            Some(SearchTarget::Region) => {
                let picked = self.filtered_regions().get(index).map(|r| (*r).clone());
                match picked {
                    Some(region) => {
                        self.on_region_selected(region);
                        true
                    }
                    None => false,
                }
            }
            Some(SearchTarget::Location) => {
                let picked = self
                    .filtered_search_results()
                    .get(index)
                    .map(|i| (*i).clone());
                match picked {
                    Some(item) => {
                        self.on_location_selected(item);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    // =========================================================================
    // State for renderers
    // =========================================================================

    pub fn current_regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn filtered_regions(&self) -> Vec<&Region> {
        filter(&self.regions, self.region_select.search_term())
    }

    pub fn current_selection(&self) -> Option<Selection<'_>> {
        if let Some(item) = self.location_select.selected() {
            Some(Selection::Location(item))
        } else {
            self.region_select.selected().map(Selection::Region)
        }
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.region_select.selected()
    }

    pub fn selected_location(&self) -> Option<&SearchableItem> {
        self.location_select.selected()
    }

    pub fn filtered_search_results(&self) -> Vec<&SearchableItem> {
        filter(&self.index, self.location_select.search_term())
    }

    pub fn index_counts(&self) -> IndexCounts {
        IndexCounts::of(&self.index)
    }

    pub fn region_select(&self) -> &Combobox<Region> {
        &self.region_select
    }

    pub fn location_select(&self) -> &Combobox<SearchableItem> {
        &self.location_select
    }

    /// Narrowing by province/city only makes sense for a country reported
    /// in more than one part.
    pub fn location_search_available(&self) -> bool {
        self.region_select.selected().is_some() && self.reports.len() > 1
    }

    pub fn global(&self) -> Option<&GlobalStats> {
        self.global.as_ref()
    }

    pub fn reports(&self) -> &[CountryReport] {
        &self.reports
    }

    pub fn is_loading(&self) -> bool {
        self.summary_loading || self.regions_loading || self.is_loading_reports()
    }

    pub fn is_loading_summary(&self) -> bool {
        self.summary_loading
    }

    pub fn is_loading_reports(&self) -> bool {
        self.current_request.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|(_, message)| message.as_str())
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Age of the cached summary, for the status bar.
    pub fn summary_age(&self) -> Option<String> {
        self.cache.age(SUMMARY_CACHE_KEY)
    }
}

/// Bound a fetch by `timeout`, reporting expiry as a transport error.
async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(ApiError::Timeout))
}

/// Helper to send fetch results, logging any channel errors
async fn send_result(tx: &mpsc::Sender<FetchResult>, result: FetchResult) {
    if tx.send(result).await.is_err() {
        error!("Failed to send fetch result - channel closed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::models::{City, ReportRegion};
    use crate::search::ItemKind;
    use futures::future::{BoxFuture, FutureExt};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSource {
        summary: Option<GlobalStats>,
        regions: Vec<Region>,
        /// Per-ISO response delay and reports
        reports: HashMap<String, (Duration, Vec<CountryReport>)>,
        summary_delay: Duration,
        regions_delay: Duration,
        summary_calls: AtomicUsize,
        region_calls: AtomicUsize,
    }

    impl ReportSource for FakeSource {
        fn global_summary(&self) -> BoxFuture<'_, Result<GlobalStats, ApiError>> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(self.summary_delay).await;
                self.summary
                    .clone()
                    .ok_or_else(|| ApiError::ServerError("unavailable".to_string()))
            }
            .boxed()
        }

        fn regions(&self) -> BoxFuture<'_, Result<Vec<Region>, ApiError>> {
            self.region_calls.fetch_add(1, Ordering::SeqCst);
            let regions = self.regions.clone();
            async move {
                tokio::time::sleep(self.regions_delay).await;
                Ok(regions)
            }
            .boxed()
        }

        fn country_reports<'a>(
            &'a self,
            iso: &'a str,
        ) -> BoxFuture<'a, Result<Vec<CountryReport>, ApiError>> {
            async move {
                let (delay, reports) = self.reports.get(iso).cloned().unwrap_or_default();
                tokio::time::sleep(delay).await;
                Ok(reports)
            }
            .boxed()
        }
    }

    fn province(iso: &str, name: &str, cities: &[&str]) -> CountryReport {
        CountryReport {
            confirmed: 1000,
            region: ReportRegion {
                iso: iso.to_string(),
                name: iso.to_string(),
                province: name.to_string(),
                cities: cities
                    .iter()
                    .map(|c| City {
                        name: c.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fake() -> FakeSource {
        let mut reports = HashMap::new();
        reports.insert(
            "CAN".to_string(),
            (
                Duration::from_millis(500),
                vec![
                    province("CAN", "Ontario", &["Toronto", "Ottawa"]),
                    province("CAN", "Quebec", &["Montreal"]),
                ],
            ),
        );
        reports.insert(
            "USA".to_string(),
            (
                Duration::from_millis(50),
                vec![
                    province("USA", "Texas", &["Austin"]),
                    province("USA", "Ohio", &[]),
                ],
            ),
        );
        reports.insert(
            "MCO".to_string(),
            (Duration::from_millis(10), vec![province("MCO", "", &[])]),
        );

        FakeSource {
            summary: Some(GlobalStats {
                confirmed: 676_570_149,
                ..Default::default()
            }),
            regions: vec![
                Region::new("USA", "US"),
                Region::new("CAN", "Canada"),
                Region::new("USA", "US (dup)"),
                Region::new("MCO", "Monaco"),
            ],
            reports,
            ..Default::default()
        }
    }

    fn settings() -> DashboardSettings {
        DashboardSettings::from_config(&Config::default())
    }

    fn dashboard(source: Arc<FakeSource>, cache: Arc<CacheManager>) -> Dashboard {
        Dashboard::new(source, cache, settings())
    }

    fn memory_cache() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(Arc::new(MemoryStore::new())))
    }

    /// Let spawned fetches finish, then apply them.
    async fn settle(dashboard: &mut Dashboard) -> usize {
        tokio::time::sleep(Duration::from_secs(5)).await;
        dashboard.poll()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_dedups_and_sorts_regions() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source.clone(), memory_cache());

        dash.load_initial();
        assert!(dash.is_loading());
        assert_eq!(settle(&mut dash).await, 2);

        assert!(!dash.is_loading());
        assert_eq!(dash.global().map(|g| g.confirmed), Some(676_570_149));
        let names: Vec<&str> = dash.current_regions().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Canada", "Monaco", "US"]);
        assert_eq!(dash.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_dashboard_is_served_from_cache() {
        let source = Arc::new(fake());
        let cache = memory_cache();

        let mut first = dashboard(source.clone(), Arc::clone(&cache));
        first.load_initial();
        settle(&mut first).await;

        let mut second = dashboard(source.clone(), cache);
        second.load_initial();
        settle(&mut second).await;

        assert_eq!(source.region_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.summary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.current_regions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_refetches() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source.clone(), memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        dash.refresh();
        settle(&mut dash).await;
        assert_eq!(source.region_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.summary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_during_initial_load_refetches() {
        let source = Arc::new(FakeSource {
            regions_delay: Duration::from_secs(2),
            ..fake()
        });
        let mut dash = dashboard(source.clone(), memory_cache());
        dash.load_initial();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.region_calls.load(Ordering::SeqCst), 1);

        dash.refresh();
        settle(&mut dash).await;
        assert_eq!(source.region_calls.load(Ordering::SeqCst), 2);
        assert_eq!(dash.current_regions().len(), 3);
        assert!(!dash.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_error_survives_region_selection() {
        let source = Arc::new(FakeSource {
            summary: None,
            ..fake()
        });
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        dash.on_region_selected(Region::new("CAN", "Canada"));
        settle(&mut dash).await;
        assert_eq!(
            dash.last_error(),
            Some("Failed to load data: Server error: unavailable")
        );

        dash.dismiss_error();
        assert_eq!(dash.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_failure_surfaces_error() {
        let source = Arc::new(FakeSource {
            summary: None,
            ..fake()
        });
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        assert!(dash.global().is_none());
        assert!(!dash.is_loading());
        assert_eq!(
            dash.last_error(),
            Some("Failed to load data: Server error: unavailable")
        );
        // Regions still load independently
        assert_eq!(dash.current_regions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let source = Arc::new(FakeSource {
            summary_delay: Duration::from_secs(120),
            ..fake()
        });
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        tokio::time::sleep(Duration::from_secs(31)).await;
        dash.poll();

        assert!(!dash.is_loading_summary());
        assert_eq!(dash.last_error(), Some("The server took too long to respond"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_region_selection_builds_index() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        dash.on_region_selected(Region::new("CAN", "Canada"));
        assert!(dash.is_loading_reports());
        assert!(!dash.location_search_available());
        settle(&mut dash).await;

        assert!(!dash.is_loading_reports());
        assert_eq!(dash.reports().len(), 2);
        assert!(dash.location_search_available());
        let names: Vec<&str> = dash.filtered_search_results().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Montreal", "Ontario", "Ottawa", "Quebec", "Toronto"]);
        assert_eq!(
            dash.index_counts(),
            IndexCounts {
                provinces: 2,
                cities: 3
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_country_response_is_discarded() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        // Canada responds after 500ms, US after 50ms: Canada resolves last
        dash.on_region_selected(Region::new("CAN", "Canada"));
        dash.on_region_selected(Region::new("USA", "US"));
        assert_eq!(settle(&mut dash).await, 1);

        assert_eq!(dash.selected_region().map(|r| r.iso.as_str()), Some("USA"));
        assert!(dash.reports().iter().all(|r| r.region.iso == "USA"));
        assert_eq!(dash.reports().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselecting_same_region_only_applies_latest() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        dash.on_region_selected(Region::new("USA", "US"));
        dash.on_region_selected(Region::new("USA", "US"));
        assert_eq!(settle(&mut dash).await, 1);
        assert_eq!(dash.reports().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_region_discards_in_flight_reports() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        dash.on_region_selected(Region::new("CAN", "Canada"));
        assert!(dash.clear_region());
        assert_eq!(settle(&mut dash).await, 0);

        assert!(dash.reports().is_empty());
        assert!(dash.current_selection().is_none());
        assert!(!dash.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_report_country_has_no_location_search() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        dash.on_region_selected(Region::new("MCO", "Monaco"));
        settle(&mut dash).await;
        assert_eq!(dash.reports().len(), 1);
        assert!(!dash.location_search_available());

        dash.open_search(SearchTarget::Location);
        assert_eq!(dash.open_target(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_search_flow_and_clear_selection() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());
        dash.on_region_selected(Region::new("CAN", "Canada"));
        settle(&mut dash).await;

        dash.open_search(SearchTarget::Location);
        assert_eq!(dash.open_target(), Some(SearchTarget::Location));
        for c in "tor".chars() {
            dash.type_char(c);
        }
        let names: Vec<&str> = dash.filtered_search_results().iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Toronto"]);

        dash.confirm_highlighted();
        assert_eq!(dash.open_target(), None);
        match dash.current_selection() {
            Some(Selection::Location(item)) => {
                assert_eq!(item.name(), "Toronto");
                assert_eq!(item.kind(), ItemKind::City);
                assert_eq!(item.parent_province_name(), Some("Ontario"));
            }
            other => panic!("expected a location selection, got {:?}", other),
        }
        // Search term was cleared on pick, the full list is back
        assert_eq!(dash.filtered_search_results().len(), 5);

        dash.on_clear_selection();
        assert!(matches!(dash.current_selection(), Some(Selection::Region(r)) if r.iso == "CAN"));
        dash.on_clear_selection();
        assert!(dash.current_selection().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opening_one_search_dismisses_the_other() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        dash.on_region_selected(Region::new("CAN", "Canada"));
        settle(&mut dash).await;

        dash.open_search(SearchTarget::Region);
        dash.type_char('u');
        dash.open_search(SearchTarget::Location);

        assert!(!dash.region_select().is_open());
        assert_eq!(dash.region_select().search_term(), "");
        assert_eq!(dash.selected_region().map(|r| r.iso.as_str()), Some("CAN"));
        assert!(dash.location_select().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_region_search_by_keyboard() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        dash.open_search(SearchTarget::Region);
        dash.highlight_next();
        dash.highlight_next();
        dash.highlight_next();
        dash.highlight_prev();
        dash.confirm_highlighted();
        assert_eq!(dash.selected_region().map(|r| r.iso.as_str()), Some("MCO"));
        assert!(dash.is_loading_reports());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pick_result_out_of_range_keeps_control_open() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        assert!(!dash.pick_result(0));
        dash.open_search(SearchTarget::Region);
        dash.type_char('z');
        assert!(!dash.pick_result(0));
        assert_eq!(dash.open_target(), Some(SearchTarget::Region));

        dash.backspace();
        assert!(dash.pick_result(2));
        assert_eq!(dash.selected_region().map(|r| r.iso.as_str()), Some("USA"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_region_waits_for_region_list() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());

        dash.restore_region("CAN");
        assert!(dash.selected_region().is_none());

        dash.load_initial();
        settle(&mut dash).await;
        assert_eq!(dash.selected_region().map(|r| r.iso.as_str()), Some("CAN"));

        settle(&mut dash).await;
        assert_eq!(dash.reports().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_unknown_region_is_ignored() {
        let source = Arc::new(fake());
        let mut dash = dashboard(source, memory_cache());
        dash.load_initial();
        settle(&mut dash).await;

        dash.restore_region("ATL");
        assert!(dash.selected_region().is_none());
        assert!(!dash.is_loading());
    }
}
