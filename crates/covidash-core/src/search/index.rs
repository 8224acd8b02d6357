//! Hierarchical search index over provinces and their cities.

use crate::models::{City, CountryReport, Region};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

/// Anything a combobox can list and match against a search term.
pub trait Searchable {
    /// Name shown in lists and used for ordering.
    fn search_name(&self) -> &str;

    /// Whether this item matches a non-empty search term.
    fn matches(&self, term: &str) -> bool {
        contains_ignore_case(self.search_name(), term)
    }
}

impl Searchable for Region {
    fn search_name(&self) -> &str {
        &self.name
    }

    /// Countries are also found by ISO code ("TUR", "usa").
    fn matches(&self, term: &str) -> bool {
        contains_ignore_case(&self.name, term) || contains_ignore_case(&self.iso, term)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Province,
    City,
}

/// A province or a city, flattened for unified search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchableItem {
    Province {
        name: String,
        source_report: CountryReport,
    },
    City {
        name: String,
        /// Display name of the province the city was listed under.
        parent_province_name: String,
        source_city: City,
    },
}

impl SearchableItem {
    pub fn name(&self) -> &str {
        match self {
            SearchableItem::Province { name, .. } | SearchableItem::City { name, .. } => name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            SearchableItem::Province { .. } => ItemKind::Province,
            SearchableItem::City { .. } => ItemKind::City,
        }
    }

    pub fn parent_province_name(&self) -> Option<&str> {
        match self {
            SearchableItem::Province { .. } => None,
            SearchableItem::City {
                parent_province_name,
                ..
            } => Some(parent_province_name),
        }
    }

    pub fn confirmed(&self) -> i64 {
        match self {
            SearchableItem::Province { source_report, .. } => source_report.confirmed,
            SearchableItem::City { source_city, .. } => source_city.confirmed,
        }
    }
}

impl Searchable for SearchableItem {
    fn search_name(&self) -> &str {
        self.name()
    }
}

/// Flatten reports into one list: a province item per report followed by a
/// city item per nested city, then sorted by name.
///
/// The sort is stable, so items with equal names keep their input order.
pub fn build_index(reports: &[CountryReport]) -> Vec<SearchableItem> {
    let city_count: usize = reports.iter().map(|r| r.region.cities.len()).sum();
    let mut items = Vec::with_capacity(reports.len() + city_count);

    for report in reports {
        let province_name = report.display_name();
        items.push(SearchableItem::Province {
            name: province_name.to_string(),
            source_report: report.clone(),
        });

        for city in &report.region.cities {
            items.push(SearchableItem::City {
                name: city.name.clone(),
                parent_province_name: province_name.to_string(),
                source_city: city.clone(),
            });
        }
    }

    items.sort_by(|a, b| cmp_ignore_case(a.name(), b.name()));
    items
}

/// Items whose name contains `term`, in index order.
///
/// A blank term returns every item.
pub fn filter<'a, T: Searchable>(index: &'a [T], term: &str) -> Vec<&'a T> {
    if term.trim().is_empty() {
        return index.iter().collect();
    }
    index.iter().filter(|item| item.matches(term)).collect()
}

/// Province and city totals for the "N regions • M cities" hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    pub provinces: usize,
    pub cities: usize,
}

impl IndexCounts {
    pub fn of(index: &[SearchableItem]) -> Self {
        let cities = index.iter().filter(|i| i.kind() == ItemKind::City).count();
        Self {
            provinces: index.len() - cities,
            cities,
        }
    }
}

/// What a result list should show. An empty list is never an error, but
/// "nothing to search yet" and "nothing matched" read differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Populated,
    NoQuery,
    NoMatches { term: String },
}

impl ListState {
    pub fn classify<T>(term: &str, results: &[T]) -> Self {
        if !results.is_empty() {
            ListState::Populated
        } else if term.trim().is_empty() {
            ListState::NoQuery
        } else {
            ListState::NoMatches {
                term: term.to_string(),
            }
        }
    }
}
