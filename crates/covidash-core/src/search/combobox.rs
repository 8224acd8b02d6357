//! Search-select control state machine.
//!
//! ```text
//!   ClosedEmpty ──activate──▶ Open ◀──activate── ClosedSelected
//!        ▲                    │  │                    ▲   │
//!        │        dismiss     │  │ pick               │   │ clear
//!        └────(no selection)──┘  └────────────────────┘   │
//!        └────────────────────────────────────────────────┘
//! ```
//!
//! The machine never decides what it lists; callers hand it the filtered
//! results when picking by keyboard.

use super::index::Searchable;

/// Visual accent a renderer may map to its own palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accent {
    #[default]
    Primary,
    Secondary,
}

/// Presentation parameters for one combobox instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboboxConfig {
    pub label: String,
    pub placeholder: String,
    pub icon: String,
    pub accent: Accent,
}

impl Default for ComboboxConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            placeholder: "Search...".to_string(),
            icon: String::new(),
            accent: Accent::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboboxState {
    ClosedEmpty,
    ClosedSelected,
    Open,
}

/// The single branch a renderer draws. Open always shows the input, closed
/// shows the selection badge or the placeholder, never both.
#[derive(Debug, PartialEq)]
pub enum ComboboxView<'a, T> {
    Placeholder,
    Selected(&'a T),
    Input { term: &'a str },
}

#[derive(Debug, Clone)]
pub struct Combobox<T> {
    config: ComboboxConfig,
    is_open: bool,
    search_term: String,
    selected: Option<T>,
    highlighted: usize,
}

impl<T> Combobox<T> {
    /// Start closed, showing `selected` if one is supplied.
    pub fn new(config: ComboboxConfig, selected: Option<T>) -> Self {
        Self {
            config,
            is_open: false,
            search_term: String::new(),
            selected,
            highlighted: 0,
        }
    }

    pub fn config(&self) -> &ComboboxConfig {
        &self.config
    }

    pub fn state(&self) -> ComboboxState {
        match (self.is_open, &self.selected) {
            (true, _) => ComboboxState::Open,
            (false, Some(_)) => ComboboxState::ClosedSelected,
            (false, None) => ComboboxState::ClosedEmpty,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn view(&self) -> ComboboxView<'_, T> {
        if self.is_open {
            return ComboboxView::Input {
                term: &self.search_term,
            };
        }
        match &self.selected {
            Some(item) => ComboboxView::Selected(item),
            None => ComboboxView::Placeholder,
        }
    }

    /// Open the dropdown with an empty query. A current selection is kept.
    pub fn activate(&mut self) {
        if self.is_open {
            return;
        }
        self.is_open = true;
        self.search_term.clear();
        self.highlighted = 0;
    }

    /// Replace the query. Typing into a closed control opens it first.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.activate();
        self.search_term = term.into();
        self.highlighted = 0;
    }

    pub fn push_char(&mut self, c: char) {
        self.activate();
        self.search_term.push(c);
        self.highlighted = 0;
    }

    pub fn pop_char(&mut self) {
        if self.is_open && self.search_term.pop().is_some() {
            self.highlighted = 0;
        }
    }

    /// Select `item` and close.
    pub fn pick(&mut self, item: T) {
        self.selected = Some(item);
        self.close();
    }

    /// An interaction landed outside the control: close and drop the
    /// unsubmitted query. The selection is untouched.
    pub fn dismiss(&mut self) {
        if self.is_open {
            self.close();
        }
    }

    /// Remove the selection. Never opens the dropdown; callers must not also
    /// route the same activation to [`Combobox::activate`].
    ///
    /// Returns whether there was a selection to remove.
    pub fn clear(&mut self) -> bool {
        self.search_term.clear();
        self.highlighted = 0;
        self.selected.take().is_some()
    }

    pub fn highlight_next(&mut self, result_count: usize) {
        if result_count > 0 {
            self.highlighted = (self.highlighted + 1).min(result_count - 1);
        }
    }

    pub fn highlight_prev(&mut self) {
        self.highlighted = self.highlighted.saturating_sub(1);
    }

    fn close(&mut self) {
        self.is_open = false;
        self.search_term.clear();
        self.highlighted = 0;
    }
}

impl<T: Searchable + Clone> Combobox<T> {
    /// Pick the highlighted entry of `results` (the list currently shown).
    /// Returns the picked item, or `None` when closed or nothing is listed.
    pub fn pick_highlighted(&mut self, results: &[&T]) -> Option<T> {
        if !self.is_open {
            return None;
        }
        let item = results
            .get(self.highlighted.min(results.len().saturating_sub(1)))
            .map(|item| (*item).clone())?;
        self.pick(item.clone());
        Some(item)
    }
}
