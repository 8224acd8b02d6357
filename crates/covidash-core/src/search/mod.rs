//! Location search.
//!
//! - `index`: flattens province reports and their cities into one sorted,
//!   filterable list
//! - `combobox`: the open/closed/selected lifecycle of a search-select
//!   control, independent of what it searches

pub mod combobox;
pub mod index;

pub use combobox::{Accent, Combobox, ComboboxConfig, ComboboxState, ComboboxView};
pub use index::{
    build_index, filter, IndexCounts, ItemKind, ListState, Searchable, SearchableItem,
};
