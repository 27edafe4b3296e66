use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use crate::domain::DEFAULT_PAGE_SIZE;
use crate::record::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "▲",
            SortOrder::Descending => "▼",
        }
    }
}

/// Set of columns selected for rendering. Iterates in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet(BTreeSet<Field>);

impl ColumnSet {
    pub fn all() -> Self {
        Field::ALL.into_iter().collect()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains(&field)
    }

    /// Adds `field` if absent, removes it otherwise.
    pub fn toggled(&self, field: Field) -> Self {
        let mut columns = self.0.clone();
        if !columns.remove(&field) {
            columns.insert(field);
        }
        ColumnSet(columns)
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::all().toggled(Field::Pin)
    }
}

impl FromIterator<Field> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        ColumnSet(iter.into_iter().collect())
    }
}

/// User driven parameters of the table. Every transition returns a new state.
///
/// Transitions that can move the page out of range take the number of pages
/// of the current filtered view and clamp the page to `[1, max(total_pages, 1)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub sort_field: Field,
    pub sort_order: SortOrder,
    pub columns: ColumnSet,
    pub page: usize,
    pub page_size: NonZeroUsize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::new(DEFAULT_PAGE_SIZE)
    }
}

impl ViewState {
    pub fn new(page_size: NonZeroUsize) -> Self {
        ViewState {
            query: String::new(),
            sort_field: Field::Id,
            sort_order: SortOrder::Ascending,
            columns: ColumnSet::default(),
            page: 1,
            page_size,
        }
    }

    /// A new query always starts on the first page.
    pub fn with_query(self, query: impl Into<String>) -> Self {
        ViewState {
            query: query.into(),
            page: 1,
            ..self
        }
    }

    /// Header click: the active field flips its direction, any other field sorts ascending.
    pub fn sorted_by(self, field: Field) -> Self {
        let sort_order = if self.sort_field == field {
            self.sort_order.flipped()
        } else {
            SortOrder::Ascending
        };
        ViewState {
            sort_field: field,
            sort_order,
            ..self
        }
    }

    pub fn with_column_toggled(self, field: Field) -> Self {
        let columns = self.columns.toggled(field);
        ViewState { columns, ..self }
    }

    pub fn next_page(self, total_pages: usize) -> Self {
        let page = self.page.saturating_add(1);
        ViewState { page, ..self }.clamped(total_pages)
    }

    pub fn prev_page(self, total_pages: usize) -> Self {
        let page = self.page.saturating_sub(1);
        ViewState { page, ..self }.clamped(total_pages)
    }

    pub fn goto_page(self, page: usize, total_pages: usize) -> Self {
        ViewState { page, ..self }.clamped(total_pages)
    }

    pub fn clamped(self, total_pages: usize) -> Self {
        let page = self.page.clamp(1, total_pages.max(1));
        ViewState { page, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_at_mount() {
        let state = ViewState::default();
        assert_eq!(state.query, "");
        assert_eq!(state.sort_field, Field::Id);
        assert_eq!(state.sort_order, SortOrder::Ascending);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size.get(), 5);
        assert_eq!(state.columns.len(), 6);
        assert!(!state.columns.contains(Field::Pin));
        assert!(state.columns.contains(Field::Id));
    }

    #[test]
    fn sorting_the_active_field_flips_the_order() {
        let state = ViewState::default().sorted_by(Field::Name);
        assert_eq!(state.sort_field, Field::Name);
        assert_eq!(state.sort_order, SortOrder::Ascending);

        let state = state.sorted_by(Field::Name);
        assert_eq!(state.sort_order, SortOrder::Descending);

        let state = state.sorted_by(Field::Name);
        assert_eq!(state.sort_order, SortOrder::Ascending);
    }

    #[test]
    fn sorting_a_new_field_resets_to_ascending() {
        let state = ViewState::default()
            .sorted_by(Field::Name)
            .sorted_by(Field::Name)
            .sorted_by(Field::Email);
        assert_eq!(state.sort_field, Field::Email);
        assert_eq!(state.sort_order, SortOrder::Ascending);
    }

    #[test]
    fn first_click_on_active_default_field_sorts_descending() {
        let state = ViewState::default().sorted_by(Field::Id);
        assert_eq!(state.sort_order, SortOrder::Descending);
    }

    #[test]
    fn toggling_a_column_twice_is_identity() {
        let state = ViewState::default();
        for field in Field::ALL {
            let toggled = state.clone().with_column_toggled(field);
            assert_ne!(toggled.columns, state.columns);
            assert_eq!(toggled.with_column_toggled(field).columns, state.columns);
        }
    }

    #[test]
    fn id_column_can_be_hidden() {
        let state = ViewState::default().with_column_toggled(Field::Id);
        assert!(!state.columns.contains(Field::Id));
    }

    #[test]
    fn columns_can_all_be_deselected() {
        let state = Field::ALL
            .into_iter()
            .filter(|&f| f != Field::Pin)
            .fold(ViewState::default(), |s, f| s.with_column_toggled(f));
        assert!(state.columns.is_empty());
        assert_eq!(state.columns.iter().count(), 0);
    }

    #[test]
    fn column_set_iterates_in_field_order() {
        let columns: ColumnSet = [Field::Pin, Field::Id, Field::Email].into_iter().collect();
        assert_eq!(
            columns.iter().collect::<Vec<_>>(),
            vec![Field::Id, Field::Email, Field::Pin]
        );
        assert_eq!(ColumnSet::all().len(), 7);
    }

    #[test]
    fn new_query_resets_page() {
        let state = ViewState::default().goto_page(4, 6).with_query("Name 1");
        assert_eq!(state.page, 1);
        assert_eq!(state.query, "Name 1");
    }

    #[test]
    fn page_navigation_stops_at_the_bounds() {
        let state = ViewState::default();
        assert_eq!(state.clone().prev_page(6).page, 1);

        let state = state.goto_page(6, 6);
        assert_eq!(state.page, 6);
        assert_eq!(state.clone().next_page(6).page, 6);
        assert_eq!(state.prev_page(6).page, 5);
    }

    #[test]
    fn goto_page_clamps() {
        assert_eq!(ViewState::default().goto_page(99, 6).page, 6);
        assert_eq!(ViewState::default().goto_page(0, 6).page, 1);
    }

    #[test]
    fn clamping_without_pages_stays_on_first_page() {
        let state = ViewState::default().goto_page(3, 6).clamped(0);
        assert_eq!(state.page, 1);
        assert_eq!(ViewState::default().next_page(0).page, 1);
    }
}
