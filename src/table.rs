//! The filter -> sort -> page pipeline.
//!
//! Every stage is a pure function working on row indices into the record slice,
//! so a view can be kept next to the records it refers to.

use std::num::NonZeroUsize;

use tracing::trace;

use crate::record::{Field, Record};
use crate::state::{SortOrder, ViewState};

/// Indices of the records where any field contains `query`, ignoring case.
/// Input order is kept. The query is matched literally, whitespace included.
pub fn filter(records: &[Record], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.matches_lowercase(&needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// Stable sort of `rows` by `field`. Descending reverses the comparison,
/// so equal values keep their input order in both directions.
pub fn sort(records: &[Record], rows: &mut [usize], field: Field, order: SortOrder) {
    match order {
        SortOrder::Ascending => {
            rows.sort_by(|&a, &b| records[a].value(field).cmp(&records[b].value(field)))
        }
        SortOrder::Descending => {
            rows.sort_by(|&a, &b| records[b].value(field).cmp(&records[a].value(field)))
        }
    }
}

pub fn total_pages(count: usize, page_size: NonZeroUsize) -> usize {
    count.div_ceil(page_size.get())
}

/// The slice `[(page-1)*size, page*size)` clamped to `rows`. Pages are 1 based;
/// page 0 and pages past the end are empty.
pub fn paginate<T>(rows: &[T], page: usize, page_size: NonZeroUsize) -> &[T] {
    let size = page_size.get();
    let Some(begin) = page.checked_sub(1).and_then(|p| p.checked_mul(size)) else {
        return &[];
    };
    if begin >= rows.len() {
        return &[];
    }
    let end = std::cmp::min(begin.saturating_add(size), rows.len());
    &rows[begin..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_rows: usize, // Number of rows after filtering
}

impl PageInfo {
    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Output of the pipeline: the rows of the current page and the pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub rows: Vec<usize>, // Mapping of page row index to record index
    pub page: PageInfo,
}

impl TableView {
    pub fn records<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        self.rows.iter().map(move |&idx| &records[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Runs the full pipeline. Nothing is cached, the view is re-derived from
/// `records` and `state` on every call.
pub fn compute(records: &[Record], state: &ViewState) -> TableView {
    let mut rows = filter(records, &state.query);
    sort(records, &mut rows, state.sort_field, state.sort_order);

    let total_rows = rows.len();
    let total_pages = total_pages(total_rows, state.page_size);
    let page = paginate(&rows, state.page, state.page_size).to_vec();

    trace!(
        "Pipeline: q {:?}, sort {}:{:?}, page {}/{}, rows {}/{}",
        state.query,
        state.sort_field,
        state.sort_order,
        state.page,
        total_pages,
        total_rows,
        records.len()
    );

    TableView {
        rows: page,
        page: PageInfo {
            current_page: state.page,
            total_pages,
            total_rows,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ids(records: &[Record], rows: &[usize]) -> Vec<i64> {
        rows.iter().map(|&i| records[i].id).collect()
    }

    fn with_countries(countries: &[&str]) -> Vec<Record> {
        let mut records = Record::synthetic(countries.len());
        for (r, c) in records.iter_mut().zip(countries) {
            r.country = c.to_string();
        }
        records
    }

    #[test]
    fn empty_query_matches_everything_in_order() {
        let records = Record::synthetic(30);
        assert_eq!(filter(&records, ""), (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn filter_ignores_case() {
        let records = Record::synthetic(30);
        assert_eq!(ids(&records, &filter(&records, "NAME 15")), vec![15]);
        assert_eq!(ids(&records, &filter(&records, "name 15")), vec![15]);
    }

    #[test]
    fn filter_searches_every_field() {
        let records = Record::synthetic(30);
        assert_eq!(ids(&records, &filter(&records, "email7@")), vec![7]);
        assert_eq!(ids(&records, &filter(&records, "pin 22")), vec![22]);
        // "Name 1" prefix matches 1 and 10..=19
        assert_eq!(
            ids(&records, &filter(&records, "Name 1")),
            vec![1, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19]
        );
    }

    #[test]
    fn filter_matches_the_id_as_text() {
        let mut records = Record::synthetic(3);
        records[2].id = 4711;
        assert_eq!(ids(&records, &filter(&records, "471")), vec![4711]);
    }

    #[test]
    fn filter_does_not_trim_the_query() {
        let records = Record::synthetic(30);
        assert!(filter(&records, "  ").is_empty());
        assert!(filter(&records, " Name 15").is_empty());
    }

    #[test]
    fn filter_matching_nothing() {
        let records = Record::synthetic(30);
        assert!(filter(&records, "no such value").is_empty());
        assert!(filter(&[], "").is_empty());
    }

    #[test]
    fn filter_is_idempotent() {
        let records = Record::synthetic(30);
        for query in ["", "name 2", "3", "example", "zzz"] {
            let once: Vec<Record> = filter(&records, query)
                .into_iter()
                .map(|i| records[i].clone())
                .collect();
            let twice = filter(&once, query);
            assert_eq!(twice, (0..once.len()).collect::<Vec<_>>(), "query {query:?}");
        }
    }

    #[test]
    fn sort_by_name_is_lexicographic() {
        let records = Record::synthetic(30);
        let mut rows = filter(&records, "");
        sort(&records, &mut rows, Field::Name, SortOrder::Ascending);
        assert_eq!(ids(&records, &rows[..5]), vec![1, 10, 11, 12, 13]);

        sort(&records, &mut rows, Field::Name, SortOrder::Descending);
        assert_eq!(ids(&records, &rows[..5]), vec![9, 8, 7, 6, 5]);
    }

    #[test]
    fn sort_by_id_is_numeric() {
        let records = Record::synthetic(12);
        let mut rows: Vec<usize> = (0..12).rev().collect();
        sort(&records, &mut rows, Field::Id, SortOrder::Ascending);
        assert_eq!(ids(&records, &rows), (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn without_ties_descending_is_the_reverse() {
        let records = Record::synthetic(30);
        let mut asc = filter(&records, "");
        sort(&records, &mut asc, Field::Email, SortOrder::Ascending);
        let mut desc = asc.clone();
        sort(&records, &mut desc, Field::Email, SortOrder::Descending);
        asc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let records = with_countries(&["B", "A", "B", "A", "C", "B"]);

        let mut asc: Vec<usize> = (0..records.len()).collect();
        sort(&records, &mut asc, Field::Country, SortOrder::Ascending);
        assert_eq!(ids(&records, &asc), vec![2, 4, 1, 3, 6, 5]);

        let mut desc: Vec<usize> = (0..records.len()).collect();
        sort(&records, &mut desc, Field::Country, SortOrder::Descending);
        assert_eq!(ids(&records, &desc), vec![5, 1, 3, 6, 2, 4]);

        // Not a literal reversal of the ascending order
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_ne!(reversed, desc);
    }

    #[test]
    fn ties_keep_pre_sort_order() {
        let records = with_countries(&["X", "X", "X", "Y"]);
        let mut rows = vec![3, 2, 0, 1];
        sort(&records, &mut rows, Field::Country, SortOrder::Ascending);
        assert_eq!(rows, vec![2, 0, 1, 3]);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(30, size(5)), 6);
        assert_eq!(total_pages(31, size(5)), 7);
        assert_eq!(total_pages(1, size(5)), 1);
        assert_eq!(total_pages(0, size(5)), 0);
        assert_eq!(total_pages(7, size(1)), 7);
    }

    #[test]
    fn paginate_clamps_and_degrades_to_empty() {
        let rows: Vec<usize> = (0..12).collect();
        assert_eq!(paginate(&rows, 1, size(5)), &[0, 1, 2, 3, 4]);
        assert_eq!(paginate(&rows, 3, size(5)), &[10, 11]);
        assert!(paginate(&rows, 4, size(5)).is_empty());
        assert!(paginate(&rows, 0, size(5)).is_empty());
        assert!(paginate(&rows, usize::MAX, size(5)).is_empty());
        assert!(paginate::<usize>(&[], 1, size(5)).is_empty());
    }

    #[test]
    fn pages_concatenate_to_the_input() {
        let rows: Vec<usize> = (0..23).map(|i| i * 7 % 23).collect();
        for page_size in 1..=25 {
            let ps = size(page_size);
            let pages = total_pages(rows.len(), ps);
            let joined: Vec<usize> = (1..=pages)
                .flat_map(|p| paginate(&rows, p, ps).iter().copied())
                .collect();
            assert_eq!(joined, rows, "page size {page_size}");
        }
    }

    #[test]
    fn initial_view_shows_the_first_five_ids() {
        let records = Record::synthetic(30);
        let view = compute(&records, &ViewState::default());
        assert_eq!(ids(&records, &view.rows), vec![1, 2, 3, 4, 5]);
        assert_eq!(view.page.total_pages, 6);
        assert_eq!(view.page.total_rows, 30);
        assert!(!view.page.has_prev());
        assert!(view.page.has_next());
    }

    #[test]
    fn searching_a_single_name() {
        let records = Record::synthetic(30);
        let state = ViewState::default().goto_page(4, 6).with_query("Name 15");
        let view = compute(&records, &state);
        assert_eq!(ids(&records, &view.rows), vec![15]);
        assert_eq!(view.page.total_pages, 1);
        assert_eq!(view.page.current_page, 1);
        assert!(!view.page.has_next());
    }

    #[test]
    fn last_page_disables_next() {
        let records = Record::synthetic(30);
        let state = ViewState::default().goto_page(6, 6);
        let view = compute(&records, &state);
        assert_eq!(ids(&records, &view.rows), vec![26, 27, 28, 29, 30]);
        assert!(!view.page.has_next());
        assert!(view.page.has_prev());
    }

    #[test]
    fn sorting_applies_to_the_filtered_view_only() {
        let records = Record::synthetic(30);
        let state = ViewState::default()
            .with_query("Name 2")
            .sorted_by(Field::Name)
            .sorted_by(Field::Name);
        let view = compute(&records, &state);
        assert_eq!(view.page.total_rows, 11);
        assert_eq!(ids(&records, &view.rows), vec![29, 28, 27, 26, 25]);

        // Clearing the query brings every record back, still sorted
        let view = compute(&records, &state.with_query(""));
        assert_eq!(view.page.total_rows, 30);
        assert_eq!(ids(&records, &view.rows), vec![9, 8, 7, 6, 5]);
    }

    #[test]
    fn hidden_columns_do_not_change_pagination() {
        let records = Record::synthetic(30);
        let all = compute(&records, &ViewState::default());
        let mut state = ViewState::default();
        for field in Field::ALL {
            if state.columns.contains(field) {
                state = state.with_column_toggled(field);
            }
        }
        let none = compute(&records, &state);
        assert!(state.columns.is_empty());
        assert_eq!(none, all);
    }

    #[test]
    fn empty_dataset_has_no_pages() {
        let view = compute(&[], &ViewState::default());
        assert!(view.is_empty());
        assert_eq!(view.page.total_pages, 0);
        assert!(!view.page.has_prev());
        assert!(!view.page.has_next());
    }

    #[test]
    fn view_resolves_records() {
        let records = Record::synthetic(8);
        let state = ViewState::default().goto_page(2, 2);
        let view = compute(&records, &state);
        let names: Vec<&str> = view.records(&records).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Name 6", "Name 7", "Name 8"]);
    }
}
