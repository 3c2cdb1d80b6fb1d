use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::debounce::{DEFAULT_SEARCH_DEBOUNCE, Debouncer};
use crate::row::{FILTER_KEYS, Row, RowId, SortField, SortKind, athlete_sort_fields};
use crate::surface::{Representation, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Table,
    Cards,
}

impl View {
    pub fn toggled(self) -> Self {
        match self {
            View::Table => View::Cards,
            View::Cards => View::Table,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Table => write!(f, "table"),
            View::Cards => write!(f, "cards"),
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(View::Table),
            "cards" | "grid" => Ok(View::Cards),
            other => Err(format!("unknown view \"{other}\", expected table or cards")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: Option<String>,
    pub direction: SortDirection,
}

/// Search term, filters, sort and view. Lives as long as the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub search_term: String,
    pub active_filters: BTreeMap<String, String>,
    pub sort: SortSpec,
    pub view: View,
}

impl FilterState {
    pub fn new(view: View) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }

    /// Search AND every active filter, all substring matches on lower-cased text.
    pub fn matches(&self, row: &Row) -> bool {
        if !self.search_term.is_empty() && !row.searchable_text().contains(&self.search_term) {
            return false;
        }
        self.active_filters
            .iter()
            .all(|(key, value)| row.attribute(key).contains(value.as_str()))
    }
}

/// Filter keys and sort fields a table exposes. Fixed per deployment.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub filter_keys: Vec<String>,
    pub sort_fields: Vec<SortField>,
}

impl TableLayout {
    pub fn athletes() -> Self {
        Self {
            filter_keys: FILTER_KEYS.iter().map(|k| k.to_string()).collect(),
            sort_fields: athlete_sort_fields(),
        }
    }
}

pub struct TableController<S: Surface> {
    rows: Vec<Row>,
    index: HashMap<RowId, usize>,
    layout: TableLayout,
    state: FilterState,
    order: Vec<usize>, // Positions into rows, in display order
    visible: Vec<bool>, // Indexed like rows
    debouncer: Debouncer,
    surface: S,
}

impl<S: Surface> TableController<S> {
    pub fn new(rows: Vec<Row>, layout: TableLayout, view: View, mut surface: S) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.id(), idx))
            .collect::<HashMap<_, _>>();
        if index.len() != rows.len() {
            debug!(
                "Row ids are not unique: {} rows, {} distinct ids",
                rows.len(),
                index.len()
            );
        }

        if rows.is_empty() {
            debug!("No rows supplied, table controller stays idle");
        } else {
            let ids: Vec<RowId> = rows.iter().map(Row::id).collect();
            for representation in Representation::ALL {
                surface.reorder(representation, &ids);
            }
            surface.set_active_view(view);
        }

        Self {
            order: (0..rows.len()).collect(),
            visible: vec![true; rows.len()],
            rows,
            index,
            layout,
            state: FilterState::new(view),
            debouncer: Debouncer::new(DEFAULT_SEARCH_DEBOUNCE),
            surface,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    pub fn is_idle(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.index.get(&id).map(|&idx| &self.rows[idx])
    }

    pub fn order(&self) -> Vec<RowId> {
        self.order.iter().map(|&idx| self.rows[idx].id()).collect()
    }

    pub fn is_visible(&self, id: RowId) -> bool {
        self.index
            .get(&id)
            .map(|&idx| self.visible[idx])
            .unwrap_or(false)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|&&v| v).count()
    }

    pub fn visible_in_order(&self) -> Vec<RowId> {
        self.order
            .iter()
            .filter(|&&idx| self.visible[idx])
            .map(|&idx| self.rows[idx].id())
            .collect()
    }

    pub fn search_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Distinct non-empty values of a filter attribute, sorted.
    pub fn filter_options(&self, key: &str) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.attribute(key))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_search_term(&mut self, text: &str, now: Instant) {
        if self.is_idle() {
            return;
        }
        self.state.search_term = text.trim().to_lowercase();
        self.debouncer.schedule(now);
        trace!("Search term \"{}\" scheduled", self.state.search_term);
    }

    /// Runs the deferred search recompute once its idle window has passed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.debouncer.poll(now).is_some() {
            self.apply_filters();
            true
        } else {
            false
        }
    }

    pub fn flush_search(&mut self) -> bool {
        if self.debouncer.flush().is_some() {
            self.apply_filters();
            true
        } else {
            false
        }
    }

    pub fn set_filter(&mut self, key: &str, value: &str) {
        if self.is_idle() {
            return;
        }
        if !self.layout.filter_keys.iter().any(|k| k == key) {
            debug!("Ignoring unknown filter key \"{key}\"");
            return;
        }
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            self.state.active_filters.remove(key);
        } else {
            self.state.active_filters.insert(key.to_string(), value);
        }
        self.apply_filters();
    }

    pub fn clear_filters(&mut self) {
        if self.is_idle() {
            return;
        }
        self.state.search_term.clear();
        self.state.active_filters.clear();
        self.debouncer.cancel();
        self.apply_filters();
    }

    pub fn toggle_sort(&mut self, field: &str) {
        if self.is_idle() {
            return;
        }
        let Some(kind) = self
            .layout
            .sort_fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.kind)
        else {
            debug!("Ignoring unknown sort field \"{field}\"");
            return;
        };

        if self.state.sort.field.as_deref() == Some(field) {
            self.state.sort.direction = self.state.sort.direction.flipped();
        } else {
            self.state.sort.field = Some(field.to_string());
            self.state.sort.direction = SortDirection::Asc;
        }
        let direction = self.state.sort.direction;

        // Always sort the supplied order, so ties keep their original relative order
        // in both directions.
        let rows = &self.rows;
        let mut order: Vec<usize> = (0..rows.len()).collect();
        match kind {
            SortKind::Numeric => {
                let keys: Vec<f64> = rows.iter().map(|r| r.sort_number(field)).collect();
                order.sort_by(|&a, &b| {
                    let ord = keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal);
                    Self::directed(ord, direction)
                });
            }
            SortKind::Text => {
                let keys: Vec<String> = rows.iter().map(|r| r.sort_text(field)).collect();
                order.sort_by(|&a, &b| Self::directed(keys[a].cmp(&keys[b]), direction));
            }
        }
        self.order = order;
        trace!("Sorted by {field} {:?}", direction);

        let ids = self.order();
        for representation in Representation::ALL {
            self.surface.reorder(representation, &ids);
        }
        for sort_field in self.layout.sort_fields.iter() {
            let indicator = (sort_field.name == field).then_some(direction);
            self.surface.set_sort_indicator(&sort_field.name, indicator);
        }
    }

    fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    pub fn set_view(&mut self, view: View) {
        if self.is_idle() {
            return;
        }
        self.state.view = view;
        self.surface.set_active_view(view);
    }

    /// Re-evaluates visibility for every row. Order is left untouched.
    pub fn apply_filters(&mut self) {
        if self.is_idle() {
            return;
        }
        let state = &self.state;
        self.visible = self
            .rows
            .par_iter()
            .map(|row| state.matches(row))
            .collect();

        for (row, &visible) in self.rows.iter().zip(self.visible.iter()) {
            for representation in Representation::ALL {
                self.surface
                    .set_row_visible(representation, row.id(), visible);
            }
        }

        let visible_count = self.visible_count();
        self.surface.set_no_results(visible_count == 0);
        debug!(
            "Filter pass: {visible_count}/{} rows visible (search \"{}\", filters {:?})",
            self.rows.len(),
            self.state.search_term,
            self.state.active_filters
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::{FILTER_SCHOOL, SORT_NAME, SORT_NIL, SORT_RANK};
    use crate::surface::Projection;

    fn athlete(id: u64, name: &str, position: &str, school: &str, nil: f64) -> Row {
        Row::new(RowId(id))
            .with_search_part(name)
            .with_search_part(position)
            .with_search_part(school)
            .with_attribute("position", position)
            .with_attribute("school", school)
            .with_sort_value(SORT_NAME, name)
            .with_sort_value(SORT_NIL, nil)
            .with_sort_value(SORT_RANK, id as usize)
    }

    fn controller(rows: Vec<Row>) -> TableController<Projection> {
        let ids: Vec<RowId> = rows.iter().map(Row::id).collect();
        let surface = Projection::new(&ids, View::Table);
        TableController::new(rows, TableLayout::athletes(), View::Table, surface)
    }

    fn search(ctl: &mut TableController<Projection>, term: &str) {
        let now = Instant::now();
        ctl.set_search_term(term, now);
        assert!(ctl.tick(now + DEFAULT_SEARCH_DEBOUNCE));
    }

    fn scenario_a() -> TableController<Projection> {
        controller(vec![
            athlete(1, "A", "qb", "X", 100.0),
            athlete(2, "B", "wr", "Y", 300.0),
            athlete(3, "C", "rb", "X", 200.0),
        ])
    }

    #[test]
    fn filter_then_sort_keeps_visible_set() {
        let mut ctl = scenario_a();
        ctl.set_filter(FILTER_SCHOOL, "x");
        assert_eq!(ctl.visible_in_order(), vec![RowId(1), RowId(3)]);
        assert_eq!(ctl.order(), vec![RowId(1), RowId(2), RowId(3)]);

        ctl.toggle_sort(SORT_NIL);
        assert_eq!(ctl.order(), vec![RowId(1), RowId(3), RowId(2)]);
        assert_eq!(ctl.visible_in_order(), vec![RowId(1), RowId(3)]);

        let surface = ctl.surface();
        assert_eq!(
            surface.visible_ids(Representation::Table),
            vec![RowId(1), RowId(3)]
        );
        assert_eq!(
            surface.visible_ids(Representation::Cards),
            vec![RowId(1), RowId(3)]
        );
        assert_eq!(surface.order(Representation::Cards), &[RowId(1), RowId(3), RowId(2)]);
        assert!(!surface.no_results());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut ctl = controller(vec![
            athlete(1, "Bobby Jones", "QB", "Alabama", 10.0),
            athlete(2, "Jane Bob", "WR", "Texas", 20.0),
            athlete(3, "Alice", "RB", "Ohio State", 30.0),
        ]);
        search(&mut ctl, "  BOB ");
        assert_eq!(ctl.state().search_term, "bob");
        assert!(ctl.is_visible(RowId(1)));
        assert!(ctl.is_visible(RowId(2)));
        assert!(!ctl.is_visible(RowId(3)));
        assert!(!ctl.surface().is_visible(Representation::Cards, RowId(3)));
    }

    #[test]
    fn search_matches_position_and_school_too() {
        let mut ctl = controller(vec![
            athlete(1, "Bobby Jones", "QB", "Alabama", 10.0),
            athlete(2, "Jane Bob", "WR", "Texas", 20.0),
        ]);
        search(&mut ctl, "texas");
        assert_eq!(ctl.visible_in_order(), vec![RowId(2)]);
        search(&mut ctl, "qb alabama");
        assert_eq!(ctl.visible_in_order(), vec![RowId(1)]);
    }

    #[test]
    fn search_waits_for_idle_window() {
        let mut ctl = controller(vec![
            athlete(1, "Bobby Jones", "QB", "Alabama", 10.0),
            athlete(2, "Alice", "RB", "Ohio State", 30.0),
        ]);
        let start = Instant::now();
        ctl.set_search_term("a", start);
        ctl.set_search_term("al", start + Duration::from_millis(100));
        ctl.set_search_term("ali", start + Duration::from_millis(150));

        assert!(!ctl.tick(start + Duration::from_millis(300)));
        assert_eq!(ctl.visible_count(), 2);

        assert!(ctl.tick(start + Duration::from_millis(350)));
        assert_eq!(ctl.visible_in_order(), vec![RowId(2)]);
        assert!(!ctl.tick(start + Duration::from_millis(600)));
    }

    #[test]
    fn flush_applies_pending_search() {
        let mut ctl = scenario_a();
        ctl.set_search_term("c", Instant::now());
        assert!(ctl.search_pending());
        assert!(ctl.flush_search());
        assert_eq!(ctl.visible_in_order(), vec![RowId(3)]);
        assert!(!ctl.flush_search());
    }

    #[test]
    fn repeated_search_is_idempotent() {
        let mut ctl = scenario_a();
        search(&mut ctl, "x");
        let once = ctl.visible_in_order();
        search(&mut ctl, "x");
        assert_eq!(ctl.visible_in_order(), once);
    }

    #[test]
    fn filters_and_search_combine_with_and() {
        let mut ctl = controller(vec![
            athlete(1, "Arch Manning", "QB", "Texas", 10.0),
            athlete(2, "Quinn Ewers", "QB", "Miami", 20.0),
            athlete(3, "Ryan Wingo", "WR", "Texas", 30.0),
        ]);
        ctl.set_filter("position", "QB");
        ctl.set_filter(FILTER_SCHOOL, "texas");
        assert_eq!(ctl.visible_in_order(), vec![RowId(1)]);

        search(&mut ctl, "quinn");
        assert_eq!(ctl.visible_count(), 0);
        assert!(ctl.surface().no_results());

        ctl.set_filter(FILTER_SCHOOL, "");
        assert_eq!(ctl.visible_in_order(), vec![RowId(2)]);
        assert!(!ctl.surface().no_results());
    }

    #[test]
    fn visibility_matches_predicate_for_every_row() {
        let mut ctl = controller(vec![
            athlete(1, "Arch Manning", "QB", "Texas", 10.0),
            athlete(2, "Quinn Ewers", "QB", "Miami", 20.0),
            athlete(3, "Ryan Wingo", "WR", "Texas", 30.0),
            athlete(4, "Nico", "qb", "", 0.0),
        ]);
        ctl.set_filter("position", "q");
        search(&mut ctl, "n");
        for row in ctl.rows() {
            let expected = row.searchable_text().contains("n") && row.attribute("position").contains('q');
            assert_eq!(ctl.is_visible(row.id()), expected, "row {}", row.id());
        }
    }

    #[test]
    fn unknown_filter_key_is_ignored() {
        let mut ctl = scenario_a();
        ctl.set_filter("hometown", "x");
        assert!(ctl.state().active_filters.is_empty());
        assert_eq!(ctl.visible_count(), 3);
    }

    #[test]
    fn toggle_sort_flips_direction_and_keeps_ties_stable() {
        let mut ctl = controller(vec![
            athlete(1, "First Fifty", "qb", "x", 50.0),
            athlete(2, "Second Fifty", "qb", "x", 50.0),
            athlete(3, "Ten", "qb", "x", 10.0),
        ]);
        ctl.toggle_sort(SORT_NIL);
        assert_eq!(ctl.state().sort.direction, SortDirection::Asc);
        assert_eq!(ctl.order(), vec![RowId(3), RowId(1), RowId(2)]);

        ctl.toggle_sort(SORT_NIL);
        assert_eq!(ctl.state().sort.direction, SortDirection::Desc);
        assert_eq!(ctl.order(), vec![RowId(1), RowId(2), RowId(3)]);

        ctl.toggle_sort(SORT_NIL);
        assert_eq!(ctl.state().sort.direction, SortDirection::Asc);
        assert_eq!(ctl.order(), vec![RowId(3), RowId(1), RowId(2)]);
    }

    #[test]
    fn sorting_again_in_same_direction_is_stable() {
        let mut ctl = scenario_a();
        ctl.toggle_sort(SORT_NAME);
        let first = ctl.order();
        // Away and back lands on the same field ascending again.
        ctl.toggle_sort(SORT_NIL);
        ctl.toggle_sort(SORT_NAME);
        assert_eq!(ctl.state().sort.direction, SortDirection::Asc);
        assert_eq!(ctl.order(), first);
    }

    #[test]
    fn text_sort_is_case_insensitive() {
        let mut ctl = controller(vec![
            athlete(1, "bravo", "qb", "x", 0.0),
            athlete(2, "Alpha", "qb", "x", 0.0),
            athlete(3, "charlie", "qb", "x", 0.0),
        ]);
        ctl.toggle_sort(SORT_NAME);
        assert_eq!(ctl.order(), vec![RowId(2), RowId(1), RowId(3)]);
    }

    #[test]
    fn sort_indicators_follow_active_field() {
        let mut ctl = scenario_a();
        ctl.toggle_sort(SORT_NIL);
        ctl.toggle_sort(SORT_NIL);
        assert_eq!(
            ctl.surface().sort_indicator(SORT_NIL),
            Some(SortDirection::Desc)
        );
        ctl.toggle_sort(SORT_RANK);
        assert_eq!(ctl.surface().sort_indicator(SORT_NIL), None);
        assert_eq!(
            ctl.surface().sort_indicator(SORT_RANK),
            Some(SortDirection::Asc)
        );
    }

    #[test]
    fn unknown_sort_field_is_ignored() {
        let mut ctl = scenario_a();
        ctl.toggle_sort("weight");
        assert_eq!(ctl.state().sort, SortSpec::default());
        assert_eq!(ctl.order(), vec![RowId(1), RowId(2), RowId(3)]);
    }

    #[test]
    fn missing_numbers_sort_as_zero() {
        let rows = vec![
            athlete(1, "A", "qb", "x", 5.0),
            Row::new(RowId(2)).with_sort_value(SORT_NIL, "n/a"),
            Row::new(RowId(3)),
        ];
        let mut ctl = controller(rows);
        ctl.toggle_sort(SORT_NIL);
        assert_eq!(ctl.order(), vec![RowId(2), RowId(3), RowId(1)]);
    }

    #[test]
    fn view_switch_is_neutral() {
        let mut ctl = scenario_a();
        ctl.set_filter(FILTER_SCHOOL, "x");
        ctl.toggle_sort(SORT_NIL);
        let order = ctl.order();
        let visible = ctl.visible_in_order();

        ctl.set_view(View::Cards);
        assert_eq!(ctl.surface().active_view(), View::Cards);
        ctl.set_view(View::Table);

        assert_eq!(ctl.state().view, View::Table);
        assert_eq!(ctl.order(), order);
        assert_eq!(ctl.visible_in_order(), visible);
    }

    #[test]
    fn clear_filters_shows_everything() {
        let mut ctl = scenario_a();
        ctl.set_filter(FILTER_SCHOOL, "y");
        ctl.set_search_term("zzz", Instant::now());
        ctl.clear_filters();
        assert_eq!(ctl.visible_count(), 3);
        assert!(!ctl.search_pending());
        assert_eq!(ctl.state().search_term, "");
    }

    #[test]
    fn filter_options_are_distinct_and_sorted() {
        let ctl = controller(vec![
            athlete(1, "A", "qb", "Texas", 0.0),
            athlete(2, "B", "wr", "alabama", 0.0),
            athlete(3, "C", "qb", "texas", 0.0),
            athlete(4, "D", "", "", 0.0),
        ]);
        assert_eq!(ctl.filter_options("school"), vec!["alabama", "texas"]);
        assert_eq!(ctl.filter_options("position"), vec!["qb", "wr"]);
    }

    #[test]
    fn empty_row_set_is_a_no_op() {
        let mut ctl = controller(Vec::new());
        let now = Instant::now();
        ctl.set_search_term("bob", now);
        ctl.set_filter(FILTER_SCHOOL, "x");
        ctl.toggle_sort(SORT_NIL);
        ctl.set_view(View::Cards);
        ctl.apply_filters();
        assert!(!ctl.tick(now + Duration::from_secs(1)));

        assert!(ctl.is_idle());
        assert_eq!(ctl.state(), &FilterState::new(View::Table));
        assert!(!ctl.surface().no_results());
        assert_eq!(ctl.surface().active_view(), View::Table);
        assert!(ctl.visible_in_order().is_empty());
    }

    #[test]
    fn view_parses_from_str() {
        assert_eq!("Cards".parse::<View>(), Ok(View::Cards));
        assert_eq!("table".parse::<View>(), Ok(View::Table));
        assert!("list".parse::<View>().is_err());
        assert_eq!(View::Table.toggled(), View::Cards);
    }
}
