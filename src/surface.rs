use std::collections::{HashMap, HashSet};

use crate::row::RowId;
use crate::table_controller::{SortDirection, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    Table,
    Cards,
}

impl Representation {
    pub const ALL: [Representation; 2] = [Representation::Table, Representation::Cards];
}

impl From<View> for Representation {
    fn from(view: View) -> Self {
        match view {
            View::Table => Representation::Table,
            View::Cards => Representation::Cards,
        }
    }
}

/// Display surface driven by the table controller. It only shows, hides and
/// reorders elements by id; it never decides visibility itself.
pub trait Surface {
    fn set_row_visible(&mut self, representation: Representation, id: RowId, visible: bool);
    fn reorder(&mut self, representation: Representation, order: &[RowId]);
    fn set_no_results(&mut self, shown: bool);
    fn set_sort_indicator(&mut self, field: &str, direction: Option<SortDirection>);
    fn set_active_view(&mut self, view: View);
}

#[derive(Debug, Default, Clone)]
struct Container {
    order: Vec<RowId>,
    hidden: HashSet<RowId>,
}

/// In-memory surface. The terminal UI renders from it.
#[derive(Debug, Clone)]
pub struct Projection {
    table: Container,
    cards: Container,
    no_results: bool,
    sort_indicators: HashMap<String, SortDirection>,
    active_view: View,
}

impl Projection {
    pub fn new(ids: &[RowId], view: View) -> Self {
        let container = Container {
            order: ids.to_vec(),
            hidden: HashSet::new(),
        };
        Self {
            table: container.clone(),
            cards: container,
            no_results: false,
            sort_indicators: HashMap::new(),
            active_view: view,
        }
    }

    fn container(&self, representation: Representation) -> &Container {
        match representation {
            Representation::Table => &self.table,
            Representation::Cards => &self.cards,
        }
    }

    fn container_mut(&mut self, representation: Representation) -> &mut Container {
        match representation {
            Representation::Table => &mut self.table,
            Representation::Cards => &mut self.cards,
        }
    }

    pub fn order(&self, representation: Representation) -> &[RowId] {
        &self.container(representation).order
    }

    pub fn is_visible(&self, representation: Representation, id: RowId) -> bool {
        !self.container(representation).hidden.contains(&id)
    }

    pub fn visible_ids(&self, representation: Representation) -> Vec<RowId> {
        let container = self.container(representation);
        container
            .order
            .iter()
            .filter(|id| !container.hidden.contains(id))
            .copied()
            .collect()
    }

    pub fn no_results(&self) -> bool {
        self.no_results
    }

    pub fn sort_indicator(&self, field: &str) -> Option<SortDirection> {
        self.sort_indicators.get(field).copied()
    }

    pub fn active_view(&self) -> View {
        self.active_view
    }
}

impl Surface for Projection {
    fn set_row_visible(&mut self, representation: Representation, id: RowId, visible: bool) {
        let container = self.container_mut(representation);
        if visible {
            container.hidden.remove(&id);
        } else {
            container.hidden.insert(id);
        }
    }

    fn reorder(&mut self, representation: Representation, order: &[RowId]) {
        self.container_mut(representation).order = order.to_vec();
    }

    fn set_no_results(&mut self, shown: bool) {
        self.no_results = shown;
    }

    fn set_sort_indicator(&mut self, field: &str, direction: Option<SortDirection>) {
        match direction {
            Some(d) => {
                self.sort_indicators.insert(field.to_string(), d);
            }
            None => {
                self.sort_indicators.remove(field);
            }
        }
    }

    fn set_active_view(&mut self, view: View) {
        self.active_view = view;
    }
}
