use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::{BSConfig, BSError, HELP_TEXT, Message};
use crate::fields::format_value;
use crate::inputter::{InputResult, Inputter};
use crate::loader::{self, AthleteRecord};
use crate::row::{FILTER_POSITION, FILTER_SCHOOL, FILTER_KEYS, RowId, SORT_NAME, SORT_NIL, SORT_RANK};
use crate::surface::{Projection, Representation};
use crate::table_controller::{SortDirection, TableController, TableLayout, View};
use crate::theme::{Theme, ThemeStore};
use crate::ui::{CARD_HEIGHT, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT, TOOLBAR_HEIGHT};

/// Position dropdown values and their labels.
pub const POSITION_OPTIONS: [(&str, &str); 10] = [
    ("qb", "Quarterback"),
    ("rb", "Running Back"),
    ("wr", "Wide Receiver"),
    ("te", "Tight End"),
    ("ol", "Offensive Line"),
    ("dl", "Defensive Line"),
    ("lb", "Linebacker"),
    ("db", "Defensive Back"),
    ("k", "Kicker"),
    ("p", "Punter"),
];

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Browse,
    SearchInput,
    Popup,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub toolbar_height: usize,
    pub body_height: usize,
    pub statusline_height: usize,
    pub cards_per_row: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize, card_width: usize) -> Self {
        let body_height = ui_height.saturating_sub(TOOLBAR_HEIGHT + STATUSLINE_HEIGHT);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            toolbar_height: TOOLBAR_HEIGHT,
            body_height,
            statusline_height: STATUSLINE_HEIGHT,
            cards_per_row: std::cmp::max(1, ui_width / std::cmp::max(1, card_width)),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }

    fn page_size(&self, view: View) -> usize {
        match view {
            View::Table => std::cmp::max(1, self.body_height.saturating_sub(TABLE_HEADER_HEIGHT)),
            View::Cards => {
                std::cmp::max(1, self.body_height / CARD_HEIGHT) * self.cards_per_row
            }
        }
    }
}

/// A filter dropdown as shown in the toolbar.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterView {
    pub key: &'static str,
    pub label: String,
}

/// Everything the UI needs for one frame.
pub struct UIData<'a> {
    pub name: String,
    pub athletes: Vec<&'a AthleteRecord>,
    pub total: usize,
    pub selected: usize,
    pub view: View,
    pub search_text: InputResult,
    pub search_active: bool,
    pub filters: Vec<FilterView>,
    pub sort_indicators: Vec<(&'static str, Option<SortDirection>)>,
    pub no_results: bool,
    pub empty_dataset: bool,
    pub theme: Theme,
    pub show_rank: bool,
    pub card_width: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub layout: UILayout,
}

pub struct Model {
    config: BSConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    records: Vec<AthleteRecord>,
    record_index: HashMap<RowId, usize>,
    table: TableController<Projection>,
    selected: usize, // Index into the visible rows of the active view
    uilayout: UILayout,
    input: Inputter,
    last_input: InputResult,
    search_input: String, // As typed, the controller keeps the normalized term
    filter_cursor: HashMap<&'static str, usize>, // 0 means "All"
    theme: Theme,
    theme_store: ThemeStore,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &BSConfig, ui_width: usize, ui_height: usize) -> Self {
        let theme_store = ThemeStore::new(config.theme_file.clone());
        let theme = config.theme.unwrap_or_else(|| {
            theme_store.preferred(std::env::var("COLORFGBG").ok().as_deref())
        });
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Browse,
            previous_modus: Modus::Browse,
            name: String::new(),
            records: Vec::new(),
            record_index: HashMap::new(),
            table: Self::build_table(&[], config),
            selected: 0,
            uilayout: UILayout::from_values(ui_width, ui_height, config.card_width),
            input: Inputter::default(),
            last_input: InputResult::default(),
            search_input: String::new(),
            filter_cursor: HashMap::new(),
            theme,
            theme_store,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message("Started ballstreet!");
        model
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<bool, BSError> {
        let (file_info, records) = loader::load_athletes(path)?;
        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.set_records(name, records);
        Ok(true)
    }

    /// Records must already be ranked; their order is the supplied row order.
    pub fn set_records(&mut self, name: String, records: Vec<AthleteRecord>) {
        self.record_index = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (RowId(r.id), idx))
            .collect();
        self.table = Self::build_table(&records, &self.config);
        self.records = records;
        self.name = name;
        self.selected = 0;
        self.search_input.clear();
        self.filter_cursor.clear();
        self.set_status_message(format!("Loaded {} athletes", self.records.len()));
    }

    fn build_table(records: &[AthleteRecord], config: &BSConfig) -> TableController<Projection> {
        let rows: Vec<_> = records.iter().map(AthleteRecord::to_row).collect();
        let ids: Vec<RowId> = rows.iter().map(|r| r.id()).collect();
        let surface = Projection::new(&ids, config.initial_view);
        TableController::new(rows, TableLayout::athletes(), config.initial_view, surface)
            .with_debounce(config.search_debounce)
    }

    pub fn table(&self) -> &TableController<Projection> {
        &self.table
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SearchInput
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn view(&self) -> View {
        self.table.surface().active_view()
    }

    fn visible_ids(&self) -> Vec<RowId> {
        self.table
            .surface()
            .visible_ids(Representation::from(self.view()))
    }

    pub fn selected_record(&self) -> Option<&AthleteRecord> {
        self.visible_ids()
            .get(self.selected)
            .and_then(|id| self.record_index.get(id))
            .map(|&idx| &self.records[idx])
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    pub fn get_uidata(&self) -> UIData<'_> {
        let athletes = self
            .visible_ids()
            .iter()
            .filter_map(|id| self.record_index.get(id))
            .map(|&idx| &self.records[idx])
            .collect::<Vec<_>>();
        let surface = self.table.surface();
        let sort_indicators = [SORT_RANK, SORT_NAME, SORT_NIL]
            .into_iter()
            .map(|field| (field, surface.sort_indicator(field)))
            .collect();

        let search_text = if self.modus == Modus::SearchInput {
            self.last_input.clone()
        } else {
            InputResult {
                input: self.search_input.clone(),
                ..Default::default()
            }
        };

        UIData {
            name: self.name.clone(),
            total: self.records.len(),
            selected: self.selected,
            view: self.view(),
            search_text,
            search_active: self.modus == Modus::SearchInput,
            filters: self.filter_views(),
            sort_indicators,
            no_results: surface.no_results(),
            empty_dataset: self.records.is_empty(),
            theme: self.theme,
            show_rank: self.config.show_rank,
            card_width: self.config.card_width,
            show_popup: self.modus == Modus::Popup,
            popup_message: HELP_TEXT.to_string(),
            status_message: self.status_line(athletes.len()),
            layout: self.uilayout.clone(),
            athletes,
        }
    }

    fn status_line(&self, shown: usize) -> String {
        if self.records.is_empty() {
            return self.status_message.clone();
        }
        let total_nil: f64 = self.records.iter().map(|r| r.nil_valuation).sum();
        format!(
            "{shown}/{} athletes · {} total NIL · {}",
            self.records.len(),
            format_value(total_nil),
            self.status_message
        )
    }

    fn filter_options(&self, key: &str) -> Vec<(String, String)> {
        if key == FILTER_POSITION {
            POSITION_OPTIONS
                .iter()
                .map(|(value, label)| (value.to_string(), label.to_string()))
                .collect()
        } else {
            self.table
                .filter_options(key)
                .into_iter()
                .map(|value| (value.clone(), title_case(&value)))
                .collect()
        }
    }

    fn filter_views(&self) -> Vec<FilterView> {
        FILTER_KEYS
            .iter()
            .map(|&key| {
                let cursor = self.filter_cursor.get(key).copied().unwrap_or(0);
                let label = match cursor {
                    0 => match key {
                        FILTER_POSITION => "All Positions".to_string(),
                        FILTER_SCHOOL => "All Schools".to_string(),
                        other => format!("All {other}"),
                    },
                    n => self
                        .filter_options(key)
                        .get(n - 1)
                        .map(|(_, label)| label.clone())
                        .unwrap_or_default(),
                };
                FilterView { key, label }
            })
            .collect()
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), BSError> {
        let Some(msg) = message else {
            return Ok(());
        };

        match msg {
            Message::Tick => {
                if self.table.tick(Instant::now()) {
                    self.clamp_selection();
                }
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            _ => {}
        }

        match self.modus {
            Modus::Browse => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_up(self.step()),
                Message::MoveDown => self.move_selection_down(self.step()),
                Message::MovePageUp => self.move_selection_up(self.uilayout.page_size(self.view())),
                Message::MovePageDown => {
                    self.move_selection_down(self.uilayout.page_size(self.view()))
                }
                Message::MoveBeginning => self.selected = 0,
                Message::MoveEnd => self.selected = self.visible_ids().len().saturating_sub(1),
                Message::Search => self.enter_search_mode(),
                Message::CycleFilter(key, forward) => self.cycle_filter(key, forward),
                Message::ClearFilters => self.clear_filters(),
                Message::Sort(field) => self.sort(field),
                Message::ToggleView => self.toggle_view(),
                Message::ToggleTheme => self.toggle_theme(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Exit => {
                    if !self.table.state().search_term.is_empty()
                        || !self.table.state().active_filters.is_empty()
                    {
                        self.clear_filters();
                    }
                }
                _ => (),
            },
            Modus::SearchInput => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
            Modus::Popup => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit_popup(),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn step(&self) -> usize {
        match self.view() {
            View::Table => 1,
            View::Cards => self.uilayout.cards_per_row,
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height, self.config.card_width);
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    fn exit_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
    }

    fn enter_search_mode(&mut self) {
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SearchInput;
        self.input.begin(&self.search_input);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            self.search_input = self.last_input.input.clone();
            self.table
                .set_search_term(&self.last_input.input, Instant::now());
        }
        if self.last_input.finished {
            if self.last_input.canceled {
                self.search_input.clear();
                self.table.set_search_term("", Instant::now());
            }
            self.table.flush_search();
            self.clamp_selection();
            self.modus = Modus::Browse;
            self.previous_modus = Modus::SearchInput;
            debug!("Search finished with \"{}\"", self.table.state().search_term);
        }
    }

    fn cycle_filter(&mut self, key: &'static str, forward: bool) {
        let options = self.filter_options(key);
        let slots = options.len() + 1;
        let current = self.filter_cursor.get(key).copied().unwrap_or(0) % slots;
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.filter_cursor.insert(key, next);

        let value = match next {
            0 => String::new(),
            n => options[n - 1].0.clone(),
        };
        self.keep_selection(|model| model.table.set_filter(key, &value));
        self.set_status_message(format!(
            "{} athletes match",
            self.table.visible_count()
        ));
    }

    fn clear_filters(&mut self) {
        self.filter_cursor.clear();
        self.search_input.clear();
        self.keep_selection(|model| model.table.clear_filters());
        self.set_status_message("Cleared search and filters");
    }

    fn sort(&mut self, field: &'static str) {
        self.keep_selection(|model| model.table.toggle_sort(field));
        if let Some(direction) = self.table.surface().sort_indicator(field) {
            self.set_status_message(format!("Sorted by {field} {direction:?}"));
        }
    }

    fn toggle_view(&mut self) {
        let view = self.table.state().view.toggled();
        self.keep_selection(|model| model.table.set_view(view));
        info!("Switched to {view} view");
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
        self.theme_store.save(self.theme);
        self.set_status_message(format!("Switched to {} mode", self.theme));
    }

    /// Runs `change` and moves the cursor so it stays on the same athlete
    /// when that athlete is still visible.
    fn keep_selection(&mut self, change: impl FnOnce(&mut Self)) {
        let previous = self.visible_ids().get(self.selected).copied();
        change(self);
        if let Some(id) = previous
            && let Some(pos) = self.visible_ids().iter().position(|&v| v == id)
        {
            self.selected = pos;
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible_ids().len();
        self.selected = std::cmp::min(self.selected, visible.saturating_sub(1));
    }

    fn move_selection_up(&mut self, size: usize) {
        self.selected = self.selected.saturating_sub(size);
    }

    fn move_selection_down(&mut self, size: usize) {
        let last = self.visible_ids().len().saturating_sub(1);
        self.selected = std::cmp::min(self.selected + size, last);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    pub fn row_as_csv(record: &AthleteRecord) -> String {
        [
            record.rank.to_string(),
            record.name.clone(),
            record.position.clone(),
            record.school_name().to_string(),
            record.nil_valuation.to_string(),
            record.sponsor_names().join("; "),
        ]
        .iter()
        .map(|c| Model::wrap_cell_content(c))
        .collect::<Vec<String>>()
        .join(",")
    }

    fn copy_row(&mut self) {
        let Some(record) = self.selected_record() else {
            return;
        };
        let content = Model::row_as_csv(record);
        trace!("Row content: {}", content);

        let result = Clipboard::new().and_then(|mut clipboard| clipboard.set_text(content));
        match result {
            Ok(_) => self.set_status_message("Copied athlete to clipboard"),
            Err(e) => {
                debug!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Clipboard not available");
            }
        }
    }
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
