use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::fields::{EMPTY_VALUE, format_value, initials};
use crate::loader::AthleteRecord;
use crate::model::{Model, UIData};
use crate::row::{SORT_NAME, SORT_NIL, SORT_RANK};
use crate::table_controller::{SortDirection, View};
use crate::theme::Palette;

pub const TOOLBAR_HEIGHT: usize = 3;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 3; // Header row plus the block borders
pub const CARD_HEIGHT: usize = 7;
const TABLE_SPONSORS: usize = 4;
const CARD_SPONSORS: usize = 3;
const NO_MATCHES: &str = "No athletes found matching your search.";
const NO_ATHLETES: &str = "No athletes found.";

#[derive(Debug, Default)]
pub struct TableUI {}

impl TableUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let palette = uidata.theme.palette();
        let area = frame.area();

        frame.render_widget(
            Block::new().style(Style::new().bg(palette.background).fg(palette.foreground)),
            area,
        );

        let [toolbar, body, statusline] = Layout::vertical([
            Constraint::Length(TOOLBAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(area);

        self.render_toolbar(&uidata, &palette, toolbar, frame);
        if uidata.empty_dataset {
            Self::render_message(NO_ATHLETES, &palette, body, frame);
        } else if uidata.no_results {
            Self::render_message(NO_MATCHES, &palette, body, frame);
        } else {
            match uidata.view {
                View::Table => self.render_table(&uidata, &palette, body, frame),
                View::Cards => self.render_cards(&uidata, &palette, body, frame),
            }
        }
        self.render_statusline(&uidata, &palette, statusline, frame);

        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, &palette, area, frame);
        }
    }

    fn render_toolbar(&self, uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
        let block = Block::bordered()
            .border_set(border::ROUNDED)
            .border_style(Style::new().fg(palette.border))
            .title(Line::from(format!(" {} ", uidata.name)).bold());
        let inner = block.inner(area);

        const SEARCH_PREFIX: &str = " Search: ";
        let search_style = if uidata.search_active {
            Style::new().fg(palette.accent)
        } else {
            Style::new().fg(palette.foreground)
        };
        let placeholder = uidata.search_text.input.is_empty() && !uidata.search_active;
        let search = if placeholder {
            Span::styled("Search athletes...", Style::new().fg(palette.muted))
        } else {
            Span::styled(uidata.search_text.input.clone(), search_style)
        };

        let mut spans = vec![
            Span::styled(SEARCH_PREFIX, Style::new().fg(palette.muted)),
            search,
        ];
        for filter in uidata.filters.iter() {
            spans.push(Span::raw("  │ "));
            spans.push(Span::styled(filter.label.clone(), Style::new().fg(palette.accent)));
        }
        spans.push(Span::raw("  │ "));
        for view in [View::Table, View::Cards] {
            let label = format!("[{view}]");
            if view == uidata.view {
                spans.push(Span::styled(
                    label,
                    Style::new().fg(palette.background).bg(palette.accent),
                ));
            } else {
                spans.push(Span::styled(label, Style::new().fg(palette.muted)));
            }
            spans.push(Span::raw(" "));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

        if uidata.search_active {
            let x = inner.x + (SEARCH_PREFIX.chars().count() + uidata.search_text.cursor_pos) as u16;
            frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
        }
    }

    fn header_label(label: &str, field: &str, uidata: &UIData) -> String {
        let indicator = uidata
            .sort_indicators
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, d)| *d);
        match indicator {
            Some(SortDirection::Asc) => format!("{label} ▲"),
            Some(SortDirection::Desc) => format!("{label} ▼"),
            None => label.to_string(),
        }
    }

    fn sponsors_summary(athlete: &AthleteRecord, max: usize) -> String {
        let names = athlete.sponsor_names();
        if names.is_empty() {
            return EMPTY_VALUE.to_string();
        }
        let mut summary = names.iter().take(max).copied().collect::<Vec<_>>().join(", ");
        if names.len() > max {
            summary.push_str(&format!(" +{}", names.len() - max));
        }
        summary
    }

    fn player_label(athlete: &AthleteRecord) -> String {
        let mut label = athlete.name.clone();
        if !athlete.position.is_empty() {
            label.push_str(&format!(" ({})", athlete.position));
        }
        let info = athlete.player_info();
        if !info.is_empty() {
            label.push_str(&format!(" · {info}"));
        }
        label
    }

    fn render_table(&self, uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
        let mut header_cells = Vec::new();
        let mut widths = Vec::new();
        if uidata.show_rank {
            header_cells.push(Self::header_label("#", SORT_RANK, uidata));
            widths.push(Constraint::Length(6));
        }
        header_cells.push(Self::header_label("Player", SORT_NAME, uidata));
        widths.push(Constraint::Percentage(40));
        header_cells.push(Self::header_label("NIL Value", SORT_NIL, uidata));
        widths.push(Constraint::Length(12));
        header_cells.push("School".to_string());
        widths.push(Constraint::Percentage(20));
        header_cells.push("Sponsors".to_string());
        widths.push(Constraint::Fill(1));

        let header = Row::new(header_cells.into_iter().map(Cell::from))
            .style(Style::new().fg(palette.muted).add_modifier(Modifier::BOLD));

        let rows = uidata.athletes.iter().map(|athlete| {
            let mut cells = Vec::new();
            if uidata.show_rank {
                cells.push(Cell::from(athlete.rank.to_string()));
            }
            cells.push(Cell::from(Self::player_label(athlete)));
            cells.push(Cell::from(Span::styled(
                format_value(athlete.nil_valuation),
                Style::new().fg(palette.accent),
            )));
            let school = match athlete.school_name() {
                "" => EMPTY_VALUE,
                name => name,
            };
            cells.push(Cell::from(school.to_string()));
            cells.push(Cell::from(Self::sponsors_summary(athlete, TABLE_SPONSORS)));
            Row::new(cells)
        });

        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::bordered()
                    .border_set(border::ROUNDED)
                    .border_style(Style::new().fg(palette.border)),
            )
            .row_highlight_style(Style::new().bg(palette.highlight).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = TableState::default().with_selected(Some(uidata.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_cards(&self, uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
        let per_row = std::cmp::max(1, uidata.layout.cards_per_row);
        let card_width = std::cmp::max(1, area.width as usize / per_row) as u16;
        let visible_rows = std::cmp::max(1, area.height as usize / CARD_HEIGHT);

        let selected_row = uidata.selected / per_row;
        let first_row = selected_row.saturating_sub(visible_rows - 1);
        let first = first_row * per_row;
        let last = std::cmp::min(uidata.athletes.len(), first + visible_rows * per_row);

        for (idx, athlete) in uidata.athletes[first..last].iter().enumerate() {
            let row = (idx / per_row) as u16;
            let col = (idx % per_row) as u16;
            let rect = Rect {
                x: area.x + col * card_width,
                y: area.y + row * CARD_HEIGHT as u16,
                width: card_width,
                height: CARD_HEIGHT as u16,
            }
            .intersection(area);
            let selected = first + idx == uidata.selected;
            frame.render_widget(Self::card(athlete, uidata.show_rank, selected, palette), rect);
        }
    }

    fn card<'a>(
        athlete: &'a AthleteRecord,
        show_rank: bool,
        selected: bool,
        palette: &Palette,
    ) -> Paragraph<'a> {
        let border_color = if selected { palette.accent } else { palette.border };
        let mut block = Block::bordered()
            .border_set(if selected { border::THICK } else { border::ROUNDED })
            .border_style(Style::new().fg(border_color));
        if show_rank {
            block = block.title(Line::from(format!(" #{} ", athlete.rank)).right_aligned());
        }

        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!("[{}] ", initials(&athlete.name)),
                Style::new().fg(palette.muted),
            ),
            Span::styled(athlete.name.as_str(), Style::new().bold()),
        ])];
        if !athlete.position.is_empty() {
            lines.push(Line::from(Span::styled(
                athlete.position.as_str(),
                Style::new().fg(palette.muted),
            )));
        }
        if athlete.nil_valuation != 0.0 {
            lines.push(Line::from(vec![
                Span::styled("NIL Value ", Style::new().fg(palette.muted)),
                Span::styled(
                    format_value(athlete.nil_valuation),
                    Style::new().fg(palette.accent).bold(),
                ),
            ]));
        }
        if !athlete.school_name().is_empty() {
            lines.push(Line::from(athlete.school_name()));
        }
        if !athlete.sponsors.is_empty() {
            lines.push(Line::from(Span::styled(
                Self::sponsors_summary(athlete, CARD_SPONSORS),
                Style::new().fg(palette.muted),
            )));
        }

        Paragraph::new(Text::from(lines)).block(block)
    }

    fn render_message(message: &str, palette: &Palette, area: Rect, frame: &mut Frame) {
        let block = Block::bordered()
            .border_set(border::ROUNDED)
            .border_style(Style::new().fg(palette.border));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .areas(inner);
        frame.render_widget(
            Paragraph::new(message)
                .centered()
                .style(Style::new().fg(palette.warning)),
            middle,
        );
    }

    fn render_statusline(&self, uidata: &UIData, palette: &Palette, area: Rect, frame: &mut Frame) {
        let [left, right] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(24)]).areas(area);
        frame.render_widget(
            Paragraph::new(format!(" {}", uidata.status_message)).style(Style::new().fg(palette.muted)),
            left,
        );
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                "?".fg(palette.accent).bold(),
                " help  ".fg(palette.muted),
                "T".fg(palette.accent).bold(),
                " theme  ".fg(palette.muted),
                "q".fg(palette.accent).bold(),
                " quit".fg(palette.muted),
            ]))
            .right_aligned(),
            right,
        );
    }

    fn render_popup(message: &str, palette: &Palette, area: Rect, frame: &mut Frame) {
        let lines = message.lines().count() as u16 + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let popup = Rect {
            x: area.x + area.width.saturating_sub(width) / 2,
            y: area.y + area.height.saturating_sub(lines) / 2,
            width: width.min(area.width),
            height: lines.min(area.height),
        };
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message)
                .wrap(Wrap { trim: false })
                .style(Style::new().bg(palette.highlight).fg(palette.foreground))
                .block(
                    Block::bordered()
                        .border_set(border::THICK)
                        .border_style(Style::new().fg(palette.accent))
                        .title(Line::from(" Help ").centered()),
                ),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BSConfig, Message};
    use crate::fields::PostRef;
    use crate::loader::rank_by_valuation;
    use crate::theme::Theme;
    use ratatui::crossterm::event::{KeyCode, KeyEvent};
    use ratatui::{Terminal, backend::TestBackend};

    const WIDTH: u16 = 160;
    const HEIGHT: u16 = 20;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn model() -> Model {
        let config = BSConfig::default().with_theme(Some(Theme::Dark));
        let mut model = Model::init(&config, WIDTH as usize, HEIGHT as usize);
        model.set_records(
            "athletes.csv".to_string(),
            rank_by_valuation(vec![
                AthleteRecord {
                    id: 1,
                    name: "Arch Manning".into(),
                    position: "QB".into(),
                    nil_valuation: 6_500_000.0,
                    school: Some(PostRef {
                        id: 3,
                        title: "Texas".into(),
                    }),
                    sponsors: ["Uber", "Red Bull", "Panini", "EA", "Nike"]
                        .iter()
                        .map(|t| PostRef {
                            id: 0,
                            title: t.to_string(),
                        })
                        .collect(),
                    ..Default::default()
                },
                AthleteRecord {
                    id: 2,
                    name: "Sam Walkon".into(),
                    ..Default::default()
                },
            ]),
        );
        model
    }

    fn draw(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
        let mut ui = TableUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn renders_table_rows() {
        let text = draw(&model());
        assert!(text.contains("Arch Manning (QB)"));
        assert!(text.contains("$6.5M"));
        assert!(text.contains("Uber, Red Bull, Panini, EA +1"));
        assert!(text.contains("Sam Walkon"));
        assert!(text.contains("All Positions"));
    }

    #[test]
    fn renders_sort_indicator() {
        let mut model = model();
        model.update(Some(Message::Sort(SORT_NIL))).unwrap();
        assert!(draw(&model).contains("NIL Value ▲"));
    }

    #[test]
    fn renders_cards_view() {
        let mut model = model();
        model.update(Some(Message::ToggleView)).unwrap();
        let text = draw(&model);
        assert!(text.contains("[Ar] Arch Manning"));
        assert!(text.contains("#1"));
        assert!(text.contains("Uber, Red Bull, Panini +2"));
    }

    #[test]
    fn renders_empty_states() {
        let config = BSConfig::default().with_theme(Some(Theme::Dark));
        let empty = Model::init(&config, WIDTH as usize, HEIGHT as usize);
        assert!(draw(&empty).contains(NO_ATHLETES));

        let mut model = model();
        model.update(Some(Message::Search)).unwrap();
        for code in [KeyCode::Char('z'), KeyCode::Char('z'), KeyCode::Enter] {
            model
                .update(Some(Message::RawKey(KeyEvent::from(code))))
                .unwrap();
        }
        assert!(draw(&model).contains(NO_MATCHES));
    }

    #[test]
    fn renders_help_popup() {
        let mut model = model();
        model.update(Some(Message::Help)).unwrap();
        assert!(draw(&model).contains("Ball Street athlete database"));
    }
}
