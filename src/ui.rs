use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use tracing::trace;

use crate::domain::DTVConfig;
use crate::model::{Model, UIData};
use crate::record::Field;
use crate::table::PageInfo;

pub const SEARCH_HEIGHT: u16 = 3;
pub const COLUMN_SELECTION_HEIGHT: u16 = 1;
pub const PAGINATION_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGHT: u16 = 1;
pub const POPUP_WIDTH_PERCENT: u16 = 60;
pub const POPUP_HEIGHT_PERCENT: u16 = 70;

/// Renders the ui data of a model. Holds no table state of its own.
#[derive(Debug)]
pub struct TableUI {
    page_size: usize,
}

impl TableUI {
    pub fn new(config: &DTVConfig) -> Self {
        Self {
            page_size: config.page_size.get(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [search_area, columns_area, table_area, pagination_area, cmdline_area] =
            Layout::vertical([
                Constraint::Length(SEARCH_HEIGHT),
                Constraint::Length(COLUMN_SELECTION_HEIGHT),
                Constraint::Min(3),
                Constraint::Length(PAGINATION_HEIGHT),
                Constraint::Length(CMDLINE_HEIGHT),
            ])
            .areas(frame.area());

        self.render_search(uidata, frame, search_area);
        self.render_column_selection(uidata, frame, columns_area);
        self.render_table(uidata, frame, table_area);
        self.render_pagination(&uidata.page, frame, pagination_area);
        self.render_cmdline(uidata, frame, cmdline_area);

        if let Some(record) = &uidata.record {
            self.render_record(&uidata.name, record, frame);
        }
        if uidata.show_popup {
            self.render_popup(&uidata.popup_message, frame);
        }
    }

    fn render_search(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(format!(" {} ", uidata.name).bold());
        let block = Block::bordered()
            .title(title.centered())
            .border_set(border::THICK);

        let query = if uidata.query.is_empty() {
            Span::from("type / to search").dim()
        } else {
            Span::from(uidata.query.as_str()).yellow()
        };
        let line = Line::from(vec![" Search: ".bold(), query]);
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn render_column_selection(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::from(" Columns: ").bold()];
        for (idx, (field, shown)) in uidata.columns.iter().enumerate() {
            let check = if *shown { "[x]" } else { "[ ]" };
            let span = Span::from(format!("{check} {} {}  ", idx + 1, field.label()));
            spans.push(if *shown { span } else { span.dim() });
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        let headers: Vec<Cell> = uidata
            .table
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let mut style = header_style;
                if column.sort.is_some() {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                if Some(idx) == uidata.selected_column {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Cell::from(column.name.as_str()).style(style)
            })
            .collect();

        // Rows are built from the page row count so hidden columns still render empty rows
        let rows: Vec<Row> = (0..uidata.nrows)
            .map(|ridx| {
                let cells: Vec<Cell> = uidata
                    .table
                    .iter()
                    .map(|column| {
                        let line = Line::from(column.data[ridx].as_str());
                        if column.field == Field::Id {
                            Cell::from(line.right_aligned())
                        } else {
                            Cell::from(line)
                        }
                    })
                    .collect();
                let row = Row::new(cells);
                if ridx % 2 == 1 {
                    row.style(Style::default().add_modifier(Modifier::DIM))
                } else {
                    row
                }
            })
            .collect();

        let widths: Vec<Constraint> = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16))
            .collect();

        let mut state = TableState::default();
        if uidata.nrows > 0 && uidata.record.is_none() {
            state.select(Some(uidata.selected_row));
        }

        let empty_message = if uidata.nrows == 0 {
            Line::from(" no matching records ".italic()).centered()
        } else {
            Line::default()
        };

        let table = Table::new(rows, widths)
            .header(Row::new(headers))
            .column_spacing(1)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .block(Block::bordered().title_bottom(empty_message));
        trace!(
            "Render table with {} columns and {} rows",
            uidata.table.len(),
            uidata.nrows
        );
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_pagination(&self, page: &PageInfo, frame: &mut Frame, area: Rect) {
        let prev = if page.has_prev() {
            Span::from(" « Prev ").bold()
        } else {
            Span::from(" « Prev ").dim()
        };
        let next = if page.has_next() {
            Span::from(" Next » ").bold()
        } else {
            Span::from(" Next » ").dim()
        };

        let mut spans = vec![prev];
        for p in 1..=page.total_pages {
            let item = Span::from(format!(" {p} "));
            spans.push(if p == page.current_page {
                item.reversed()
            } else {
                item
            });
        }
        spans.push(next);
        spans.push(
            format!(
                "  page {}/{}, {} rows, {} per page",
                page.current_page, page.total_pages, page.total_rows, self.page_size
            )
            .dim(),
        );
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = uidata.cmd_mode.map(|m| m.prompt()).unwrap_or(":");
            let line = Line::from(vec![
                Span::from(prompt).blue().bold(),
                Span::from(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let line = Line::from(vec![
                Span::from(uidata.status_message.as_str()),
                Span::from("  ? help, q quit").dim(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn render_record(&self, name: &str, record: &[(String, String)], frame: &mut Frame) {
        let area = popup_area(frame.area(), POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT);
        let header_width = record
            .iter()
            .map(|(h, _)| h.chars().count())
            .max()
            .unwrap_or(0) as u16;
        let rows: Vec<Row> = record
            .iter()
            .map(|(h, v)| Row::new(vec![Cell::from(h.as_str()).bold(), Cell::from(v.as_str())]))
            .collect();
        let table = Table::new(rows, [Constraint::Length(header_width), Constraint::Fill(1)])
            .column_spacing(2)
            .block(
                Block::bordered()
                    .title(Line::from(format!(" {name} ")).centered())
                    .title_bottom(Line::from(" ←/→ previous/next record, Esc close ").centered()),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(table, area);
    }

    fn render_popup(&self, message: &str, frame: &mut Frame) {
        let area = popup_area(frame.area(), POPUP_WIDTH_PERCENT, POPUP_HEIGHT_PERCENT);
        let popup = Paragraph::new(message)
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(Line::from(" Help ".bold()).centered())
                    .border_set(border::THICK),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
