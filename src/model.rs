use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::domain::{CMDMode, DTVConfig, DTVError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, Record};
use crate::state::{SortOrder, ViewState};
use crate::table::{self, PageInfo, TableView};

const COLUMN_WIDTH_MARGIN: usize = 2;
const MAX_COLUMN_WIDTH: usize = 40;

#[derive(Debug, PartialEq)]
pub enum Status {
    EMPTY,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

/// One rendered column of the current page.
#[derive(Clone, Debug)]
pub struct ColumnView {
    pub field: Field,
    pub name: String,
    pub sort: Option<SortOrder>,
    pub width: usize,
    pub data: Vec<String>,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize, // Rows on the current page, independent of the visible columns
    pub columns: Vec<(Field, bool)>,
    pub query: String,
    pub page: PageInfo,
    pub selected_row: usize,
    pub selected_column: Option<usize>,
    pub record: Option<Vec<(String, String)>>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            nrows: 0,
            columns: Vec::new(),
            query: String::new(),
            page: PageInfo::default(),
            selected_row: 0,
            selected_column: None,
            record: None,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

/// Owns the records and the view state. Every change of the view state
/// re-runs the table pipeline from scratch.
pub struct Model {
    name: String,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    records: Vec<Record>,
    state: ViewState,
    view: TableView,
    curser_row: usize,    // Row on the current page
    curser_column: usize, // Index into the visible columns
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    state_before_cmd: Option<ViewState>,
    ui_size: (usize, usize),
    status_message: String,
}

impl Model {
    pub fn init(name: impl Into<String>, records: Vec<Record>, config: &DTVConfig) -> Self {
        let status = if records.is_empty() {
            Status::EMPTY
        } else {
            Status::READY
        };
        let mut model = Self {
            name: name.into(),
            status,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            records,
            state: ViewState::new(config.page_size),
            view: TableView::default(),
            curser_row: 0,
            curser_column: 0,
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            state_before_cmd: None,
            ui_size: (0, 0),
            status_message: String::new(),
        };
        info!(
            "Showing {} records, {} per page",
            model.records.len(),
            config.page_size
        );
        model.apply(model.state.clone());
        model.set_status_message(format!("Loaded {} records. Press ? for help.", model.records.len()));
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) -> Result<(), DTVError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit => self.quit(),
                Message::Search => self.enter_cmd_mode(CMDMode::Search),
                Message::EnterPage => self.enter_cmd_mode(CMDMode::GotoPage),
                Message::ClearSearch | Message::Exit => self.clear_search(),
                Message::MoveUp => self.move_row_selection(-1),
                Message::MoveDown => self.move_row_selection(1),
                Message::MoveLeft => self.move_column_selection(-1),
                Message::MoveRight => self.move_column_selection(1),
                Message::Sort => self.sort_selected_column(),
                Message::ToggleColumn(field) => self.toggle_column(field),
                Message::NextPage => self.next_page(),
                Message::PrevPage => self.prev_page(),
                Message::FirstPage => self.goto_page(1),
                Message::LastPage => self.goto_page(self.view.page.total_pages),
                Message::GotoPage(page) => self.goto_page(page),
                Message::Enter => self.enter_record_view(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(_) => (),
            },
            Modus::RECORD => match message {
                Message::Quit => self.quit(),
                Message::MoveUp | Message::MoveLeft => self.step_record(-1),
                Message::MoveDown | Message::MoveRight => self.step_record(1),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Enter | Message::Exit => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Help | Message::Enter | Message::Exit => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match message {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Pipeline ---------------------- //

    // Recomputes the view for `state` and keeps page and cursors in range
    fn apply(&mut self, state: ViewState) {
        let mut view = table::compute(&self.records, &state);
        let state = state.clamped(view.page.total_pages);
        if state.page != view.page.current_page {
            debug!(
                "Clamped page {} to {}",
                view.page.current_page, state.page
            );
            view = table::compute(&self.records, &state);
        }
        // A different row order leaves the cursor on an unrelated record
        if state.page != self.state.page
            || state.query != self.state.query
            || state.sort_field != self.state.sort_field
            || state.sort_order != self.state.sort_order
        {
            self.curser_row = 0;
        }
        self.state = state;
        self.view = view;
        self.curser_row = std::cmp::min(self.curser_row, self.view.rows.len().saturating_sub(1));
        self.curser_column = std::cmp::min(
            self.curser_column,
            self.state.columns.len().saturating_sub(1),
        );
        self.update_uidata();
    }

    fn selected_field(&self) -> Option<Field> {
        self.state.columns.iter().nth(self.curser_column)
    }

    fn selected_record(&self) -> Option<&Record> {
        self.view
            .rows
            .get(self.curser_row)
            .map(|&idx| &self.records[idx])
    }

    // -------------------- UI data ---------------------- //

    fn update_uidata(&mut self) {
        let table: Vec<ColumnView> = self
            .state
            .columns
            .iter()
            .map(|field| self.build_column_view(field))
            .collect();

        let record = match self.modus {
            Modus::RECORD => self.selected_record().map(|r| {
                Field::ALL
                    .iter()
                    .map(|&f| (f.label().to_string(), r.text(f).into_owned()))
                    .collect()
            }),
            _ => None,
        };

        let name = match self.modus {
            Modus::RECORD => format!("R[{}]", self.name),
            _ if !self.state.query.is_empty() => format!("F[{}]", self.name),
            _ => self.name.clone(),
        };

        self.uidata = UIData {
            name,
            table,
            nrows: self.view.rows.len(),
            columns: Field::ALL
                .iter()
                .map(|&f| (f, self.state.columns.contains(f)))
                .collect(),
            query: self.state.query.clone(),
            page: self.view.page,
            selected_row: self.curser_row,
            selected_column: self.selected_field().map(|_| self.curser_column),
            record,
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
        };
    }

    fn build_column_view(&self, field: Field) -> ColumnView {
        let data: Vec<String> = self
            .view
            .records(&self.records)
            .map(|r| r.text(field).into_owned())
            .collect();
        let sort = (self.state.sort_field == field).then_some(self.state.sort_order);
        let name = match sort {
            Some(order) => format!("{} {}", field.label(), order.symbol()),
            None => field.label().to_string(),
        };
        let width = Self::calculate_column_width(&name, &data);
        ColumnView {
            field,
            name,
            sort,
            width,
            data,
        }
    }

    fn calculate_column_width(name: &str, data: &[String]) -> usize {
        let max_width = data
            .iter()
            .map(|d| d.chars().count())
            .max()
            .unwrap_or(0);
        std::cmp::min(
            std::cmp::max(name.chars().count(), max_width) + COLUMN_WIDTH_MARGIN,
            MAX_COLUMN_WIDTH,
        )
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_size.0, width, self.ui_size.1, height
        );
        self.ui_size = (width, height);
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {}
            Modus::RECORD | Modus::POPUP => {
                trace!("Leaving {:?} ...", self.modus);
                self.modus = self.previous_modus;
                self.previous_modus = Modus::TABLE;
                self.update_uidata();
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.update_uidata();
    }

    fn enter_record_view(&mut self) {
        if self.view.is_empty() {
            self.set_status_message("No record selected!");
            return;
        }
        self.previous_modus = self.modus;
        self.modus = Modus::RECORD;
        self.update_uidata();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.state_before_cmd = Some(self.state.clone());

        self.input.clear();
        if mode == CMDMode::Search {
            self.input.set(&self.state.query);
        }
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);

        // The search is applied while typing
        if self.cmd_mode == Some(CMDMode::Search)
            && !self.last_input.canceled
            && self.last_input.input != self.state.query
        {
            let query = self.last_input.input.clone();
            self.apply(self.state.clone().with_query(query));
        }

        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.update_uidata();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        let mode = self.cmd_mode.take();
        let previous_state = self.state_before_cmd.take();

        if self.last_input.canceled {
            if let Some(state) = previous_state {
                self.apply(state);
            }
            return;
        }

        let cmd_input = self.last_input.input.clone();
        match mode {
            Some(CMDMode::Search) => {
                let found = self.view.page.total_rows;
                if cmd_input.is_empty() {
                    self.set_status_message("Search cleared");
                } else if found == 0 {
                    self.set_status_message("Found no matches!");
                } else {
                    self.set_status_message(format!("Found {found} results"));
                }
            }
            Some(CMDMode::GotoPage) => match cmd_input.trim().parse::<usize>() {
                Ok(page) => self.goto_page(page),
                Err(_) => self.set_status_message(format!("Invalid page number {cmd_input:?}")),
            },
            None => info!("Cmd mode is none!"),
        }
    }

    fn clear_search(&mut self) {
        if !self.state.query.is_empty() {
            self.apply(self.state.clone().with_query(""));
            self.set_status_message("Search cleared");
        }
    }

    fn sort_selected_column(&mut self) {
        match self.selected_field() {
            Some(field) => {
                self.apply(self.state.clone().sorted_by(field));
                self.set_status_message(format!(
                    "Sorted by {} {}",
                    field.label(),
                    self.state.sort_order.symbol()
                ));
            }
            None => self.set_status_message("No column selected!"),
        }
    }

    fn toggle_column(&mut self, field: Field) {
        self.apply(self.state.clone().with_column_toggled(field));
        let shown = if self.state.columns.contains(field) {
            "shown"
        } else {
            "hidden"
        };
        self.set_status_message(format!("Column {} {}", field.label(), shown));
    }

    fn next_page(&mut self) {
        if self.view.page.has_next() {
            self.apply(self.state.clone().next_page(self.view.page.total_pages));
        }
    }

    fn prev_page(&mut self) {
        if self.view.page.has_prev() {
            self.apply(self.state.clone().prev_page(self.view.page.total_pages));
        }
    }

    fn goto_page(&mut self, page: usize) {
        self.apply(
            self.state
                .clone()
                .goto_page(page, self.view.page.total_pages),
        );
    }

    fn move_row_selection(&mut self, step: isize) {
        let last = self.view.rows.len().saturating_sub(1);
        self.curser_row = self.curser_row.saturating_add_signed(step).min(last);
        self.update_uidata();
    }

    // Steps through the records of the whole view, crossing page boundaries
    fn step_record(&mut self, step: isize) {
        let last = self.view.rows.len().saturating_sub(1);
        if step > 0 && self.curser_row >= last && self.view.page.has_next() {
            self.next_page();
        } else if step < 0 && self.curser_row == 0 && self.view.page.has_prev() {
            self.prev_page();
            self.curser_row = self.view.rows.len().saturating_sub(1);
            self.update_uidata();
        } else {
            self.move_row_selection(step);
        }
    }

    fn move_column_selection(&mut self, step: isize) {
        let last = self.state.columns.len().saturating_sub(1);
        self.curser_column = self.curser_column.saturating_add_signed(step).min(last);
        self.update_uidata();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
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

    /// The visible columns of `record` as one csv line.
    fn row_as_csv(record: &Record, columns: impl Iterator<Item = Field>) -> String {
        columns
            .map(|f| Self::wrap_cell_content(&record.text(f)))
            .collect::<Vec<String>>()
            .join(",")
    }

    fn copy_row(&mut self) {
        if self.state.columns.is_empty() {
            self.set_status_message("No columns to copy!");
            return;
        }
        let Some(content) = self
            .selected_record()
            .map(|r| Self::row_as_csv(r, self.state.columns.iter()))
        else {
            self.set_status_message("No record selected!");
            return;
        };
        trace!("Row content: {}", content);

        match self.copy_to_clipboard(content) {
            Ok(_) => self.set_status_message("Copied row to clipboard."),
            Err(e) => {
                error!("Error copying to clipboard: {:?}", e);
                self.set_status_message(format!("Copy failed: {e}"));
            }
        }
    }

    fn copy_to_clipboard(&mut self, content: String) -> Result<(), DTVError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set_text(content)?;
        }
        Ok(())
    }
}
