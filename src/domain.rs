use std::io::Error;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

use crate::record::Field;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(5).unwrap();
pub const DEFAULT_ROWS: usize = 30;
pub const DEFAULT_EVENT_POLL_TIME: u64 = 100;
pub const DEFAULT_LOG_FILE: &str = "dtv.log";

#[derive(Debug, thiserror::Error)]
pub enum DTVError {
    #[error("io error: {0}")]
    IoError(#[from] Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("clipboard error: {0}")]
    ClipboardError(#[from] arboard::Error),
    #[error("loading failed: {message}")]
    LoadingFailed {
        message: String,
        span_trace: SpanTrace,
    },
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
}

impl DTVError {
    pub fn loading_failed(message: impl Into<String>) -> Self {
        DTVError::LoadingFailed {
            message: message.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

/// Runtime configuration, assembled from the command line.
#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct DTVConfig {
    pub event_poll_time: u64,
    pub page_size: NonZeroUsize,
    pub rows: usize,
    pub log_file: PathBuf,
}

impl Default for DTVConfig {
    fn default() -> Self {
        DTVConfig {
            event_poll_time: DEFAULT_EVENT_POLL_TIME,
            page_size: DEFAULT_PAGE_SIZE,
            rows: DEFAULT_ROWS,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    GotoPage,
}

impl CMDMode {
    pub fn prompt(&self) -> &'static str {
        match self {
            CMDMode::Search => "/",
            CMDMode::GotoPage => "page: ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Search,
    ClearSearch,
    EnterPage,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Sort,
    ToggleColumn(Field),
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GotoPage(usize),
    Enter,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  ←/h →/l     select column header
  ↑/k ↓/j     select row
  n, PgDn     next page
  p, PgUp     previous page
  g, Home     first page
  G, End      last page
  :           go to page

Table
  /           search (Enter keeps, Esc restores)
  x           clear search
  s           sort by selected column, again to flip
  1-7         toggle column id, name, email, phone,
              address, country, pin
  Enter       show record
  c           copy row as csv

  ?           this help
  Esc         close
  q           quit";
