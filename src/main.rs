use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod inputter;
mod loader;
mod model;
mod record;
mod state;
mod table;
mod ui;

use controller::Controller;
use domain::{
    DEFAULT_EVENT_POLL_TIME, DEFAULT_LOG_FILE, DEFAULT_PAGE_SIZE, DEFAULT_ROWS, DTVConfig,
    DTVError, Message,
};
use model::{Model, Status};
use record::Record;
use ui::TableUI;

/// A searchable, sortable and paginated data table for the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// csv, parquet or arrow file with the columns id, name, email, phone, address, country and pin.
    /// Without a file a synthetic dataset is shown.
    path: Option<String>,

    /// Number of synthetic records
    #[arg(short = 'n', long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// Rows per page
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: NonZeroUsize,

    /// Log file, the filter is read from DTV_LOG
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_EVENT_POLL_TIME)]
    poll: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            if let DTVError::LoadingFailed { span_trace, .. } = &e {
                eprintln!("{span_trace}");
            }
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), DTVError> {
    let config = DTVConfig::default()
        .with_rows(args.rows)
        .with_page_size(args.page_size)
        .with_event_poll_time(args.poll)
        .with_log_file(expand_path(&args.log_file)?);
    init_logging(&config.log_file)?;
    info!("Starting dtv with {:?}", config);

    let (name, records) = match args.path {
        Some(path) => {
            let path = expand_path(&path)?;
            let name = path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string();
            (name, loader::load_records(&path)?)
        }
        None => ("synthetic".to_string(), Record::synthetic(config.rows)),
    };

    let mut model = Model::init(name, records, &config);
    let mut ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), DTVError> {
    let size = terminal.size()?;
    model.update(Message::Resize(size.width as usize, size.height as usize))?;

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model, f))?;

        if let Some(message) = controller.handle_event(model)? {
            model.update(message)?;
        };
    }
    info!("Quitting dtv, last view state {:?}", model.state());
    Ok(())
}

fn expand_path(path: &str) -> Result<PathBuf, DTVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DTVError::InvalidPath(e.to_string()))
}

// The terminal belongs to the ui, so logs go to a file
fn init_logging(path: &Path) -> Result<(), DTVError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_env("DTV_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
