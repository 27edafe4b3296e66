use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::DTVError;
use crate::record::{Field, Record};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Loads records from a csv, parquet or arrow file with one column per record field.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_records(path: &Path) -> Result<Vec<Record>, DTVError> {
    let file_info = get_file_info(path)?;
    debug!(
        "Loading {:?} file of {} bytes",
        file_info.file_type, file_info.file_size
    );
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;

    let column_names = df.get_column_names();
    if let Some(missing) = Field::ALL
        .iter()
        .find(|f| !column_names.iter().any(|n| n.as_str() == f.key()))
    {
        return Err(DTVError::loading_failed(format!(
            "missing column \"{}\"",
            missing.key()
        )));
    }

    let ids = load_ids(&df)?;

    // Each text column is materialized in its own thread
    let columns: Result<Vec<Vec<String>>, PolarsError> = Field::ALL[1..]
        .par_iter()
        .map(|field| load_text_column(&df, field.key()))
        .collect();
    let mut columns = columns?.into_iter();
    let mut next_column = || columns.next().unwrap_or_default();
    let (names, emails, phones, addresses, countries, pins) = (
        next_column(),
        next_column(),
        next_column(),
        next_column(),
        next_column(),
        next_column(),
    );

    let records: Vec<Record> = ids
        .into_iter()
        .zip(names)
        .zip(emails)
        .zip(phones)
        .zip(addresses)
        .zip(countries)
        .zip(pins)
        .map(
            |((((((id, name), email), phone), address), country), pin)| Record {
                id,
                name,
                email,
                phone,
                address,
                country,
                pin,
            },
        )
        .collect();

    info!(
        "Loaded {} records in {}ms ...",
        records.len(),
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

fn load_ids(df: &DataFrame) -> Result<Vec<i64>, DTVError> {
    let col = df.column(Field::Id.key())?.cast(&DataType::Int64)?;
    let ids: Vec<i64> = col
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| DTVError::loading_failed(format!("row {} has no valid id", row + 1)))
        })
        .collect::<Result<_, _>>()?;

    // Ids identify a record, a repeated one is rejected
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some((row, id)) = ids.iter().enumerate().find(|(_, id)| !seen.insert(**id)) {
        return Err(DTVError::loading_failed(format!(
            "duplicate id {id} in row {}",
            row + 1
        )));
    }
    Ok(ids)
}

fn load_text_column(df: &DataFrame, col_name: &str) -> Result<Vec<String>, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    Ok(series
        .into_iter()
        .map(|value| value.map(str::to_string).unwrap_or_default())
        .collect())
}

fn detect_file_type(path: &Path) -> Result<FileType, DTVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(DTVError::UnknownFileType),
    }
}

fn get_file_info(path: &Path) -> Result<FileInfo, DTVError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DTVError::FileNotFound,
        ErrorKind::PermissionDenied => DTVError::PermissionDenied,
        _ => DTVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(DTVError::loading_failed("Not a file!"));
    }

    Ok(FileInfo {
        path: path.to_path_buf(),
        file_size: metadata.len(),
        file_type: detect_file_type(path)?,
    })
}

// Schema inference is disabled, every column is read as text. Otherwise a phone
// number like "+1234" would be read as an integer and lose its sign.
fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
