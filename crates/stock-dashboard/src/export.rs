//! Spreadsheet export of a price series.
//!
//! The export is an `.xlsx` workbook with one sheet, `Sheet1`, holding
//! `Date, Open, High, Low, Close[, Volume], MA5, MA20, MA60, MA120`. The same
//! table can also be written as CSV; [`export_to_path`] and
//! [`import_from_path`] pick the format from the file extension. Both formats
//! read back exactly what was written.

use crate::error::{Result, StockError};
use crate::metrics::{MA_WINDOWS, moving_average};
use crate::model::{DailyBar, PriceSeries, parse_date};
use calamine::{Data, DataType, Reader, Xlsx};
use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::Path;

pub const SHEET_NAME: &str = "Sheet1";

const PRICE_COLUMNS: [&str; 5] = ["Date", "Open", "High", "Low", "Close"];
const VOLUME_COLUMN: &str = "Volume";
const DATE_FORMAT: &str = "yyyy-mm-dd";

/// File format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// `.csv` files are CSV, anything else is a workbook
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Xlsx,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

fn header(series: &PriceSeries) -> Vec<String> {
    let mut header: Vec<String> = PRICE_COLUMNS.iter().map(ToString::to_string).collect();
    if series.has_volume() {
        header.push(VOLUME_COLUMN.to_string());
    }
    header.extend(MA_WINDOWS.iter().map(|w| format!("MA{w}")));
    header
}

fn averages(series: &PriceSeries) -> Result<Vec<Vec<f64>>> {
    let closes = series.closes();
    MA_WINDOWS
        .iter()
        .map(|&w| moving_average(&closes, w))
        .collect()
}

/// Build the workbook for `series` in memory
pub fn workbook_bytes(series: &PriceSeries) -> Result<Vec<u8>> {
    let averages = averages(series)?;
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in header(series).iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }

    for (i, bar) in series.bars().iter().enumerate() {
        let row = (i + 1) as u32;
        let date = ExcelDateTime::from_ymd(
            bar.date.year() as u16,
            bar.date.month() as u8,
            bar.date.day() as u8,
        )?;
        sheet.write_datetime_with_format(row, 0, &date, &date_format)?;

        let mut values = vec![bar.open, bar.high, bar.low, bar.close];
        if let Some(volume) = series.volume() {
            values.push(volume[i] as f64);
        }
        values.extend(averages.iter().map(|ma| ma[i]));
        for (offset, value) in values.into_iter().enumerate() {
            sheet.write_number(row, (offset + 1) as u16, value)?;
        }
    }
    sheet.set_column_width(0, 12)?;

    Ok(workbook.save_to_buffer()?)
}

/// Write `series` as a workbook. Returns the row count.
pub fn write_workbook<W: io::Write>(series: &PriceSeries, mut writer: W) -> Result<usize> {
    writer.write_all(&workbook_bytes(series)?)?;
    writer.flush()?;
    Ok(series.len())
}

/// Write `series` as CSV with ISO dates. Returns the row count.
pub fn write_csv<W: io::Write>(series: &PriceSeries, writer: W) -> Result<usize> {
    let averages = averages(series)?;
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(header(series))?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut record = vec![
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
        ];
        if let Some(volume) = series.volume() {
            record.push(volume[i].to_string());
        }
        record.extend(averages.iter().map(|ma| ma[i].to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(series.len())
}

pub fn export_to_path(series: &PriceSeries, path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let rows = match ExportFormat::from_path(path) {
        ExportFormat::Xlsx => write_workbook(series, file)?,
        ExportFormat::Csv => write_csv(series, file)?,
    };
    tracing::info!("Exported {} rows to {}", rows, path.display());
    Ok(rows)
}

/// `<label>_prices.<ext>`, with path separators replaced
pub fn default_file_name(label: &str, format: ExportFormat) -> String {
    let safe: String = label
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{safe}_prices.{}", format.extension())
}

/// Column positions found in a header row
struct Columns {
    prices: [usize; 5],
    volume: Option<usize>,
}

impl Columns {
    fn locate<'a>(header: impl IntoIterator<Item = &'a str> + Clone) -> Result<Self> {
        let position = |name: &str| header.clone().into_iter().position(|h| h.trim() == name);
        let mut prices = [0usize; 5];
        for (slot, name) in prices.iter_mut().zip(PRICE_COLUMNS) {
            *slot = position(name)
                .ok_or_else(|| StockError::InvalidSeries(format!("missing column '{name}'")))?;
        }
        Ok(Self {
            prices,
            volume: position(VOLUME_COLUMN),
        })
    }
}

fn unreadable(row: usize, what: &str, raw: impl std::fmt::Display) -> StockError {
    StockError::InvalidSeries(format!("row {row}: cannot read '{raw}' as a {what}"))
}

/// Read the first sheet of a workbook written by [`write_workbook`].
///
/// Columns are located by header name; moving-average columns are ignored.
/// The volume column is optional and kept only when every row has a value.
pub fn import_workbook<R: Read + Seek>(reader: R) -> Result<PriceSeries> {
    let mut workbook = Xlsx::new(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| StockError::InvalidSeries("the workbook has no sheets".to_string()))??;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok(PriceSeries::default());
    };
    let names: Vec<String> = header_row
        .iter()
        .map(|cell| cell.get_string().unwrap_or_default().to_string())
        .collect();
    let columns = Columns::locate(names.iter().map(String::as_str))?;

    let empty = Data::Empty;
    let mut rows = Vec::new();
    for (line, row) in rows_iter.enumerate() {
        let line = line + 2;
        let cell = |idx: usize| row.get(idx).unwrap_or(&empty);
        let number = |idx: usize| -> Result<f64> {
            cell(idx)
                .as_f64()
                .ok_or_else(|| unreadable(line, "price", cell(idx)))
        };

        let date_cell = cell(columns.prices[0]);
        let date = match date_cell.as_date() {
            Some(date) => date,
            None => parse_date(
                date_cell
                    .get_string()
                    .ok_or_else(|| unreadable(line, "date", date_cell))?,
            )?,
        };

        let bar = DailyBar {
            date,
            open: number(columns.prices[1])?,
            high: number(columns.prices[2])?,
            low: number(columns.prices[3])?,
            close: number(columns.prices[4])?,
        };
        let volume = columns
            .volume
            .and_then(|idx| cell(idx).as_f64())
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64);
        rows.push((bar, volume));
    }

    PriceSeries::from_rows(rows)
}

/// Read a CSV written by [`write_csv`] back into a series
pub fn import_csv<R: io::Read>(reader: R) -> Result<PriceSeries> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();
    let columns = Columns::locate(headers.iter())?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let line = line + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let number = |idx: usize| -> Result<f64> {
            field(idx)
                .parse()
                .map_err(|_| unreadable(line, "price", field(idx)))
        };

        let bar = DailyBar {
            date: parse_date(field(columns.prices[0]))?,
            open: number(columns.prices[1])?,
            high: number(columns.prices[2])?,
            low: number(columns.prices[3])?,
            close: number(columns.prices[4])?,
        };
        let volume = columns
            .volume
            .and_then(|idx| field(idx).parse::<u64>().ok());
        rows.push((bar, volume));
    }

    PriceSeries::from_rows(rows)
}

pub fn import_from_path(path: &Path) -> Result<PriceSeries> {
    let file = File::open(path)?;
    let series = match ExportFormat::from_path(path) {
        ExportFormat::Xlsx => import_workbook(BufReader::new(file))?,
        ExportFormat::Csv => import_csv(file)?,
    };
    tracing::info!("Imported {} rows from {}", series.len(), path.display());
    Ok(series)
}

/// Read a workbook held in memory
pub fn import_workbook_bytes(bytes: &[u8]) -> Result<PriceSeries> {
    import_workbook(Cursor::new(bytes))
}
