//! Spreadsheet export of a usage query
//!
//! Produces a two-sheet workbook: itemized events first, daily aggregates
//! second. Stored usage figures are divided by the configured divisor.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::config::ExportConfig;
use crate::services::quota_query::QueryResult;
use crate::utils::error::{AppError, AppResult};

pub const EVENTS_SHEET: &str = "配额明细";
pub const DAILY_SHEET: &str = "每日统计";

pub const EVENTS_HEADERS: [&str; 5] = ["时间", "次数消耗", "配额类型", "描述", "邮箱"];
pub const DAILY_HEADERS: [&str; 3] = ["日期", "邮箱", "每日使用量"];

const EVENTS_WIDTHS: [f64; 5] = [20.0, 12.0, 15.0, 50.0, 30.0];
const DAILY_WIDTHS: [f64; 3] = [15.0, 30.0, 12.0];

/// One cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

/// Sheet contents before rendering
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub widths: &'static [f64],
    pub rows: Vec<Vec<Cell>>,
}

/// Workbook ready to be rendered
#[derive(Debug, Clone)]
pub struct QuotaWorkbook {
    pub file_name: String,
    pub sheets: Vec<SheetData>,
}

impl QuotaWorkbook {
    /// Lay out `result` as a workbook dated `today`
    ///
    /// Refuses a result without itemized events.
    pub fn build(result: &QueryResult, today: NaiveDate, config: &ExportConfig) -> AppResult<Self> {
        if result.events.is_empty() {
            return Err(AppError::Export(format!(
                "no usage events to export for {}",
                result.email
            )));
        }

        let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!("invalid export UTC offset {}h", config.utc_offset_hours))
        })?;
        let divisor = config.usage_divisor;

        let events = result
            .events
            .iter()
            .map(|event| {
                vec![
                    Cell::Text(
                        event
                            .time
                            .with_timezone(&offset)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string(),
                    ),
                    Cell::Number(event.quota_cost / divisor),
                    Cell::Text(event.quota_type.clone()),
                    Cell::Text(event.description.clone().unwrap_or_default()),
                    Cell::Text(event.email.clone()),
                ]
            })
            .collect();

        let daily = result
            .daily
            .iter()
            .map(|day| {
                let date = day
                    .day(&offset)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| day.date.clone());
                vec![
                    Cell::Text(date),
                    Cell::Text(day.email.clone()),
                    Cell::Number(day.daily_usage / divisor),
                ]
            })
            .collect();

        Ok(Self {
            file_name: format!(
                "配额查询结果_{}_{}.xlsx",
                result.email,
                today.format("%Y-%m-%d")
            ),
            sheets: vec![
                SheetData {
                    name: EVENTS_SHEET,
                    headers: &EVENTS_HEADERS,
                    widths: &EVENTS_WIDTHS,
                    rows: events,
                },
                SheetData {
                    name: DAILY_SHEET,
                    headers: &DAILY_HEADERS,
                    widths: &DAILY_WIDTHS,
                    rows: daily,
                },
            ],
        })
    }

    /// Render to XLSX bytes
    pub fn render(&self) -> AppResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name)?;

            for (col, width) in sheet.widths.iter().enumerate() {
                worksheet.set_column_width(col as u16, *width)?;
            }
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
            }
            for (idx, row) in sheet.rows.iter().enumerate() {
                let row_num = idx as u32 + 1;
                for (col, cell) in row.iter().enumerate() {
                    match cell {
                        Cell::Text(text) => worksheet.write_string(row_num, col as u16, text)?,
                        Cell::Number(value) => worksheet.write_number(row_num, col as u16, *value)?,
                    };
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Render and write into `dir`, returning the file path
    pub fn save(&self, dir: &Path) -> AppResult<PathBuf> {
        let bytes = self.render()?;
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::Export(format!("cannot create {}: {}", dir.display(), e)))?;

        let path = dir.join(&self.file_name);
        std::fs::write(&path, bytes)
            .map_err(|e| AppError::Export(format!("cannot write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Exported quota workbook");
        Ok(path)
    }
}
