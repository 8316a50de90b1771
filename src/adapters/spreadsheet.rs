use crate::domain::model::{ClassificationReport, ClassifiedRow, ReviewRow};
use crate::utils::error::{EtlError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use std::path::Path;

pub const REPORT_SHEET: &str = "Sheet1";
pub const REPORT_HEADERS: [&str; 6] = ["商品评论", "情感分类", "标签", "评分", "处理状态", "token消耗"];
pub const COLUMN_WIDTHS: [f64; 6] = [50.0, 10.0, 40.0, 10.0, 10.0, 10.0];
/// 試算表最大欄數，對應 `XFD`
pub const MAX_COLUMNS: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_path(path: &str) -> Self {
        let is_csv = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            SheetFormat::Csv
        } else {
            SheetFormat::Workbook
        }
    }
}

/// 欄位字母轉成從 0 起算的索引，`A` → 0，`AA` → 26
pub fn column_index(letters: &str) -> Result<usize> {
    let trimmed = letters.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EtlError::InvalidConfigValueError {
            field: "column".to_string(),
            value: letters.to_string(),
            reason: "Column must be letters such as A or AB".to_string(),
        });
    }

    let mut index = 0usize;
    for c in trimmed.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index * 26 + digit;
        if index > MAX_COLUMNS {
            return Err(EtlError::InvalidConfigValueError {
                field: "column".to_string(),
                value: letters.to_string(),
                reason: "Column must not be beyond XFD".to_string(),
            });
        }
    }
    Ok(index - 1)
}

/// 讀取指定欄位的評論，跳過第一列標題
pub fn read_reviews(
    data: &[u8],
    format: SheetFormat,
    column: usize,
    sheet: Option<&str>,
) -> Result<Vec<ReviewRow>> {
    match format {
        SheetFormat::Workbook => read_workbook_column(data, column, sheet),
        SheetFormat::Csv => read_csv_column(data, column),
    }
}

fn read_workbook_column(data: &[u8], column: usize, sheet: Option<&str>) -> Result<Vec<ReviewRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EtlError::ProcessingError {
                message: "Workbook contains no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    // 使用絕對座標，range 不一定從 A1 開始
    let rows = (1..=last_row)
        .map(|row| {
            let text = range
                .get_value((row, column as u32))
                .map(cell_text)
                .unwrap_or_default();
            ReviewRow::new(row as usize, text)
        })
        .collect();

    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_csv_column(data: &[u8], column: usize) -> Result<Vec<ReviewRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for (position, record) in reader.records().enumerate() {
        let record = record?;
        let text = record.get(column).unwrap_or_default();
        rows.push(ReviewRow::new(position + 1, text));
    }
    Ok(rows)
}

/// 標籤以 JSON 陣列字串寫入，例如 `["手机","拍照"]`
pub fn render_tags(tags: &[String]) -> Result<String> {
    Ok(serde_json::to_string(tags)?)
}

fn row_cells(row: &ClassifiedRow) -> Result<(String, String, Option<f64>)> {
    match &row.classification {
        Some(c) => {
            let tags = if c.tags.is_empty() {
                String::new()
            } else {
                render_tags(&c.tags)?
            };
            Ok((c.sentiment.label().to_string(), tags, c.score))
        }
        None => Ok((String::new(), String::new(), None)),
    }
}

pub fn write_report(report: &ClassificationReport, format: SheetFormat) -> Result<Vec<u8>> {
    match format {
        SheetFormat::Workbook => write_xlsx(report),
        SheetFormat::Csv => write_csv(report),
    }
}

fn write_xlsx(report: &ClassificationReport) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET)?;

    for (col, header) in REPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (position, row) in report.rows.iter().enumerate() {
        let r = (position + 1) as u32;
        let (sentiment, tags, score) = row_cells(row)?;

        worksheet.write_string(r, 0, &row.text)?;
        if !sentiment.is_empty() {
            worksheet.write_string(r, 1, &sentiment)?;
        }
        if !tags.is_empty() {
            worksheet.write_string(r, 2, &tags)?;
        }
        if let Some(score) = score {
            worksheet.write_number(r, 3, score)?;
        }
        worksheet.write_string(r, 4, row.status.label())?;
        worksheet.write_number(r, 5, row.total_tokens as f64)?;
    }

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_csv(report: &ClassificationReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADERS)?;

    for row in &report.rows {
        let (sentiment, tags, score) = row_cells(row)?;
        let score = score.map(|s| s.to_string()).unwrap_or_default();
        let tokens = row.total_tokens.to_string();
        writer.write_record([
            row.text.as_str(),
            sentiment.as_str(),
            tags.as_str(),
            score.as_str(),
            row.status.label(),
            tokens.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
