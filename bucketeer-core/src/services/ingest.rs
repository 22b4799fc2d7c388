//! Ingest service - statement file parsing
//!
//! Turns a CSV or Excel statement export into candidate transactions:
//! read raw rows, detect which columns carry the date/description/amount
//! roles, normalize cell text into typed values, and collect per-row
//! diagnostics without ever aborting the batch.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{builtin_formats, ColumnMapping, StatementFormat};
use crate::domain::result::{Error, Result, RowError};
use crate::domain::{NewTransaction, RawRow};

/// The catalog of known statement layouts the detector scores against.
///
/// Immutable once constructed. Order matters: ties among equally scored
/// entries resolve to the first one listed, so institution-specific
/// layouts precede the generic ones.
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    formats: Vec<StatementFormat>,
}

impl FormatCatalog {
    /// The built-in layouts only
    pub fn builtin() -> Self {
        Self {
            formats: builtin_formats(),
        }
    }

    /// Built-in layouts plus user-configured extras (appended after, so
    /// built-ins win ties)
    pub fn with_custom(custom: &[StatementFormat]) -> Self {
        let mut formats = builtin_formats();
        formats.extend(custom.iter().cloned());
        Self { formats }
    }

    /// Score every catalog entry against the file's headers and resolve
    /// the best match to the actual header strings.
    ///
    /// An entry only qualifies if all three required roles (date,
    /// description, amount) match a header case-insensitively; the
    /// optional raw-description column adds one point for ranking.
    /// Falls back to regex role inference when no entry qualifies.
    pub fn detect(&self, headers: &[String]) -> Option<ColumnMapping> {
        if let Some(format) = self.best_match(headers) {
            return Some(ColumnMapping {
                date_column: resolve_header(headers, &format.date_column)?,
                description_column: resolve_header(headers, &format.description_column)?,
                amount_column: resolve_header(headers, &format.amount_column)?,
                raw_description_column: format
                    .raw_description_column
                    .as_deref()
                    .and_then(|c| resolve_header(headers, c)),
            });
        }

        infer_roles(headers)
    }

    /// Which institution's layout the headers look like, if any.
    ///
    /// Fuzzy-inferred mappings have no institution and return None.
    pub fn identify(&self, headers: &[String]) -> Option<String> {
        self.best_match(headers).map(|f| f.institution.clone())
    }

    fn best_match(&self, headers: &[String]) -> Option<&StatementFormat> {
        let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();

        let mut best: Option<(u32, &StatementFormat)> = None;
        for format in &self.formats {
            let (score, all_required) = score_format(format, &lower);
            if !all_required {
                continue;
            }
            // Strictly greater keeps the first of equally scored entries
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, format));
            }
        }

        best.map(|(_, format)| format)
    }
}

/// Weighted match of one layout against lowercased headers:
/// 3 points per required role, 1 for the optional raw-description column.
fn score_format(format: &StatementFormat, lower_headers: &[String]) -> (u32, bool) {
    let mut score = 0;
    let mut required = 0;

    for column in [
        &format.date_column,
        &format.description_column,
        &format.amount_column,
    ] {
        if lower_headers.contains(&column.to_lowercase()) {
            score += 3;
            required += 1;
        }
    }

    if let Some(raw) = &format.raw_description_column {
        if lower_headers.contains(&raw.to_lowercase()) {
            score += 1;
        }
    }

    (score, required == 3)
}

/// Find the header matching a canonical column name, preserving the
/// file's original casing
fn resolve_header(headers: &[String], canonical: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.eq_ignore_ascii_case(canonical))
        .cloned()
}

/// Regex fallback when no catalog entry matches: classify each header
/// against independent role patterns and take the first hit per role.
fn infer_roles(headers: &[String]) -> Option<ColumnMapping> {
    let date_re = Regex::new(r"(?i)date|posted|transaction.*date").unwrap();
    let desc_re = Regex::new(r"(?i)description|merchant|payee|details|name").unwrap();
    let original_re = Regex::new(r"(?i)original").unwrap();
    let amount_re = Regex::new(r"(?i)amount|debit|credit|withdrawal|deposit|charge").unwrap();

    let date = headers.iter().find(|h| date_re.is_match(h))?;
    let description = headers
        .iter()
        .find(|h| desc_re.is_match(h) && !original_re.is_match(h))?;
    let amount = headers.iter().find(|h| amount_re.is_match(h))?;

    Some(ColumnMapping {
        date_column: date.clone(),
        description_column: description.clone(),
        amount_column: amount.clone(),
        raw_description_column: None,
    })
}

/// Everything the ingest pipeline produced for one statement file.
///
/// `mapping == None` means detection failed and the caller must supply a
/// manual mapping. `errors` is non-fatal and may coexist with a non-empty
/// `transactions` list; partial success is the default.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub transactions: Vec<NewTransaction>,
    pub mapping: Option<ColumnMapping>,
    pub headers: Vec<String>,
    pub errors: Vec<RowError>,
}

/// Ingest service for statement files
pub struct IngestService {
    catalog: FormatCatalog,
}

impl IngestService {
    pub fn new(catalog: FormatCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FormatCatalog {
        &self.catalog
    }

    /// Parse a statement file, auto-detecting its column layout.
    ///
    /// Fails fast on an unsupported extension or an empty file; row-level
    /// problems are collected into the outcome instead.
    pub fn process_file(&self, path: &Path) -> Result<IngestOutcome> {
        let (headers, rows, mut errors) = read_statement(path)?;

        if rows.is_empty() {
            return Err(Error::EmptyStatement);
        }

        let Some(mapping) = self.catalog.detect(&headers) else {
            return Ok(IngestOutcome {
                transactions: Vec::new(),
                mapping: None,
                headers,
                errors,
            });
        };

        let (transactions, conversion_errors) = convert_rows(&rows, &mapping);
        errors.extend(conversion_errors);

        Ok(IngestOutcome {
            transactions,
            mapping: Some(mapping),
            headers,
            errors,
        })
    }

    /// Parse a statement file using a caller-supplied column mapping
    /// (the manual-mapping path when detection fails)
    pub fn process_file_with_mapping(
        &self,
        path: &Path,
        mapping: ColumnMapping,
    ) -> Result<IngestOutcome> {
        let (headers, rows, mut errors) = read_statement(path)?;

        if rows.is_empty() {
            return Err(Error::EmptyStatement);
        }

        for column in [
            &mapping.date_column,
            &mapping.description_column,
            &mapping.amount_column,
        ] {
            if !headers.contains(column) {
                return Err(Error::validation(format!(
                    "Column '{}' not found in file headers",
                    column
                )));
            }
        }

        let (transactions, conversion_errors) = convert_rows(&rows, &mapping);
        errors.extend(conversion_errors);

        Ok(IngestOutcome {
            transactions,
            mapping: Some(mapping),
            headers,
            errors,
        })
    }
}

/// Dispatch on file extension. Anything but .csv/.xlsx/.xls fails before
/// any parsing is attempted.
fn read_statement(path: &Path) -> Result<(Vec<String>, Vec<RawRow>, Vec<RowError>)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" => read_excel(path),
        _ => Err(Error::UnsupportedFormat(extension)),
    }
}

/// Read a CSV file into raw rows keyed by header.
///
/// Unreadable records become row diagnostics; rows whose cells are all
/// blank are dropped.
fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<RawRow>, Vec<RowError>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::Other(format!("Failed to read CSV file: {}", e)))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Other(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (index, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let row: RawRow = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(|cell| cell.to_string()))
                    .collect();
                if row.values().any(|v| !v.trim().is_empty()) {
                    rows.push(row);
                }
            }
            Err(e) => errors.push(RowError::new(index + 2, e.to_string())),
        }
    }

    Ok((headers, rows, errors))
}

/// Read the first worksheet of an Excel file into raw rows keyed by the
/// first row's cells
fn read_excel(path: &Path) -> Result<(Vec<String>, Vec<RawRow>, Vec<RowError>)> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::Other(format!("Failed to open Excel file: {}", e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(Error::EmptyStatement)?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| Error::Other(format!("Failed to read worksheet '{}': {}", sheet, e)))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(first) => first.iter().map(|c| cell_to_string(c).trim().to_string()).collect(),
        None => return Err(Error::EmptyStatement),
    };

    let mut rows = Vec::new();
    for cells in row_iter {
        let row: RawRow = headers
            .iter()
            .cloned()
            .zip(cells.iter().map(cell_to_string))
            .collect();
        if row.values().any(|v| !v.trim().is_empty()) {
            rows.push(row);
        }
    }

    Ok((headers, rows, Vec::new()))
}

/// Render one Excel cell as the text the normalizer expects
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Excel stores dates as day counts; render them ISO so parse_date takes
/// the first branch.
// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
fn excel_serial_to_date(serial: f64) -> String {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Map raw rows through a column mapping into candidate transactions.
///
/// One row's failure never affects another row: missing required cells
/// and malformed values become row-indexed errors and the batch
/// continues. Row numbers are offset by the header line, so the first
/// data row reports as row 2.
pub fn convert_rows(rows: &[RawRow], mapping: &ColumnMapping) -> (Vec<NewTransaction>, Vec<RowError>) {
    let mut transactions = Vec::new();
    let mut errors = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 2;

        let date_text = row.get(&mapping.date_column).map(|s| s.trim());
        let description = row.get(&mapping.description_column).map(|s| s.trim());
        let amount_text = row.get(&mapping.amount_column).map(|s| s.trim());

        let (Some(date_text), Some(description), Some(amount_text)) =
            (date_text, description, amount_text)
        else {
            errors.push(RowError::new(row_number, "Missing required data"));
            continue;
        };

        if date_text.is_empty() || description.is_empty() || amount_text.is_empty() {
            errors.push(RowError::new(row_number, "Missing required data"));
            continue;
        }

        let date = match parse_date(date_text) {
            Ok(date) => date,
            Err(e) => {
                errors.push(RowError::new(row_number, e.to_string()));
                continue;
            }
        };

        let amount = match parse_amount(amount_text) {
            Ok(amount) => amount,
            Err(e) => {
                errors.push(RowError::new(row_number, e.to_string()));
                continue;
            }
        };

        let raw_description = mapping
            .raw_description_column
            .as_ref()
            .and_then(|c| row.get(c))
            .map(|s| s.to_string());

        transactions.push(NewTransaction {
            date,
            description: description.to_string(),
            amount,
            raw_description,
            original_data: row.clone(),
        });
    }

    (transactions, errors)
}

/// Parse a statement date.
///
/// ISO first, then the slash/dash month-day-year shapes US banks export.
/// chrono's numeric specifiers accept unpadded fields, so `3/15/2024`
/// parses via `%m/%d/%Y`.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let formats = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];

    for fmt in &formats {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date);
        }
    }

    Err(Error::MalformedDate(text.to_string()))
}

/// Parse a statement amount into a signed decimal.
///
/// Blank input is zero. Currency symbols, thousands commas, and
/// whitespace are stripped; a value wrapped in parentheses is negative
/// magnitude (accounting convention).
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();

    let is_negative = cleaned.contains('(') && cleaned.contains(')');
    let number_str: String = cleaned.chars().filter(|c| *c != '(' && *c != ')').collect();

    let amount: Decimal = number_str
        .parse()
        .map_err(|_| Error::MalformedAmount(text.to_string()))?;

    if is_negative {
        Ok(-amount.abs())
    } else {
        Ok(amount)
    }
}
