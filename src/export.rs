use anyhow::{anyhow, Context as _, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, FormatBorder, Workbook, Worksheet};
use std::path::PathBuf;

use crate::ir::{Sheets, Transaction};

/// Header row of every sheet, in column order
pub const COLUMNS: [&str; 8] = [
    "id", "type", "date", "memo", "payee", "amount", "checknum", "mcc",
];

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DATE_COLUMN_WIDTH: f64 = 20.0;

pub trait SpreadsheetWriter {
    fn add_sheet(&mut self, name: &str, transactions: &[Transaction]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Writes one sheet per account, in account order. Accounts without
/// transactions still get a sheet with just the header row.
pub fn emit(sheets: &Sheets, writer: &mut impl SpreadsheetWriter) -> Result<()> {
    for (account, transactions) in sheets {
        writer
            .add_sheet(&account.0, transactions)
            .with_context(|| format!("Failed to write sheet for account {account}"))?;
    }
    Ok(())
}

pub struct XlsxWriter {
    path: PathBuf,
    workbook: Workbook,
    header_format: Format,
    date_format: Format,
}

impl XlsxWriter {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let mut workbook = Workbook::new();
        // The creation time is stored in the file. Pinning it makes the output
        // only depend on the input.
        let properties = DocProperties::new().set_creation_datetime(&pinned_creation_datetime()?);
        workbook.set_properties(&properties);
        Ok(Self {
            path: path.into(),
            workbook,
            header_format: Format::new().set_bold().set_border(FormatBorder::Thin),
            date_format: Format::new().set_num_format(DATE_FORMAT),
        })
    }

    fn write_header(&self, worksheet: &mut Worksheet) -> Result<()> {
        for (column, name) in (0u16..).zip(COLUMNS) {
            worksheet.write_string_with_format(0, column, name, &self.header_format)?;
        }
        worksheet.set_column_width(2, DATE_COLUMN_WIDTH)?;
        Ok(())
    }

    fn write_row(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        transaction: &Transaction,
    ) -> Result<()> {
        write_text(worksheet, row, 0, &transaction.id)?;
        write_text(worksheet, row, 1, &transaction.transaction_type)?;
        worksheet.write_datetime_with_format(
            row,
            2,
            &excel_datetime(&transaction.date)?,
            &self.date_format,
        )?;
        write_text(worksheet, row, 3, &transaction.memo)?;
        write_text(worksheet, row, 4, &transaction.payee)?;
        let amount = transaction
            .amount
            .to_f64()
            .ok_or_else(|| anyhow!("Amount {} is not representable", transaction.amount))?;
        worksheet.write_number(row, 5, amount)?;
        write_text(worksheet, row, 6, &transaction.checknum)?;
        write_text(worksheet, row, 7, &transaction.mcc)?;
        Ok(())
    }
}

impl SpreadsheetWriter for XlsxWriter {
    fn add_sheet(&mut self, name: &str, transactions: &[Transaction]) -> Result<()> {
        let mut worksheet = Worksheet::new();
        worksheet
            .set_name(name)
            .with_context(|| format!("Invalid sheet name '{name}'"))?;
        self.write_header(&mut worksheet)?;
        for (row, transaction) in (1u32..).zip(transactions) {
            self.write_row(&mut worksheet, row, transaction)
                .with_context(|| format!("Failed to write transaction {}", transaction.id))?;
        }
        self.workbook.push_worksheet(worksheet);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::info!("Saving {}...", self.path.display());
        self.workbook
            .save(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        log::info!("Saving {}...done", self.path.display());
        Ok(())
    }
}

/// Blank cell for empty values
fn write_text(worksheet: &mut Worksheet, row: u32, column: u16, text: &str) -> Result<()> {
    if !text.is_empty() {
        worksheet.write_string(row, column, text)?;
    }
    Ok(())
}

fn excel_datetime(date: &NaiveDateTime) -> Result<ExcelDateTime> {
    let year = u16::try_from(date.year())
        .with_context(|| format!("Date {date} can't be written to a spreadsheet"))?;
    let datetime = ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)
        .and_then(|day| day.and_hms(date.hour() as u16, date.minute() as u8, date.second()))
        .with_context(|| format!("Date {date} can't be written to a spreadsheet"))?;
    Ok(datetime)
}

fn pinned_creation_datetime() -> Result<ExcelDateTime> {
    Ok(ExcelDateTime::from_ymd(2000, 1, 1)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::path::Path;
    use tempfile::TempDir;

    use super::*;
    use crate::ir::AccountNumber;

    /// Keeps what would be written, for checking sheet order and content
    #[derive(Default)]
    struct RecordingWriter {
        sheets: Vec<(String, Vec<Transaction>)>,
        finished: bool,
    }

    impl SpreadsheetWriter for RecordingWriter {
        fn add_sheet(&mut self, name: &str, transactions: &[Transaction]) -> Result<()> {
            self.sheets.push((name.to_string(), transactions.to_vec()));
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn transaction(id: &str, memo: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            transaction_type: "debit".to_string(),
            date: NaiveDate::from_ymd_opt(2014, 1, 5)
                .unwrap()
                .and_hms_opt(12, 30, 15)
                .unwrap(),
            memo: memo.to_string(),
            payee: "Coffee Shop".to_string(),
            amount: Decimal::new(-350, 2),
            checknum: "".to_string(),
            mcc: "5814".to_string(),
        }
    }

    fn sheets() -> Sheets {
        let mut sheets = Sheets::new();
        sheets.insert(
            AccountNumber("222".to_string()),
            vec![transaction("2", ""), transaction("3", "Latte")],
        );
        sheets.insert(AccountNumber("111".to_string()), vec![transaction("1", "")]);
        sheets.insert(AccountNumber("333".to_string()), vec![]);
        sheets
    }

    fn write_xlsx(path: &Path, sheets: &Sheets) -> Result<()> {
        let mut writer = XlsxWriter::new(path)?;
        emit(sheets, &mut writer)?;
        writer.finish()
    }

    #[test]
    fn emits_one_sheet_per_account_in_order() {
        let mut writer = RecordingWriter::default();
        emit(&sheets(), &mut writer).unwrap();
        let names: Vec<&str> = writer.sheets.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(vec!["111", "222", "333"], names);
        assert_eq!(
            vec![transaction("2", ""), transaction("3", "Latte")],
            writer.sheets[1].1
        );
        assert!(writer.sheets[2].1.is_empty());
        assert!(!writer.finished);
    }

    #[test]
    fn writes_xlsx_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.xlsx");
        write_xlsx(&path, &sheets()).unwrap();
        let content = std::fs::read(&path).unwrap();
        assert!(content.starts_with(b"PK"));
    }

    #[test]
    fn rerun_produces_identical_file() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.xlsx");
        let second = dir.path().join("second.xlsx");
        write_xlsx(&first, &sheets()).unwrap();
        write_xlsx(&second, &sheets()).unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn invalid_sheet_name() {
        let dir = TempDir::new().unwrap();
        let mut writer = XlsxWriter::new(dir.path().join("output.xlsx")).unwrap();
        let err = writer.add_sheet("12/34", &[]).unwrap_err();
        assert_eq!("Invalid sheet name '12/34'", err.to_string());
    }

    #[test]
    fn unwritable_output_path() {
        let dir = TempDir::new().unwrap();
        let mut writer = XlsxWriter::new(dir.path().join("missing").join("output.xlsx")).unwrap();
        writer.add_sheet("111", &[]).unwrap();
        assert!(writer
            .finish()
            .unwrap_err()
            .to_string()
            .starts_with("Failed to write"));
    }

    #[test]
    fn date_before_excel_epoch() {
        let date = NaiveDate::from_ymd_opt(1899, 12, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(excel_datetime(&date).is_err());
    }

    #[test]
    fn date_conversion_keeps_time() {
        let date = NaiveDate::from_ymd_opt(2014, 1, 5)
            .unwrap()
            .and_hms_opt(12, 30, 15)
            .unwrap();
        let expected = ExcelDateTime::from_ymd(2014, 1, 5)
            .unwrap()
            .and_hms(12, 30, 15)
            .unwrap();
        assert_eq!(expected.to_excel(), excel_datetime(&date).unwrap().to_excel());
    }
}
