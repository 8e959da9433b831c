use anyhow::Result;
use console::{style, StyledObject};
use std::collections::BTreeMap;

use crate::args::Args;
use crate::config::Config;
use crate::export::{self, SpreadsheetWriter, XlsxWriter};
use crate::import;
use crate::ir::{AccountNumber, Sheets};
use crate::operations;
use crate::terminal::{BulletPointPrinter, LineWriter};

pub fn main(args: Args) -> Result<()> {
    let config = Config::from_args(args)?;
    let (sheets, summary) = reconcile_files(&config)?;

    println!(
        "{}",
        style_header(&format!(
            "Writing result to {}",
            config.output_file.display()
        ))
    );
    let mut writer = XlsxWriter::new(&config.output_file)?;
    write_sheets(&sheets, &mut writer)?;

    print_summary(&BulletPointPrinter::new_stdout(), &summary);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    /// As written to the output, i.e. masked if masking is enabled
    pub account: AccountNumber,
    pub rows_read: usize,
    pub rows_written: usize,
}

/// Loads all input files and reconciles them into the sheets to be written,
/// together with per-account row counts.
pub fn reconcile_files(config: &Config) -> Result<(Sheets, Vec<AccountSummary>)> {
    let ledger = import::load_files(&config.input_files, config.reconcile.id_length)?;

    log::info!("Reconciling {} accounts...", ledger.accounts.len());
    let rows_read: BTreeMap<AccountNumber, usize> = ledger
        .accounts
        .iter()
        .map(|(account, rows)| {
            (
                operations::mask_account_number(account, config.account_prefix_len),
                rows.len(),
            )
        })
        .collect();
    let sheets = operations::reconcile_ledger(ledger, &config.reconcile)?;
    let sheets = operations::mask_account_prefix(sheets, config.account_prefix_len)?;
    log::info!("Reconciling {} accounts...done", sheets.len());

    let summary = sheets
        .iter()
        .map(|(account, transactions)| AccountSummary {
            account: account.clone(),
            rows_read: rows_read.get(account).copied().unwrap_or(0),
            rows_written: transactions.len(),
        })
        .collect();
    Ok((sheets, summary))
}

pub fn write_sheets(sheets: &Sheets, writer: &mut impl SpreadsheetWriter) -> Result<()> {
    export::emit(sheets, writer)?;
    writer.finish()
}

fn print_summary<W: LineWriter + Clone>(
    printer: &BulletPointPrinter<W>,
    summary: &[AccountSummary],
) {
    printer.print_heading(style_header("Accounts:"));
    if summary.is_empty() {
        printer.print_item(style("(none)").italic());
    }
    for account in summary {
        printer.print_item(style_account(&account.account));
        let printer = printer.indent();
        printer.print_item(format!("{} rows read", style_count(account.rows_read)));
        printer.print_item(format!(
            "{} rows written",
            style_count(account.rows_written)
        ));
    }
}

fn style_header(header: &str) -> StyledObject<&str> {
    style(header).bold().underlined()
}

fn style_account(account: &AccountNumber) -> StyledObject<&str> {
    style(account.0.as_str()).cyan().bold()
}

fn style_count(count: usize) -> StyledObject<usize> {
    style(count).bold()
}
