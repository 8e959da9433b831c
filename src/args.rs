use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Convert multiple .qfx or .ofx files to one .xlsx.
///
/// Transactions that show up in more than one (overlapping) file are only
/// written once. Every account gets its own sheet with the fixed columns
/// id, type, date, memo, payee, amount, checknum, mcc.
#[derive(Parser, Debug)]
#[command(name = "ofx2xlsx", version)]
pub struct Args {
    /// .qfx or .ofx file names
    #[arg(value_name = "*.ofx *.qfx", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Don't take transactions before this date
    #[arg(long, value_name = "2014-01-01", default_value = "2014-01-01")]
    pub start: NaiveDate,

    /// Don't take transactions after this date
    #[arg(long, value_name = "2014-12-31", default_value = "2014-12-31")]
    pub end: NaiveDate,

    /// Where to store the xlsx
    #[arg(long, value_name = "output.xlsx", default_value = "output.xlsx")]
    pub output: PathBuf,

    /// Number of leading characters of a transaction ID that are compared.
    ///
    /// The trailing characters of an ID are usually running numbers that change
    /// from download to download, so the same transaction would show up twice
    /// unless the ID is truncated. Use a large number to compare full IDs.
    #[arg(long, value_name = "24", default_value_t = 24)]
    pub id_length: usize,

    /// Merge transactions which only differ in their memo
    #[arg(short, long)]
    pub merge_memo: bool,

    /// How many characters to mask from the start of account numbers and transaction IDs
    #[arg(short = 'c', long, value_name = "N")]
    pub remove_account_prefix: Option<usize>,
}

pub fn parse() -> Args {
    Args::parse()
}
