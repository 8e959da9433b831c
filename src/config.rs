use anyhow::{ensure, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::args::Args;

#[derive(Debug, Clone)]
pub struct Config {
    pub input_files: Vec<PathBuf>,
    pub output_file: PathBuf,
    pub reconcile: ReconcileOptions,
    /// Number of leading characters stripped from account numbers and
    /// transaction ids before they are written. Zero disables masking.
    pub account_prefix_len: usize,
}

/// Options that influence how the transactions of one account are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub id_length: usize,
    pub merge_memo: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Self {
            input_files: args.files,
            output_file: args.output,
            reconcile: ReconcileOptions {
                start_date: args.start,
                end_date: args.end,
                id_length: args.id_length,
                merge_memo: args.merge_memo,
            },
            account_prefix_len: args.remove_account_prefix.unwrap_or(0),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.input_files.is_empty(), "No input files given");
        ensure!(
            self.reconcile.start_date <= self.reconcile.end_date,
            "Start date {} is after end date {}",
            self.reconcile.start_date,
            self.reconcile.end_date,
        );
        ensure!(
            self.reconcile.id_length > 0,
            "--id-length must be at least 1"
        );
        Ok(())
    }
}
