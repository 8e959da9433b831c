use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::ir::{AccountNumber, Ledger, SourcedTransaction, Transaction};
use crate::ofx::{self, OfxDocument, StatementTransaction};

/// Parses all input files, in order, and buckets their transactions by account.
pub fn load_files(paths: &[PathBuf], id_length: usize) -> Result<Ledger> {
    let mut ledger = Ledger::default();
    for path in paths {
        let document = load_file(path)?;
        add_to_ledger(&mut ledger, document, &source_name(path), id_length);
    }
    Ok(ledger)
}

fn load_file(path: &Path) -> Result<OfxDocument> {
    log::info!("Loading {}...", path.display());
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let document = ofx::parse(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    log::info!(
        "Loading {}...done, {} statements",
        path.display(),
        document.statements.len()
    );
    Ok(document)
}

/// Name the transactions of a file are tagged with. The path is used as given,
/// so that two exports with the same file name in different directories are
/// still treated as different sources.
fn source_name(path: &Path) -> String {
    path.display().to_string()
}

fn add_to_ledger(ledger: &mut Ledger, document: OfxDocument, source: &str, id_length: usize) {
    for statement in document.statements {
        log::debug!(
            "{}: {:?} account {} ({}) with {} transactions",
            source,
            statement.kind,
            statement.account_id,
            statement.currency.as_deref().unwrap_or("no currency"),
            statement.transactions.len(),
        );
        ledger
            .accounts
            .entry(AccountNumber(statement.account_id))
            .or_default()
            .extend(
                statement
                    .transactions
                    .into_iter()
                    .map(|transaction| SourcedTransaction {
                        transaction: to_ir(transaction, id_length),
                        source_file: source.to_string(),
                    }),
            );
    }
}

fn to_ir(transaction: StatementTransaction, id_length: usize) -> Transaction {
    Transaction {
        id: truncate_id(&transaction.fitid, id_length),
        transaction_type: transaction.trntype,
        date: transaction.posted,
        memo: transaction.memo.unwrap_or_default(),
        payee: transaction.name.unwrap_or_default(),
        amount: transaction.amount,
        checknum: transaction.checknum.unwrap_or_default(),
        mcc: transaction.sic.unwrap_or_default(),
    }
}

/// The trailing characters of a transaction id often change from one download
/// to the next, so only the first `id_length` characters are kept.
fn truncate_id(id: &str, id_length: usize) -> String {
    id.chars().take(id_length).collect()
}
