use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// A transaction as it ends up in the spreadsheet. All fields together form
/// the identity that is used to detect the same transaction in different files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transaction {
    pub id: String,
    pub transaction_type: String,
    pub date: NaiveDateTime,
    pub memo: String,
    pub payee: String,
    pub amount: Decimal,
    pub checknum: String,
    pub mcc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedTransaction {
    pub transaction: Transaction,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountNumber(pub String);

impl Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transactions of all input files, bucketed by account.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub accounts: BTreeMap<AccountNumber, Vec<SourcedTransaction>>,
}

/// Reconciled transactions per account, ready to be written.
pub type Sheets = BTreeMap<AccountNumber, Vec<Transaction>>;
