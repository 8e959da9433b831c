use anyhow::{bail, Result};
use std::collections::{btree_map, hash_map::Entry, HashMap};
use std::hash::Hash;
use std::iter;
use thiserror::Error;

use crate::config::ReconcileOptions;
use crate::ir::{AccountNumber, Ledger, Sheets, SourcedTransaction, Transaction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(
        "Different same-day repeat counts in different files for a transaction of account {account}: {} appears {}",
        describe_transaction(.transaction),
        describe_repeat_counts(.repeat_counts)
    )]
    InconsistentRepeatCount {
        account: AccountNumber,
        transaction: Box<Transaction>,
        /// Source file and how often the transaction appears in it
        repeat_counts: Vec<(String, usize)>,
    },
}

fn describe_transaction(transaction: &Transaction) -> String {
    format!(
        "[{} {} {} {:?} id={} memo={:?}]",
        transaction.date.format("%Y-%m-%d"),
        transaction.transaction_type,
        transaction.amount,
        transaction.payee,
        transaction.id,
        transaction.memo,
    )
}

fn describe_repeat_counts(repeat_counts: &[(String, usize)]) -> String {
    repeat_counts
        .iter()
        .map(|(source_file, count)| format!("{count}x in {source_file}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A distinct transaction together with how often it happened on its day
#[derive(Debug, Clone, PartialEq, Eq)]
struct RepeatedTransaction {
    transaction: Transaction,
    repeat_count: usize,
}

pub fn reconcile_ledger(ledger: Ledger, options: &ReconcileOptions) -> Result<Sheets, ReconcileError> {
    ledger
        .accounts
        .into_iter()
        .map(|(account, rows)| {
            let transactions = reconcile(&account, rows, options)?;
            Ok((account, transactions))
        })
        .collect()
}

/// Removes the duplicates that overlapping export files of one account
/// introduce, while keeping transactions that legitimately happened several
/// times on the same day.
///
/// The number of times a transaction appears in one file is its same-day
/// repeat count. Every file containing the transaction has to agree on that
/// count, otherwise the files contradict each other and reconciling fails.
/// The result has each transaction exactly repeat-count times, sorted by date
/// and restricted to the configured date range.
pub fn reconcile(
    account: &AccountNumber,
    rows: Vec<SourcedTransaction>,
    options: &ReconcileOptions,
) -> Result<Vec<Transaction>, ReconcileError> {
    let per_file = count_same_day_repeats(rows);
    let per_identity = group_by(
        per_file.into_iter(),
        |(transaction, _, _)| transaction.clone(),
        |(_, source_file, repeat_count)| iter::once((source_file, repeat_count)),
    );
    let repeated = per_identity
        .into_iter()
        .map(|(transaction, repeat_counts)| {
            check_repeat_counts_agree(account, transaction, repeat_counts)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let collapsed = if options.merge_memo {
        merge_transactions_differing_only_in_memo(repeated)
    } else {
        repeated
    };

    let mut transactions: Vec<Transaction> = collapsed
        .into_iter()
        .flat_map(|repeated| iter::repeat(repeated.transaction).take(repeated.repeat_count))
        .collect();
    sort_transactions_by_date(&mut transactions);
    transactions.retain(|transaction| {
        (options.start_date..=options.end_date).contains(&transaction.date.date())
    });
    Ok(transactions)
}

fn count_same_day_repeats(rows: Vec<SourcedTransaction>) -> Vec<(Transaction, String, usize)> {
    group_by(
        rows.into_iter(),
        |row| (row.transaction.clone(), row.source_file.clone()),
        |_| iter::once(()),
    )
    .into_iter()
    .map(|((transaction, source_file), occurrences)| {
        (transaction, source_file, occurrences.len())
    })
    .collect()
}

fn check_repeat_counts_agree(
    account: &AccountNumber,
    transaction: Transaction,
    repeat_counts: Vec<(String, usize)>,
) -> Result<RepeatedTransaction, ReconcileError> {
    let mut counts = repeat_counts.iter().map(|(_, count)| *count);
    let repeat_count = counts.next().unwrap_or(0);
    if counts.all(|count| count == repeat_count) {
        Ok(RepeatedTransaction {
            transaction,
            repeat_count,
        })
    } else {
        Err(ReconcileError::InconsistentRepeatCount {
            account: account.clone(),
            transaction: Box::new(transaction),
            repeat_counts,
        })
    }
}

/// Transactions that agree in everything but the memo (and have the same
/// repeat count) become one transaction whose memo lists each distinct,
/// non-empty memo once, sorted so that the input file order doesn't matter.
fn merge_transactions_differing_only_in_memo(
    repeated: Vec<RepeatedTransaction>,
) -> Vec<RepeatedTransaction> {
    group_by(
        repeated.into_iter(),
        |repeated| {
            (
                Transaction {
                    memo: String::new(),
                    ..repeated.transaction.clone()
                },
                repeated.repeat_count,
            )
        },
        |repeated| iter::once(repeated.transaction.memo),
    )
    .into_iter()
    .map(|((mut transaction, repeat_count), memos)| {
        transaction.memo = join_memos(memos.iter().map(String::as_str));
        RepeatedTransaction {
            transaction,
            repeat_count,
        }
    })
    .collect()
}

fn join_memos<'a>(memos: impl Iterator<Item = &'a str>) -> String {
    let mut distinct: Vec<&str> = memos.filter(|memo| !memo.is_empty()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.join(" ")
}

/// Stable, so transactions on the same date keep the order they were read in
fn sort_transactions_by_date(transactions: &mut [Transaction]) {
    transactions.sort_by_key(|transaction| transaction.date);
}

/// Strips the first `prefix_len` characters off every account number and
/// transaction id, so the output can be shared without revealing them.
pub fn mask_account_prefix(sheets: Sheets, prefix_len: usize) -> Result<Sheets> {
    if prefix_len == 0 {
        return Ok(sheets);
    }
    let mut masked = Sheets::new();
    for (account, transactions) in sheets {
        let masked_account = mask_account_number(&account, prefix_len);
        let transactions = transactions
            .into_iter()
            .map(|mut transaction| {
                transaction.id = strip_prefix_chars(&transaction.id, prefix_len);
                transaction
            })
            .collect();
        match masked.entry(masked_account) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(transactions);
            }
            btree_map::Entry::Occupied(entry) => {
                bail!(
                    "Removing {} characters from account {} gives '{}', which is already the name of another account",
                    prefix_len,
                    account,
                    entry.key(),
                );
            }
        }
    }
    Ok(masked)
}

pub fn mask_account_number(account: &AccountNumber, prefix_len: usize) -> AccountNumber {
    AccountNumber(strip_prefix_chars(&account.0, prefix_len))
}

fn strip_prefix_chars(value: &str, count: usize) -> String {
    value.chars().skip(count).collect()
}

/// Groups items by key. Groups are returned in the order their key was first
/// seen and values keep their input order.
fn group_by<T, K, V, IV>(
    items: impl Iterator<Item = T>,
    key_fn: impl Fn(&T) -> K,
    value_fn: impl Fn(T) -> IV,
) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    IV: Iterator<Item = V>,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut grouped: Vec<(K, Vec<V>)> = Vec::new();
    for item in items {
        let key = key_fn(&item);
        match positions.entry(key) {
            Entry::Occupied(position) => {
                grouped[*position.get()].1.extend(value_fn(item));
            }
            Entry::Vacant(position) => {
                grouped.push((position.key().clone(), value_fn(item).collect()));
                position.insert(grouped.len() - 1);
            }
        }
    }
    grouped
}
