use anyhow::{anyhow, Context as _, Result};
use chrono::NaiveDateTime;
use nom::{combinator::all_consuming, error::VerboseError, Finish as _, IResult};
use rust_decimal::Decimal;

use super::element::Element;
use super::parser::{ofx_amount, ofx_datetime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Bank,
    CreditCard,
}

/// One account statement (`STMTRS` or `CCSTMTRS`) of an OFX file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: AccountKind,
    pub account_id: String,
    pub currency: Option<String>,
    pub transactions: Vec<StatementTransaction>,
}

/// A `STMTTRN` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementTransaction {
    pub fitid: String,
    pub trntype: String,
    pub posted: NaiveDateTime,
    pub amount: Decimal,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub checknum: Option<String>,
    pub sic: Option<String>,
}

pub fn statements(ofx: &Element) -> Result<Vec<Statement>> {
    ofx.descendants_named(&["STMTRS", "CCSTMTRS"])
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            statement(element).with_context(|| format!("Failed to read statement #{}", index + 1))
        })
        .collect()
}

fn statement(element: &Element) -> Result<Statement> {
    let (kind, account_tag) = match element.name.as_str() {
        "CCSTMTRS" => (AccountKind::CreditCard, "CCACCTFROM"),
        _ => (AccountKind::Bank, "BANKACCTFROM"),
    };
    let account_id = element
        .child(account_tag)
        .and_then(|account| account.child_text("ACCTID"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("Statement has no {}/ACCTID", account_tag))?
        .to_string();
    let transactions = match element.child("BANKTRANLIST") {
        Some(list) => list
            .children_named("STMTTRN")
            .map(|transaction| {
                statement_transaction(transaction)
                    .with_context(|| format!("Failed to read transaction in account {}", account_id))
            })
            .collect::<Result<Vec<_>>>()?,
        None => vec![],
    };
    Ok(Statement {
        kind,
        account_id,
        currency: element.child_text("CURDEF").map(str::to_string),
        transactions,
    })
}

fn statement_transaction(element: &Element) -> Result<StatementTransaction> {
    let required = |name: &str| {
        element
            .child_text(name)
            .ok_or_else(|| anyhow!("Transaction is missing <{}>", name))
    };
    let optional = |name: &str| element.child_text(name).map(str::to_string);

    let fitid = required("FITID")?.to_string();
    let posted = parse_field(required("DTPOSTED")?, ofx_datetime)
        .with_context(|| format!("Invalid DTPOSTED in transaction {}", fitid))?;
    let amount = parse_field(required("TRNAMT")?, ofx_amount)
        .with_context(|| format!("Invalid TRNAMT in transaction {}", fitid))?;
    let name = optional("NAME").or_else(|| {
        element
            .child("PAYEE")
            .and_then(|payee| payee.child_text("NAME"))
            .map(str::to_string)
    });
    Ok(StatementTransaction {
        trntype: required("TRNTYPE")?.to_ascii_lowercase(),
        posted,
        amount,
        name,
        memo: optional("MEMO"),
        checknum: optional("CHECKNUM"),
        sic: optional("SIC"),
        fitid,
    })
}

fn parse_field<'a, T>(
    value: &'a str,
    parser: impl FnMut(&'a str) -> IResult<&'a str, T, VerboseError<&'a str>>,
) -> Result<T> {
    all_consuming(parser)(value)
        .finish()
        .map(|(_, parsed)| parsed)
        .map_err(|err| anyhow!(nom::error::convert_error(value, err)))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use nom::combinator::all_consuming;

    use super::*;
    use crate::ofx::{element::build_tree, parser::tokens};

    fn ofx(input: &str) -> Element {
        let (_, tokens) = all_consuming(tokens)(input).unwrap();
        build_tree(tokens).unwrap()
    }

    const BANK_STATEMENT: &str = "<OFX><BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STMTRS>
<CURDEF>USD
<BANKACCTFROM><BANKID>121000358<ACCTID>123456789<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST><DTSTART>20140101<DTEND>20140131
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20140105120000[0:GMT]<TRNAMT>-3.50<FITID>0001<NAME>Coffee Shop<MEMO>Latte</STMTTRN>
<STMTTRN><TRNTYPE>CHECK<DTPOSTED>20140106<TRNAMT>-100.00<FITID>0002<CHECKNUM>1001<PAYEE><NAME>Landlord<ADDR1>Main St</PAYEE><MEMO></STMTTRN>
</BANKTRANLIST>
<LEDGERBAL><BALAMT>100.00<DTASOF>20140131</LEDGERBAL>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";

    #[test]
    fn bank_statement() {
        let statements = statements(&ofx(BANK_STATEMENT)).unwrap();
        assert_eq!(
            vec![Statement {
                kind: AccountKind::Bank,
                account_id: "123456789".to_string(),
                currency: Some("USD".to_string()),
                transactions: vec![
                    StatementTransaction {
                        fitid: "0001".to_string(),
                        trntype: "debit".to_string(),
                        posted: NaiveDate::from_ymd_opt(2014, 1, 5)
                            .unwrap()
                            .and_hms_opt(12, 0, 0)
                            .unwrap(),
                        amount: Decimal::new(-350, 2),
                        name: Some("Coffee Shop".to_string()),
                        memo: Some("Latte".to_string()),
                        checknum: None,
                        sic: None,
                    },
                    StatementTransaction {
                        fitid: "0002".to_string(),
                        trntype: "check".to_string(),
                        posted: NaiveDate::from_ymd_opt(2014, 1, 6)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap(),
                        amount: Decimal::new(-10000, 2),
                        name: Some("Landlord".to_string()),
                        memo: Some("".to_string()),
                        checknum: Some("1001".to_string()),
                        sic: None,
                    },
                ],
            }],
            statements
        );
    }

    #[test]
    fn credit_card_statement() {
        let input = "<OFX><CREDITCARDMSGSRSV1><CCSTMTTRNRS><CCSTMTRS><CURDEF>USD
<CCACCTFROM><ACCTID>4111111111111111</CCACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20140301<TRNAMT>-20<FITID>ABC<NAME>Grocer<SIC>5411</STMTTRN></BANKTRANLIST>
</CCSTMTRS></CCSTMTTRNRS></CREDITCARDMSGSRSV1></OFX>";
        let statements = statements(&ofx(input)).unwrap();
        assert_eq!(1, statements.len());
        assert_eq!(AccountKind::CreditCard, statements[0].kind);
        assert_eq!("4111111111111111", statements[0].account_id);
        assert_eq!(Some("5411"), statements[0].transactions[0].sic.as_deref());
    }

    #[test]
    fn multiple_accounts() {
        let input = "<OFX><BANKMSGSRSV1>
<STMTTRNRS><STMTRS><BANKACCTFROM><ACCTID>111</BANKACCTFROM></STMTRS></STMTTRNRS>
<STMTTRNRS><STMTRS><BANKACCTFROM><ACCTID>222</BANKACCTFROM><BANKTRANLIST></BANKTRANLIST></STMTRS></STMTTRNRS>
</BANKMSGSRSV1></OFX>";
        let statements = statements(&ofx(input)).unwrap();
        let accounts: Vec<_> = statements.iter().map(|s| s.account_id.as_str()).collect();
        assert_eq!(vec!["111", "222"], accounts);
        assert!(statements.iter().all(|s| s.transactions.is_empty()));
    }

    #[test]
    fn statement_without_account_id() {
        let input = "<OFX><STMTRS><BANKACCTFROM><BANKID>1</BANKACCTFROM></STMTRS></OFX>";
        assert!(statements(&ofx(input)).is_err());
    }

    #[test]
    fn transaction_without_fitid() {
        let input = "<OFX><STMTRS><BANKACCTFROM><ACCTID>1</BANKACCTFROM><BANKTRANLIST>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20140301<TRNAMT>-20</STMTTRN>
</BANKTRANLIST></STMTRS></OFX>";
        let err = statements(&ofx(input)).unwrap_err();
        assert_eq!("Transaction is missing <FITID>", err.root_cause().to_string());
    }

    #[test]
    fn transaction_with_invalid_amount() {
        let input = "<OFX><STMTRS><BANKACCTFROM><ACCTID>1</BANKACCTFROM><BANKTRANLIST>
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20140301<TRNAMT>12abc<FITID>X</STMTTRN>
</BANKTRANLIST></STMTRS></OFX>";
        let err = statements(&ofx(input)).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid TRNAMT in transaction X"));
    }
}
