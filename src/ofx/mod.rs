use anyhow::{anyhow, Context as _, Result};
use nom::{error::convert_error, Finish as _};
use std::io::Read;

mod element;
mod parser;
mod statement;

pub use parser::{OfxHeader, OfxVariant};
pub use statement::{AccountKind, Statement, StatementTransaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxDocument {
    pub header: OfxHeader,
    pub statements: Vec<Statement>,
}

/// Parses an OFX 1.x (SGML) or 2.x (XML) file. QFX files are OFX files with
/// a few extra Intuit elements, which are ignored.
pub fn parse(mut input_stream: impl Read) -> Result<OfxDocument> {
    let mut content = Vec::new();
    input_stream
        .read_to_end(&mut content)
        .context("Failed to read input")?;
    let content = maybe_remove_byte_order_mark(decode(content));

    let (_, (header, tokens)) = parser::document(&content).finish().map_err(|err| {
        anyhow!(
            "Failed to parse OFX document:\n{}",
            convert_error(content.as_str(), err)
        )
    })?;
    log::debug!("OFX header: {:?}", header);

    let ofx = element::build_tree(tokens)?;
    let statements = statement::statements(&ofx)?;
    Ok(OfxDocument { header, statements })
}

/// SGML exports are often Windows-1252 instead of UTF-8. Bytes that aren't
/// valid UTF-8 are read as Latin-1, which agrees with Windows-1252 outside of
/// 0x80..0xA0.
fn decode(content: Vec<u8>) -> String {
    match String::from_utf8(content) {
        Ok(content) => content,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn maybe_remove_byte_order_mark(mut content: String) -> String {
    if content.starts_with('\u{FEFF}') {
        content.remove(0);
    }
    content
}
