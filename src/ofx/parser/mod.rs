use nom::{
    combinator::{all_consuming, cut},
    error::{context, VerboseError},
    sequence::pair,
    IResult,
};

mod header;
mod tokens;
mod utils;

pub use header::{OfxHeader, OfxVariant};
pub use tokens::Token;
pub use utils::{ofx_amount, ofx_datetime};

#[cfg(test)]
pub(crate) use tokens::tokens;

/// Header and tokenized body of a complete OFX file
pub fn document(input: &str) -> IResult<&str, (OfxHeader, Vec<Token>), VerboseError<&str>> {
    context(
        "Failed to parse document",
        all_consuming(pair(header::header, cut(tokens::tokens))),
    )(input)
}
