use nom::{
    character::complete::{digit0, digit1, one_of},
    combinator::{map_res, opt, recognize},
    error::{context, VerboseError},
    sequence::{pair, tuple},
    IResult,
};
use rust_decimal::Decimal;

/// Parses an OFX amount like `-12.50`. Some exporters use a comma as the
/// decimal separator, which is accepted as well.
pub fn ofx_amount(input: &str) -> IResult<&str, Decimal, VerboseError<&str>> {
    context(
        "Failed to parse ofx_amount",
        map_res(
            recognize(tuple((
                opt(one_of("+-")),
                digit0,
                opt(pair(one_of(".,"), digit1)),
            ))),
            parse_content,
        ),
    )(input)
}

fn parse_content(content: &str) -> Result<Decimal, &'static str> {
    let (negative, content) = match content.chars().next() {
        Some('-') => (true, &content[1..]),
        Some('+') => (false, &content[1..]),
        _ => (false, content),
    };
    if content.is_empty() {
        return Err("Expected digits in amount");
    }
    let mut content = content.replace(',', ".");
    if content.starts_with('.') {
        content.insert(0, '0');
    }
    let result = Decimal::from_str_exact(&content).map_err(|_| "Failed to parse amount")?;
    Ok(if negative { -result } else { result })
}
