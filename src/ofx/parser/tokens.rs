use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, value},
    error::{context, VerboseError},
    multi::{many0, many0_count},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open(String),
    Close(String),
    /// `<TAG/>`
    Empty(String),
    /// Trimmed, entity-decoded text between two tags
    Text(String),
}

/// Splits an OFX body into tags and text. Tag names are upper-cased since
/// OFX tag names are case insensitive in SGML files.
pub fn tokens(input: &str) -> IResult<&str, Vec<Token>, VerboseError<&str>> {
    context(
        "Failed to parse tokens",
        terminated(many0(preceded(insignificant, token)), insignificant),
    )(input)
}

fn token(input: &str) -> IResult<&str, Token, VerboseError<&str>> {
    alt((close_tag, empty_tag, open_tag, text))(input)
}

fn open_tag(input: &str) -> IResult<&str, Token, VerboseError<&str>> {
    context(
        "Failed to parse open_tag",
        map(
            delimited(char('<'), tag_name, preceded(multispace0, char('>'))),
            |name| Token::Open(name.to_ascii_uppercase()),
        ),
    )(input)
}

fn empty_tag(input: &str) -> IResult<&str, Token, VerboseError<&str>> {
    context(
        "Failed to parse empty_tag",
        map(
            delimited(char('<'), tag_name, preceded(multispace0, tag("/>"))),
            |name| Token::Empty(name.to_ascii_uppercase()),
        ),
    )(input)
}

fn close_tag(input: &str) -> IResult<&str, Token, VerboseError<&str>> {
    context(
        "Failed to parse close_tag",
        map(
            delimited(tag("</"), tag_name, preceded(multispace0, char('>'))),
            |name| Token::Close(name.to_ascii_uppercase()),
        ),
    )(input)
}

/// Intuit extensions use dotted names like `INTU.BID`
fn tag_name(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':'))(input)
}

fn text(input: &str) -> IResult<&str, Token, VerboseError<&str>> {
    map(take_till1(|c: char| c == '<'), |text: &str| {
        Token::Text(decode_entities(text.trim_end()))
    })(input)
}

/// Whitespace and comments between tokens
fn insignificant(input: &str) -> IResult<&str, (), VerboseError<&str>> {
    value((), many0_count(alt((multispace1, comment))))(input)
}

fn comment(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    map(tuple((tag("<!--"), take_until("-->"), tag("-->"))), |(_, body, _)| body)(input)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
