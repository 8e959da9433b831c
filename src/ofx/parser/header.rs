use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, map_res},
    error::{context, VerboseError},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfxVariant {
    /// OFX 1.x, `KEY:VALUE` header followed by an SGML body
    Sgml,
    /// OFX 2.x, XML prolog with an `<?OFX ...?>` processing instruction
    Xml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfxHeader {
    pub variant: OfxVariant,
    pub fields: Vec<(String, String)>,
}

impl OfxHeader {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

pub fn header(input: &str) -> IResult<&str, OfxHeader, VerboseError<&str>> {
    context(
        "Failed to parse header",
        preceded(multispace0, alt((xml_header, sgml_header))),
    )(input)
}

fn sgml_header(input: &str) -> IResult<&str, OfxHeader, VerboseError<&str>> {
    context(
        "Failed to parse sgml_header",
        map_res(
            many1(terminated(sgml_header_field, multispace0)),
            |fields| {
                let header = OfxHeader {
                    variant: OfxVariant::Sgml,
                    fields,
                };
                if header.get("OFXHEADER").is_some() {
                    Ok(header)
                } else {
                    Err("Missing OFXHEADER field")
                }
            },
        ),
    )(input)
}

/// `KEY:VALUE`, values never contain whitespace
fn sgml_header_field(input: &str) -> IResult<&str, (String, String), VerboseError<&str>> {
    map(
        separated_pair(
            take_while1(|c: char| c.is_ascii_alphanumeric()),
            char(':'),
            take_till(|c: char| c.is_whitespace() || c == '<'),
        ),
        |(key, value): (&str, &str)| (key.to_string(), value.to_string()),
    )(input)
}

fn xml_header(input: &str) -> IResult<&str, OfxHeader, VerboseError<&str>> {
    context(
        "Failed to parse xml_header",
        map_res(
            many1(terminated(processing_instruction, multispace0)),
            |instructions| {
                instructions
                    .into_iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("OFX"))
                    .map(|(_, fields)| OfxHeader {
                        variant: OfxVariant::Xml,
                        fields,
                    })
                    .ok_or("Missing <?OFX ...?> processing instruction")
            },
        ),
    )(input)
}

/// `<?name key="value" ...?>`
fn processing_instruction(
    input: &str,
) -> IResult<&str, (String, Vec<(String, String)>), VerboseError<&str>> {
    map(
        delimited(
            tag("<?"),
            pair(name, many0(preceded(multispace1, attribute))),
            preceded(multispace0, tag("?>")),
        ),
        |(name, attributes)| (name.to_string(), attributes),
    )(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String), VerboseError<&str>> {
    map(
        separated_pair(
            name,
            char('='),
            alt((
                delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
                delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
            )),
        ),
        |(key, value): (&str, &str)| (key.to_string(), value.to_string()),
    )(input)
}

fn name(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')(input)
}
