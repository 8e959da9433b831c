use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use nom::{
    bytes::complete::{take_till, take_while_m_n},
    character::complete::{char, digit1, one_of, space0},
    combinator::{map_opt, map_res, opt, recognize},
    error::{context, VerboseError},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::str::FromStr;

const MAX_OFFSET_HOURS: f64 = 24.0;

/// Parses an OFX date-time `YYYYMMDD[HHMMSS[.XXX]][[offset[:TZ]]]`.
///
/// If a GMT offset is given, the result is normalized to UTC.
pub fn ofx_datetime(input: &str) -> IResult<&str, NaiveDateTime, VerboseError<&str>> {
    context(
        "Failed to parse ofx_datetime",
        map_opt(
            tuple((date, opt(time), opt(preceded(space0, timezone)))),
            |(date, time, offset_minutes)| {
                let local = match time {
                    Some(time) => date.and_time(time),
                    None => date.and_hms_opt(0, 0, 0)?,
                };
                local.checked_sub_signed(Duration::try_minutes(offset_minutes.unwrap_or(0))?)
            },
        ),
    )(input)
}

fn digits<'a, T: FromStr>(
    count: usize,
) -> impl FnMut(&'a str) -> IResult<&'a str, T, VerboseError<&'a str>> {
    map_res(
        take_while_m_n(count, count, |c: char| c.is_ascii_digit()),
        |digits: &str| digits.parse::<T>(),
    )
}

fn date(input: &str) -> IResult<&str, NaiveDate, VerboseError<&str>> {
    context(
        "Failed to parse date",
        map_opt(
            tuple((digits::<i32>(4), digits::<u32>(2), digits::<u32>(2))),
            |(year, month, day)| NaiveDate::from_ymd_opt(year, month, day),
        ),
    )(input)
}

/// `HHMM[SS[.XXX]]`, fractional seconds are dropped
fn time(input: &str) -> IResult<&str, NaiveTime, VerboseError<&str>> {
    context(
        "Failed to parse time",
        map_opt(
            tuple((
                digits::<u32>(2),
                digits::<u32>(2),
                opt(digits::<u32>(2)),
                opt(preceded(char('.'), digit1)),
            )),
            |(hour, minute, second, _fraction)| {
                NaiveTime::from_hms_opt(hour, minute, second.unwrap_or(0))
            },
        ),
    )(input)
}

/// `[-5:EST]`, `[+5.5]`, `[0:GMT]`. Returns the offset in minutes. Offsets of
/// more than 24 hours are rejected.
fn timezone(input: &str) -> IResult<&str, i64, VerboseError<&str>> {
    context(
        "Failed to parse timezone",
        delimited(
            char('['),
            map_res(
                pair(
                    recognize(tuple((
                        opt(one_of("+-")),
                        digit1,
                        opt(pair(char('.'), digit1)),
                    ))),
                    opt(preceded(char(':'), take_till(|c: char| c == ']'))),
                ),
                |(hours, _name): (&str, Option<&str>)| -> anyhow::Result<i64> {
                    let hours: f64 = hours.parse()?;
                    anyhow::ensure!(
                        hours.abs() <= MAX_OFFSET_HOURS,
                        "GMT offset of {hours} hours is out of range"
                    );
                    Ok((hours * 60.0).round() as i64)
                },
            ),
            char(']'),
        ),
    )(input)
}
