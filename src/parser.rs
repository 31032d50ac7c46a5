//! Small nom parsers for the textual bits of a declaration.
//!
//! ```text
//! VARCHAR(255)     declared column type (case-insensitive)
//! users.id         foreign-key target
//! username=Max     column assignment (CLI)
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag_no_case, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, rest, value, verify},
    sequence::{delimited, preceded, separated_pair},
};

use crate::error::{OrmError, OrmResult};

/// Column types the binder knows how to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    Text,
    Char(u32),
    Varchar(u32),
}

impl SqlType {
    /// Values of string-like types are quoted, INT stays bare.
    pub fn is_string_like(self) -> bool {
        !matches!(self, SqlType::Int)
    }
}

/// Recognize a declared type: `INT`, `TEXT`, `CHAR(n)` or `VARCHAR(n)`
/// with `n > 0`. Anything else is `None`.
pub fn parse_sql_type(input: &str) -> Option<SqlType> {
    all_consuming(sql_type)(input).ok().map(|(_, t)| t)
}

fn sql_type(input: &str) -> IResult<&str, SqlType> {
    alt((
        map(sized("VARCHAR"), SqlType::Varchar),
        map(sized("CHAR"), SqlType::Char),
        value(SqlType::Int, tag_no_case("INT")),
        value(SqlType::Text, tag_no_case("TEXT")),
    ))(input)
}

/// `NAME(n)` with a positive length.
fn sized<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    preceded(
        tag_no_case(name),
        delimited(
            char('('),
            verify(map_res(digit1, |d: &str| d.parse::<u32>()), |n: &u32| *n > 0),
            char(')'),
        ),
    )
}

/// Split a foreign-key target `table.column`.
///
/// Exactly one separator with a non-empty name on each side.
pub fn parse_fk_target(input: &str) -> Option<(&str, &str)> {
    all_consuming(fk_target)(input).ok().map(|(_, pair)| pair)
}

fn fk_target(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(is_not("."), char('.'), is_not("."))(input)
}

/// Parse a `column=value` assignment. The value is everything after the
/// first `=` and may be empty.
pub fn parse_assignment(input: &str) -> OrmResult<(String, String)> {
    let input = input.trim();
    match assignment(input) {
        Ok((_, (column, value))) => Ok((column.to_string(), value.to_string())),
        Err(_) => Err(OrmError::Config(format!(
            "Invalid assignment '{}', expected column=value",
            input
        ))),
    }
}

fn assignment(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(parse_identifier, char('='), rest)(input)
}

/// Parse an identifier (column name).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}
