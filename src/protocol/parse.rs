use crate::protocol::{
    Value, ARRAY_MAJOR, BREAK, BYTES_MAJOR, ERROR_MAJOR, INDEFINITE_LENGTH, MAP_MAJOR,
    NEGATIVE_MAJOR, POSITIVE_MAJOR, SIMPLE_DOUBLE, SIMPLE_FALSE, SIMPLE_MAJOR, SIMPLE_NIL,
    SIMPLE_TRUE, STRING_MAJOR,
};
use std::borrow::Cow;

use crate::error::{IResult, ParseError};
use nom::{
    bytes::streaming::{tag, take},
    combinator::{map, map_res},
    multi::{count, many_till},
    number::streaming::{be_f64, be_u8},
    sequence::tuple,
};

/// Parse first byte and split it into `major` and `additional` information.
pub fn parse_first_byte(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
    map(be_u8, |b: u8| (b >> 5, b & 0x1F))(input)
}

/// Parses one complete value.
///
/// Parsers are streaming: a truncated frame yields [`nom::Err::Incomplete`] so callers can read
/// more input and retry, while malformed input yields a hard error.
pub fn parse(input: &[u8]) -> IResult<&[u8], Value<'_>> {
    let (rest, (major, additional)) = parse_first_byte(input)?;
    match major {
        POSITIVE_MAJOR => parse_number(rest, additional).map(|(rest, n)| (rest, Value::Positive(n))),
        NEGATIVE_MAJOR => {
            let (rest, n) = parse_number(rest, additional)?;
            let n = i64::try_from(n).map_err(|_| nom::Err::Failure(ParseError))?;
            Ok((rest, Value::Negative(-1 - n)))
        }
        BYTES_MAJOR => parse_bytes(rest, additional),
        STRING_MAJOR => parse_string(rest, additional),
        ARRAY_MAJOR => parse_array(rest, additional),
        ERROR_MAJOR => parse_error(rest, additional),
        MAP_MAJOR => parse_map(rest, additional),
        SIMPLE_MAJOR => parse_simple(rest, additional),
        _ => Err(nom::Err::Failure(ParseError)),
    }
}

fn parse_array(input: &[u8], size: u8) -> IResult<&[u8], Value<'_>> {
    if size == INDEFINITE_LENGTH {
        return map(many_till(parse, tag(&[BREAK][..])), |items| {
            Value::Array(items.0)
        })(input);
    }
    let (rest, len) = parse_number(input, size)?;
    map(count(parse, len as usize), Value::Array)(rest)
}

fn parse_map(input: &[u8], size: u8) -> IResult<&[u8], Value<'_>> {
    if size == INDEFINITE_LENGTH {
        return map(
            many_till(tuple((parse, parse)), tag(&[BREAK][..])),
            |items| Value::Map(items.0),
        )(input);
    }
    let (rest, len) = parse_number(input, size)?;
    map(count(tuple((parse, parse)), len as usize), Value::Map)(rest)
}

fn parse_bytes(input: &[u8], additional: u8) -> IResult<&[u8], Value<'_>> {
    let (rest, len) = parse_number(input, additional)?;
    map(take(len as usize), |bytes: &[u8]| {
        Value::Bytes(Cow::Borrowed(bytes))
    })(rest)
}

fn parse_text(input: &[u8], additional: u8) -> IResult<&[u8], &str> {
    let (rest, len) = parse_number(input, additional)?;
    map_res(take(len as usize), std::str::from_utf8)(rest)
}

fn parse_string(input: &[u8], additional: u8) -> IResult<&[u8], Value<'_>> {
    let (rest, s) = parse_text(input, additional)?;
    Ok((rest, Value::String(Cow::Borrowed(s))))
}

fn parse_error(input: &[u8], additional: u8) -> IResult<&[u8], Value<'_>> {
    let (rest, s) = parse_text(input, additional)?;
    Ok((rest, Value::Error(Cow::Borrowed(s))))
}

fn parse_simple(input: &[u8], additional: u8) -> IResult<&[u8], Value<'_>> {
    match additional {
        SIMPLE_FALSE => Ok((input, Value::Boolean(false))),
        SIMPLE_TRUE => Ok((input, Value::Boolean(true))),
        SIMPLE_NIL => Ok((input, Value::Nil)),
        SIMPLE_DOUBLE => map(be_f64, Value::Double)(input),
        _ => Err(nom::Err::Failure(ParseError)),
    }
}

/// Parses number from bytes, filling empty bytes with zeros to fit in u64.
pub fn parse_number(input: &[u8], additional: u8) -> IResult<&[u8], u64> {
    if additional < 24 {
        return Ok((input, additional as u64));
    }
    let additional = additional - 23;
    map(take(additional), |b: &[u8]| {
        let mut arr = [0u8; 8];
        let offset = 8 - b.len();
        arr[offset..].copy_from_slice(b);
        u64::from_be_bytes(arr)
    })(input)
}
