use super::{Major, Value, BREAK, INDEFINITE_LENGTH, SIMPLE_DOUBLE};

use bytes::{BufMut, BytesMut};

/// Arrays and maps at least this long are written with indefinite length.
const INDEFINITE_THRESHOLD: usize = INDEFINITE_LENGTH as usize;

/// Writes the first byte for `major` and, when `value` does not fit into the additional
/// information, the big-endian bytes that follow it.
fn write_head(major: Major, value: u64, buf: &mut BytesMut) {
    let major = (major as u8) << 5;
    if value < 24 {
        buf.put_u8(major | value as u8);
        return;
    }
    let len = ((64 - value.leading_zeros() as usize) + 7) / 8;
    buf.put_u8(major | (len + 23) as u8);
    buf.put_uint(value, len);
}

pub fn encode_positive(n: u64, buf: &mut BytesMut) {
    write_head(Major::Positive, n, buf);
}

/// Negative numbers are stored as `-1 - n`, so `-1` is the smallest encoding.
pub fn encode_negative(n: i64, buf: &mut BytesMut) {
    if n >= 0 {
        encode_positive(n as u64, buf);
        return;
    }
    write_head(Major::Negative, (-1 - n) as u64, buf);
}

pub fn encode_bytes(bytes: &[u8], buf: &mut BytesMut) {
    write_head(Major::Bytes, bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

pub fn encode_string(string: &str, buf: &mut BytesMut) {
    write_head(Major::String, string.len() as u64, buf);
    buf.extend_from_slice(string.as_bytes());
}

pub fn encode_error(error: &str, buf: &mut BytesMut) {
    write_head(Major::Error, error.len() as u64, buf);
    buf.extend_from_slice(error.as_bytes());
}

pub fn encode_array(array: &[Value<'_>], buf: &mut BytesMut) {
    let len = array.len();
    if len >= INDEFINITE_THRESHOLD {
        buf.put_u8(((Major::Array as u8) << 5) | INDEFINITE_LENGTH);
    } else {
        write_head(Major::Array, len as u64, buf);
    }
    for item in array {
        item.encode_into(buf);
    }
    if len >= INDEFINITE_THRESHOLD {
        buf.put_u8(BREAK);
    }
}

pub fn encode_map(map: &[(Value<'_>, Value<'_>)], buf: &mut BytesMut) {
    let len = map.len();
    if len >= INDEFINITE_THRESHOLD {
        buf.put_u8(((Major::Map as u8) << 5) | INDEFINITE_LENGTH);
    } else {
        write_head(Major::Map, len as u64, buf);
    }
    for (k, v) in map {
        k.encode_into(buf);
        v.encode_into(buf);
    }
    if len >= INDEFINITE_THRESHOLD {
        buf.put_u8(BREAK);
    }
}

pub fn encode_simple(simple: u8, buf: &mut BytesMut) {
    buf.put_u8(((Major::Simple as u8) << 5) | simple);
}

pub fn encode_double(d: f64, buf: &mut BytesMut) {
    encode_simple(SIMPLE_DOUBLE, buf);
    buf.put_f64(d);
}
