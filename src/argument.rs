//! Typed argument capture, wire encoding, and `{}`-style deserialization.
//!
//! Grounded in the original `ArgumentType` tag set and `Record::Deserialize`
//! (original_source `include/logging/record.h`, `source/logging/record.cpp`):
//! producers append arguments by value into a self-describing byte buffer on
//! the hot path; the consumer thread later walks the buffer to reconstruct
//! the formatted message using a template string with Python-`{}`-style
//! placeholders.

use smallvec::SmallVec;
use std::fmt::Write as _;

/// One-byte tag identifying the wire type of a captured argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArgTag {
    Bool = 0,
    Char = 1,
    WChar = 2,
    I8 = 3,
    U8 = 4,
    I16 = 5,
    U16 = 6,
    I32 = 7,
    U32 = 8,
    I64 = 9,
    U64 = 10,
    F32 = 11,
    F64 = 12,
    Str = 13,
    Ptr = 14,
}

impl ArgTag {
    fn from_u8(v: u8) -> Option<ArgTag> {
        use ArgTag::*;
        Some(match v {
            0 => Bool,
            1 => Char,
            2 => WChar,
            3 => I8,
            4 => U8,
            5 => I16,
            6 => U16,
            7 => I32,
            8 => U32,
            9 => I64,
            10 => U64,
            11 => F32,
            12 => F64,
            13 => Str,
            14 => Ptr,
            _ => return None,
        })
    }
}

/// A value captured by the producer before it is serialized into the
/// record's argument buffer. Captured *by value* so the producer's stack
/// frame is free to unwind immediately after the logging call returns.
#[derive(Debug, Clone)]
pub enum Arg {
    Bool(bool),
    Char(u8),
    WChar(char),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Ptr(u64),
}

/// Inline capacity tuned so that a typical handful of scalar arguments never
/// triggers a heap allocation for the encoded buffer.
pub type ArgBuffer = SmallVec<[u8; 128]>;

/// The maximum length an `ARG_STRING` payload may occupy before it is
/// truncated with a marker, keeping the steady-state buffer bounded.
const MAX_STRING_ARG_LEN: usize = u32::MAX as usize;

/// Appends one argument's wire encoding (tag byte + little-endian payload)
/// to `out`. Strings longer than `max_string_bytes` are truncated; the
/// truncation itself never panics or fails.
pub fn encode_arg(out: &mut ArgBuffer, arg: &Arg, max_string_bytes: usize) {
    match arg {
        Arg::Bool(v) => {
            out.push(ArgTag::Bool as u8);
            out.push(*v as u8);
        }
        Arg::Char(v) => {
            out.push(ArgTag::Char as u8);
            out.push(*v);
        }
        Arg::WChar(v) => {
            out.push(ArgTag::WChar as u8);
            out.extend_from_slice(&(*v as u32).to_le_bytes());
        }
        Arg::I8(v) => {
            out.push(ArgTag::I8 as u8);
            out.push(*v as u8);
        }
        Arg::U8(v) => {
            out.push(ArgTag::U8 as u8);
            out.push(*v);
        }
        Arg::I16(v) => {
            out.push(ArgTag::I16 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::U16(v) => {
            out.push(ArgTag::U16 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::I32(v) => {
            out.push(ArgTag::I32 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::U32(v) => {
            out.push(ArgTag::U32 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::I64(v) => {
            out.push(ArgTag::I64 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::U64(v) => {
            out.push(ArgTag::U64 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::F32(v) => {
            out.push(ArgTag::F32 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::F64(v) => {
            out.push(ArgTag::F64 as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::Ptr(v) => {
            out.push(ArgTag::Ptr as u8);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Arg::Str(s) => {
            out.push(ArgTag::Str as u8);
            let bytes = s.as_bytes();
            let cap = max_string_bytes.min(MAX_STRING_ARG_LEN);
            if bytes.len() <= cap {
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
            } else {
                // Truncate deterministically; append a marker so the
                // formatted output visibly indicates truncation occurred.
                const MARKER: &[u8] = b"...<truncated>";
                let keep = cap.saturating_sub(MARKER.len());
                // Respect UTF-8 boundaries when truncating.
                let mut boundary = keep.min(bytes.len());
                while boundary > 0 && !s.is_char_boundary(boundary) {
                    boundary -= 1;
                }
                let total_len = boundary + MARKER.len();
                out.extend_from_slice(&(total_len as u32).to_le_bytes());
                out.extend_from_slice(&bytes[..boundary]);
                out.extend_from_slice(MARKER);
            }
        }
    }
}

/// One parsed argument slot: its tag plus the byte range in the buffer it
/// occupies. Lengths of fixed-size scalars are implied by the tag; strings
/// carry an explicit `u32` length prefix.
#[derive(Debug, Clone, Copy)]
struct ParsedArg {
    tag: ArgTag,
    offset: usize,
    len: usize,
}

impl ParsedArg {
    fn as_unsigned(&self, buf: &[u8]) -> Option<u64> {
        let b = &buf[self.offset..self.offset + self.len];
        Some(match self.tag {
            ArgTag::I8 => b[0] as i8 as i64 as u64,
            ArgTag::U8 => b[0] as u64,
            ArgTag::I16 => i16::from_le_bytes(b.try_into().ok()?) as i64 as u64,
            ArgTag::U16 => u16::from_le_bytes(b.try_into().ok()?) as u64,
            ArgTag::I32 => i32::from_le_bytes(b.try_into().ok()?) as i64 as u64,
            ArgTag::U32 => u32::from_le_bytes(b.try_into().ok()?) as u64,
            ArgTag::I64 => i64::from_le_bytes(b.try_into().ok()?) as u64,
            ArgTag::U64 => u64::from_le_bytes(b.try_into().ok()?),
            _ => return None,
        })
    }
}

/// A single forward scan of the argument buffer. Parsing failure at any tag
/// stops the scan and returns what was parsed so far — the consumer never
/// aborts on a malformed buffer.
fn parse_arguments(buf: &[u8]) -> Vec<ParsedArg> {
    let mut out = Vec::new();
    let mut index = 0usize;
    while index < buf.len() {
        let Some(tag) = ArgTag::from_u8(buf[index]) else {
            break;
        };
        index += 1;
        let fixed_len = match tag {
            ArgTag::Bool | ArgTag::Char | ArgTag::I8 | ArgTag::U8 => 1,
            ArgTag::I16 | ArgTag::U16 => 2,
            ArgTag::WChar | ArgTag::I32 | ArgTag::U32 | ArgTag::F32 => 4,
            ArgTag::I64 | ArgTag::U64 | ArgTag::F64 | ArgTag::Ptr => 8,
            ArgTag::Str => {
                if index + 4 > buf.len() {
                    break;
                }
                let len = u32::from_le_bytes(buf[index..index + 4].try_into().unwrap()) as usize;
                4 + len
            }
        };
        if index + fixed_len > buf.len() {
            break;
        }
        out.push(ParsedArg {
            tag,
            offset: index,
            len: fixed_len,
        });
        index += fixed_len;
    }
    out
}

#[derive(Default, Clone, Copy)]
struct FormatSpec {
    width: usize,
    precision: Option<usize>,
    zero_pad: bool,
    plus_sign: bool,
    space_sign: bool,
    alt_form: bool,
}

/// Reconstructs the formatted message from `template` using the arguments
/// encoded in `buffer`. Invalid format strings fall back to the raw
/// template verbatim; this function never panics.
pub fn deserialize(template: &str, buffer: &[u8]) -> String {
    let arguments = parse_arguments(buffer);
    let chars: Vec<char> = template.chars().collect();
    let mut result = String::with_capacity(template.len());
    let mut implicit_index = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c != '{' {
            result.push(c);
            i += 1;
            continue;
        }

        // '{{' escapes to a literal '{'.
        if i + 1 < chars.len() && chars[i + 1] == '{' {
            result.push('{');
            i += 2;
            continue;
        }

        // '{' immediately followed by '}}' escapes to a literal '}' — this
        // is distinct from a bare '{}' placeholder, which has only one '}'.
        if i + 2 < chars.len() && chars[i + 1] == '}' && chars[i + 2] == '}' {
            result.push('}');
            i += 3;
            continue;
        }

        // Find the matching '}'.
        let Some(close) = find_close_brace(&chars, i) else {
            return template.to_string();
        };
        let spec_str: String = chars[i + 1..close].iter().collect();
        i = close + 1;

        match render_placeholder(&spec_str, &mut implicit_index, &arguments, buffer) {
            Some(rendered) => result.push_str(&rendered),
            None => return template.to_string(),
        }
    }

    result
}

fn find_close_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Renders a single `{...}` placeholder body (without braces). Callers
/// filter out the `{{` and `{}}` escapes before reaching here, so an empty
/// spec here is always a bare `{}` (implicit-index placeholder).
fn render_placeholder(
    spec: &str,
    implicit_index: &mut usize,
    arguments: &[ParsedArg],
    buffer: &[u8],
) -> Option<String> {
    let mut chars: Vec<char> = spec.chars().collect();
    let mut pos = 0usize;

    // Argument index: explicit digits, or implicit running counter.
    let index = if pos < chars.len() && chars[pos].is_ascii_digit() {
        let start = pos;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
        let s: String = chars[start..pos].iter().collect();
        s.parse::<usize>().ok()?
    } else {
        let idx = *implicit_index;
        *implicit_index += 1;
        idx
    };

    let mut fmt_spec = FormatSpec::default();
    let mut type_spec: Option<char> = None;

    if pos < chars.len() && chars[pos] == ':' {
        pos += 1;

        // Alignment/fill: a two-char lookahead for a fill char followed by
        // an align char, otherwise a bare align char.
        if pos + 1 < chars.len() && is_align_char(chars[pos + 1]) {
            pos += 2; // skip fill + align (fill is cosmetic; not tracked further)
        } else if pos < chars.len() && is_align_char(chars[pos]) {
            pos += 1;
        }

        // Sign.
        if pos < chars.len() && matches!(chars[pos], '+' | '-' | ' ') {
            fmt_spec.plus_sign = chars[pos] == '+';
            fmt_spec.space_sign = chars[pos] == ' ';
            pos += 1;
        }

        // Alternate form.
        if pos < chars.len() && chars[pos] == '#' {
            fmt_spec.alt_form = true;
            pos += 1;
        }

        // Zero-pad shorthand.
        if pos < chars.len() && chars[pos] == '0' {
            fmt_spec.zero_pad = true;
            pos += 1;
        }

        // Width: literal digits or a `{n}`/`{}` nested reference.
        if pos < chars.len() && chars[pos].is_ascii_digit() {
            let start = pos;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let s: String = chars[start..pos].iter().collect();
            fmt_spec.width = s.parse().ok()?;
        } else if pos < chars.len() && chars[pos] == '{' {
            let (value, new_pos) =
                consume_nested_arg(&chars, pos, implicit_index, arguments, buffer)?;
            fmt_spec.width = value as usize;
            pos = new_pos;
        }

        // Precision.
        if pos < chars.len() && chars[pos] == '.' {
            pos += 1;
            if pos < chars.len() && chars[pos].is_ascii_digit() {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let s: String = chars[start..pos].iter().collect();
                fmt_spec.precision = Some(s.parse().ok()?);
            } else if pos < chars.len() && chars[pos] == '{' {
                let (value, new_pos) =
                    consume_nested_arg(&chars, pos, implicit_index, arguments, buffer)?;
                fmt_spec.precision = Some(value as usize);
                pos = new_pos;
            }
        }

        // Type specifier: one of d/x/o/b/f/s/c/p.
        if pos < chars.len() && matches!(chars[pos], 'd' | 'x' | 'o' | 'b' | 'f' | 's' | 'c' | 'p')
        {
            type_spec = Some(chars[pos]);
            pos += 1;
        }
    }

    if pos != chars.len() {
        // Leftover, unparsed characters: treat as invalid.
        return None;
    }
    chars.clear();

    let argument = arguments.get(index)?;
    Some(format_argument(argument, buffer, &fmt_spec, type_spec))
}

fn is_align_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '^')
}

/// Consumes a `{` ... `}` nested width/precision reference, returning the
/// unsigned value it resolves to and the position just past the closing
/// brace. An empty `{}` consumes the next implicit argument.
fn consume_nested_arg(
    chars: &[char],
    mut pos: usize,
    implicit_index: &mut usize,
    arguments: &[ParsedArg],
    buffer: &[u8],
) -> Option<(u64, usize)> {
    debug_assert_eq!(chars[pos], '{');
    pos += 1;
    let start = pos;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    let idx = if pos > start {
        let s: String = chars[start..pos].iter().collect();
        s.parse::<usize>().ok()?
    } else {
        let idx = *implicit_index;
        *implicit_index += 1;
        idx
    };
    if pos >= chars.len() || chars[pos] != '}' {
        return None;
    }
    pos += 1;
    let arg = arguments.get(idx)?;
    let value = arg.as_unsigned(buffer)?;
    Some((value, pos))
}

fn format_argument(
    arg: &ParsedArg,
    buffer: &[u8],
    spec: &FormatSpec,
    type_spec: Option<char>,
) -> String {
    let b = &buffer[arg.offset..arg.offset + arg.len];
    let base = match arg.tag {
        ArgTag::Bool => (b[0] != 0).to_string(),
        ArgTag::Char => (b[0] as char).to_string(),
        ArgTag::WChar => {
            let v = u32::from_le_bytes(b.try_into().unwrap_or_default());
            char::from_u32(v).map(|c| c.to_string()).unwrap_or_default()
        }
        ArgTag::I8 => format_integer(b[0] as i8 as i64, spec, type_spec),
        ArgTag::U8 => format_integer(b[0] as i64, spec, type_spec),
        ArgTag::I16 => {
            format_integer(i16::from_le_bytes(b.try_into().unwrap()) as i64, spec, type_spec)
        }
        ArgTag::U16 => {
            format_integer(u16::from_le_bytes(b.try_into().unwrap()) as i64, spec, type_spec)
        }
        ArgTag::I32 => {
            format_integer(i32::from_le_bytes(b.try_into().unwrap()) as i64, spec, type_spec)
        }
        ArgTag::U32 => {
            format_integer(u32::from_le_bytes(b.try_into().unwrap()) as i64, spec, type_spec)
        }
        ArgTag::I64 => format_integer(i64::from_le_bytes(b.try_into().unwrap()), spec, type_spec),
        ArgTag::U64 => {
            let v = u64::from_le_bytes(b.try_into().unwrap());
            format_integer(v as i64, spec, type_spec)
        }
        ArgTag::F32 => {
            let v = f32::from_le_bytes(b.try_into().unwrap());
            format_float(v as f64, spec)
        }
        ArgTag::F64 => {
            let v = f64::from_le_bytes(b.try_into().unwrap());
            format_float(v, spec)
        }
        ArgTag::Str => {
            let len = u32::from_le_bytes(b[..4].try_into().unwrap()) as usize;
            let bytes = &b[4..4 + len.min(b.len().saturating_sub(4))];
            String::from_utf8_lossy(bytes).into_owned()
        }
        ArgTag::Ptr => {
            let v = u64::from_le_bytes(b.try_into().unwrap());
            format!("0x{v:016x}")
        }
    };
    pad(base, spec)
}

fn format_integer(value: i64, spec: &FormatSpec, type_spec: Option<char>) -> String {
    let mut s = match type_spec {
        Some('x') => {
            if spec.alt_form {
                format!("0x{value:x}")
            } else {
                format!("{value:x}")
            }
        }
        Some('o') => {
            if spec.alt_form {
                format!("0{value:o}")
            } else {
                format!("{value:o}")
            }
        }
        Some('b') => {
            if spec.alt_form {
                format!("0b{value:b}")
            } else {
                format!("{value:b}")
            }
        }
        Some('c') => char::from_u32(value as u32).map(|c| c.to_string()).unwrap_or_default(),
        _ => value.to_string(),
    };
    if spec.plus_sign && value >= 0 && !s.starts_with('+') {
        s = format!("+{s}");
    } else if spec.space_sign && value >= 0 && !s.starts_with('+') {
        s = format!(" {s}");
    }
    s
}

fn format_float(value: f64, spec: &FormatSpec) -> String {
    let precision = spec.precision.unwrap_or(6);
    let mut s = format!("{value:.precision$}");
    if spec.plus_sign && value >= 0.0 {
        s = format!("+{s}");
    } else if spec.space_sign && value >= 0.0 {
        s = format!(" {s}");
    }
    s
}

fn pad(s: String, spec: &FormatSpec) -> String {
    if spec.width == 0 || s.chars().count() >= spec.width {
        return s;
    }
    let fill = if spec.zero_pad { '0' } else { ' ' };
    let mut out = String::with_capacity(spec.width);
    let pad_len = spec.width - s.chars().count();
    if spec.zero_pad && (s.starts_with('-') || s.starts_with('+')) {
        out.push(s.chars().next().unwrap());
        for _ in 0..pad_len {
            out.push(fill);
        }
        out.extend(s.chars().skip(1));
    } else {
        for _ in 0..pad_len {
            out.push(fill);
        }
        out.push_str(&s);
    }
    out
}

/// Renders an `<?>` placeholder text used when a truncated/partially parsed
/// argument buffer leaves a referenced slot unavailable.
pub fn unavailable_marker(out: &mut String) {
    let _ = write!(out, "<?>");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(args: &[Arg]) -> ArgBuffer {
        let mut buf = ArgBuffer::new();
        for a in args {
            encode_arg(&mut buf, a, 4096);
        }
        buf
    }

    #[test]
    fn implicit_indices_advance() {
        let buf = encode(&[Arg::I32(1), Arg::I32(2), Arg::I32(3)]);
        assert_eq!(deserialize("{} {} {}", &buf), "1 2 3");
    }

    #[test]
    fn explicit_indices_do_not_advance_counter() {
        let buf = encode(&[Arg::I32(10), Arg::I32(20)]);
        assert_eq!(deserialize("{1} {0} {}", &buf), "20 10 20");
    }

    #[test]
    fn escaped_braces() {
        let buf = encode(&[]);
        // '{{' escapes to a literal '{'; the trailing "}}" here is just two
        // ordinary characters, not a second escape.
        assert_eq!(deserialize("{{}} literal", &buf), "{}} literal");
        // '{' immediately followed by '}}' is the distinct 3-char escape
        // for a literal '}', separate from a bare '{}' placeholder.
        assert_eq!(deserialize("{}} literal", &buf), "} literal");
    }

    #[test]
    fn space_sign_flag_prefixes_positive_values_with_a_space() {
        let buf = encode(&[Arg::F64(3.14), Arg::F64(-3.14)]);
        assert_eq!(deserialize("{: f}; {: f}", &buf), " 3.140000; -3.140000");
    }

    #[test]
    fn alternate_octal_uses_c_style_leading_zero() {
        let buf = encode(&[Arg::I32(42)]);
        assert_eq!(deserialize("oct: {0:#o}", &buf), "oct: 052");
    }

    #[test]
    fn invalid_format_falls_back_to_template() {
        let buf = encode(&[Arg::I32(1)]);
        assert_eq!(deserialize("{unterminated", &buf), "{unterminated");
    }

    #[test]
    fn width_and_precision_from_argument() {
        let buf = encode(&[Arg::F64(3.14159), Arg::U32(2)]);
        assert_eq!(deserialize("{0:.{1}f}", &buf), "3.14");
    }

    #[test]
    fn string_argument_round_trips() {
        let buf = encode(&[Arg::Str("hello".to_string())]);
        assert_eq!(deserialize("{}", &buf), "hello");
    }

    #[test]
    fn hex_and_pointer_specifiers() {
        let buf = encode(&[Arg::I32(255), Arg::Ptr(0xDEAD_BEEF)]);
        assert_eq!(deserialize("{:x} {}", &buf), "ff 0x00000000deadbeef");
    }

    #[test]
    fn zero_padded_width() {
        let buf = encode(&[Arg::I32(5)]);
        assert_eq!(deserialize("{:03}", &buf), "005");
    }

    #[test]
    fn oversize_string_is_truncated_deterministically() {
        let long = "x".repeat(100);
        let mut buf = ArgBuffer::new();
        encode_arg(&mut buf, &Arg::Str(long), 10);
        let rendered = deserialize("{}", &buf);
        assert!(rendered.ends_with("...<truncated>"));
    }
}
