use std::borrow::Cow;

use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res};
use nom::IResult;

pub const COMMENT_MARKER: &str = "//";

/// Largest value an address instruction can carry (15 bits).
pub const MAX_CONSTANT: u16 = 0x7FFF;

/// Drops everything from the first comment marker onwards.
pub fn strip_comment(line: &str) -> &str {
    line.split_once(COMMENT_MARKER)
        .map(|(code, _)| code)
        .unwrap_or(line)
}

/// Decodes the part of a raw line before the comment marker. Invalid
/// UTF-8 there becomes U+FFFD; invalid bytes inside a comment are dropped
/// with the comment.
pub fn decode_code(raw: &[u8]) -> Cow<'_, str> {
    let marker = COMMENT_MARKER.as_bytes();
    let code = raw
        .windows(marker.len())
        .position(|w| w == marker)
        .map_or(raw, |end| &raw[..end]);
    String::from_utf8_lossy(code)
}

/// Comment-stripped and trimmed text of a physical line, or `None` when
/// nothing is left.
pub fn clean_line(line: &str) -> Option<&str> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

/// True when `s` is a non-empty run of ASCII digits.
pub fn is_constant(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn decimal(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

/// Strict decimal conversion: the whole string must be digits and fit
/// in a `u32`. No sign, no whitespace, no radix prefix.
pub fn parse_decimal(s: &str) -> Option<u32> {
    all_consuming(decimal)(s).ok().map(|(_, value)| value)
}

#[test]
fn test_clean_line() {
    assert_eq!(clean_line("   @12 // load twelve\r\n"), Some("@12"));
    assert_eq!(clean_line("D=M\t"), Some("D=M"));
    assert_eq!(clean_line("// only a comment"), None);
    assert_eq!(clean_line("  \t \r\n"), None);
    assert_eq!(clean_line(""), None);
    assert_eq!(clean_line("0;JMP//no space"), Some("0;JMP"));
}

#[test]
fn test_constants() {
    assert!(is_constant("0"));
    assert!(is_constant("32767"));
    assert!(!is_constant(""));
    assert!(!is_constant("1abc"));
    assert!(!is_constant("-1"));

    assert_eq!(parse_decimal("32768"), Some(32768));
    assert_eq!(parse_decimal("007"), Some(7));
    assert_eq!(parse_decimal("12 "), None);
    assert_eq!(parse_decimal("+12"), None);
    assert_eq!(parse_decimal("99999999999"), None);
}

#[test]
fn test_decode_code() {
    assert_eq!(decode_code(b"D=A // caf\xe9\n"), "D=A ");
    assert_eq!(decode_code(b"@x\xff\n"), "@x\u{FFFD}\n");
    assert_eq!(decode_code(b"//"), "");
    assert_eq!(decode_code(b""), "");
}
