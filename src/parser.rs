use std::io::{self, BufRead};

use nom::bytes::complete::{is_not, take_till};
use nom::character::complete::char;
use nom::combinator::{opt, rest};
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::IResult;

use crate::commands::*;
use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::text::{clean_line, decode_code, is_constant, parse_decimal, MAX_CONSTANT};

/// An error and the 0-based column it points at.
type Located = (SyntaxErrorKind, usize);

/// Pulls cleaned instruction lines out of a reader, one at a time.
///
/// Blank and comment-only lines are skipped but still counted, so
/// `line_number` always refers to the physical line. Once the input is
/// exhausted (or failed) the parser stays exhausted. Bytes that are not
/// UTF-8 are only an error if they survive comment removal, and then they
/// reach the classifier as U+FFFD and fail that line alone.
pub struct Parser<R> {
    input: R,
    buffer: Vec<u8>,
    line_number: usize,
    exhausted: bool,
}

impl<R: BufRead> Parser<R> {
    pub fn new(input: R) -> Parser<R> {
        Parser {
            input,
            buffer: Vec::new(),
            line_number: 0,
            exhausted: false,
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn next_line(&mut self) -> io::Result<Option<RawLine>> {
        while !self.exhausted {
            self.buffer.clear();
            let read = self.input.read_until(b'\n', &mut self.buffer).map_err(|e| {
                self.exhausted = true;
                e
            })?;
            if read == 0 {
                self.exhausted = true;
                break;
            }
            self.line_number += 1;

            if let Some(text) = clean_line(&decode_code(&self.buffer)) {
                return Ok(Some(RawLine {
                    number: self.line_number,
                    text: text.to_string(),
                }));
            }
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for Parser<R> {
    type Item = io::Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

pub fn classify(line: &str) -> InstructionKind {
    if line.starts_with('@') {
        InstructionKind::Address
    } else if line.starts_with('(') {
        InstructionKind::Label
    } else {
        InstructionKind::Compute
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':')
}

fn is_compute_char(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '0' | '1' | ';' | '=' | '-' | '+' | '!' | '&' | '|')
}

fn first_illegal(s: &str, allowed: impl Fn(char) -> bool) -> Option<(usize, char)> {
    s.chars().enumerate().find(|&(_, c)| !allowed(c))
}

/// Checks a symbol candidate. Columns are relative to the symbol.
pub fn validate_symbol(symbol: &str, kind: InstructionKind) -> Result<Address, Located> {
    if is_constant(symbol) {
        if kind == InstructionKind::Label {
            return Err((SyntaxErrorKind::InvalidLabelSymbol, 0));
        }
        return match parse_decimal(symbol).and_then(|v| u16::try_from(v).ok()) {
            Some(value) if value <= MAX_CONSTANT => Ok(Address::Constant(value)),
            _ => Err((SyntaxErrorKind::ConstantTooLarge(symbol.to_string()), 0)),
        };
    }

    if let Some(first) = symbol.chars().next().filter(char::is_ascii_digit) {
        return Err((SyntaxErrorKind::LeadingDigit(first), 0));
    }

    match first_illegal(symbol, is_symbol_char) {
        Some((column, c)) => Err((SyntaxErrorKind::IllegalCharacter(c), column)),
        None => Ok(Address::Symbol(symbol.to_string())),
    }
}

fn a_body(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), rest)(input)
}

fn l_body(input: &str) -> IResult<&str, &str> {
    delimited(char('('), take_till(|c| c == ')'), char(')'))(input)
}

/// Symbol of an `@symbol` line.
pub fn extract_address(line: &str) -> Result<Address, Located> {
    let symbol = match a_body(line) {
        Ok((_, symbol)) if !symbol.is_empty() => symbol,
        _ => return Err((SyntaxErrorKind::MissingSymbol, line.chars().count())),
    };
    let address = validate_symbol(symbol, InstructionKind::Address)
        .map_err(|(err, column)| (err, column + 1))?;
    tracing::debug!("found address {:?} in \"{}\"", address, line);
    Ok(address)
}

/// Symbol of a `(symbol)` line: everything between `(` and the first `)`.
/// Anything after that `)` is rejected.
pub fn extract_label(line: &str) -> Result<String, Located> {
    let (trailing, symbol) =
        l_body(line).map_err(|_| (SyntaxErrorKind::MissingCloseParen, line.chars().count()))?;
    if symbol.is_empty() {
        return Err((SyntaxErrorKind::MissingSymbol, 1));
    }
    validate_symbol(symbol, InstructionKind::Label).map_err(|(err, column)| (err, column + 1))?;

    if let Some(c) = trailing.chars().next() {
        let column = symbol.chars().count() + 2;
        return Err((SyntaxErrorKind::IllegalCharacter(c), column));
    }
    tracing::debug!("found label symbol \"{}\"", symbol);
    Ok(symbol.to_string())
}

fn check_operator(line: &str, op: char) -> Result<Option<usize>, Located> {
    let last = line.chars().count().saturating_sub(1);
    let mut positions = line
        .chars()
        .enumerate()
        .filter(|&(_, c)| c == op)
        .map(|(i, _)| i);

    let first = match positions.next() {
        Some(first) => first,
        None => return Ok(None),
    };
    if first == 0 || first == last {
        return Err((SyntaxErrorKind::DanglingOperator(op), first));
    }
    if let Some(second) = positions.next() {
        return Err((SyntaxErrorKind::DuplicateOperator(op), second));
    }
    Ok(Some(first))
}

/// Character-level checks on a whole compute line.
pub fn validate_compute(line: &str) -> Result<(), Located> {
    if let Some((column, c)) = first_illegal(line, is_compute_char) {
        return Err((SyntaxErrorKind::IllegalCharacterInCompute(c), column));
    }
    let equals = check_operator(line, '=')?;
    let semicolon = check_operator(line, ';')?;
    if let (Some(eq), Some(semi)) = (equals, semicolon) {
        if eq > semi {
            return Err((SyntaxErrorKind::MisorderedOperator, eq));
        }
    }
    Ok(())
}

fn compute_fields(input: &str) -> IResult<&str, (Option<&str>, &str, Option<&str>)> {
    tuple((
        opt(terminated(is_not("=;"), char('='))),
        take_till(|c| c == ';'),
        opt(preceded(char(';'), rest)),
    ))(input)
}

/// Splits `dest=comp;jump` into its mnemonics after validating the line.
pub fn extract_mnemonics(line: &str) -> Result<Mnemonics, Located> {
    validate_compute(line)?;
    match compute_fields(line) {
        Ok(("", (dest, comp, jump))) => Ok(Mnemonics {
            dest: dest.map(str::to_string),
            comp: comp.to_string(),
            jump: jump.map(str::to_string),
        }),
        Ok((remainder, _)) => {
            let column = line.chars().count() - remainder.chars().count();
            let c = remainder.chars().next().unwrap_or(' ');
            Err((SyntaxErrorKind::IllegalCharacterInCompute(c), column))
        }
        Err(_) => Err((SyntaxErrorKind::IllegalCharacterInCompute(' '), 0)),
    }
}

/// Classifies a line and extracts its symbol or mnemonics.
pub fn parse_instruction(line: &RawLine) -> Result<Instruction, SyntaxError> {
    let kind = classify(&line.text);
    let parsed = match kind {
        InstructionKind::Address => extract_address(&line.text).map(Instruction::A),
        InstructionKind::Label => extract_label(&line.text).map(Instruction::L),
        InstructionKind::Compute => extract_mnemonics(&line.text).map(Instruction::C),
    };
    parsed.map_err(|(err, column)| SyntaxError::new(err, kind, line, column))
}

#[cfg(test)]
fn mnemonics(dest: Option<&str>, comp: &str, jump: Option<&str>) -> Mnemonics {
    Mnemonics {
        dest: dest.map(str::to_string),
        comp: comp.to_string(),
        jump: jump.map(str::to_string),
    }
}

#[test]
fn test_next_line() {
    let src = "     // The beginning \n// Of the end\r\n(LABEL) \n\n   @12\n @B_NUT12$\nD=M+1";
    let mut parser = Parser::new(src.as_bytes());

    let lines: Vec<RawLine> = parser.by_ref().map(|l| l.unwrap()).collect();
    assert_eq!(
        lines,
        vec![
            RawLine { number: 3, text: "(LABEL)".to_string() },
            RawLine { number: 5, text: "@12".to_string() },
            RawLine { number: 6, text: "@B_NUT12$".to_string() },
            RawLine { number: 7, text: "D=M+1".to_string() },
        ]
    );
    assert_eq!(parser.line_number(), 7);
    assert_eq!(parser.next_line().unwrap(), None);
    assert_eq!(parser.line_number(), 7);
}

#[cfg(test)]
struct FailingReader;

#[cfg(test)]
impl io::Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
    }
}

#[test]
fn test_next_line_read_error() {
    let input = io::Read::chain(&b"@1\n"[..], FailingReader);
    let mut parser = Parser::new(io::BufReader::new(input));
    assert_eq!(parser.next_line().unwrap().unwrap().text, "@1");
    assert!(parser.next_line().is_err());
    assert!(parser.next_line().unwrap().is_none());
    assert_eq!(parser.line_number(), 1);
}

#[test]
fn test_next_line_non_utf8() {
    let bytes: &[u8] = b"@2 // caf\xe9\n// \xff\xfe\n@ab\xffc\n";
    let mut parser = Parser::new(bytes);
    assert_eq!(parser.next_line().unwrap().unwrap().text, "@2");

    let line = parser.next_line().unwrap().unwrap();
    assert_eq!(line.number, 3);
    assert_eq!(line.text, "@ab\u{FFFD}c");
    assert_eq!(
        parse_instruction(&line).unwrap_err().kind,
        SyntaxErrorKind::IllegalCharacter('\u{FFFD}')
    );
    assert_eq!(parse_instruction(&line).unwrap_err().column, 3);
    assert!(parser.next_line().unwrap().is_none());
}

#[test]
fn test_classify() {
    assert_eq!(classify("@12"), InstructionKind::Address);
    assert_eq!(classify("(LOOP)"), InstructionKind::Label);
    assert_eq!(classify("0;JMP"), InstructionKind::Compute);
    assert_eq!(classify("@"), InstructionKind::Address);
}

#[test]
fn test_extract_address() {
    assert_eq!(extract_address("@12"), Ok(Address::Constant(12)));
    assert_eq!(extract_address("@32767"), Ok(Address::Constant(32767)));
    assert_eq!(
        extract_address("@B_NUT12$"),
        Ok(Address::Symbol("B_NUT12$".to_string()))
    );
    assert_eq!(extract_address("@"), Err((SyntaxErrorKind::MissingSymbol, 1)));
    assert_eq!(
        extract_address("@32768"),
        Err((SyntaxErrorKind::ConstantTooLarge("32768".to_string()), 1))
    );
    assert_eq!(
        extract_address("@1abc"),
        Err((SyntaxErrorKind::LeadingDigit('1'), 1))
    );
    assert_eq!(
        extract_address("@ab-c"),
        Err((SyntaxErrorKind::IllegalCharacter('-'), 3))
    );
    assert_eq!(
        extract_address("@a b"),
        Err((SyntaxErrorKind::IllegalCharacter(' '), 2))
    );
}

#[test]
fn test_extract_label() {
    assert_eq!(extract_label("(LOOP)"), Ok("LOOP".to_string()));
    assert_eq!(extract_label("(a.b$c:_1)"), Ok("a.b$c:_1".to_string()));
    assert_eq!(
        extract_label("(LOOP"),
        Err((SyntaxErrorKind::MissingCloseParen, 5))
    );
    assert_eq!(extract_label("()"), Err((SyntaxErrorKind::MissingSymbol, 1)));
    assert_eq!(
        extract_label("(12)"),
        Err((SyntaxErrorKind::InvalidLabelSymbol, 1))
    );
    assert_eq!(
        extract_label("(LOOP) x"),
        Err((SyntaxErrorKind::IllegalCharacter(' '), 6))
    );
    assert_eq!(
        extract_label("(LO)OP)"),
        Err((SyntaxErrorKind::IllegalCharacter('O'), 4))
    );
}

#[test]
fn test_extract_mnemonics() {
    assert_eq!(
        extract_mnemonics("D=D|M;JEQ"),
        Ok(mnemonics(Some("D"), "D|M", Some("JEQ")))
    );
    assert_eq!(extract_mnemonics("D;JGT"), Ok(mnemonics(None, "D", Some("JGT"))));
    assert_eq!(extract_mnemonics("AM=M-1"), Ok(mnemonics(Some("AM"), "M-1", None)));
    assert_eq!(extract_mnemonics("0"), Ok(mnemonics(None, "0", None)));
    assert_eq!(extract_mnemonics("D=;JMP"), Ok(mnemonics(Some("D"), "", Some("JMP"))));
}

#[test]
fn test_invalid_compute() {
    assert_eq!(
        extract_mnemonics("D=M+2"),
        Err((SyntaxErrorKind::IllegalCharacterInCompute('2'), 4))
    );
    assert_eq!(
        extract_mnemonics("D = M"),
        Err((SyntaxErrorKind::IllegalCharacterInCompute(' '), 1))
    );
    assert_eq!(
        extract_mnemonics("=M"),
        Err((SyntaxErrorKind::DanglingOperator('='), 0))
    );
    assert_eq!(
        extract_mnemonics("D;"),
        Err((SyntaxErrorKind::DanglingOperator(';'), 1))
    );
    assert_eq!(
        extract_mnemonics("M=1=1"),
        Err((SyntaxErrorKind::DuplicateOperator('='), 3))
    );
    assert_eq!(
        extract_mnemonics("0;JMP;JMP"),
        Err((SyntaxErrorKind::DuplicateOperator(';'), 5))
    );
    assert_eq!(
        extract_mnemonics("D;J=M"),
        Err((SyntaxErrorKind::MisorderedOperator, 3))
    );
}

#[test]
fn test_parse_instruction() {
    let line = RawLine {
        number: 4,
        text: "@1abc".to_string(),
    };
    let err = parse_instruction(&line).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::LeadingDigit('1'));
    assert_eq!(err.instruction, InstructionKind::Address);
    assert_eq!(err.line, 4);
    assert_eq!(err.column, 1);

    let line = RawLine {
        number: 1,
        text: "(END)".to_string(),
    };
    assert_eq!(parse_instruction(&line), Ok(Instruction::L("END".to_string())));
}
