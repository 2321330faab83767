use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::commands::{Address, InstructionKind, RawLine, TranslatedFields, Word};
use crate::error::{AsmError, SyntaxError, SyntaxErrorKind};
use crate::text::MAX_CONSTANT;

pub const OUTPUT_EXTENSION: &str = "hack";

/// Supplies addresses for non-numeric `@symbol` operands.
pub trait SymbolResolver {
    fn resolve(&self, symbol: &str) -> Option<u16>;
}

/// Resolver that knows no symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unresolved;

impl SymbolResolver for Unresolved {
    fn resolve(&self, _symbol: &str) -> Option<u16> {
        None
    }
}

impl SymbolResolver for HashMap<String, u16> {
    fn resolve(&self, symbol: &str) -> Option<u16> {
        self.get(symbol).copied()
    }
}

pub fn assemble_compute(fields: TranslatedFields) -> Word {
    let word = Word::compute(fields);
    tracing::debug!("bits assembled: \"{}\"", word);
    word
}

pub fn assemble_address(
    line: &RawLine,
    address: &Address,
    resolver: &impl SymbolResolver,
) -> Result<Word, SyntaxError> {
    let located = |kind: SyntaxErrorKind| SyntaxError::new(kind, InstructionKind::Address, line, 1);
    let value = match address {
        Address::Constant(value) => *value,
        Address::Symbol(symbol) => resolver
            .resolve(symbol)
            .ok_or_else(|| located(SyntaxErrorKind::UnresolvedSymbol(symbol.clone())))?,
    };
    if value > MAX_CONSTANT {
        return Err(located(SyntaxErrorKind::ConstantTooLarge(value.to_string())));
    }
    let word = Word::address(value);
    tracing::debug!("bits assembled: \"{}\"", word);
    Ok(word)
}

/// `prog.asm` becomes `prog.hack`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

pub fn write_words(out: &mut impl Write, words: &[Word]) -> io::Result<()> {
    for word in words {
        writeln!(out, "{}", word)?;
    }
    out.flush()
}

/// Writes `words` to `path`. A failed write leaves no file behind.
pub fn write_output(path: &Path, words: &[Word]) -> Result<(), AsmError> {
    let result = File::create(path).and_then(|file| write_words(&mut BufWriter::new(file), words));
    result.map_err(|source| {
        discard_output(path);
        AsmError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Removes a previous or partial output file, if any.
pub fn discard_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
fn address_line(text: &str) -> RawLine {
    RawLine {
        number: 1,
        text: text.to_string(),
    }
}

#[test]
fn test_assemble_address() {
    let line = address_line("@2");
    assert_eq!(
        assemble_address(&line, &Address::Constant(2), &Unresolved).map(|w| w.to_string()),
        Ok("0000000000000010".to_string())
    );

    let line = address_line("@foo");
    let err = assemble_address(&line, &Address::Symbol("foo".to_string()), &Unresolved)
        .unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::UnresolvedSymbol("foo".to_string()));
    assert_eq!(err.column, 1);

    let table: HashMap<String, u16> = HashMap::from([("foo".to_string(), 16), ("big".to_string(), 0x8000)]);
    assert_eq!(
        assemble_address(&line, &Address::Symbol("foo".to_string()), &table),
        Ok(Word::address(16))
    );
    let err = assemble_address(&line, &Address::Symbol("big".to_string()), &table).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::ConstantTooLarge("32768".to_string()));
}

#[test]
fn test_assemble_compute() {
    let fields = TranslatedFields {
        dest: 0b000,
        comp: 0b0001100,
        jump: 0b001,
    };
    assert_eq!(assemble_compute(fields).to_string(), "1110001100000001");
}

#[test]
fn test_write_words() {
    let mut out = Vec::new();
    write_words(&mut out, &[Word::address(2), Word::address(0)]).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "0000000000000010\n0000000000000000\n"
    );
}

#[test]
fn test_output_path() {
    assert_eq!(
        output_path(Path::new("dir/Max.asm")),
        PathBuf::from("dir/Max.hack")
    );
}
