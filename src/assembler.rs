use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::commands::{Instruction, RawLine, Word};
use crate::diagnostics::Diagnostics;
use crate::error::{AsmError, SyntaxError};
use crate::parser::{parse_instruction, Parser};
use crate::translator::Translator;
use crate::writer::{self, SymbolResolver, Unresolved};

/// Run-wide settings, passed in explicitly by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Echo each cleaned line and trace it inside a per-line span.
    pub verbose: bool,
    /// Use ANSI colors in diagnostics.
    pub color: bool,
}

/// Outcome of one pass over an input.
#[derive(Debug, Default)]
pub struct Report {
    pub words: Vec<Word>,
    pub errors: Vec<SyntaxError>,
    /// Physical lines read, blank and comment lines included.
    pub lines: usize,
}

impl Report {
    /// False once any line failed, whatever came after it.
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Assembler<S = Unresolved> {
    config: Config,
    translator: Translator,
    resolver: S,
}

impl Assembler<Unresolved> {
    pub fn new(config: Config) -> Assembler<Unresolved> {
        Assembler::with_resolver(config, Unresolved)
    }
}

impl<S: SymbolResolver> Assembler<S> {
    pub fn with_resolver(config: Config, resolver: S) -> Assembler<S> {
        Assembler {
            config,
            translator: Translator::new(),
            resolver,
        }
    }

    /// Translates a single line. Labels produce no word. A compute line
    /// can fail with one error per unknown mnemonic.
    pub fn process_line(&self, line: &RawLine) -> Result<Option<Word>, Vec<SyntaxError>> {
        let word = match parse_instruction(line).map_err(|err| vec![err])? {
            Instruction::L(_) => None,
            Instruction::A(address) => Some(
                writer::assemble_address(line, &address, &self.resolver).map_err(|err| vec![err])?,
            ),
            Instruction::C(mnemonics) => {
                let fields = self.translator.translate(line, &mnemonics)?;
                Some(writer::assemble_compute(fields))
            }
        };
        tracing::debug!(line = line.number, "successfully parsed \"{}\"", line.text);
        Ok(word)
    }

    /// Runs every line of `input` through the pipeline. Syntax errors are
    /// reported to `diagnostics` and collected; only a read failure stops
    /// the run early.
    pub fn assemble<R: BufRead, W: Write>(
        &self,
        input: R,
        diagnostics: &mut Diagnostics<W>,
    ) -> io::Result<Report> {
        let mut parser = Parser::new(input);
        let mut report = Report::default();

        while let Some(line) = parser.next_line()? {
            let _span = self
                .config
                .verbose
                .then(|| tracing::debug_span!("line", number = line.number).entered());
            if self.config.verbose {
                tracing::debug!("{}", line.text);
            }

            match self.process_line(&line) {
                Ok(Some(word)) => report.words.push(word),
                Ok(None) => {}
                Err(errors) => {
                    for err in errors {
                        diagnostics.report(&err);
                        report.errors.push(err);
                    }
                }
            }
        }
        report.lines = parser.line_number();

        tracing::info!(
            lines = report.lines,
            words = report.words.len(),
            errors = report.errors.len(),
            "pass finished"
        );
        Ok(report)
    }

    /// Assembles `path` into the `.hack` file next to it and returns the
    /// output path. On failure no output file is left behind.
    pub fn assemble_file(&self, path: &Path) -> Result<PathBuf, AsmError> {
        let output = writer::output_path(path);
        let file = File::open(path).map_err(|source| AsmError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut diagnostics = Diagnostics::new(io::stderr().lock(), self.config.color);
        let result = self.assemble(BufReader::new(file), &mut diagnostics);

        let report = match result {
            Ok(report) => report,
            Err(source) => {
                writer::discard_output(&output);
                return Err(AsmError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !report.succeeded() {
            writer::discard_output(&output);
            return Err(AsmError::Failed {
                path: path.to_path_buf(),
                errors: report.errors.len(),
            });
        }

        writer::write_output(&output, &report.words)?;
        Ok(output)
    }
}

#[cfg(test)]
fn run(src: &str) -> (Report, String) {
    run_bytes(src.as_bytes(), Config::default())
}

#[cfg(test)]
fn run_bytes(src: &[u8], config: Config) -> (Report, String) {
    let assembler = Assembler::new(config);
    let mut diagnostics = Diagnostics::new(Vec::new(), false);
    let report = assembler.assemble(src, &mut diagnostics).unwrap();
    let out = String::from_utf8(diagnostics.into_inner()).unwrap();
    (report, out)
}

#[cfg(test)]
fn words(report: &Report) -> Vec<String> {
    report.words.iter().map(Word::to_string).collect()
}

#[test]
fn test_simple_program() {
    let (report, out) = run("@2\nD=D+A\n@0\nM=D\n");
    assert!(report.succeeded());
    assert!(out.is_empty());
    assert_eq!(
        words(&report),
        vec![
            "0000000000000010",
            "1110000010010000",
            "0000000000000000",
            "1110001100001000",
        ]
    );
}

#[test]
fn test_labels_and_comments() {
    let src = "// Computes nothing\n\n(LOOP)\n  @32767 // max\n0;JMP\n(END)\n   \n";
    let (report, _) = run(src);
    assert!(report.succeeded());
    assert_eq!(words(&report), vec!["0111111111111111", "1110101010000111"]);
    assert_eq!(report.lines, 7);
}

#[test]
fn test_jump_without_dest() {
    let (report, _) = run("D;JGT\nAMD=M-1;JNE\n");
    assert_eq!(words(&report), vec!["1110001100000001", "1111110010111101"]);
}

#[test]
fn test_errors_are_sticky() {
    let (report, out) = run("@1abc\nD=M\n@32768\nM=1=1\n(5)\n@foo\nD=M\n");
    assert!(!report.succeeded());
    assert_eq!(report.words.len(), 2);

    let lines: Vec<(usize, usize)> = report.errors.iter().map(|e| (e.line, e.column)).collect();
    assert_eq!(lines, vec![(1, 1), (3, 1), (4, 3), (5, 1), (6, 1)]);
    assert_eq!(out.matches("[ERROR]").count(), 5);
    assert!(out.contains("unresolved symbol \"foo\""));
}

#[test]
fn test_all_unknown_mnemonics_reported() {
    let (report, out) = run("X=Q;JXX\n@1\n");
    assert_eq!(report.errors.len(), 3);
    assert_eq!(out.matches("[ERROR]").count(), 3);
    assert!(out.contains("invalid comp mnemonic \"Q\""));
    assert!(out.contains("invalid jump mnemonic \"JXX\""));
    assert_eq!(words(&report), vec!["0000000000000001"]);
}

#[test]
fn test_non_utf8_bytes() {
    let (report, _) = run_bytes(b"@2 // caf\xe9\nD=A\n@3\n", Config::default());
    assert!(report.succeeded());
    assert_eq!(report.words.len(), 3);

    let (report, out) = run_bytes(b"@x\xe9\nD=A\n", Config::default());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].line, 1);
    assert_eq!(report.words.len(), 1);
    assert!(out.contains("[ERROR]"));
}

#[test]
fn test_verbose_does_not_change_output() {
    let src = b"(START)\n@2\nD=D+A\n";
    let (quiet, _) = run_bytes(src, Config::default());
    let verbose = Config {
        verbose: true,
        ..Config::default()
    };
    let (loud, out) = run_bytes(src, verbose);
    assert_eq!(words(&quiet), words(&loud));
    assert!(out.is_empty());
}

#[test]
fn test_resolver() {
    let symbols = std::collections::HashMap::from([("LOOP".to_string(), 4u16)]);
    let assembler = Assembler::with_resolver(Config::default(), symbols);
    let mut diagnostics = Diagnostics::new(Vec::new(), false);
    let report = assembler
        .assemble("@LOOP\n@MISSING\n".as_bytes(), &mut diagnostics)
        .unwrap();
    assert_eq!(words(&report), vec!["0000000000000100"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(diagnostics.reported(), 1);
}

#[test]
fn test_assemble_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Add.asm");
    std::fs::write(&source, "// Adds 2 and 3\n@2\nD=A\n@3\nD=D+A\n@0\nM=D\n").unwrap();

    let assembler = Assembler::new(Config::default());
    let output = assembler.assemble_file(&source).unwrap();
    assert_eq!(output, dir.path().join("Add.hack"));
    let first = std::fs::read_to_string(&output).unwrap();
    assert_eq!(first.lines().count(), 6);
    assert!(first.ends_with("1110001100001000\n"));

    assembler.assemble_file(&source).unwrap();
    assert_eq!(std::fs::read_to_string(&output).unwrap(), first);
}

#[test]
fn test_failed_file_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("Bad.asm");
    let output = dir.path().join("Bad.hack");
    std::fs::write(&output, "stale\n").unwrap();
    std::fs::write(&source, "@1\nD=Q\n@2\n").unwrap();

    let err = Assembler::new(Config::default())
        .assemble_file(&source)
        .unwrap_err();
    assert!(matches!(err, AsmError::Failed { errors: 1, .. }));
    assert!(!output.exists());
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = Assembler::new(Config::default())
        .assemble_file(&dir.path().join("Nope.asm"))
        .unwrap_err();
    assert!(matches!(err, AsmError::Open { .. }));
}
