use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::commands::{InstructionKind, RawLine};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Field {
    Dest,
    Comp,
    Jump,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Dest => "dest",
            Field::Comp => "comp",
            Field::Jump => "jump",
        })
    }
}

fn char_class(c: &char) -> &'static str {
    if c.is_whitespace() {
        "whitespace"
    } else {
        "char"
    }
}

/// What went wrong on a single line.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("missing symbol after @")]
    MissingSymbol,

    #[error("missing ')'")]
    MissingCloseParen,

    #[error("symbol can't start with digit '{0}'")]
    LeadingDigit(char),

    #[error("label symbol can't be a constant")]
    InvalidLabelSymbol,

    #[error("constant {0} is larger than 32767")]
    ConstantTooLarge(String),

    #[error("invalid {} '{0}' in symbol", char_class(.0))]
    IllegalCharacter(char),

    #[error("'{0}' can't start or end an instruction")]
    DanglingOperator(char),

    #[error("more than one '{0}'")]
    DuplicateOperator(char),

    #[error("'=' must come before ';'")]
    MisorderedOperator,

    #[error("invalid {} '{0}'", char_class(.0))]
    IllegalCharacterInCompute(char),

    #[error("invalid {field} mnemonic \"{mnemonic}\"")]
    UnknownMnemonic { field: Field, mnemonic: String },

    #[error("unresolved symbol \"{0}\"")]
    UnresolvedSymbol(String),
}

/// A positioned syntax error. `column` is 0-based, `line` 1-based.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("Syntax error on line {line}, column {} : {kind} in {instruction} \"{text}\"", .column + 1)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub instruction: InstructionKind,
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl SyntaxError {
    pub fn new(
        kind: SyntaxErrorKind,
        instruction: InstructionKind,
        line: &RawLine,
        column: usize,
    ) -> SyntaxError {
        SyntaxError {
            kind,
            instruction,
            line: line.number,
            column,
            text: line.text.clone(),
        }
    }
}

/// Conditions that end a run.
#[derive(Debug, thiserror::Error)]
pub enum AsmError {
    #[error("error opening file '{}': {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("I/O error on {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("error writing '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("assembly of {} failed because of {errors} error(s)", .path.display())]
    Failed { path: PathBuf, errors: usize },
}

#[test]
fn test_messages() {
    let err = SyntaxError {
        kind: SyntaxErrorKind::LeadingDigit('1'),
        instruction: InstructionKind::Address,
        line: 3,
        column: 1,
        text: "@1abc".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Syntax error on line 3, column 2 : symbol can't start with digit '1' in A-instruction \"@1abc\""
    );
    assert_eq!(
        SyntaxErrorKind::IllegalCharacterInCompute(' ').to_string(),
        "invalid whitespace ' '"
    );
    assert_eq!(
        SyntaxErrorKind::UnknownMnemonic {
            field: Field::Jump,
            mnemonic: "JXX".to_string()
        }
        .to_string(),
        "invalid jump mnemonic \"JXX\""
    );
}
