use std::fmt;

use crate::text::MAX_CONSTANT;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InstructionKind {
    /// `@symbol`
    Address,
    /// `(symbol)`
    Label,
    /// `dest=comp;jump`
    Compute,
}

impl InstructionKind {
    pub fn label(self) -> &'static str {
        match self {
            InstructionKind::Address => "A-instruction",
            InstructionKind::Label => "L-instruction",
            InstructionKind::Compute => "C-instruction",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One cleaned, non-empty source line and the physical line it came from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawLine {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Address {
    Constant(u16),
    Symbol(String),
}

/// Mnemonic substrings of a compute instruction. An absent dest or jump
/// field is `None`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Mnemonics {
    pub dest: Option<String>,
    pub comp: String,
    pub jump: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Instruction {
    A(Address),
    C(Mnemonics),
    L(String),
}

impl Instruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::A(_) => InstructionKind::Address,
            Instruction::C(_) => InstructionKind::Compute,
            Instruction::L(_) => InstructionKind::Label,
        }
    }
}

/// Bit codes of a compute instruction: dest is 3 bits, comp 7, jump 3.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct TranslatedFields {
    pub dest: u8,
    pub comp: u8,
    pub jump: u8,
}

/// A 16-bit machine word, printed as sixteen `0`/`1` characters.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Word(u16);

impl Word {
    pub fn address(value: u16) -> Word {
        debug_assert!(value <= MAX_CONSTANT);
        Word(value & MAX_CONSTANT)
    }

    pub fn compute(fields: TranslatedFields) -> Word {
        let mut word = 0xE000;
        word |= u16::from(fields.comp & 0x7F) << 6;
        word |= u16::from(fields.dest & 0x07) << 3;
        word |= u16::from(fields.jump & 0x07);
        Word(word)
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016b}", self.0)
    }
}

#[test]
fn test_word_layout() {
    assert_eq!(Word::address(2).to_string(), "0000000000000010");
    assert_eq!(Word::address(MAX_CONSTANT).to_string(), "0111111111111111");
    assert_eq!(Word::address(0).to_string(), "0000000000000000");

    let fields = TranslatedFields {
        dest: 0b010,
        comp: 0b0000010,
        jump: 0b000,
    };
    assert_eq!(Word::compute(fields).to_string(), "1110000010010000");
    assert_eq!(Word::compute(TranslatedFields::default()).bits(), 0xE000);
}
