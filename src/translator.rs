use std::collections::HashMap;

use crate::commands::{InstructionKind, Mnemonics, RawLine, TranslatedFields};
use crate::error::{Field, SyntaxError, SyntaxErrorKind};

fn comp_table() -> HashMap<&'static str, u8> {
    HashMap::from([
        ("0", 0b0101010),
        ("1", 0b0111111),
        ("-1", 0b0111010),
        ("D", 0b0001100),
        ("A", 0b0110000),
        ("M", 0b1110000),
        ("!D", 0b0001101),
        ("!A", 0b0110001),
        ("!M", 0b1110001),
        ("-D", 0b0001111),
        ("-A", 0b0110011),
        ("-M", 0b1110011),
        ("D+1", 0b0011111),
        ("A+1", 0b0110111),
        ("M+1", 0b1110111),
        ("D-1", 0b0001110),
        ("A-1", 0b0110010),
        ("M-1", 0b1110010),
        ("D+A", 0b0000010),
        ("D+M", 0b1000010),
        ("D-A", 0b0010011),
        ("D-M", 0b1010011),
        ("A-D", 0b0000111),
        ("M-D", 0b1000111),
        ("D&A", 0b0000000),
        ("D&M", 0b1000000),
        ("D|A", 0b0010101),
        ("D|M", 0b1010101),
    ])
}

/// Keys are spelled with their letters in `A`, `D`, `M` order.
fn dest_table() -> HashMap<&'static str, u8> {
    HashMap::from([
        ("M", 0b001),
        ("D", 0b010),
        ("DM", 0b011),
        ("A", 0b100),
        ("AM", 0b101),
        ("AD", 0b110),
        ("ADM", 0b111),
    ])
}

fn jump_table() -> HashMap<&'static str, u8> {
    HashMap::from([
        ("JGT", 0b001),
        ("JEQ", 0b010),
        ("JGE", 0b011),
        ("JLT", 0b100),
        ("JNE", 0b101),
        ("JLE", 0b110),
        ("JMP", 0b111),
    ])
}

/// Code of an absent dest or jump field.
const EMPTY_FIELD: u8 = 0b000;

/// Sorts the letters of a dest mnemonic so `MD` and `DM` share a key.
fn normalize_dest(mnemonic: &str) -> String {
    let mut letters: Vec<char> = mnemonic.chars().collect();
    letters.sort_unstable();
    letters.into_iter().collect()
}

/// Looks compute mnemonics up in the fixed dest/comp/jump tables.
pub struct Translator {
    dest: HashMap<&'static str, u8>,
    comp: HashMap<&'static str, u8>,
    jump: HashMap<&'static str, u8>,
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new()
    }
}

impl Translator {
    pub fn new() -> Translator {
        Translator {
            dest: dest_table(),
            comp: comp_table(),
            jump: jump_table(),
        }
    }

    pub fn dest(&self, mnemonic: Option<&str>) -> Option<u8> {
        match mnemonic {
            None => Some(EMPTY_FIELD),
            Some(m) => self.dest.get(normalize_dest(m).as_str()).copied(),
        }
    }

    pub fn comp(&self, mnemonic: &str) -> Option<u8> {
        self.comp.get(mnemonic).copied()
    }

    pub fn jump(&self, mnemonic: Option<&str>) -> Option<u8> {
        match mnemonic {
            None => Some(EMPTY_FIELD),
            Some(m) => self.jump.get(m).copied(),
        }
    }

    /// Translates all three fields of a compute line. Every unknown
    /// mnemonic is reported, in dest, comp, jump order.
    pub fn translate(
        &self,
        line: &RawLine,
        mnemonics: &Mnemonics,
    ) -> Result<TranslatedFields, Vec<SyntaxError>> {
        let dest_len = mnemonics.dest.as_deref().map(|d| d.chars().count());
        let unknown = |field: Field, mnemonic: &str, column: usize| {
            SyntaxError::new(
                SyntaxErrorKind::UnknownMnemonic {
                    field,
                    mnemonic: mnemonic.to_string(),
                },
                InstructionKind::Compute,
                line,
                column,
            )
        };

        let mut errors = Vec::new();

        let dest = self.dest(mnemonics.dest.as_deref());
        match dest {
            Some(code) => tracing::debug!("dest {:?} -> {:03b}", mnemonics.dest, code),
            None => errors.push(unknown(
                Field::Dest,
                mnemonics.dest.as_deref().unwrap_or_default(),
                dest_len.unwrap_or(0),
            )),
        }

        let comp = self.comp(&mnemonics.comp);
        match comp {
            Some(code) => tracing::debug!("comp {:?} -> {:07b}", mnemonics.comp, code),
            None => errors.push(unknown(
                Field::Comp,
                &mnemonics.comp,
                dest_len.map_or(0, |len| len + 1),
            )),
        }

        let jump = self.jump(mnemonics.jump.as_deref());
        match jump {
            Some(code) => tracing::debug!("jump {:?} -> {:03b}", mnemonics.jump, code),
            None => {
                let jump = mnemonics.jump.as_deref().unwrap_or_default();
                let semicolon = line.text.chars().count() - jump.chars().count() - 1;
                errors.push(unknown(Field::Jump, jump, semicolon));
            }
        }

        match (dest, comp, jump) {
            (Some(dest), Some(comp), Some(jump)) => Ok(TranslatedFields { dest, comp, jump }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
fn compute_line(text: &str) -> (RawLine, Mnemonics) {
    let line = RawLine {
        number: 1,
        text: text.to_string(),
    };
    let mnemonics = crate::parser::extract_mnemonics(text).unwrap();
    (line, mnemonics)
}

#[test]
fn test_table_sizes() {
    let translator = Translator::new();
    assert_eq!(translator.comp.len(), 28);
    assert_eq!(translator.dest.len() + 1, 8);
    assert_eq!(translator.jump.len() + 1, 8);
}

#[test]
fn test_lookups() {
    let translator = Translator::new();
    assert_eq!(translator.dest(None), Some(0b000));
    assert_eq!(translator.dest(Some("MD")), Some(0b011));
    assert_eq!(translator.dest(Some("DM")), Some(0b011));
    assert_eq!(translator.dest(Some("AMD")), Some(0b111));
    assert_eq!(translator.dest(Some("MM")), None);
    assert_eq!(translator.dest(Some("X")), None);

    assert_eq!(translator.comp("D+A"), Some(0b0000010));
    assert_eq!(translator.comp("M-D"), Some(0b1000111));
    assert_eq!(translator.comp("A+D"), None);

    assert_eq!(translator.jump(None), Some(0b000));
    assert_eq!(translator.jump(Some("JMP")), Some(0b111));
    assert_eq!(translator.jump(Some("JXX")), None);
}

#[test]
fn test_translate() {
    let translator = Translator::new();

    let (line, mnemonics) = compute_line("D;JGT");
    assert_eq!(
        translator.translate(&line, &mnemonics),
        Ok(TranslatedFields {
            dest: 0b000,
            comp: 0b0001100,
            jump: 0b001
        })
    );

    let (line, mnemonics) = compute_line("AM=M-1");
    assert_eq!(
        translator.translate(&line, &mnemonics),
        Ok(TranslatedFields {
            dest: 0b101,
            comp: 0b1110010,
            jump: 0b000
        })
    );
}

#[test]
fn test_unknown_mnemonics() {
    let translator = Translator::new();

    let (line, mnemonics) = compute_line("X=D");
    let err = translator.translate(&line, &mnemonics).unwrap_err().remove(0);
    assert_eq!(
        err.kind,
        SyntaxErrorKind::UnknownMnemonic {
            field: Field::Dest,
            mnemonic: "X".to_string()
        }
    );
    assert_eq!(err.column, 1);

    let (line, mnemonics) = compute_line("D=D+D");
    let err = translator.translate(&line, &mnemonics).unwrap_err().remove(0);
    assert_eq!(
        err.kind,
        SyntaxErrorKind::UnknownMnemonic {
            field: Field::Comp,
            mnemonic: "D+D".to_string()
        }
    );
    assert_eq!(err.column, 2);

    let (line, mnemonics) = compute_line("0;JUMP");
    let err = translator.translate(&line, &mnemonics).unwrap_err().remove(0);
    assert_eq!(
        err.kind,
        SyntaxErrorKind::UnknownMnemonic {
            field: Field::Jump,
            mnemonic: "JUMP".to_string()
        }
    );
    assert_eq!(err.column, 1);
}

#[test]
fn test_every_unknown_field_is_reported() {
    let translator = Translator::new();
    let (line, mnemonics) = compute_line("X=Q;JXX");
    let errors = translator.translate(&line, &mnemonics).unwrap_err();

    let found: Vec<(String, usize)> = errors
        .iter()
        .map(|e| (e.kind.to_string(), e.column))
        .collect();
    assert_eq!(
        found,
        vec![
            ("invalid dest mnemonic \"X\"".to_string(), 1),
            ("invalid comp mnemonic \"Q\"".to_string(), 2),
            ("invalid jump mnemonic \"JXX\"".to_string(), 3),
        ]
    );
}

#[test]
fn test_all_table_combinations() {
    let translator = Translator::new();
    let dests: Vec<Option<&str>> = std::iter::once(None)
        .chain(translator.dest.keys().map(|k| Some(*k)))
        .collect();
    let jumps: Vec<Option<&str>> = std::iter::once(None)
        .chain(translator.jump.keys().map(|k| Some(*k)))
        .collect();
    assert_eq!(dests.len(), 8);
    assert_eq!(jumps.len(), 8);

    for dest in &dests {
        for (comp, comp_code) in &translator.comp {
            for jump in &jumps {
                let text = format!(
                    "{}{}{}",
                    dest.map(|d| format!("{d}=")).unwrap_or_default(),
                    comp,
                    jump.map(|j| format!(";{j}")).unwrap_or_default()
                );
                let (line, mnemonics) = compute_line(&text);
                let fields = translator.translate(&line, &mnemonics).unwrap();
                let word = crate::commands::Word::compute(fields).to_string();

                let dest_code = dest.map_or(0, |d| translator.dest[d]);
                let jump_code = jump.map_or(0, |j| translator.jump[j]);
                assert_eq!(word.len(), 16, "{text}");
                assert_eq!(&word[..3], "111", "{text}");
                assert_eq!(word[3..10], format!("{:07b}", comp_code), "{text}");
                assert_eq!(word[10..13], format!("{:03b}", dest_code), "{text}");
                assert_eq!(word[13..16], format!("{:03b}", jump_code), "{text}");
            }
        }
    }
}
