//! Translates Hack assembly into Hack machine code, one 16-bit word of
//! `0`/`1` text per instruction.
//!
//! ```
//! use hack_assembler::assembler::{Assembler, Config};
//! use hack_assembler::diagnostics::Diagnostics;
//!
//! let assembler = Assembler::new(Config::default());
//! let mut diagnostics = Diagnostics::new(Vec::new(), false);
//! let report = assembler
//!     .assemble("@2\nD=D+A\n".as_bytes(), &mut diagnostics)
//!     .unwrap();
//! assert_eq!(report.words[0].to_string(), "0000000000000010");
//! ```

pub mod assembler;
pub mod commands;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod text;
pub mod translator;
pub mod writer;
