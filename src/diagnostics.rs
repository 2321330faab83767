use std::io::Write;

use colored::{Color, Colorize};

use crate::error::SyntaxError;

fn paint(text: &str, fg: Color, color: bool) -> String {
    if color {
        text.color(fg).to_string()
    } else {
        text.to_string()
    }
}

/// The offending line followed by a caret under `err.column` and the
/// error message.
pub fn render(err: &SyntaxError, color: bool) -> String {
    let caret = format!("{:width$}^ ", "", width = err.column);
    let message = format!("[ERROR] {err}");
    format!(
        "{}\n{}{}",
        err.text,
        paint(&caret, Color::Red, color),
        paint(&message, Color::Red, color)
    )
}

/// Final pass/fail line of a run.
pub fn banner(ok: bool, message: &str, color: bool) -> String {
    paint(message, if ok { Color::Green } else { Color::Red }, color)
}

/// Writes syntax errors as soon as they are found.
pub struct Diagnostics<W> {
    out: W,
    color: bool,
    reported: usize,
}

impl<W: Write> Diagnostics<W> {
    pub fn new(out: W, color: bool) -> Diagnostics<W> {
        Diagnostics {
            out,
            color,
            reported: 0,
        }
    }

    pub fn report(&mut self, err: &SyntaxError) {
        self.reported += 1;
        let _ = writeln!(self.out, "{}", render(err, self.color));
    }

    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
fn sample_error() -> SyntaxError {
    use crate::commands::{InstructionKind, RawLine};
    use crate::error::SyntaxErrorKind;

    let line = RawLine {
        number: 7,
        text: "D=M+2".to_string(),
    };
    SyntaxError::new(
        SyntaxErrorKind::IllegalCharacterInCompute('2'),
        InstructionKind::Compute,
        &line,
        4,
    )
}

#[test]
fn test_render() {
    assert_eq!(
        render(&sample_error(), false),
        "D=M+2\n    ^ [ERROR] Syntax error on line 7, column 5 : invalid char '2' in C-instruction \"D=M+2\""
    );
    let painted = render(&sample_error(), true);
    assert!(painted.starts_with("D=M+2\n"));
    assert!(painted.contains("[ERROR] Syntax error on line 7, column 5"));
}

#[test]
fn test_report() {
    let mut diagnostics = Diagnostics::new(Vec::new(), false);
    diagnostics.report(&sample_error());
    diagnostics.report(&sample_error());
    assert_eq!(diagnostics.reported(), 2);

    let out = String::from_utf8(diagnostics.into_inner()).unwrap();
    assert_eq!(out.lines().count(), 4);
    assert_eq!(out.lines().nth(1).map(|l| l.find('^')), Some(Some(4)));
}
