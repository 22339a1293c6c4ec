use std::ops::Range;

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::asm::{AsmError, ErrorLimitExceeded, ObjectError};
use crate::cpu::RunError;

/// Byte range of line `line` (0-based) inside `src`, without its line ending.
fn line_span(src: &str, line: usize) -> Range<usize> {
    let mut offs = 0;
    for (i, text) in src.split_inclusive('\n').enumerate() {
        if i == line {
            let len = text.trim_end_matches(['\n', '\r']).len();
            return offs..offs + len;
        }
        offs += text.len();
    }
    src.len()..src.len()
}

fn source(name: &str, src: &str) -> NamedSource<String> {
    NamedSource::new(name, src.to_string())
}

// Assembler errors

pub fn asm_error(err: &AsmError, name: &str, src: &str) -> Report {
    let span = line_span(src, err.line());
    let (code, help, label) = match err {
        AsmError::Syntax { .. } => (
            "asm::syntax",
            "expected `OP[/PRED] rT,rS1,rS2[offset]`, `DATA value`, or `LOAD`/`STORE`/`JUMP` with a label",
            "invalid line",
        ),
        AsmError::DuplicateLabel { .. } => (
            "asm::duplicate_label",
            "labels may only be defined once per file",
            "duplicate label",
        ),
        AsmError::UndefinedSymbol { .. } => (
            "asm::undefined_symbol",
            "define the label on the line it should refer to, like `name: DATA 0`",
            "undefined label",
        ),
        AsmError::OutOfReach { .. } => (
            "asm::out_of_reach",
            "move the label closer, or load its address through a register",
            "label too far away",
        ),
    };
    miette!(
        severity = Severity::Error,
        code = code,
        help = help,
        labels = vec![LabeledSpan::at(span, label)],
        "{err}"
    )
    .with_source_code(source(name, src))
}

pub fn asm_too_many(err: ErrorLimitExceeded) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::error_limit",
        help = "fix the errors above, or raise the limit with `--error-limit`",
        "{err}"
    )
}

pub fn object_error(err: &ObjectError, name: &str, src: &str) -> Report {
    let line = match err {
        ObjectError::Syntax { line, .. } | ObjectError::Unresolved { line, .. } => *line,
    };
    miette!(
        severity = Severity::Error,
        code = "object::load",
        help = "object files must contain only fully specified instructions and data",
        labels = vec![LabeledSpan::at(line_span(src, line), "cannot encode")],
        "{err}"
    )
    .with_source_code(source(name, src))
}

// Runtime errors

pub fn run_error(err: &RunError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "run::fault",
        help = "the machine was halted",
        "{err}"
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spans_cover_single_lines() {
        let src = "first\r\nsecond\n\nlast";
        assert_eq!(line_span(src, 0), 0..5);
        assert_eq!(line_span(src, 1), 7..13);
        assert_eq!(line_span(src, 2), 14..14);
        assert_eq!(line_span(src, 3), 15..19);
        assert_eq!(line_span(src, 9), 19..19);
    }
}
