use super::diag::{AsmError, Diagnostics, ErrorLimitExceeded};
use super::line::parse_line;
use super::symbol::SymbolTable;

/// First pass: assign an address to every line that takes space and record where each label
/// points.
///
/// Syntax errors and duplicate labels are reported to `diag` and skipped. Fails only once the
/// error limit is exceeded.
pub fn resolve_labels<S: AsRef<str>>(
    lines: &[S],
    diag: &mut Diagnostics,
) -> Result<SymbolTable, ErrorLimitExceeded> {
    let mut table = SymbolTable::new();
    let mut addr: u32 = 0;

    for (lnum, line) in lines.iter().enumerate() {
        let parsed = match parse_line(line.as_ref()) {
            Ok(parsed) => parsed,
            Err(reason) => {
                diag.report(AsmError::Syntax { line: lnum, reason })?;
                continue;
            }
        };
        if let Some(label) = &parsed.label {
            if let Err(first) = table.define(label, addr) {
                diag.report(AsmError::DuplicateLabel {
                    line: lnum,
                    label: label.clone(),
                    first,
                })?;
            }
        }
        if parsed.takes_space() {
            addr += 1;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asm::line::LineError;

    #[test]
    fn labels_get_addresses() {
        let src = [
            "# a comment first",
            "start: ADD r1,r0,r0",
            "       JUMP skip",
            "       ADD r1,r1,r1",
            "",
            "skip:  HALT r0,r0,r0",
            "empty:",
            "value: DATA 5",
        ];
        let mut diag = Diagnostics::new(5);
        let table = resolve_labels(&src, &mut diag).unwrap();

        assert!(diag.is_empty());
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![("start", 0), ("skip", 3), ("empty", 4), ("value", 4)]
        );
    }

    #[test]
    fn duplicate_label() {
        let src = ["a: DATA 1", "b: DATA 2", "a: DATA 3"];
        let mut diag = Diagnostics::new(5);
        let table = resolve_labels(&src, &mut diag).unwrap();

        assert_eq!(
            diag.errors(),
            &[AsmError::DuplicateLabel {
                line: 2,
                label: "a".into(),
                first: 0
            }]
        );
        assert_eq!(table.get("a"), Some(0));
    }

    #[test]
    fn syntax_errors_are_counted() {
        let src = ["ADD r1", "ok: HALT r0,r0,r0", "what is this"];
        let mut diag = Diagnostics::new(5);
        let table = resolve_labels(&src, &mut diag).unwrap();

        assert_eq!(diag.count(), 2);
        assert_eq!(
            diag.errors()[0],
            AsmError::Syntax {
                line: 0,
                reason: LineError::NoMatch
            }
        );
        assert_eq!(diag.errors()[1].line(), 2);
        // Bad lines take no address
        assert_eq!(table.get("ok"), Some(0));
    }

    #[test]
    fn too_many_errors() {
        let src = vec!["bad line"; 7];
        let mut diag = Diagnostics::new(5);
        assert_eq!(
            resolve_labels(&src, &mut diag),
            Err(ErrorLimitExceeded { count: 6, limit: 5 })
        );
        // Abandoned right at the limit
        assert_eq!(diag.count(), 6);
    }
}
