//! Two-pass assembler for Duck Machine assembly.
mod diag;
mod line;
mod object;
mod pass1;
mod pass2;
mod symbol;

pub use self::diag::{AsmError, Diagnostics, ErrorLimitExceeded};
pub use self::line::{parse_line, AsmLine, LineError, LineKind, SymOp};
pub use self::object::{load, ObjectError};
pub use self::pass1::resolve_labels;
pub use self::pass2::transform;
pub use self::symbol::SymbolTable;

/// Assemble source text into object lines.
///
/// Returns `Ok(None)` when errors were reported to `diag` but stayed within its limit. The second
/// pass only runs on a source the first pass found no problems with.
pub fn assemble(src: &str, diag: &mut Diagnostics) -> Result<Option<Vec<String>>, ErrorLimitExceeded> {
    let lines: Vec<&str> = src.lines().collect();
    let table = resolve_labels(&lines, diag)?;
    if !diag.is_empty() {
        return Ok(None);
    }
    let out = transform(&lines, &table, diag)?;
    if !diag.is_empty() {
        return Ok(None);
    }
    Ok(Some(out))
}
