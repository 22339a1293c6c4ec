use super::diag::{AsmError, Diagnostics, ErrorLimitExceeded};
use super::line::{parse_line, AsmLine, LineKind, SymOp};
use super::symbol::SymbolTable;
use crate::instr::{check_offset, Instruction, OpCode};
use crate::register::PC;

/// Second pass: rewrite `LOAD`, `STORE` and `JUMP` by label into fully specified instructions
/// addressing relative to the program counter. All other lines are copied through.
pub fn transform<S: AsRef<str>>(
    lines: &[S],
    table: &SymbolTable,
    diag: &mut Diagnostics,
) -> Result<Vec<String>, ErrorLimitExceeded> {
    let mut out = Vec::with_capacity(lines.len());
    let mut addr: u32 = 0;

    for (lnum, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(reason) => {
                diag.report(AsmError::Syntax { line: lnum, reason })?;
                continue;
            }
        };
        match resolve(&parsed, table, addr, lnum) {
            Ok(Some(resolved)) => out.push(resolved),
            Ok(None) => out.push(line.trim_end().to_string()),
            Err(err) => diag.report(err)?,
        }
        if parsed.takes_space() {
            addr += 1;
        }
    }
    Ok(out)
}

/// Fully specified text for a symbolic line, `None` for any other kind of line.
fn resolve(
    parsed: &AsmLine,
    table: &SymbolTable,
    addr: u32,
    lnum: usize,
) -> Result<Option<String>, AsmError> {
    let LineKind::Symbolic {
        op,
        cond,
        target,
        symbol,
    } = &parsed.kind
    else {
        return Ok(None);
    };

    let dest = table.get(symbol).ok_or_else(|| AsmError::UndefinedSymbol {
        line: lnum,
        symbol: symbol.clone(),
    })?;
    let distance = dest as i64 - addr as i64;
    let offset = check_offset(distance).map_err(|_| AsmError::OutOfReach {
        line: lnum,
        symbol: symbol.clone(),
        distance,
    })?;

    let instr = match op {
        SymOp::Load => Instruction::new(OpCode::Load, target.unwrap_or(0), 0, PC, offset),
        SymOp::Store => Instruction::new(OpCode::Store, target.unwrap_or(0), 0, PC, offset),
        SymOp::Jump => Instruction::new(OpCode::Add, PC, 0, PC, offset),
    }
    .with_cond(*cond);

    let resolved = match &parsed.label {
        Some(label) => format!("{label}: {instr}"),
        None => instr.to_string(),
    };
    Ok(Some(resolved))
}
