use thiserror::Error;

use super::line::{parse_line, LineError, LineKind};
use crate::instr::encode;
use crate::Word;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ObjectError {
    #[error("object line {}: {reason}", .line + 1)]
    Syntax { line: usize, reason: LineError },
    #[error("object line {}: reference to `{symbol}` was never resolved", .line + 1)]
    Unresolved { line: usize, symbol: String },
}

/// Encode resolved object text into memory words, one per line that takes space.
pub fn load<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Word>, ObjectError> {
    let mut words = Vec::with_capacity(lines.len());
    for (lnum, line) in lines.iter().enumerate() {
        let parsed = parse_line(line.as_ref()).map_err(|reason| ObjectError::Syntax {
            line: lnum,
            reason,
        })?;
        match parsed.kind {
            LineKind::Comment => (),
            LineKind::Full(instr) => words.push(encode(&instr)),
            LineKind::Data(value) => words.push(value),
            LineKind::Symbolic { symbol, .. } => {
                return Err(ObjectError::Unresolved {
                    line: lnum,
                    symbol,
                })
            }
        }
    }
    Ok(words)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instr::{decode, Instruction, OpCode};

    #[test]
    fn encodes_instructions_and_data() {
        let words = load(&[
            "# header",
            "start: ADD r1,r0,r0[3]",
            "",
            "DATA 0x10",
            "HALT r0,r0,r0",
        ])
        .unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(decode(words[0]), Ok(Instruction::new(OpCode::Add, 1, 0, 0, 3)));
        assert_eq!(words[1], 0x10);
        assert_eq!(decode(words[2]), Ok(Instruction::new(OpCode::Halt, 0, 0, 0, 0)));
    }

    #[test]
    fn rejects_unresolved() {
        assert_eq!(
            load(&["HALT r0,r0,r0", "JUMP later"]),
            Err(ObjectError::Unresolved {
                line: 1,
                symbol: "later".into()
            })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            load(&["HALT r0,r0"]),
            Err(ObjectError::Syntax {
                line: 0,
                reason: LineError::NoMatch
            })
        );
    }
}
