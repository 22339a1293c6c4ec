use std::cmp::Ordering;

use thiserror::Error;

use crate::instr::{CondFlag, OpCode};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum AluError {
    #[error("division by zero")]
    DivisionByZero,
}

/// Perform `op` on two signed operands, returning the result and the condition it sets.
///
/// `right` is `reg[src2] + offset` formed without wrapping, so it may lie just outside the 32-bit
/// range. Results that do not fit in 32 bits wrap around and set only the overflow flag.
/// `LOAD` and `STORE` compute the effective address `left + right`; `HALT` yields zero.
pub fn execute(op: OpCode, left: i32, right: i64) -> Result<(i32, CondFlag), AluError> {
    let (l, r) = (left as i64, right);
    let wide = match op {
        OpCode::Halt => 0,
        OpCode::Load | OpCode::Store | OpCode::Add => l + r,
        OpCode::Sub => l - r,
        OpCode::Mul => l * r,
        OpCode::Div => {
            if r == 0 {
                return Err(AluError::DivisionByZero);
            }
            floor_div(l, r)
        }
        OpCode::And => l & r,
        OpCode::Or => l | r,
        OpCode::Xor => l ^ r,
    };
    Ok(settle(wide))
}

/// Integer division rounding towards negative infinity.
fn floor_div(l: i64, r: i64) -> i64 {
    let quot = l / r;
    if l % r != 0 && ((l < 0) != (r < 0)) {
        quot - 1
    } else {
        quot
    }
}

fn settle(wide: i64) -> (i32, CondFlag) {
    let result = wide as i32;
    if result as i64 != wide {
        return (result, CondFlag::V);
    }
    let flag = match result.cmp(&0) {
        Ordering::Less => CondFlag::M,
        Ordering::Equal => CondFlag::Z,
        Ordering::Greater => CondFlag::P,
    };
    (result, flag)
}
