//! Classification of single assembly source lines.
//!
//! Every form may start with a `label:` and end with a `#` or `;` comment.
//!
//! ```text
//! loop:  ADD/ZP r1,r2,r3[-4]   # fully specified
//!        LOAD/M r2,counter     # symbolic, resolved relative to the PC
//!        JUMP loop
//! n:     DATA 0x1f
//! ```
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::instr::{parse_register, CondFlag, FieldError, Instruction};
use crate::Word;

lazy_static! {
    static ref FULL: Regex = Regex::new(
        r"(?x)^
        \s* (?:(?P<label>[a-zA-Z]\w*):)?
        \s* (?P<opcode>[a-zA-Z]+)
        (?:/(?P<predicate>[a-zA-Z]+))?
        \s+ (?P<target>r[0-9]+)
        \s*,\s* (?P<src1>r[0-9]+)
        \s*,\s* (?P<src2>r[0-9]+)
        (?:\[\s*(?P<offset>-?[0-9]+)\s*\])?
        \s* (?:[\#;].*)?
        $"
    )
    .unwrap();
    static ref DATA: Regex = Regex::new(
        r"(?x)^
        \s* (?:(?P<label>[a-zA-Z]\w*):)?
        \s* DATA
        (?:\s+ (?P<value>0x[a-fA-F0-9]+|-?[0-9]+))?
        \s* (?:[\#;].*)?
        $"
    )
    .unwrap();
    static ref COMMENT: Regex = Regex::new(
        r"(?x)^
        \s* (?:(?P<label>[a-zA-Z]\w*):)?
        \s* (?:[\#;].*)?
        $"
    )
    .unwrap();
    static ref SYMBOLIC: Regex = Regex::new(
        r"(?x)^
        \s* (?:(?P<label>[a-zA-Z]\w*):)?
        \s* (?P<opcode>JUMP|LOAD|STORE)
        (?:/(?P<predicate>[a-zA-Z]+))?
        \s+ (?:(?P<target>r[0-9]+)\s*,\s*)?
        (?P<symbol>[a-zA-Z]\w*)
        \s* (?:[\#;].*)?
        $"
    )
    .unwrap();
}

/// Opcodes that may refer to a label instead of registers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymOp {
    Load,
    Store,
    Jump,
}

/// One classified source line.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AsmLine {
    pub label: Option<String>,
    pub kind: LineKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineKind {
    /// Blank, comment or label only. Takes no space in memory.
    Comment,
    /// All operands are registers, can be encoded directly.
    Full(Instruction),
    /// A raw data word.
    Data(Word),
    /// `LOAD`, `STORE` or `JUMP` referring to a label.
    Symbolic {
        op: SymOp,
        cond: CondFlag,
        target: Option<u8>,
        symbol: String,
    },
}

impl AsmLine {
    /// Whether the line is assigned an address.
    pub fn takes_space(&self) -> bool {
        self.kind != LineKind::Comment
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum LineError {
    #[error("line does not match any instruction form")]
    NoMatch,
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("data value `{0}` does not fit in a word")]
    DataRange(String),
    #[error("JUMP does not take a target register")]
    JumpTarget,
}

pub fn parse_line(line: &str) -> Result<AsmLine, LineError> {
    if let Some(caps) = FULL.captures(line) {
        let instr = Instruction::from_parts(
            &caps["opcode"],
            group(&caps, "predicate"),
            &caps["target"],
            &caps["src1"],
            &caps["src2"],
            group(&caps, "offset"),
        )?;
        return Ok(labeled(&caps, LineKind::Full(instr)));
    }
    if let Some(caps) = DATA.captures(line) {
        let value = match group(&caps, "value") {
            Some(text) => parse_data(text)?,
            None => 0,
        };
        return Ok(labeled(&caps, LineKind::Data(value)));
    }
    if let Some(caps) = COMMENT.captures(line) {
        return Ok(labeled(&caps, LineKind::Comment));
    }
    if let Some(caps) = SYMBOLIC.captures(line) {
        let op = match &caps["opcode"] {
            "LOAD" => SymOp::Load,
            "STORE" => SymOp::Store,
            _ => SymOp::Jump,
        };
        let cond = group(&caps, "predicate")
            .map(str::parse)
            .transpose()?
            .unwrap_or(CondFlag::ALWAYS);
        let target = group(&caps, "target").map(parse_register).transpose()?;
        if op == SymOp::Jump && target.is_some() {
            return Err(LineError::JumpTarget);
        }
        let kind = LineKind::Symbolic {
            op,
            cond,
            target,
            symbol: caps["symbol"].to_string(),
        };
        return Ok(labeled(&caps, kind));
    }
    Err(LineError::NoMatch)
}

fn group<'a>(caps: &Captures<'a>, name: &str) -> Option<&'a str> {
    caps.name(name).map(|m| m.as_str())
}

fn labeled(caps: &Captures, kind: LineKind) -> AsmLine {
    AsmLine {
        label: group(caps, "label").map(str::to_string),
        kind,
    }
}

/// Accepts hex, or decimal in either the signed or the unsigned range of a word.
fn parse_data(text: &str) -> Result<Word, LineError> {
    let value = match text.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse::<i64>().ok(),
    };
    match value {
        Some(val) if (i32::MIN as i64..=Word::MAX as i64).contains(&val) => Ok(val as Word),
        _ => Err(LineError::DataRange(text.to_string())),
    }
}
