//! Instruction word layout and the conversions between packed words, decoded records and the
//! textual form of fully specified instructions.
//!
//! ```text
//!  31      27 26    23 22    19 18    15 14    11 10            0
//! +----------+--------+--------+--------+--------+---------------+
//! |  opcode  |  pred  | target |  src1  |  src2  |    offset     |
//! +----------+--------+--------+--------+--------+---------------+
//! ```
//!
//! The fields cover the whole word, so every word with a valid opcode re-encodes to itself.
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::bitfield::BitField;
use crate::Word;

pub const OPCODE_FIELD: BitField = BitField::new(27, 31);
pub const PREDICATE_FIELD: BitField = BitField::new(23, 26);
pub const TARGET_FIELD: BitField = BitField::new(19, 22);
pub const SRC1_FIELD: BitField = BitField::new(15, 18);
pub const SRC2_FIELD: BitField = BitField::new(11, 14);
pub const OFFSET_FIELD: BitField = BitField::new(0, 10);

/// Number of addressable registers.
pub const REGISTER_COUNT: usize = 16;

lazy_static! {
    static ref TEXT_FORM: Regex = Regex::new(
        r"(?x)^
        \s* (?P<opcode>[a-zA-Z]+)
        (?:/(?P<predicate>[a-zA-Z]+))?
        \s+ (?P<target>r[0-9]+)
        \s*,\s* (?P<src1>r[0-9]+)
        \s*,\s* (?P<src2>r[0-9]+)
        (?:\[\s*(?P<offset>-?[0-9]+)\s*\])?
        \s*$"
    )
    .unwrap();
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OpCode {
    Halt = 0,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

impl OpCode {
    pub const ALL: [OpCode; 10] = [
        OpCode::Halt,
        OpCode::Load,
        OpCode::Store,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::And,
        OpCode::Or,
        OpCode::Xor,
    ];

    pub fn from_bits(bits: Word) -> Option<OpCode> {
        Self::ALL.get(bits as usize).copied()
    }

    pub fn bits(self) -> Word {
        self as Word
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Halt => "HALT",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Xor => "XOR",
        }
    }
}

impl FromStr for OpCode {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic() == s)
            .ok_or_else(|| FieldError::UnknownOpcode(s.to_string()))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Condition code bits. Used both for the CPU's current condition and for instruction
/// predicates, which execute only if they share a bit with the current condition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct CondFlag(u8);

impl CondFlag {
    pub const NEVER: CondFlag = CondFlag(0);
    /// Minus
    pub const M: CondFlag = CondFlag(0b0001);
    /// Zero
    pub const Z: CondFlag = CondFlag(0b0010);
    /// Positive
    pub const P: CondFlag = CondFlag(0b0100);
    /// Overflow
    pub const V: CondFlag = CondFlag(0b1000);
    pub const ALWAYS: CondFlag = CondFlag(0b1111);

    const LETTERS: [(char, CondFlag); 4] = [
        ('M', CondFlag::M),
        ('Z', CondFlag::Z),
        ('P', CondFlag::P),
        ('V', CondFlag::V),
    ];

    /// Keeps only the low four bits.
    pub fn from_bits(bits: Word) -> CondFlag {
        CondFlag((bits & 0b1111) as u8)
    }

    pub fn bits(self) -> Word {
        self.0 as Word
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any bit of `other` is set in `self`.
    pub fn intersects(self, other: CondFlag) -> bool {
        !(self & other).is_empty()
    }
}

impl BitAnd for CondFlag {
    type Output = CondFlag;

    fn bitand(self, rhs: Self) -> Self::Output {
        CondFlag(self.0 & rhs.0)
    }
}

impl BitOr for CondFlag {
    type Output = CondFlag;

    fn bitor(self, rhs: Self) -> Self::Output {
        CondFlag(self.0 | rhs.0)
    }
}

impl FromStr for CondFlag {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALWAYS" => return Ok(CondFlag::ALWAYS),
            "NEVER" => return Ok(CondFlag::NEVER),
            "" => return Err(FieldError::BadPredicate(s.to_string())),
            _ => (),
        }
        let mut flag = CondFlag::NEVER;
        for ch in s.chars() {
            let bit = Self::LETTERS
                .iter()
                .find(|(letter, _)| *letter == ch)
                .map(|(_, bit)| *bit)
                .ok_or_else(|| FieldError::BadPredicate(s.to_string()))?;
            if flag.intersects(bit) {
                return Err(FieldError::BadPredicate(s.to_string()));
            }
            flag = flag | bit;
        }
        Ok(flag)
    }
}

impl fmt::Display for CondFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CondFlag::ALWAYS => f.pad("ALWAYS"),
            CondFlag::NEVER => f.pad("NEVER"),
            flag => {
                let letters: String = Self::LETTERS
                    .iter()
                    .filter(|(_, bit)| flag.intersects(*bit))
                    .map(|(letter, _)| letter)
                    .collect();
                f.pad(&letters)
            }
        }
    }
}

/// Decoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub op: OpCode,
    pub cond: CondFlag,
    pub target: u8,
    pub src1: u8,
    pub src2: u8,
    pub offset: i32,
}

impl Instruction {
    pub fn new(op: OpCode, target: u8, src1: u8, src2: u8, offset: i32) -> Self {
        Instruction {
            op,
            cond: CondFlag::ALWAYS,
            target,
            src1,
            src2,
            offset,
        }
    }

    pub fn with_cond(self, cond: CondFlag) -> Self {
        Instruction { cond, ..self }
    }

    /// Build an instruction out of the textual parts of a fully specified source line.
    pub fn from_parts(
        op: &str,
        cond: Option<&str>,
        target: &str,
        src1: &str,
        src2: &str,
        offset: Option<&str>,
    ) -> Result<Self, FieldError> {
        let op = op.parse()?;
        let cond = cond.map(str::parse).transpose()?.unwrap_or(CondFlag::ALWAYS);
        let offset = match offset {
            Some(text) => parse_offset(text)?,
            None => 0,
        };
        Ok(Instruction {
            op,
            cond,
            target: parse_register(target)?,
            src1: parse_register(src1)?,
            src2: parse_register(src2)?,
            offset,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if self.cond != CondFlag::ALWAYS {
            write!(f, "/{}", self.cond)?;
        }
        write!(f, " r{},r{},r{}", self.target, self.src1, self.src2)?;
        if self.offset != 0 {
            write!(f, "[{}]", self.offset)?;
        }
        Ok(())
    }
}

/// Parses the form written by `Display`, like `SUB/ZP r1,r2,r15[-12]`. Labels and comments
/// belong to source lines and are not accepted here.
impl FromStr for Instruction {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TEXT_FORM
            .captures(s)
            .ok_or_else(|| FieldError::Malformed(s.to_string()))?;
        Instruction::from_parts(
            &caps["opcode"],
            caps.name("predicate").map(|m| m.as_str()),
            &caps["target"],
            &caps["src1"],
            &caps["src2"],
            caps.name("offset").map(|m| m.as_str()),
        )
    }
}

/// Parse a register name like `r12`.
pub fn parse_register(text: &str) -> Result<u8, FieldError> {
    text.strip_prefix('r')
        .and_then(|num| num.parse::<u8>().ok())
        .filter(|&num| (num as usize) < REGISTER_COUNT)
        .ok_or_else(|| FieldError::BadRegister(text.to_string()))
}

/// Parse a decimal offset and check that it fits the offset field.
pub fn parse_offset(text: &str) -> Result<i32, FieldError> {
    let value: i64 = text
        .parse()
        .map_err(|_| FieldError::BadOffset(text.to_string()))?;
    check_offset(value)
}

pub fn check_offset(value: i64) -> Result<i32, FieldError> {
    let range = OFFSET_FIELD.min_signed() as i64..=OFFSET_FIELD.max_signed() as i64;
    if range.contains(&value) {
        Ok(value as i32)
    } else {
        Err(FieldError::OffsetRange(value))
    }
}

/// Problems with one textual component of an instruction.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum FieldError {
    #[error("`{0}` is not of the form `OP[/PRED] rT,rS1,rS2[offset]`")]
    Malformed(String),
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("invalid predicate `{0}`")]
    BadPredicate(String),
    #[error("invalid register `{0}`, expected r0 to r15")]
    BadRegister(String),
    #[error("invalid offset `{0}`")]
    BadOffset(String),
    #[error(
        "offset {0} does not fit in {} bits (range {} to {})",
        OFFSET_FIELD.width(),
        OFFSET_FIELD.min_signed(),
        OFFSET_FIELD.max_signed()
    )]
    OffsetRange(i64),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode} in instruction word {word:#010x}")]
    UnknownOpcode { word: Word, opcode: Word },
}

pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let opcode = OPCODE_FIELD.extract(word);
    let op = OpCode::from_bits(opcode).ok_or(DecodeError::UnknownOpcode { word, opcode })?;
    Ok(Instruction {
        op,
        cond: CondFlag::from_bits(PREDICATE_FIELD.extract(word)),
        target: TARGET_FIELD.extract(word) as u8,
        src1: SRC1_FIELD.extract(word) as u8,
        src2: SRC2_FIELD.extract(word) as u8,
        offset: OFFSET_FIELD.extract_signed(word),
    })
}

pub fn encode(instr: &Instruction) -> Word {
    let mut word = 0;
    word = OPCODE_FIELD.insert(instr.op.bits(), word);
    word = PREDICATE_FIELD.insert(instr.cond.bits(), word);
    word = TARGET_FIELD.insert(instr.target as Word, word);
    word = SRC1_FIELD.insert(instr.src1 as Word, word);
    word = SRC2_FIELD.insert(instr.src2 as Word, word);
    OFFSET_FIELD.insert_signed(instr.offset, word)
}
