/// Unit of memory and of instruction encoding.
pub type Word = u32;

// Encoding
pub mod bitfield;
pub mod instr;

// Machine
pub mod alu;
pub mod cpu;
pub mod memory;
pub mod register;
pub use cpu::{Cpu, RunError, StepEvent};

// Assembling
pub mod asm;
pub use asm::{assemble, Diagnostics};

pub mod env;
pub mod error;
pub mod output;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 2;
