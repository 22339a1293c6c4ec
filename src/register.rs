use std::ops::{Index, IndexMut};

use crate::instr::REGISTER_COUNT;

/// Index of the program counter.
pub const PC: u8 = 15;

/// A single register. `Zero` is wired to the constant 0 and drops every write.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Register {
    Zero,
    General(i32),
}

impl Register {
    pub fn get(&self) -> i32 {
        match self {
            Register::Zero => 0,
            Register::General(val) => *val,
        }
    }

    pub fn put(&mut self, val: i32) {
        match self {
            Register::Zero => (),
            Register::General(slot) => *slot = val,
        }
    }
}

/// The 16 registers of the machine. `r0` reads as zero, `r15` is the program counter.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegisterFile([Register; REGISTER_COUNT]);

impl RegisterFile {
    pub fn new() -> Self {
        let mut regs = [Register::General(0); REGISTER_COUNT];
        regs[0] = Register::Zero;
        RegisterFile(regs)
    }

    pub fn get(&self, reg: u8) -> i32 {
        self[reg].get()
    }

    pub fn put(&mut self, reg: u8, val: i32) {
        self[reg].put(val)
    }

    pub fn pc(&self) -> i32 {
        self.get(PC)
    }

    pub fn set_pc(&mut self, val: i32) {
        self.put(PC, val)
    }

    /// Move the program counter one word forward.
    pub fn step_pc(&mut self) {
        self.set_pc(self.pc().wrapping_add(1))
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().map(Register::get)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

// Register numbers come from 4-bit fields, so indexing cannot go out of range for decoded
// instructions.
impl Index<u8> for RegisterFile {
    type Output = Register;

    fn index(&self, index: u8) -> &Self::Output {
        &self.0[index as usize]
    }
}

impl IndexMut<u8> for RegisterFile {
    fn index_mut(&mut self, index: u8) -> &mut Self::Output {
        &mut self.0[index as usize]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_register_ignores_writes() {
        let mut regs = RegisterFile::new();
        regs.put(0, 42);
        assert_eq!(regs.get(0), 0);
        assert_eq!(regs[0], Register::Zero);
    }

    #[test]
    fn general_registers_hold_values() {
        let mut regs = RegisterFile::new();
        for reg in 1..16 {
            regs.put(reg, -(reg as i32));
        }
        let values: Vec<_> = regs.iter().collect();
        assert_eq!(values[0], 0);
        assert_eq!(values[7], -7);
        assert_eq!(regs.pc(), -15);
    }

    #[test]
    fn program_counter() {
        let mut regs = RegisterFile::new();
        regs.set_pc(41);
        regs.step_pc();
        assert_eq!(regs.get(PC), 42);
    }
}
