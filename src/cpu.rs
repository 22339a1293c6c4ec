use thiserror::Error;

use crate::alu::{self, AluError};
use crate::instr::{decode, CondFlag, DecodeError, Instruction, OpCode};
use crate::memory::{Bus, MemoryFault};
use crate::register::RegisterFile;
use crate::Word;

/// Fatal condition raised while executing a program. The CPU is halted when one is returned.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("at address {pc}: {source}")]
    Decode {
        pc: i32,
        #[source]
        source: DecodeError,
    },
    #[error("at address {pc}: {source}")]
    Alu {
        pc: i32,
        #[source]
        source: AluError,
    },
    #[error("at address {pc}: {source}")]
    Memory {
        pc: i32,
        #[source]
        source: MemoryFault,
    },
}

impl RunError {
    /// Address of the instruction that failed.
    pub fn pc(&self) -> i32 {
        match self {
            RunError::Decode { pc, .. } | RunError::Alu { pc, .. } | RunError::Memory { pc, .. } => {
                *pc
            }
        }
    }
}

/// Emitted after an instruction is decoded and before it takes effect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StepEvent {
    pub pc: i32,
    pub word: Word,
    pub instr: Instruction,
    /// Whether the predicate allows the instruction to execute.
    pub executes: bool,
}

/// Duck Machine processor. Owns its register file and the bus it is connected to.
pub struct Cpu<B> {
    regs: RegisterFile,
    condition: CondFlag,
    halted: bool,
    bus: B,
}

impl<B: Bus> Cpu<B> {
    pub fn new(bus: B) -> Self {
        Cpu {
            regs: RegisterFile::new(),
            condition: CondFlag::ALWAYS,
            halted: false,
            bus,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn condition(&self) -> CondFlag {
        self.condition
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Result<(), RunError> {
        self.step_observed(&mut |_| ())
    }

    /// Execute a single instruction, reporting it to `observer` before it takes effect.
    pub fn step_observed<F>(&mut self, observer: &mut F) -> Result<(), RunError>
    where
        F: FnMut(&StepEvent),
    {
        let res = self.cycle(observer);
        if res.is_err() {
            self.halted = true;
        }
        res
    }

    fn cycle<F>(&mut self, observer: &mut F) -> Result<(), RunError>
    where
        F: FnMut(&StepEvent),
    {
        let pc = self.regs.pc();
        let word = self
            .bus
            .get(pc)
            .map_err(|source| RunError::Memory { pc, source })?;
        let instr = decode(word).map_err(|source| RunError::Decode { pc, source })?;
        let executes = instr.cond.intersects(self.condition);
        observer(&StepEvent {
            pc,
            word,
            instr,
            executes,
        });

        if !executes {
            self.regs.step_pc();
            return Ok(());
        }

        // Operands are formed first, so r15 reads as the address of this instruction
        let left = self.regs.get(instr.src1);
        let right = self.regs.get(instr.src2) as i64 + instr.offset as i64;
        // PC moves before the result is stored; a write to r15 then replaces it
        self.regs.step_pc();

        let (result, condition) =
            alu::execute(instr.op, left, right).map_err(|source| RunError::Alu { pc, source })?;
        self.condition = condition;

        match instr.op {
            OpCode::Load => {
                let val = self
                    .bus
                    .get(result)
                    .map_err(|source| RunError::Memory { pc, source })?;
                self.regs.put(instr.target, val as i32);
            }
            OpCode::Store => {
                let val = self.regs.get(instr.target);
                self.bus
                    .put(result, val as Word)
                    .map_err(|source| RunError::Memory { pc, source })?;
            }
            OpCode::Halt => self.halted = true,
            _ => self.regs.put(instr.target, result),
        }
        Ok(())
    }

    /// Run from `from_addr` until a `HALT` instruction. Returns the number of steps taken.
    ///
    /// There is no step limit; a program that never halts runs forever.
    pub fn run<F>(&mut self, from_addr: i32, mut observer: F) -> Result<u64, RunError>
    where
        F: FnMut(&StepEvent),
    {
        self.halted = false;
        self.regs.set_pc(from_addr);
        let mut steps = 0;
        while !self.halted {
            self.step_observed(&mut observer)?;
            steps += 1;
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instr::encode;
    use crate::memory::{BufferConsole, MappedMemory, Memory, IO_INPUT, IO_OUTPUT};

    fn cpu_with(program: &[Instruction]) -> Cpu<Memory> {
        let words: Vec<Word> = program.iter().map(encode).collect();
        Cpu::new(Memory::with_program(&words).unwrap())
    }

    fn halt() -> Instruction {
        Instruction::new(OpCode::Halt, 0, 0, 0, 0)
    }

    #[test]
    fn add_then_halt() {
        let mut cpu = cpu_with(&[Instruction::new(OpCode::Add, 1, 0, 0, 0), halt()]);
        let mut events = Vec::new();
        let steps = cpu.run(0, |event| events.push(*event)).unwrap();

        assert_eq!(steps, 2);
        assert!(cpu.is_halted());
        assert_eq!(cpu.registers().get(1), 0);
        assert_eq!(cpu.registers().pc(), 2);
        assert_eq!(events.iter().map(|e| e.pc).collect::<Vec<_>>(), vec![0, 1]);
        assert!(events.iter().all(|e| e.executes));
    }

    #[test]
    fn jump_is_not_overwritten() {
        // start: ADD r1,r0,r0[1]
        //        ADD r15,r0,r15[2]  ; JUMP skip
        //        ADD r1,r1,r1
        // skip:  HALT r0,r0,r0
        let mut cpu = cpu_with(&[
            Instruction::new(OpCode::Add, 1, 0, 0, 1),
            Instruction::new(OpCode::Add, 15, 0, 15, 2),
            Instruction::new(OpCode::Add, 1, 1, 1, 0),
            halt(),
        ]);
        let mut visited = Vec::new();
        let steps = cpu.run(0, |event| visited.push(event.pc)).unwrap();

        assert_eq!(visited, vec![0, 1, 3]);
        assert_eq!(steps, 3);
        assert_eq!(cpu.registers().get(1), 1);
    }

    #[test]
    fn predicate_skips_instruction() {
        // r1 = 5; SUB r0,r1,r0[5] sets Z; ADD/M is skipped, ADD/Z executes
        let mut cpu = cpu_with(&[
            Instruction::new(OpCode::Add, 1, 0, 0, 5),
            Instruction::new(OpCode::Sub, 0, 1, 0, 5),
            Instruction::new(OpCode::Add, 2, 0, 0, 7).with_cond(CondFlag::M),
            Instruction::new(OpCode::Add, 3, 0, 0, 9).with_cond(CondFlag::Z),
            halt(),
        ]);
        let mut skipped = Vec::new();
        cpu.run(0, |event| {
            if !event.executes {
                skipped.push(event.pc)
            }
        })
        .unwrap();

        assert_eq!(skipped, vec![2]);
        assert_eq!(cpu.registers().get(2), 0);
        assert_eq!(cpu.registers().get(3), 9);
    }

    #[test]
    fn skipped_instruction_keeps_flags() {
        let mut cpu = cpu_with(&[
            Instruction::new(OpCode::Sub, 1, 0, 0, 1),
            Instruction::new(OpCode::Add, 2, 0, 0, 1).with_cond(CondFlag::P),
        ]);
        cpu.step().unwrap();
        assert_eq!(cpu.condition(), CondFlag::M);
        cpu.step().unwrap();
        assert_eq!(cpu.condition(), CondFlag::M);
        assert_eq!(cpu.registers().pc(), 2);
        assert_eq!(cpu.registers().get(2), 0);
    }

    #[test]
    fn load_and_store_relative_to_pc() {
        // 0: LOAD r1,r0,r15[3]
        // 1: STORE r1,r0,r15[3]
        // 2: HALT
        // 3: DATA 77
        // 4: DATA 0
        let mut words: Vec<Word> = [
            Instruction::new(OpCode::Load, 1, 0, 15, 3),
            Instruction::new(OpCode::Store, 1, 0, 15, 3),
            halt(),
        ]
        .iter()
        .map(encode)
        .collect();
        words.extend([77, 0]);
        let mut cpu = Cpu::new(Memory::with_program(&words).unwrap());
        cpu.run(0, |_| ()).unwrap();

        assert_eq!(cpu.registers().get(1), 77);
        assert_eq!(cpu.bus().cells()[4], 77);
    }

    #[test]
    fn memory_mapped_io() {
        // LOAD r1,r0,r0[510]; ADD r1,r1,r1; STORE r1,r0,r0[511]; HALT
        let program: Vec<Word> = [
            Instruction::new(OpCode::Load, 1, 0, 0, IO_INPUT),
            Instruction::new(OpCode::Add, 1, 1, 1, 0),
            Instruction::new(OpCode::Store, 1, 0, 0, IO_OUTPUT),
            halt(),
        ]
        .iter()
        .map(encode)
        .collect();
        let bus = MappedMemory::new(
            Memory::with_program(&program).unwrap(),
            BufferConsole::new([21]),
        );
        let mut cpu = Cpu::new(bus);
        cpu.run(0, |_| ()).unwrap();

        let bus = cpu.into_bus();
        assert_eq!(bus.console().output, vec![42]);
        assert_eq!(bus.memory().cells()[IO_INPUT as usize], 0);
        assert_eq!(bus.memory().cells()[IO_OUTPUT as usize], 0);
    }

    #[test]
    fn operand_past_word_range_flags_result() {
        // ADD r1,r2,r3[1] then SUB r0,r2,r3[1] with r3 = i32::MAX
        let mut cpu = cpu_with(&[
            Instruction::new(OpCode::Add, 1, 2, 3, 1),
            Instruction::new(OpCode::Sub, 0, 2, 3, 1),
        ]);
        cpu.registers_mut().put(3, i32::MAX);

        cpu.step().unwrap();
        assert_eq!(cpu.condition(), CondFlag::V);
        assert_eq!(cpu.registers().get(1), i32::MIN);
        cpu.step().unwrap();
        assert_eq!(cpu.condition(), CondFlag::M);
    }

    #[test]
    fn run_again_after_halt() {
        let mut cpu = cpu_with(&[
            Instruction::new(OpCode::Add, 1, 1, 0, 1),
            Instruction::new(OpCode::Add, 2, 0, 0, 0),
            halt(),
        ]);
        assert_eq!(cpu.run(0, |_| ()).unwrap(), 3);
        assert!(cpu.is_halted());

        assert_eq!(cpu.run(0, |_| ()).unwrap(), 3);
        assert!(cpu.is_halted());
        assert_eq!(cpu.registers().get(1), 2);
    }

    #[test]
    fn division_by_zero_halts() {
        let mut cpu = cpu_with(&[Instruction::new(OpCode::Div, 1, 1, 0, 0), halt()]);
        let err = cpu.run(0, |_| ()).unwrap_err();
        assert!(matches!(
            err,
            RunError::Alu {
                pc: 0,
                source: AluError::DivisionByZero
            }
        ));
        assert!(cpu.is_halted());
        assert_eq!(err.pc(), 0);
    }

    #[test]
    fn corrupt_word_halts() {
        let mut cpu = Cpu::new(Memory::with_program(&[0xffff_ffff]).unwrap());
        let err = cpu.run(0, |_| ()).unwrap_err();
        assert!(matches!(err, RunError::Decode { pc: 0, .. }));
        assert!(cpu.is_halted());
    }

    #[test]
    fn running_off_memory() {
        let mut cpu = Cpu::new(Memory::new());
        cpu.registers_mut().set_pc(1024);
        assert!(matches!(
            cpu.step(),
            Err(RunError::Memory {
                pc: 1024,
                source: MemoryFault::OutOfRange(1024)
            })
        ));
    }
}
