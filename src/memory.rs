use std::collections::VecDeque;
use std::io::{self, stdin, stdout, BufRead, IsTerminal, Write};

use console::Term;
use thiserror::Error;

use crate::Word;

/// Number of words in main memory.
pub const MEMORY_SIZE: usize = 1024;
/// Loading from this address reads an integer from the console.
pub const IO_INPUT: i32 = 510;
/// Storing to this address writes an integer to the console.
pub const IO_OUTPUT: i32 = 511;

#[derive(Debug, Error)]
pub enum MemoryFault {
    #[error("address {0} is outside of memory (0 to {})", MEMORY_SIZE - 1)]
    OutOfRange(i32),
    #[error("console input `{0}` is not an integer")]
    BadInput(String),
    #[error("console input is closed")]
    InputClosed,
    #[error("console I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Anything the CPU can load words from and store words to.
pub trait Bus {
    fn get(&mut self, addr: i32) -> Result<Word, MemoryFault>;
    fn put(&mut self, addr: i32, val: Word) -> Result<(), MemoryFault>;
}

/// Plain storage, with no side effects.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Memory {
    cells: Box<[Word]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: vec![0; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    /// Memory with `program` placed at address 0.
    pub fn with_program(program: &[Word]) -> Result<Self, MemoryFault> {
        let mut mem = Memory::new();
        if program.len() > MEMORY_SIZE {
            return Err(MemoryFault::OutOfRange(program.len() as i32 - 1));
        }
        mem.cells[..program.len()].copy_from_slice(program);
        Ok(mem)
    }

    fn slot(&mut self, addr: i32) -> Result<&mut Word, MemoryFault> {
        usize::try_from(addr)
            .ok()
            .and_then(|idx| self.cells.get_mut(idx))
            .ok_or(MemoryFault::OutOfRange(addr))
    }

    pub fn cells(&self) -> &[Word] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for Memory {
    fn get(&mut self, addr: i32) -> Result<Word, MemoryFault> {
        self.slot(addr).map(|cell| *cell)
    }

    fn put(&mut self, addr: i32, val: Word) -> Result<(), MemoryFault> {
        *self.slot(addr)? = val;
        Ok(())
    }
}

/// Console side of memory-mapped I/O.
pub trait Console {
    fn read_word(&mut self) -> Result<i32, MemoryFault>;
    fn write_word(&mut self, val: i32) -> Result<(), MemoryFault>;
}

/// Memory where [`IO_INPUT`] and [`IO_OUTPUT`] talk to a console instead of storage.
pub struct MappedMemory<C> {
    mem: Memory,
    console: C,
}

impl<C: Console> MappedMemory<C> {
    pub fn new(mem: Memory, console: C) -> Self {
        MappedMemory { mem, console }
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn console(&self) -> &C {
        &self.console
    }
}

impl<C: Console> Bus for MappedMemory<C> {
    fn get(&mut self, addr: i32) -> Result<Word, MemoryFault> {
        match addr {
            IO_INPUT => self.console.read_word().map(|val| val as Word),
            _ => self.mem.get(addr),
        }
    }

    fn put(&mut self, addr: i32, val: Word) -> Result<(), MemoryFault> {
        match addr {
            IO_OUTPUT => self.console.write_word(val as i32),
            _ => self.mem.put(addr, val),
        }
    }
}

/// Prompts on the terminal, one integer per line.
#[derive(Default)]
pub struct TermConsole;

const PROMPT: &str = "Quack!: ";

impl Console for TermConsole {
    fn read_word(&mut self) -> Result<i32, MemoryFault> {
        print!("{PROMPT}");
        stdout().flush()?;
        let line = read_input()?;
        let line = line.trim();
        line.parse()
            .map_err(|_| MemoryFault::BadInput(line.to_string()))
    }

    fn write_word(&mut self, val: i32) -> Result<(), MemoryFault> {
        println!("{PROMPT}{val}");
        Ok(())
    }
}

/// Read one line from the terminal, or from stdin when it is not a terminal.
pub fn read_input() -> Result<String, MemoryFault> {
    if stdin().is_terminal() {
        Ok(Term::stdout().read_line()?)
    } else {
        let mut line = String::new();
        if stdin().lock().read_line(&mut line)? == 0 {
            return Err(MemoryFault::InputClosed);
        }
        Ok(line)
    }
}

/// In-memory console fed from a queue, recording everything written.
#[derive(Clone, Default, Debug)]
pub struct BufferConsole {
    pub input: VecDeque<i32>,
    pub output: Vec<i32>,
}

impl BufferConsole {
    pub fn new(input: impl IntoIterator<Item = i32>) -> Self {
        BufferConsole {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }
}

impl Console for BufferConsole {
    fn read_word(&mut self) -> Result<i32, MemoryFault> {
        self.input.pop_front().ok_or(MemoryFault::InputClosed)
    }

    fn write_word(&mut self, val: i32) -> Result<(), MemoryFault> {
        self.output.push(val);
        Ok(())
    }
}
