use std::io::{self, Write};
use std::str::Chars;

use colored::Colorize;

use crate::cpu::StepEvent;
use crate::instr::CondFlag;
use crate::register::RegisterFile;

/// Renders CPU activity for `run --trace` and the final register dump.
///
/// Writes to any sink, so program console output on stdout stays separate.
pub struct Tracer<W> {
    out: W,
    /// Plain text without color or box drawing, suited for blackbox tests.
    minimal: bool,
}

impl<W: Write> Tracer<W> {
    pub fn new(out: W, minimal: bool) -> Self {
        Tracer { out, minimal }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_str(&mut self, string: &str) -> io::Result<()> {
        if self.minimal {
            let plain: String = Decolored::new(string).collect();
            self.out.write_all(plain.as_bytes())
        } else {
            self.out.write_all(string.as_bytes())
        }
    }

    pub fn step(&mut self, event: &StepEvent) -> io::Result<()> {
        let instr = event.instr.to_string();
        let instr = if event.executes {
            instr.normal()
        } else {
            instr.dimmed().strikethrough()
        };
        let skipped = if event.executes { "" } else { " (skipped)" };
        let line = format!(
            "{:>5} {} {instr}{skipped}\n",
            event.pc.to_string().cyan(),
            format!("{:08x}", event.word).dimmed(),
        );
        self.print_str(&line)
    }

    pub fn registers(&mut self, regs: &RegisterFile, cond: CondFlag) -> io::Result<()> {
        if self.minimal {
            for (i, val) in regs.iter().enumerate() {
                self.print_str(&format!("r{i} {val}\n"))?;
            }
            return self.print_str(&format!("CC {cond}\n"));
        }

        self.print_str("\x1b[2m┌──────────────────────────────┐\x1b[0m\n")?;
        self.print_str("\x1b[2m│       \x1b[3mhex          int\x1b[0m\x1b[2m        │\x1b[0m\n")?;
        for (i, val) in regs.iter().enumerate() {
            let name = format!("r{i}");
            self.print_str(&format!(
                "\x1b[2m│\x1b[0m \x1b[1m{name:<4}\x1b[0m 0x{:08x} {val:>12} \x1b[2m│\x1b[0m\n",
                val as u32
            ))?;
        }
        self.print_str(&format!(
            "\x1b[2m│\x1b[0m \x1b[1mCC\x1b[0m   {cond:<24}\x1b[2m│\x1b[0m\n"
        ))?;
        self.print_str("\x1b[2m└──────────────────────────────┘\x1b[0m\n")
    }
}

/// Iterator over the characters of a string with ANSI escape sequences removed.
struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{Instruction, OpCode};

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("abc\x1b[0;2mdef\x1b[0m").collect::<String>(),
            "abcdef"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
    }

    #[test]
    fn minimal_step_lines() {
        let mut tracer = Tracer::new(Vec::new(), true);
        let instr = Instruction::new(OpCode::Add, 15, 0, 15, 2);
        tracer
            .step(&StepEvent {
                pc: 1,
                word: crate::instr::encode(&instr),
                instr,
                executes: true,
            })
            .unwrap();
        tracer
            .step(&StepEvent {
                pc: 2,
                word: 0,
                instr: Instruction::new(OpCode::Halt, 0, 0, 0, 0).with_cond(CondFlag::NEVER),
                executes: false,
            })
            .unwrap();
        let text = String::from_utf8(tracer.into_inner()).unwrap();
        assert_eq!(
            text,
            "    1 1ff87802 ADD r15,r0,r15[2]\n    2 00000000 HALT/NEVER r0,r0,r0 (skipped)\n"
        );
    }

    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_are_returned() {
        let instr = Instruction::new(OpCode::Halt, 0, 0, 0, 0);
        let event = StepEvent {
            pc: 0,
            word: 0,
            instr,
            executes: true,
        };
        for minimal in [true, false] {
            let mut tracer = Tracer::new(ClosedSink, minimal);
            let err = tracer.step(&event).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
            assert!(tracer
                .registers(&RegisterFile::new(), CondFlag::Z)
                .is_err());
        }
    }

    #[test]
    fn minimal_registers() {
        let mut regs = RegisterFile::new();
        regs.put(3, -7);
        let mut tracer = Tracer::new(Vec::new(), true);
        tracer.registers(&regs, CondFlag::M).unwrap();
        let text = String::from_utf8(tracer.into_inner()).unwrap();
        assert!(text.starts_with("r0 0\nr1 0\nr2 0\nr3 -7\n"));
        assert!(text.ends_with("r15 0\nCC M\n"));
    }
}
