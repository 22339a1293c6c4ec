use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use duck::env::Config;
use duck::memory::{read_input, MappedMemory, Memory, TermConsole};
use duck::output::Tracer;
use duck::{asm, error, Cpu, Diagnostics};

/// Exit status when assembly is abandoned after too many errors.
const EXIT_TOO_MANY_ERRORS: u8 = 2;

/// Duck is an assembler and simulator for the Duck Machine, a small 32-bit teaching architecture.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve labels and write fully specified object code
    Assemble {
        /// Assembly source, standard input if omitted
        sourcefile: Option<PathBuf>,
        /// Destination for object code, standard output if omitted
        objfile: Option<PathBuf>,
        /// Abandon assembly once more than this many errors are found
        #[arg(short, long)]
        error_limit: Option<usize>,
    },
    /// Run a `.asm` source file, or object code in any other file, until it halts
    Run {
        /// File to run
        name: PathBuf,
        /// Print every instruction as it executes, and the registers at the end
        #[arg(short, long)]
        trace: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Address to start execution at
        #[arg(short, long, default_value_t = 0)]
        from: i32,
        /// Pause before every instruction until enter is pressed
        #[arg(short, long)]
        step: bool,
        /// Abandon assembly once more than this many errors are found
        #[arg(short, long)]
        error_limit: Option<usize>,
    },
    /// Check a `.asm` file without running or outputting object code
    Check {
        /// File to check
        name: PathBuf,
        /// Abandon assembly once more than this many errors are found
        #[arg(short, long)]
        error_limit: Option<usize>,
    },
    /// Place a watch on a `.asm` file to receive constant assembler updates
    Watch {
        /// `.asm` file to watch
        name: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    use MsgColor::*;
    let args = Args::parse();
    let config = Config::from_env();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(duck::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, config, RunOptions::default());
        }
        println!("\n~ duck v{VERSION} ~");
        println!("{}", LOGO.yellow().bold());
        println!("{SHORT_INFO}");
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Command::Assemble {
            sourcefile,
            objfile,
            error_limit,
        } => {
            let config = config.with_error_limit(error_limit);
            let (name, src) = match &sourcefile {
                Some(path) => {
                    file_message(Green, "Assembling", path);
                    (
                        path.display().to_string(),
                        fs::read_to_string(path).into_diagnostic()?,
                    )
                }
                None => {
                    let mut src = String::new();
                    io::stdin().read_to_string(&mut src).into_diagnostic()?;
                    ("<stdin>".to_string(), src)
                }
            };
            let lines = match assemble(&name, &src, config.error_limit) {
                Outcome::Assembled(lines) => lines,
                // Errors within the limit are reported without failing
                Outcome::Failed => return Ok(ExitCode::SUCCESS),
                Outcome::TooMany => return Ok(ExitCode::from(EXIT_TOO_MANY_ERRORS)),
            };

            let mut object = lines.join("\n");
            object.push('\n');
            match objfile {
                Some(dest) => {
                    fs::write(&dest, object).into_diagnostic()?;
                    message(Green, "Finished", "object code");
                    file_message(Green, "Saved", &dest);
                }
                None => print!("{object}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            name,
            trace,
            minimal,
            from,
            step,
            error_limit,
        } => {
            let config = config.with_error_limit(error_limit).with_trace(trace);
            let opts = RunOptions {
                from,
                minimal,
                step,
            };
            run(&name, config, opts)
        }
        Command::Check { name, error_limit } => {
            let config = config.with_error_limit(error_limit);
            file_message(Green, "Checking", &name);
            let src = fs::read_to_string(&name).into_diagnostic()?;
            match assemble(&name.display().to_string(), &src, config.error_limit) {
                Outcome::Assembled(_) => {
                    message(Green, "Success", "no errors found!");
                    Ok(ExitCode::SUCCESS)
                }
                Outcome::Failed => Ok(ExitCode::FAILURE),
                Outcome::TooMany => Ok(ExitCode::from(EXIT_TOO_MANY_ERRORS)),
            }
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        sleep(Duration::from_millis(50));

                        let src = match fs::read_to_string(&name) {
                            Ok(src) => src,
                            Err(e) => {
                                eprintln!("{e}. Exiting...");
                                return Flow::Exit;
                            }
                        };
                        // Re-read so a changed limit applies without restarting
                        let limit = Config::from_env().error_limit;
                        if let Outcome::Assembled(_) =
                            assemble(&name.display().to_string(), &src, limit)
                        {
                            message(Green, "Success", "no errors found!");
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(ExitCode::SUCCESS)
        }
    }
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

// Status goes to stderr, stdout carries object code and program output
fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

enum Outcome {
    Assembled(Vec<String>),
    /// Errors were reported, within the limit.
    Failed,
    TooMany,
}

/// Run both assembler passes, printing every error found.
fn assemble(name: &str, src: &str, error_limit: usize) -> Outcome {
    let mut diag = Diagnostics::new(error_limit);
    let res = asm::assemble(src, &mut diag);
    for err in diag.errors() {
        eprintln!("{:?}", error::asm_error(err, name, src));
    }
    match res {
        Ok(Some(lines)) => Outcome::Assembled(lines),
        Ok(None) => {
            message(
                MsgColor::Red,
                "Failed",
                &format!("{} error(s), no object code written", diag.count()),
            );
            Outcome::Failed
        }
        Err(too_many) => {
            eprintln!("{:?}", error::asm_too_many(too_many));
            Outcome::TooMany
        }
    }
}

#[derive(Default)]
struct RunOptions {
    from: i32,
    minimal: bool,
    /// Wait for a line of input before each instruction.
    step: bool,
}

fn run(name: &Path, config: Config, opts: RunOptions) -> Result<ExitCode> {
    file_message(MsgColor::Green, "Loading", name);
    let src = fs::read_to_string(name).into_diagnostic()?;
    let display_name = name.display().to_string();

    let object = if name.extension().is_some_and(|ext| ext == "asm") {
        match assemble(&display_name, &src, config.error_limit) {
            Outcome::Assembled(lines) => lines,
            Outcome::Failed => return Ok(ExitCode::FAILURE),
            Outcome::TooMany => return Ok(ExitCode::from(EXIT_TOO_MANY_ERRORS)),
        }
    } else {
        src.lines().map(str::to_string).collect()
    };
    let words = match asm::load(&object) {
        Ok(words) => words,
        // Object text from the assembler always loads, so this is a hand-written object file
        Err(e) => return Err(error::object_error(&e, &display_name, &src)),
    };

    let memory = Memory::with_program(&words).into_diagnostic()?;
    let mut cpu = Cpu::new(MappedMemory::new(memory, TermConsole));
    let mut tracer = Tracer::new(io::stderr(), opts.minimal);
    let mut tracing = config.trace;
    let mut stepping = opts.step;
    let mut count: u64 = 0;

    message(MsgColor::Green, "Running", "loaded program");
    let res = cpu.run(opts.from, |event| {
        if stepping {
            eprint!("Step {count}; press enter");
            if let Err(e) = read_input() {
                eprintln!();
                message(MsgColor::Red, "Stepping", &format!("stopped: {e}"));
                stepping = false;
            }
        }
        count += 1;
        if tracing {
            if let Err(e) = tracer.step(event) {
                message(MsgColor::Red, "Tracing", &format!("stopped: {e}"));
                tracing = false;
            }
        }
    });
    if tracing {
        tracer
            .registers(cpu.registers(), cpu.condition())
            .into_diagnostic()?;
    }

    match res {
        Ok(steps) => {
            message(MsgColor::Cyan, "Halted", &format!("after {steps} steps"));
            file_message(MsgColor::Green, "Completed", name);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(error::run_error(&e)),
    }
}

const LOGO: &str = r#"
       __
   ___( o)>
   \ <_. )
    `---'   "#;

const SHORT_INFO: &str = r"
Welcome to duck, the Duck Machine assembler and simulator.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
