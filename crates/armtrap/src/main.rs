#![cfg_attr(not(all(target_os = "macos", target_arch = "aarch64")), allow(dead_code))]

use std::process::ExitCode;

use armtrap_core::platform::{is_privileged, TargetBackend};
use armtrap_core::types::ProcessId;
use armtrap_core::{Command, Outcome, Session};
use armtrap_utils::{init_logging, LogConfig, LogFormat, LogLevel};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

mod help;

/// Exit status when the host isn't running as root.
const EXIT_NO_PRIVILEGE: u8 = 1;
/// Exit status when the startup attach fails.
const EXIT_ATTACH_FAILED: u8 = 2;
/// Exit status when the terminal can't be read.
const EXIT_TERMINAL: u8 = 3;

/// Hardware breakpoints, watchpoints, registers and memory of a running ARM64 macOS process.
#[derive(Parser, Debug)]
#[command(name = "armtrap")]
#[command(version)]
#[command(about = "Interactive hardware breakpoint and memory debugger for ARM64 macOS processes", long_about = None)]
struct Cli
{
    /// Process ID to attach to (prompted for when omitted)
    pid: Option<u32>,

    /// Log level: error, warn, info, debug or trace (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides ARMTRAP_LOG_FORMAT)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn good(message: impl std::fmt::Display)
{
    println!("{} {message}", "#".green());
}

fn bad(message: impl std::fmt::Display)
{
    println!("{} {message}", "#".red());
}

fn notice(message: impl std::fmt::Display)
{
    println!("{} {message}", "#".yellow());
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    let config = LogConfig::from_env()
        .with_level(cli.log_level)
        .with_format(cli.log_format);
    // logs are optional; keep going without them
    let _logging = match init_logging(&config) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Failed to initialize logging: {err}");
            None
        }
    };

    println!("{} Welcome to armtrap!", "#".yellow());

    if !is_privileged() {
        bad("Run armtrap as root!");
        return ExitCode::from(EXIT_NO_PRIVILEGE);
    }

    start(cli.pid)
}

#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
fn start(pid: Option<u32>) -> ExitCode
{
    run(armtrap_core::MachBackend::new(), pid)
}

#[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
fn start(_pid: Option<u32>) -> ExitCode
{
    bad("armtrap can only attach to processes on Apple Silicon macOS");
    ExitCode::from(EXIT_ATTACH_FAILED)
}

/// Attach, then read commands until `exit` or end of input.
fn run<B: TargetBackend>(backend: B, pid: Option<u32>) -> ExitCode
{
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            bad(format!("Unable to open terminal: {err}"));
            return ExitCode::from(EXIT_TERMINAL);
        }
    };

    let pid = match pid {
        Some(pid) => pid,
        None => match editor.readline("Enter PID: ") {
            Ok(line) => match line.trim().parse::<u32>() {
                Ok(pid) => pid,
                Err(_) => {
                    bad(format!("Invalid PID: '{}'", line.trim()));
                    return ExitCode::from(EXIT_ATTACH_FAILED);
                }
            },
            Err(err) => {
                bad(format!("Unable to read PID: {err}"));
                return ExitCode::from(EXIT_TERMINAL);
            }
        },
    };

    let mut session = Session::new(backend);
    if let Err(err) = session.attach(ProcessId(pid)) {
        bad(err);
        return ExitCode::from(EXIT_ATTACH_FAILED);
    }
    good(format!("Obtained task_for_pid({pid})"));
    good("For a list of commands, type 'help'");

    let prompt = format!("{} ", "(armtrap)".blue());
    loop {
        match editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(err) = editor.add_history_entry(line.as_str()) {
                    debug!("history not updated: {err}");
                }
                if !handle_line(&mut session, &line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => notice("Type 'exit' to quit"),
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                bad(format!("Unable to read command: {err}"));
                return ExitCode::from(EXIT_TERMINAL);
            }
        }
    }

    bad("Exiting armtrap...");
    info!("session closed");
    ExitCode::SUCCESS
}

/// Parse and run one line. Returns `false` once the operator asks to exit.
fn handle_line<B: TargetBackend>(session: &mut Session<B>, line: &str) -> bool
{
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(err) => {
            bad(err);
            return true;
        }
    };

    match session.execute(command) {
        Ok(Outcome::Exit) => return false,
        Ok(Outcome::Help(topic)) => print_help(topic.as_deref()),
        Ok(outcome @ (Outcome::Lines(_) | Outcome::Registers(_))) => println!("{outcome}"),
        Ok(outcome) => good(outcome),
        Err(err) => bad(err),
    }
    true
}

fn print_help(topic: Option<&str>)
{
    let Some(name) = topic else {
        good("List of commands. Type help [command] for more info:");
        for (name, description) in help::SUMMARY {
            println!("{} - {description}", name.yellow());
        }
        return;
    };

    match help::topic(name) {
        Some((entries, note)) => {
            for (usage, description) in entries {
                println!("{} - {description}", usage.yellow());
            }
            if let Some(note) = note {
                println!("{note}");
            }
        }
        None => bad(format!("Unknown command '{name}'")),
    }
}
