//! # Commands
//!
//! Operator input parsed into a closed set of commands. Each variant maps to
//! exactly one engine operation; [`Session::execute`](crate::Session::execute)
//! is the single place that matches on them.
//!
//! ## Syntax
//!
//! ```text
//! pid [n]
//! [read|r] [bytes|b] <addr> <size>
//! [read|r] [lines|l] <char|bytes> <addr> <lines>
//! [read|r] [value|v] <addr> <size<=8>
//! [write|w] <addr> <value>
//! [register|reg] read [name|all]
//! [register|reg] write <name> <value>
//! [breakpoint|br] [set|s] <addr> | [remove|r] | list
//! [watchpoint|wa] [set|s] <addr> | [remove|r] | list
//! [pause|p]  [continue|c]  help [topic]  [exit|quit|q]
//! ```
//!
//! Numbers are `0x` hex or decimal.

use std::str::FromStr;

use tracing::warn;

use crate::breakpoints::SlotKind;
use crate::error::{DebuggerError, Result};
use crate::memory::LineFormat;
use crate::types::{parse_u64, Address, ProcessId};

/// One operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command
{
    /// Show the current PID, or attach to a new one
    Pid(Option<ProcessId>),
    ReadBytes
    {
        address: Address,
        size: usize,
    },
    ReadLines
    {
        format: LineFormat,
        address: Address,
        lines: usize,
    },
    ReadValue
    {
        address: Address,
        size: usize,
    },
    Write
    {
        address: Address,
        value: u64,
    },
    /// `None` reads every register
    RegisterRead(Option<String>),
    RegisterWrite
    {
        name: String,
        value: u64,
    },
    SlotSet
    {
        kind: SlotKind,
        address: Address,
    },
    /// Always the most recently set slot
    SlotRemove(SlotKind),
    SlotList(SlotKind),
    Pause,
    Continue,
    Help(Option<String>),
    Exit,
}

fn invalid(message: impl Into<String>) -> DebuggerError
{
    DebuggerError::InvalidCommand(message.into())
}

fn number(token: &str, what: &str) -> Result<u64>
{
    parse_u64(token).map_err(|_| invalid(format!("'{token}' is not a valid {what}")))
}

fn address(token: &str) -> Result<Address>
{
    number(token, "address").map(Address::new)
}

fn size(token: &str, what: &str) -> Result<usize>
{
    usize::try_from(number(token, what)?).map_err(|_| invalid(format!("{what} '{token}' is too large")))
}

/// Exactly `N` arguments after the verb, or a usage error naming `usage`.
fn args<'a, const N: usize>(rest: &[&'a str], usage: &str) -> Result<[&'a str; N]>
{
    <[&str; N]>::try_from(rest).map_err(|_| {
        if rest.len() < N {
            invalid(format!("not enough arguments: {usage}"))
        } else {
            invalid(format!("too many arguments: {usage}"))
        }
    })
}

impl Command
{
    /// Parse one whitespace-separated line.
    ///
    /// ## Errors
    ///
    /// - `InvalidCommand`: unknown verb, wrong argument count or a malformed number
    pub fn parse(line: &str) -> Result<Self>
    {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (verb, rest) = tokens.split_first().ok_or_else(|| invalid("empty command"))?;

        match *verb {
            "exit" | "quit" | "q" => Ok(Command::Exit),
            "help" => match rest {
                [] => Ok(Command::Help(None)),
                [topic] => Ok(Command::Help(Some((*topic).to_string()))),
                _ => Err(invalid("too many arguments: help [command]")),
            },
            "pid" => match rest {
                [] => Ok(Command::Pid(None)),
                [pid] => {
                    let pid = u32::try_from(number(pid, "PID")?).map_err(|_| invalid(format!("'{pid}' is not a valid PID")))?;
                    Ok(Command::Pid(Some(ProcessId(pid))))
                }
                _ => Err(invalid("too many arguments: pid [pid]")),
            },
            "pause" | "p" => args::<0>(rest, "pause").map(|_| Command::Pause),
            "continue" | "c" => args::<0>(rest, "continue").map(|_| Command::Continue),
            "read" | "r" => Self::parse_read(rest),
            "write" | "w" => {
                let [addr, value] = args(rest, "write <address> <value>")?;
                Ok(Command::Write {
                    address: address(addr)?,
                    value: number(value, "value")?,
                })
            }
            "register" | "reg" => Self::parse_register(rest),
            "breakpoint" | "br" => Self::parse_slot(SlotKind::Breakpoint, rest),
            "watchpoint" | "wa" => Self::parse_slot(SlotKind::Watchpoint, rest),
            other => Err(invalid(format!("unknown command '{other}'"))),
        }
    }

    fn parse_read(rest: &[&str]) -> Result<Self>
    {
        let (mode, rest) = rest
            .split_first()
            .ok_or_else(|| invalid("read needs one of: bytes, lines, value"))?;

        match *mode {
            "bytes" | "b" => {
                let [addr, len] = args(rest, "read bytes <address> <size>")?;
                Ok(Command::ReadBytes {
                    address: address(addr)?,
                    size: size(len, "size")?,
                })
            }
            "lines" | "l" => {
                let [format, addr, lines] = args(rest, "read lines <char|bytes> <address> <lines>")?;
                Ok(Command::ReadLines {
                    format: format.parse()?,
                    address: address(addr)?,
                    lines: size(lines, "line count")?,
                })
            }
            "value" | "v" => {
                let [addr, len] = args(rest, "read value <address> <size>")?;
                Ok(Command::ReadValue {
                    address: address(addr)?,
                    size: size(len, "size")?,
                })
            }
            other => Err(invalid(format!("invalid argument for 'read': '{other}'"))),
        }
    }

    fn parse_register(rest: &[&str]) -> Result<Self>
    {
        match rest {
            ["read"] | ["read", "all"] => Ok(Command::RegisterRead(None)),
            ["read", name] => Ok(Command::RegisterRead(Some((*name).to_string()))),
            ["write", name, value] => Ok(Command::RegisterWrite {
                name: (*name).to_string(),
                value: number(value, "value")?,
            }),
            ["write", ..] => Err(invalid("register write <name> <value>")),
            ["read", ..] => Err(invalid("too many arguments: register read [name|all]")),
            [] => Err(invalid("register needs 'read' or 'write'")),
            [other, ..] => Err(invalid(format!("invalid argument for 'register': '{other}'"))),
        }
    }

    fn parse_slot(kind: SlotKind, rest: &[&str]) -> Result<Self>
    {
        match rest {
            ["set" | "s", addr] => Ok(Command::SlotSet {
                kind,
                address: address(addr)?,
            }),
            ["set" | "s"] => Err(invalid(format!("not enough arguments: {kind} set <address>"))),
            ["remove" | "r"] => Ok(Command::SlotRemove(kind)),
            ["remove" | "r", ignored] => {
                warn!("{kind} remove takes no address; '{ignored}' ignored, removing the most recent {kind}");
                Ok(Command::SlotRemove(kind))
            }
            ["list"] => Ok(Command::SlotList(kind)),
            [] => Err(invalid(format!("{kind} needs 'set', 'remove' or 'list'"))),
            [other, ..] if !matches!(*other, "set" | "s" | "remove" | "r" | "list") => {
                Err(invalid(format!("invalid argument for '{kind}': '{other}'")))
            }
            _ => Err(invalid(format!("too many arguments for '{kind}'"))),
        }
    }
}

impl FromStr for Command
{
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self>
    {
        Command::parse(s)
    }
}
