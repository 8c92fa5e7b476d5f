//! Tests for operator command parsing

use armtrap_core::command::Command;
use armtrap_core::error::DebuggerError;
use armtrap_core::memory::LineFormat;
use armtrap_core::types::{Address, ProcessId};
use armtrap_core::SlotKind;

fn invalid(line: &str) -> bool
{
    matches!(Command::parse(line), Err(DebuggerError::InvalidCommand(_)))
}

#[test]
fn test_exit_aliases()
{
    for line in ["exit", "quit", "q", "  q  "] {
        assert_eq!(Command::parse(line).unwrap(), Command::Exit);
    }
}

#[test]
fn test_pid()
{
    assert_eq!(Command::parse("pid").unwrap(), Command::Pid(None));
    assert_eq!(Command::parse("pid 501").unwrap(), Command::Pid(Some(ProcessId(501))));
    assert_eq!(Command::parse("pid 0x10").unwrap(), Command::Pid(Some(ProcessId(16))));
    assert!(invalid("pid -1"));
    assert!(invalid("pid 0x100000000"));
    assert!(invalid("pid 1 2"));
}

#[test]
fn test_read_modes()
{
    assert_eq!(
        Command::parse("read bytes 0x2003 5").unwrap(),
        Command::ReadBytes {
            address: Address::new(0x2003),
            size: 5,
        }
    );
    assert_eq!(
        Command::parse("r l char 0x2003 50").unwrap(),
        Command::ReadLines {
            format: LineFormat::Char,
            address: Address::new(0x2003),
            lines: 50,
        }
    );
    assert_eq!(
        Command::parse("r v 4096 8").unwrap(),
        Command::ReadValue {
            address: Address::new(4096),
            size: 8,
        }
    );
    assert!(invalid("read"));
    assert!(invalid("read words 0x10 1"));
    assert!(invalid("read lines hex 0x10 1"));
    assert!(invalid("read bytes 0x10"));
    assert!(invalid("read bytes 0x10 1 2"));
    assert!(invalid("read value nowhere 8"));
}

#[test]
fn test_write()
{
    assert_eq!(
        "w 0x100000 0xdeadbeef".parse::<Command>().unwrap(),
        Command::Write {
            address: Address::new(0x10_0000),
            value: 0xdead_beef,
        }
    );
    assert!(invalid("write 0x100000"));
    assert!(invalid("write 0x100000 1 2"));
}

#[test]
fn test_register()
{
    assert_eq!(Command::parse("reg read").unwrap(), Command::RegisterRead(None));
    assert_eq!(Command::parse("register read all").unwrap(), Command::RegisterRead(None));
    assert_eq!(
        Command::parse("register read x5").unwrap(),
        Command::RegisterRead(Some("x5".to_string()))
    );
    assert_eq!(
        Command::parse("reg write pc 0x1000").unwrap(),
        Command::RegisterWrite {
            name: "pc".to_string(),
            value: 0x1000,
        }
    );
    // names are checked against the target, not here
    assert_eq!(
        Command::parse("reg write x99 1").unwrap(),
        Command::RegisterWrite {
            name: "x99".to_string(),
            value: 1,
        }
    );
    assert!(invalid("register"));
    assert!(invalid("register dump"));
    assert!(invalid("register write x5"));
    assert!(invalid("register read x5 x6"));
}

#[test]
fn test_slots()
{
    assert_eq!(
        Command::parse("br s 0x1000").unwrap(),
        Command::SlotSet {
            kind: SlotKind::Breakpoint,
            address: Address::new(0x1000),
        }
    );
    assert_eq!(
        Command::parse("watchpoint set 0x2000").unwrap(),
        Command::SlotSet {
            kind: SlotKind::Watchpoint,
            address: Address::new(0x2000),
        }
    );
    assert_eq!(Command::parse("wa r").unwrap(), Command::SlotRemove(SlotKind::Watchpoint));
    assert_eq!(Command::parse("br list").unwrap(), Command::SlotList(SlotKind::Breakpoint));
    assert!(invalid("br"));
    assert!(invalid("br set"));
    assert!(invalid("br toggle 0x1000"));
    assert!(invalid("br set 0x1000 0x2000"));
    assert!(invalid("br list all"));
}

#[test]
fn test_remove_ignores_address()
{
    assert_eq!(
        Command::parse("breakpoint remove 0x1000").unwrap(),
        Command::SlotRemove(SlotKind::Breakpoint)
    );
    assert!(invalid("breakpoint remove 0x1000 0x2000"));
}

#[test]
fn test_misc()
{
    assert_eq!(Command::parse("p").unwrap(), Command::Pause);
    assert_eq!(Command::parse("c").unwrap(), Command::Continue);
    assert_eq!(Command::parse("help").unwrap(), Command::Help(None));
    assert_eq!(Command::parse("help write").unwrap(), Command::Help(Some("write".to_string())));
    assert!(invalid(""));
    assert!(invalid("   "));
    assert!(invalid("step"));
    assert!(invalid("pause now"));
}
