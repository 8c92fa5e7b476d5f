//! Text for the `help` command.

/// One line of help: usage on the left, description on the right
pub type Entry = (&'static str, &'static str);

/// `help` without a topic.
pub const SUMMARY: &[Entry] = &[
    ("write", "write to memory"),
    ("read", "read from memory"),
    ("register", "read/write registers"),
    ("breakpoint", "set/remove/list breakpoints"),
    ("watchpoint", "set/remove/list watchpoints"),
    ("pause", "pauses debug task"),
    ("continue", "continues debug task"),
    ("pid", "lists pid or changes the process id"),
    ("exit", "quits armtrap"),
];

const EXIT: &[Entry] = &[("[exit/q/quit]", "exits armtrap")];
const HELP: &[Entry] = &[("help [command]", "shows help for [command]")];
const PID: &[Entry] = &[
    ("pid", "lists process ID of debug task"),
    ("pid [pid]", "changes process ID of debug task to [pid]"),
];
const WRITE: &[Entry] = &[("[write/w] [0xaddress] [0xdata]", "writes 8 bytes of [0xdata] to [0xaddress]")];
const READ: &[Entry] = &[
    ("[read/r] [bytes/b] [0xaddress] [size]", "reads [size] amount of bytes at [0xaddress]"),
    ("[read/r] [value/v] [0xaddress] [size]", "reads [size <= 8] value at [0xaddress]"),
    (
        "[read/r] [lines/l] char [0xaddress] [lines]",
        "reads [lines] amount of lines of memory as ASCII at [0xaddress]",
    ),
    (
        "[read/r] [lines/l] bytes [0xaddress] [lines]",
        "reads [lines] amount of lines of memory as bytes at [0xaddress]",
    ),
];
const REGISTER: &[Entry] = &[
    ("[register/reg] write [register] [0xdata]", "writes [0xdata] to [register]"),
    ("[register/reg] read [register]", "prints [register]"),
    ("[register/reg] read [all]", "prints all registers"),
];
const BREAKPOINT: &[Entry] = &[
    ("[breakpoint/br] [set/s] [0xaddress]", "sets breakpoint at [0xaddress]"),
    ("[breakpoint/br] [remove/r]", "removes the most recent breakpoint"),
    ("[breakpoint/br] list", "lists breakpoints"),
];
const WATCHPOINT: &[Entry] = &[
    ("[watchpoint/wa] [set/s] [0xaddress]", "sets watchpoint at [0xaddress]"),
    ("[watchpoint/wa] [remove/r]", "removes the most recent watchpoint"),
    ("[watchpoint/wa] list", "lists watchpoints"),
];
const PAUSE: &[Entry] = &[("[pause/p]", "pauses debug task")];
const CONTINUE: &[Entry] = &[("[continue/c]", "resumes debug task")];

/// Usage lines and an optional trailing note for `help <topic>`.
///
/// Aliases resolve to the same text as the long command name. Returns
/// `None` for an unknown topic.
pub fn topic(name: &str) -> Option<(&'static [Entry], Option<&'static str>)>
{
    let found = match name {
        "exit" | "quit" | "q" => (EXIT, None),
        "help" => (HELP, None),
        "pid" => (PID, None),
        "write" | "w" => (WRITE, None),
        "read" | "r" => (READ, Some("Max lines to print is 20!")),
        "register" | "reg" => (REGISTER, Some("Valid registers -> x0-x28, lr, pc, cpsr, pad")),
        "breakpoint" | "br" => (BREAKPOINT, Some("Max number of breakpoints is 6!")),
        "watchpoint" | "wa" => (WATCHPOINT, Some("Max number of watchpoints is 6!")),
        "pause" | "p" => (PAUSE, None),
        "continue" | "c" => (CONTINUE, None),
        _ => return None,
    };
    Some(found)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_every_summary_entry_has_a_topic()
    {
        for (name, _) in SUMMARY {
            assert!(topic(name).is_some(), "no help for {name}");
        }
    }

    #[test]
    fn test_aliases_share_text()
    {
        assert_eq!(topic("br"), topic("breakpoint"));
        assert_eq!(topic("q"), topic("exit"));
        assert!(topic("step").is_none());
    }

    #[test]
    fn test_register_note_lists_namespace()
    {
        let (_, note) = topic("register").unwrap();
        assert_eq!(note, Some("Valid registers -> x0-x28, lr, pc, cpsr, pad"));
    }
}
