use crate::command::CommandSnapshot;
use crate::definition::HelpHandler;

use std::fmt::Write;

/// Returns the `default` help handler, rendering [`command`] without a
/// prefix.
pub fn handler() -> HelpHandler {
    HelpHandler::from_fn("default", |snapshot| async move { Ok(command(&snapshot, "")) })
}

/// Returns a new global help message string.
pub fn global(commands: &[CommandSnapshot], prefix: &str) -> String {
    let mut string = String::new();

    let _ = writeln!(string, "__**Commands:**__");

    for command in commands {
        let _ = writeln!(string, "- {} — {}", command.name, command.description);
    }

    let _ = writeln!(
        string,
        "\n**Use `{}help`*`command`* to get more details about a command.**",
        prefix
    );

    string
}

/// Returns a new help message for a specific command.
///
/// The `prefix` is prepended to the "Usage" and "Example" fields.
pub fn command(command: &CommandSnapshot, prefix: &str) -> String {
    let mut string = String::new();

    let _ = writeln!(string, "**Name**: {}", command.label);
    let _ = writeln!(string, "**Description**: {}", command.long_description);

    if command.aliases.iter().any(|a| *a != command.name) {
        let _ = writeln!(string, "**Aliases**: {}", command.aliases.join(", "));
    }

    let parent = match command.label.rsplit_once(' ') {
        Some((parent, _)) => format!("{} ", parent),
        None => String::new(),
    };

    let _ = writeln!(string, "**Usage**: {}{}{}", prefix, parent, command.syntax);

    for example in &command.examples {
        let _ = writeln!(string, "**Example**: {}{}{}", prefix, parent, example);
    }

    if !command.flags.is_empty() {
        let _ = writeln!(string, "**Flags**:");

        for flag in &command.flags {
            let default = if flag.default { " (default)" } else { "" };
            let _ = writeln!(string, "- `{}` {}{}", flag.text, flag.value, default);
        }
    }

    for note in &command.meta_notes {
        let _ = writeln!(string, "**{}**: {}", note.text, note.value);
    }

    if command.cooldown_seconds > 0 {
        let _ = writeln!(string, "**Cooldown**: {} sec", command.cooldown_seconds);
    }

    if !command.dm_allowed {
        let _ = writeln!(string, "Only usable in guilds.");
    }

    if !command.subcommands.is_empty() {
        let _ = writeln!(string, "**Sub-Commands**:");

        for sub in command.subcommands.values() {
            let _ = writeln!(string, "- {} — {}", sub.name, sub.description);
        }
    }

    string
}
