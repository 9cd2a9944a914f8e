use crate::command::Command;

use std::collections::HashMap;
use std::sync::Arc;

/// Splits `input` at spaces. Text wrapped in double quotes is kept as a
/// single argument. Empty arguments are dropped.
pub fn parse_args(input: &str) -> Vec<&str> {
    let mut args = Vec::new();

    let mut start = 0;
    let mut quoted = false;
    for (i, b) in input.bytes().enumerate() {
        match b {
            b' ' if !quoted => {
                args.push(&input[start..i]);
                start = i + 1;
            }
            b'"' => {
                if quoted {
                    args.push(&input[start + 1..i]);
                    start = i + 1;
                }
                quoted = !quoted;
            }
            _ => (),
        }
    }

    args.push(&input[start..]);

    args.into_iter().filter(|arg| !arg.is_empty()).collect()
}

/// Resolves a top-level command by its name or one of its aliases.
pub fn find_root(roots: &HashMap<String, Arc<Command>>, name: &str) -> Option<Arc<Command>> {
    let name = name.to_lowercase();

    if let Some(command) = roots.get(&name) {
        return Some(command.clone());
    }

    roots
        .values()
        .find(|command| command.aliases().contains(&name))
        .cloned()
}

/// Follows `path` from the top-level commands down through subcommands.
/// Returns the deepest matching command together with the number of path
/// segments used. Remaining segments are arguments.
pub fn find_command<S>(
    roots: &HashMap<String, Arc<Command>>,
    path: &[S],
) -> Option<(Arc<Command>, usize)>
where
    S: AsRef<str>,
{
    let (first, rest) = path.split_first()?;

    let mut command = find_root(roots, first.as_ref())?;
    let mut depth = 1;

    for segment in rest {
        match command.subcommand(segment.as_ref()) {
            Some(sub) => {
                command = sub;
                depth += 1;
            }
            None => break,
        }
    }

    Some((command, depth))
}
