//! Handlers that ship with the crate and can be referenced by name from
//! definition files.
use crate::definition::{ExecHandler, PostCheckHandler, RequirementHandler};
use crate::source::HandlerTable;

use serde_json::Value;

/// Returns a [`HandlerTable`] holding the default help handler and all
/// builtin handlers.
pub fn handlers() -> HandlerTable {
    let mut table = HandlerTable::new();

    table
        .exec(echo())
        .exec(ping())
        .exec(version())
        .requirement(guild_only())
        .post_check(trace());

    table
}

/// `echo`: Returns the arguments joined by spaces.
pub fn echo() -> ExecHandler {
    ExecHandler::from_fn("echo", |inv| async move { Ok(Value::from(inv.args.join(" "))) })
}

/// `ping`: Returns `Pong!`.
pub fn ping() -> ExecHandler {
    ExecHandler::from_fn("ping", |_| async { Ok(Value::from("Pong!")) })
}

/// `version`: Returns the crate version.
pub fn version() -> ExecHandler {
    ExecHandler::from_fn("version", |_| async {
        Ok(Value::from(env!("CARGO_PKG_VERSION")))
    })
}

/// `guild_only`: Passes unless the message is a direct message.
pub fn guild_only() -> RequirementHandler {
    RequirementHandler::from_fn("guild_only", |inv| async move { Ok(!inv.message.is_dm()) })
}

/// `trace`: Logs every completed invocation.
pub fn trace() -> PostCheckHandler {
    PostCheckHandler::from_fn("trace", |inv| async move {
        log::trace!("[CORE] Ran with {} argument(s)", inv.args.len());
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::handlers;
    use crate::model::{Invocation, Message};
    use crate::source::FsSource;

    use serde_json::Value;

    fn invocation(args: &[&str]) -> Invocation {
        Invocation {
            message: Message::new("!echo"),
            args: args.iter().map(|s| s.to_string()).collect(),
            main: true,
        }
    }

    #[tokio::test]
    async fn test_builtin_handlers() {
        assert_eq!(
            super::echo().call(invocation(&["a", "b"])).await.unwrap(),
            Value::from("a b")
        );
        assert_eq!(
            super::ping().call(invocation(&[])).await.unwrap(),
            Value::from("Pong!")
        );

        let mut message = Message::new("!x");
        assert!(!super::guild_only()
            .call(Invocation {
                message: message.clone(),
                args: Vec::new(),
                main: true,
            })
            .await
            .unwrap());

        message.guild_id = Some(1);
        assert!(super::guild_only()
            .call(Invocation {
                message,
                args: Vec::new(),
                main: true,
            })
            .await
            .unwrap());
    }

    #[test]
    fn test_handlers_resolve() {
        let source = FsSource::new("commands", "resources", "#!delete", handlers());

        let def = source
            .parse(
                "echo.toml",
                "name = \"echo\"\nexec = \"echo\"\nhelp = \"default\"\nrequirement = \"guild_only\"\npost_check = \"trace\"\n",
            )
            .unwrap();

        assert_eq!(def.exec.unwrap().bound().unwrap().name(), "echo");
        assert!(def.meta.requirement.unwrap().bound().is_some());
        assert!(def.meta.post_check.unwrap().bound().is_some());
    }
}
