use crate::command::Command;
use crate::error::{Error, Result};
use crate::model::{Context, Invocation};

use serde_json::Value;

impl Command {
    /// Runs the command: the pre-check hook, the exec handler, then the
    /// post-check hook. Returns the value produced by the exec handler.
    ///
    /// A pre-check hook may replace the message and/or the arguments for
    /// the rest of the run. The post-check hook's return value is ignored.
    /// Errors from any stage are returned as-is and stop the run.
    pub async fn run(&self, ctx: Context) -> Result<Value> {
        let message = ctx.message.ok_or(Error::MissingMessage)?;

        // Take the handlers out so no lock is held across an await.
        let (name, exec, pre_check, post_check) = {
            let meta = self.meta();
            (
                meta.name.clone(),
                meta.exec.clone(),
                meta.pre_check.clone(),
                meta.post_check.clone(),
            )
        };

        let mut invocation = Invocation {
            message,
            args: ctx.args,
            main: true,
        };

        if let Some(hook) = pre_check {
            log::trace!("[CORE] {}: pre-check `{}`", name, hook.name());

            let overrides = hook.call(invocation.clone()).await?;

            if let Some(message) = overrides.message {
                invocation.message = message;
            }

            if let Some(args) = overrides.args {
                invocation.args = args;
            }
        }

        log::trace!("[CORE] {}: exec `{}`", name, exec.name());
        let output = exec.call(invocation.clone()).await?;

        if let Some(hook) = post_check {
            log::trace!("[CORE] {}: post-check `{}`", name, hook.name());
            hook.call(invocation).await?;
        }

        Ok(output)
    }

    /// Evaluates the requirement predicate. Commands without one always
    /// pass.
    pub async fn check_requirement(&self, invocation: Invocation) -> Result<bool> {
        let requirement = self.meta().requirement.clone();

        match requirement {
            Some(predicate) => predicate.call(invocation).await,
            None => Ok(true),
        }
    }
}
