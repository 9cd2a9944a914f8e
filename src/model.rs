use serde::{Deserialize, Serialize};

/// A message delivered by the transport layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub author_id: Option<u64>,
    /// `None` if the message was sent in a direct message.
    pub guild_id: Option<u64>,
}

impl Message {
    pub fn new<T>(content: T) -> Self
    where
        T: ToString,
    {
        Self {
            content: content.to_string(),
            author_id: None,
            guild_id: None,
        }
    }

    pub fn is_dm(&self) -> bool {
        self.guild_id.is_none()
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// The context handed to [`Command::run`]. The arguments are already
/// split by the dispatch layer.
///
/// [`Command::run`]: crate::command::Command::run
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub message: Option<Message>,
    pub args: Vec<String>,
}

impl Context {
    pub fn new<M>(message: M) -> Self
    where
        M: Into<Message>,
    {
        Self {
            message: Some(message.into()),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args = args.into_iter().map(|s| s.to_string()).collect();
        self
    }
}

/// The resolved message and arguments every handler of a single run
/// receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub message: Message,
    pub args: Vec<String>,
    /// `true` if the command itself was invoked, rather than being called
    /// as part of another command.
    pub main: bool,
}

/// Returned by a pre-check hook. Only the fields that are `Some` replace
/// the originals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Override {
    pub message: Option<Message>,
    pub args: Option<Vec<String>>,
}

impl Override {
    pub fn message<M>(mut self, message: M) -> Self
    where
        M: Into<Message>,
    {
        self.message = Some(message.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args = Some(args.into_iter().map(|s| s.to_string()).collect());
        self
    }
}
