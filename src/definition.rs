//! The raw, unvalidated shape a loader hands to the validator.
use crate::command::CommandSnapshot;
use crate::executor::Executor;
use crate::model::{Invocation, Override};

use serde_json::{Map, Value};

/// Runs the command. The returned value is handed back to the caller of
/// [`Command::run`](crate::command::Command::run) unchanged.
pub type ExecHandler = Executor<Invocation, Value>;
/// Renders help content for a command snapshot.
pub type HelpHandler = Executor<CommandSnapshot, String>;
pub type RequirementHandler = Executor<Invocation, bool>;
pub type PreCheckHandler = Executor<Invocation, Override>;
pub type PostCheckHandler = Executor<Invocation, ()>;

/// A handler slot in a raw definition. A slot is `Dangling` when the
/// definition names a handler that could not be resolved.
#[derive(Clone, Debug)]
pub enum Callable<H> {
    Bound(H),
    Dangling(String),
}

impl<H> Callable<H> {
    pub fn bound(&self) -> Option<&H> {
        match self {
            Self::Bound(h) => Some(h),
            Self::Dangling(_) => None,
        }
    }
}

impl<H> From<H> for Callable<H> {
    fn from(handler: H) -> Self {
        Self::Bound(handler)
    }
}

/// Descriptive and policy fields of a definition, plus its optional
/// handler slots.
#[derive(Clone, Debug, Default)]
pub struct Meta {
    pub fields: Map<String, Value>,
    pub help: Option<Callable<HelpHandler>>,
    pub requirement: Option<Callable<RequirementHandler>>,
    pub pre_check: Option<Callable<PreCheckHandler>>,
    pub post_check: Option<Callable<PostCheckHandler>>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `Meta` from a JSON object. Any other value yields
    /// empty fields.
    pub fn from_value(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            fields,
            ..Default::default()
        }
    }

    /// Sets a single field.
    pub fn set<K, V>(mut self, key: K, value: V) -> Self
    where
        K: ToString,
        V: Into<Value>,
    {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn help(mut self, help: HelpHandler) -> Self {
        self.help = Some(Callable::Bound(help));
        self
    }

    pub fn requirement(mut self, requirement: RequirementHandler) -> Self {
        self.requirement = Some(Callable::Bound(requirement));
        self
    }

    pub fn pre_check(mut self, hook: PreCheckHandler) -> Self {
        self.pre_check = Some(Callable::Bound(hook));
        self
    }

    pub fn post_check(mut self, hook: PostCheckHandler) -> Self {
        self.post_check = Some(Callable::Bound(hook));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// A definition as produced by a loader.
#[derive(Clone, Debug, Default)]
pub struct RawDefinition {
    pub name: Option<String>,
    pub meta: Meta,
    pub exec: Option<Callable<ExecHandler>>,
    /// Name of a loaded command this definition should be attached to.
    pub parent: Option<String>,
    /// Location the definition was loaded from.
    pub source: Option<String>,
}

impl RawDefinition {
    pub fn new<T>(name: T, meta: Meta, exec: ExecHandler) -> Self
    where
        T: ToString,
    {
        Self {
            name: Some(name.to_string()),
            meta,
            exec: Some(Callable::Bound(exec)),
            parent: None,
            source: None,
        }
    }

    pub fn source<T>(mut self, source: T) -> Self
    where
        T: ToString,
    {
        self.source = Some(source.to_string());
        self
    }

    pub fn parent<T>(mut self, parent: T) -> Self
    where
        T: ToString,
    {
        self.parent = Some(parent.to_string());
        self
    }
}
