use crate::definition::RawDefinition;
use crate::error::Result;
use crate::registry::SubcommandRegistry;
use crate::validate::{Flag, MetaNote, Metadata, Validator, DISABLED_MESSAGE};

use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A validated command. Commands are shared as `Arc<Command>`; a parent
/// owns its subcommands, a subcommand only holds a weak link back.
pub struct Command {
    meta: RwLock<Metadata>,
    enabled: AtomicBool,
    source: Option<String>,
    parent: Weak<Command>,
    pub(crate) registry: RwLock<SubcommandRegistry>,
    validator: Arc<Validator>,
}

impl Command {
    /// Creates a new top-level command from a loaded definition. The
    /// definition must carry its source location.
    pub fn new(def: &RawDefinition, validator: Arc<Validator>) -> Result<Arc<Self>> {
        let meta = validator.validate(def, true)?;

        Ok(Arc::new(Self::from_parts(
            meta,
            def.source.clone(),
            Weak::new(),
            validator,
        )))
    }

    pub(crate) fn from_parts(
        meta: Metadata,
        source: Option<String>,
        parent: Weak<Command>,
        validator: Arc<Validator>,
    ) -> Self {
        Self {
            meta: RwLock::new(meta),
            enabled: AtomicBool::new(true),
            source,
            parent,
            registry: RwLock::default(),
            validator,
        }
    }

    /// Returns a read guard to the current metadata. Don't hold the guard
    /// across an `.await`.
    pub fn meta(&self) -> RwLockReadGuard<'_, Metadata> {
        self.meta.read()
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub fn aliases(&self) -> Vec<String> {
        self.meta.read().aliases.clone()
    }

    pub fn description(&self) -> String {
        self.meta.read().description.clone()
    }

    pub fn cooldown(&self) -> u8 {
        self.meta.read().cooldown
    }

    pub fn permission(&self) -> i64 {
        self.meta.read().permission
    }

    pub fn dm_allowed(&self) -> bool {
        self.meta.read().dm_allowed
    }

    pub fn error_message(&self) -> String {
        self.meta.read().error_message.clone()
    }

    pub fn permission_denied_message(&self) -> Option<String> {
        self.meta.read().permission_denied_message.clone()
    }

    pub fn disabled_message(&self) -> &'static str {
        DISABLED_MESSAGE
    }

    /// The location this command was loaded from, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn parent(&self) -> Option<Arc<Command>> {
        self.parent.upgrade()
    }

    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    /// Returns the names from the root command down to this command,
    /// separated by spaces.
    pub fn full_label(&self) -> String {
        let mut names = vec![self.name()];

        let mut parent = self.parent();
        while let Some(command) = parent {
            names.push(command.name());
            parent = command.parent();
        }

        names.reverse();
        names.join(" ")
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Sets the enabled state from a toggle string: `true`/`enable` or
    /// `false`/`disable`. Any other input is ignored and `false` is
    /// returned.
    pub fn set_enabled_str(&self, toggle: &str) -> bool {
        match parse_toggle(toggle) {
            Some(enabled) => {
                self.set_enabled(enabled);
                true
            }
            None => {
                log::warn!(
                    "[CORE] Ignoring unknown toggle `{}` for command `{}`",
                    toggle,
                    self.full_label()
                );
                false
            }
        }
    }

    /// Replaces all metadata at once. Subcommands are left untouched.
    pub(crate) fn replace_meta(&self, meta: Metadata) -> Metadata {
        std::mem::replace(&mut *self.meta.write(), meta)
    }

    /// Appends `alias` to the alias set if it isn't already in it.
    pub(crate) fn push_alias(&self, alias: &str) {
        let mut meta = self.meta.write();
        if !meta.aliases.iter().any(|a| a == alias) {
            meta.aliases.push(alias.to_owned());
        }
    }

    pub(crate) fn strip_alias(&self, alias: &str) {
        self.meta.write().aliases.retain(|a| a != alias);
    }

    /// Returns a serializable snapshot of the public fields of this command
    /// and its subcommands.
    pub fn serialize(&self) -> CommandSnapshot {
        let label = self.full_label();

        let (subcommands, subcommand_aliases) = {
            let registry = self.registry.read();

            let subcommands = registry
                .subcommands()
                .map(|(name, cmd)| (name.clone(), cmd.serialize()))
                .collect();

            let aliases = registry
                .aliases()
                .map(|(alias, name)| (alias.clone(), name.clone()))
                .collect();

            (subcommands, aliases)
        };

        let meta = self.meta.read();

        CommandSnapshot {
            name: meta.name.clone(),
            label,
            aliases: meta.aliases.clone(),
            description: meta.description.clone(),
            long_description: meta.long_description.clone(),
            syntax: meta.syntax.clone(),
            dm_allowed: meta.dm_allowed,
            flags: meta.flags.clone(),
            cooldown_seconds: meta.cooldown,
            permission_level: meta.permission,
            permission_denied_message: meta.permission_denied_message.clone(),
            error_message: meta.error_message.clone(),
            disabled_message: DISABLED_MESSAGE.to_owned(),
            group: meta.group,
            meta_notes: meta.meta_notes.clone(),
            examples: meta.examples.clone(),
            resources: meta.resources.clone(),
            enabled: self.is_enabled(),
            exec: meta.exec.name().to_owned(),
            help: meta.help.name().to_owned(),
            requirement: meta.requirement.as_ref().map(|h| h.name().to_owned()),
            pre_check: meta.pre_check.as_ref().map(|h| h.name().to_owned()),
            post_check: meta.post_check.as_ref().map(|h| h.name().to_owned()),
            subcommands,
            subcommand_aliases,
        }
    }

    /// Renders the help content using the command's help handler.
    pub async fn help(&self) -> Result<String> {
        let handler = self.meta.read().help.clone();
        handler.call(self.serialize()).await
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let meta = self.meta.read();
        write!(f, "{} — {}", meta.name, meta.description)
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.meta.read().name)
            .field("source", &self.source)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn parse_toggle(s: &str) -> Option<bool> {
    match s {
        "true" | "enable" => Some(true),
        "false" | "disable" => Some(false),
        _ => None,
    }
}

/// The public view of a [`Command`], as handed to help renderers and
/// other presentation layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSnapshot {
    pub name: String,
    /// Full path from the root command.
    pub label: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub long_description: String,
    pub syntax: String,
    pub dm_allowed: bool,
    pub flags: Vec<Flag>,
    pub cooldown_seconds: u8,
    pub permission_level: i64,
    pub permission_denied_message: Option<String>,
    pub error_message: String,
    pub disabled_message: String,
    pub group: i64,
    pub meta_notes: Vec<MetaNote>,
    pub examples: Vec<String>,
    pub resources: Vec<String>,
    pub enabled: bool,
    pub exec: String,
    pub help: String,
    pub requirement: Option<String>,
    pub pre_check: Option<String>,
    pub post_check: Option<String>,
    pub subcommands: BTreeMap<String, CommandSnapshot>,
    pub subcommand_aliases: BTreeMap<String, String>,
}
