use crate::command::Command;
use crate::definition::{Callable, ExecHandler, Meta, RawDefinition};
use crate::error::Result;
use crate::validate::is_valid_name;

use thiserror::Error;

use std::collections::hash_map::Iter;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("BlankName: the subcommand name is empty")]
    BlankName,
    #[error("InvalidName: `{0}` must only contain lowercase letters a-z")]
    InvalidName(String),
    #[error("DuplicateName: a subcommand named `{0}` already exists")]
    DuplicateName(String),
    #[error("BlankAlias: the alias is empty")]
    BlankAlias,
    #[error("UnknownSubcommand: no subcommand named `{0}`")]
    UnknownSubcommand(String),
    #[error("DuplicateAlias: the alias `{0}` is already registered")]
    DuplicateAlias(String),
    #[error("AliasShadowsName: the alias `{0}` is already a subcommand name")]
    AliasShadowsName(String),
}

/// The subcommands of a single command and the aliases pointing at them.
#[derive(Debug, Default)]
pub struct SubcommandRegistry {
    subcommands: HashMap<String, Arc<Command>>,
    aliases: HashMap<String, String>,
}

/// What [`Command::unregister_subcommand`] removed.
#[derive(Clone, Debug)]
pub enum Removed {
    /// An alias was removed. Contains the name it pointed to.
    Alias(String),
    Subcommand(Arc<Command>),
}

impl SubcommandRegistry {
    pub fn subcommands(&self) -> Iter<'_, String, Arc<Command>> {
        self.subcommands.iter()
    }

    pub fn aliases(&self) -> Iter<'_, String, String> {
        self.aliases.iter()
    }

    /// Returns the subcommand with the canonical name or alias `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<Command>> {
        match self.subcommands.get(name) {
            Some(cmd) => Some(cmd),
            None => self
                .aliases
                .get(name)
                .and_then(|name| self.subcommands.get(name)),
        }
    }

    fn check_alias(&self, alias: &str) -> Result<(), RegistryError> {
        if alias.trim().is_empty() {
            return Err(RegistryError::BlankAlias);
        }

        if self.aliases.contains_key(alias) {
            return Err(RegistryError::DuplicateAlias(alias.to_owned()));
        }

        if self.subcommands.contains_key(alias) {
            return Err(RegistryError::AliasShadowsName(alias.to_owned()));
        }

        Ok(())
    }

    fn add_alias(&mut self, alias: String, name: String) -> Result<(), RegistryError> {
        if name.trim().is_empty() {
            return Err(RegistryError::BlankName);
        }

        self.check_alias(&alias)?;

        let target = self
            .subcommands
            .get(&name)
            .ok_or_else(|| RegistryError::UnknownSubcommand(name.clone()))?;

        target.push_alias(&alias);
        self.aliases.insert(alias, name);

        Ok(())
    }

    fn remove(&mut self, name: &str) -> Option<Removed> {
        if let Some(target) = self.aliases.remove(name) {
            if let Some(cmd) = self.subcommands.get(&target) {
                cmd.strip_alias(name);
            }

            return Some(Removed::Alias(target));
        }

        // Aliases still pointing at `name` are kept.
        self.subcommands.remove(name).map(Removed::Subcommand)
    }
}

impl Command {
    /// Creates, validates and inserts a new subcommand. Meta fields listed
    /// in this command's `subcommand_defaults` are copied into `meta` unless
    /// `meta` sets them itself.
    pub fn register_subcommand<T>(
        self: &Arc<Self>,
        name: T,
        meta: Meta,
        exec: ExecHandler,
    ) -> Result<Arc<Command>>
    where
        T: AsRef<str>,
    {
        let def = RawDefinition::new(name.as_ref(), meta, exec);
        self.attach(def, false)
    }

    /// Inserts a subcommand built from a loaded definition.
    pub(crate) fn attach(
        self: &Arc<Self>,
        mut def: RawDefinition,
        require_source: bool,
    ) -> Result<Arc<Command>> {
        let name = def.name.as_deref().unwrap_or_default().to_lowercase();

        if name.trim().is_empty() {
            return Err(RegistryError::BlankName.into());
        }

        if name.contains(char::is_whitespace) || !is_valid_name(&name) {
            return Err(RegistryError::InvalidName(name).into());
        }

        let mut registry = self.registry.write();

        if registry.subcommands.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name).into());
        }

        if registry.aliases.contains_key(&name) {
            return Err(RegistryError::DuplicateAlias(name).into());
        }

        self.inherit(&mut def);
        def.name = Some(name.clone());

        let mut meta = self.validator().validate(&def, require_source)?;

        // Only explicitly declared aliases go into the registry.
        let mut aliases: Vec<String> = Vec::new();
        if def.meta.fields.contains_key("aliases") {
            for alias in meta.aliases.iter().map(|a| a.to_lowercase()) {
                if alias == name || aliases.contains(&alias) {
                    continue;
                }

                registry.check_alias(&alias)?;
                aliases.push(alias);
            }

            let mut normalized: Vec<String> = Vec::with_capacity(meta.aliases.len());
            for alias in meta.aliases.iter().map(|a| a.to_lowercase()) {
                if !normalized.contains(&alias) {
                    normalized.push(alias);
                }
            }
            meta.aliases = normalized;
        }

        let command = Arc::new(Command::from_parts(
            meta,
            def.source.clone(),
            Arc::downgrade(self),
            self.validator().clone(),
        ));

        registry.subcommands.insert(name.clone(), command.clone());

        for alias in aliases {
            registry.add_alias(alias, name.clone())?;
        }

        log::debug!(
            "[REGISTRY] Registered subcommand `{}`",
            command.full_label()
        );

        Ok(command)
    }

    /// Copies this command's `subcommand_defaults` and help handler into a
    /// subcommand definition, unless the definition sets them itself.
    pub(crate) fn inherit(&self, def: &mut RawDefinition) {
        let parent = self.meta();

        for (key, value) in &parent.subcommand_defaults {
            if !def.meta.fields.contains_key(key) {
                def.meta.fields.insert(key.clone(), value.clone());
            }
        }

        if def.meta.help.is_none() {
            def.meta.help = Some(Callable::Bound(parent.help.clone()));
        }

        def.parent = Some(parent.name.clone());
    }

    /// Registers `alias` as an alternative name for the subcommand `name`.
    pub fn register_subcommand_alias<A, N>(&self, alias: A, name: N) -> Result<()>
    where
        A: AsRef<str>,
        N: AsRef<str>,
    {
        let alias = alias.as_ref().to_lowercase();
        let name = name.as_ref().to_lowercase();

        self.registry.write().add_alias(alias, name)?;
        Ok(())
    }

    /// Removes a subcommand or an alias. Removing an alias keeps the
    /// subcommand, removing a subcommand keeps all aliases pointing at it.
    pub fn unregister_subcommand<T>(&self, name: T) -> Option<Removed>
    where
        T: AsRef<str>,
    {
        let name = name.as_ref().to_lowercase();

        let removed = self.registry.write().remove(&name);
        if removed.is_some() {
            log::debug!(
                "[REGISTRY] Unregistered `{}` from `{}`",
                name,
                self.full_label()
            );
        }

        removed
    }

    /// Returns the subcommand with the canonical name or alias `name`.
    pub fn subcommand<T>(&self, name: T) -> Option<Arc<Command>>
    where
        T: AsRef<str>,
    {
        let name = name.as_ref().to_lowercase();
        self.registry.read().get(&name).cloned()
    }

    /// Returns all subcommands, sorted by name.
    pub fn subcommands(&self) -> Vec<Arc<Command>> {
        let registry = self.registry.read();

        let mut names: Vec<&String> = registry.subcommands.keys().collect();
        names.sort();

        names
            .into_iter()
            .map(|name| registry.subcommands[name].clone())
            .collect()
    }

    /// Returns a copy of the alias → name map.
    pub fn subcommand_aliases(&self) -> HashMap<String, String> {
        self.registry.read().aliases.clone()
    }

    pub fn has_subcommand<T>(&self, name: T) -> bool
    where
        T: AsRef<str>,
    {
        self.registry
            .read()
            .subcommands
            .contains_key(&name.as_ref().to_lowercase())
    }
}
