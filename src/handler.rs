use crate::command::Command;
use crate::error::{Error, Result};
use crate::router::{find_command, parse_args};
use crate::source::DefinitionSource;
use crate::validate::Validator;

use parking_lot::RwLock;

use std::collections::HashMap;
use std::sync::Arc;

/// The set of loaded top-level commands.
#[derive(Clone, Debug)]
pub struct CommandSet {
    inner: Arc<RwLock<HashMap<String, Arc<Command>>>>,
    validator: Arc<Validator>,
}

impl CommandSet {
    /// Creates a new `CommandSet` with no commands loaded.
    pub fn new(validator: Validator) -> Self {
        Self {
            inner: Arc::default(),
            validator: Arc::new(validator),
        }
    }

    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    /// Loads the definition at `locator`. If the definition names a
    /// `parent`, the command is registered as a subcommand of that parent.
    /// `parent` may be a space separated path, e.g. `math add`.
    pub async fn load(&self, source: &dyn DefinitionSource, locator: &str) -> Result<Arc<Command>> {
        let def = source.fetch(locator).await?;

        if let Some(path) = def.parent.clone() {
            let parent = {
                let roots = self.inner.read();
                let segments = parse_args(&path);

                match find_command(&roots, &segments) {
                    Some((parent, depth)) if depth == segments.len() => parent,
                    _ => return Err(Error::UnknownParent(path.clone())),
                }
            };

            let command = parent.attach(def, true)?;
            log::info!("[CORE] Loaded `{}` from `{}`", command.full_label(), locator);
            return Ok(command);
        }

        let command = Command::new(&def, self.validator.clone())?;
        let name = command.name();

        let mut roots = self.inner.write();
        if roots.contains_key(&name) {
            return Err(Error::DuplicateCommand(name));
        }

        roots.insert(name, command.clone());
        log::info!("[CORE] Loaded `{}` from `{}`", command.name(), locator);

        Ok(command)
    }

    /// Loads every definition `source` lists. Top-level commands are loaded
    /// before subcommands, shallower parents before deeper ones.
    ///
    /// Definitions that fail to load are logged and skipped. Returns the
    /// loaded commands together with the locators that failed.
    pub async fn load_all(
        &self,
        source: &dyn DefinitionSource,
    ) -> Result<(Vec<Arc<Command>>, Vec<(String, Error)>)> {
        let mut pending = Vec::new();
        for locator in source.list().await? {
            let depth = match source.fetch(&locator).await {
                Ok(def) => def.parent.as_deref().map_or(0, |p| parse_args(p).len()),
                Err(err) => {
                    log::error!("[CORE] Failed to fetch `{}`: {}", locator, err);
                    continue;
                }
            };

            pending.push((depth, locator));
        }

        // Stable, so locators keep their listed order within a depth.
        pending.sort_by_key(|(depth, _)| *depth);

        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for (_, locator) in pending {
            match self.load(source, &locator).await {
                Ok(command) => loaded.push(command),
                Err(err) => {
                    log::error!("[CORE] Failed to load `{}`: {}", locator, err);
                    failed.push((locator, err));
                }
            }
        }

        Ok((loaded, failed))
    }

    /// Inserts an already built top-level command.
    pub fn insert(&self, command: Arc<Command>) -> Result<()> {
        let name = command.name();

        let mut roots = self.inner.write();
        if roots.contains_key(&name) {
            return Err(Error::DuplicateCommand(name));
        }

        roots.insert(name, command);
        Ok(())
    }

    /// Returns the top-level command with the name or alias `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        crate::router::find_root(&self.inner.read(), name)
    }

    /// Removes the top-level command `name` together with its subcommands.
    pub fn remove(&self, name: &str) -> Option<Arc<Command>> {
        let command = self.inner.write().remove(&name.to_lowercase());

        if let Some(command) = &command {
            log::info!("[CORE] Removed `{}`", command.name());
        }

        command
    }

    /// Returns all top-level commands, sorted by name.
    pub fn list(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> = self.inner.read().values().cloned().collect();
        commands.sort_by_key(|command| command.name());
        commands
    }

    /// Follows `path` through the loaded commands. See
    /// [`find_command`](crate::router::find_command).
    pub fn find<S>(&self, path: &[S]) -> Option<(Arc<Command>, usize)>
    where
        S: AsRef<str>,
    {
        find_command(&self.inner.read(), path)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::CommandSet;
    use crate::command::tests::{exec, meta};
    use crate::config::PermissionScale;
    use crate::definition::RawDefinition;
    use crate::error::Error;
    use crate::source::MemorySource;
    use crate::validate::Validator;

    use std::sync::Arc;

    fn set() -> CommandSet {
        CommandSet::new(Validator::new(PermissionScale::default()).unwrap())
    }

    fn source() -> MemorySource {
        let source = MemorySource::default();
        source.insert_definition(
            "add.toml",
            RawDefinition::new("add", meta("Adds."), exec("add")).parent("math"),
        );
        source.insert_definition(
            "int.toml",
            RawDefinition::new("int", meta("Integers."), exec("int")).parent("math add"),
        );
        source.insert_definition(
            "math.toml",
            RawDefinition::new("math", meta("Does math."), exec("math")),
        );
        source.insert_definition(
            "ping.toml",
            RawDefinition::new("ping", meta("Checks latency."), exec("ping")),
        );
        source
    }

    #[tokio::test]
    async fn test_load_all() {
        let set = set();
        let source = source();

        let (loaded, failed) = set.load_all(&source).await.unwrap();
        assert_eq!(loaded.len(), 4);
        assert!(failed.is_empty());

        assert_eq!(set.len(), 2);
        let names: Vec<String> = set.list().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["math", "ping"]);

        let (int, depth) = set.find(&["math", "add", "int"]).unwrap();
        assert_eq!(depth, 3);
        assert_eq!(int.full_label(), "math add int");
        assert_eq!(int.source(), Some("int.toml"));
    }

    #[tokio::test]
    async fn test_load_errors() {
        let set = set();
        let source = source();

        assert!(matches!(
            set.load(&source, "add.toml").await,
            Err(Error::UnknownParent(parent)) if parent == "math"
        ));

        set.load(&source, "math.toml").await.unwrap();
        assert!(matches!(
            set.load(&source, "math.toml").await,
            Err(Error::DuplicateCommand(name)) if name == "math"
        ));

        set.load(&source, "add.toml").await.unwrap();
        assert!(matches!(
            set.load(&source, "add.toml").await,
            Err(Error::Registry(_))
        ));

        source.insert_definition(
            "bad.toml",
            RawDefinition::new("Bad", meta("Bad name."), exec("bad")),
        );
        let (_, failed) = set.load_all(&source).await.unwrap();
        assert!(failed.iter().any(|(locator, err)| {
            locator == "bad.toml" && matches!(err, Error::Validation(_))
        }));
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let set = set();
        let source = source();
        set.load_all(&source).await.unwrap();

        let math = set.get("MATH").unwrap();
        assert!(Arc::ptr_eq(&set.find(&["math"]).unwrap().0, &math));

        let removed = set.remove("math").unwrap();
        assert!(Arc::ptr_eq(&removed, &math));
        assert!(set.get("math").is_none());
        assert!(set.remove("math").is_none());
        assert_eq!(set.len(), 1);
    }
}
