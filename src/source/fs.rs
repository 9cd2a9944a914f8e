use super::{DefinitionSource, Resource, ResourceStore};
use crate::definition::{
    Callable, ExecHandler, HelpHandler, Meta, PostCheckHandler, PreCheckHandler, RawDefinition,
    RequirementHandler,
};
use crate::error::Result;
use crate::help;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::fs;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Named handlers that definition files can refer to.
#[derive(Clone, Debug)]
pub struct HandlerTable {
    exec: HashMap<String, ExecHandler>,
    help: HashMap<String, HelpHandler>,
    requirement: HashMap<String, RequirementHandler>,
    pre_check: HashMap<String, PreCheckHandler>,
    post_check: HashMap<String, PostCheckHandler>,
}

impl HandlerTable {
    /// Creates a new table containing only the default help handler.
    pub fn new() -> Self {
        let mut table = Self {
            exec: HashMap::new(),
            help: HashMap::new(),
            requirement: HashMap::new(),
            pre_check: HashMap::new(),
            post_check: HashMap::new(),
        };

        table.help(help::handler());
        table
    }

    /// Adds an exec handler under its own name.
    pub fn exec(&mut self, handler: ExecHandler) -> &mut Self {
        self.exec.insert(handler.name().to_owned(), handler);
        self
    }

    pub fn help(&mut self, handler: HelpHandler) -> &mut Self {
        self.help.insert(handler.name().to_owned(), handler);
        self
    }

    pub fn requirement(&mut self, handler: RequirementHandler) -> &mut Self {
        self.requirement.insert(handler.name().to_owned(), handler);
        self
    }

    pub fn pre_check(&mut self, handler: PreCheckHandler) -> &mut Self {
        self.pre_check.insert(handler.name().to_owned(), handler);
        self
    }

    pub fn post_check(&mut self, handler: PostCheckHandler) -> &mut Self {
        self.post_check.insert(handler.name().to_owned(), handler);
        self
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve<H>(handlers: &HashMap<String, H>, name: Option<String>) -> Option<Callable<H>>
where
    H: Clone,
{
    let name = name?;

    Some(match handlers.get(&name) {
        Some(handler) => Callable::Bound(handler.clone()),
        None => Callable::Dangling(name),
    })
}

/// The layout of a definition file.
#[derive(Debug, Deserialize)]
struct DefinitionFile {
    name: Option<String>,
    exec: Option<String>,
    help: Option<String>,
    requirement: Option<String>,
    pre_check: Option<String>,
    post_check: Option<String>,
    parent: Option<String>,
    meta: Option<toml::Value>,
}

/// A source reading toml definition files from a directory. Resources are
/// plain files below a separate resource directory.
///
/// ```toml
/// name = "ping"
/// exec = "ping"
/// help = "default"
///
/// [meta]
/// desc = "Checks latency."
/// long_desc = "Replies with the gateway latency."
/// cooldown = 5
/// ```
#[derive(Debug)]
pub struct FsSource {
    directory: PathBuf,
    resource_dir: PathBuf,
    marker: String,
    handlers: HandlerTable,
    definitions: RwLock<HashMap<String, RawDefinition>>,
    resources: RwLock<HashMap<String, Resource>>,
}

impl FsSource {
    pub fn new<D, R, M>(directory: D, resource_dir: R, marker: M, handlers: HandlerTable) -> Self
    where
        D: Into<PathBuf>,
        R: Into<PathBuf>,
        M: ToString,
    {
        Self {
            directory: directory.into(),
            resource_dir: resource_dir.into(),
            marker: marker.to_string(),
            handlers,
            definitions: RwLock::default(),
            resources: RwLock::default(),
        }
    }

    /// Creates a new `FsSource` from the `[commands]` config section.
    pub fn from_config(config: &crate::config::Commands, handlers: HandlerTable) -> Self {
        Self::new(
            &config.directory,
            &config.resource_dir,
            &config.deletion_marker,
            handlers,
        )
    }

    fn definition_path(&self, locator: &str) -> PathBuf {
        join(&self.directory, locator)
    }

    fn resource_path(&self, locator: &str) -> PathBuf {
        join(&self.resource_dir, locator)
    }

    /// Parses the contents of a definition file.
    pub fn parse(&self, locator: &str, input: &str) -> Result<RawDefinition> {
        let file: DefinitionFile = toml::from_str(input)?;

        let mut meta = match file.meta {
            Some(value) => Meta::from_value(serde_json::to_value(value)?),
            None => Meta::new(),
        };
        meta.help = resolve(&self.handlers.help, file.help);
        meta.requirement = resolve(&self.handlers.requirement, file.requirement);
        meta.pre_check = resolve(&self.handlers.pre_check, file.pre_check);
        meta.post_check = resolve(&self.handlers.post_check, file.post_check);

        Ok(RawDefinition {
            name: file.name,
            meta,
            exec: resolve(&self.handlers.exec, file.exec),
            parent: file.parent,
            source: Some(locator.to_owned()),
        })
    }
}

fn join(base: &Path, locator: &str) -> PathBuf {
    let path = Path::new(locator);

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[async_trait]
impl DefinitionSource for FsSource {
    async fn fetch(&self, locator: &str) -> Result<RawDefinition> {
        let cached = self.definitions.read().get(locator).cloned();
        if let Some(def) = cached {
            return Ok(def);
        }

        let input = fs::read_to_string(self.definition_path(locator)).await?;
        let def = self.parse(locator, &input)?;

        log::debug!("[SOURCE] Loaded definition `{}`", locator);

        self.definitions
            .write()
            .insert(locator.to_owned(), def.clone());

        Ok(def)
    }

    fn invalidate(&self, locator: &str) {
        self.definitions.write().remove(locator);
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut locators = Vec::new();

        let mut entries = fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if !entry.file_type().await?.is_file() {
                continue;
            }

            if path.extension().map_or(false, |ext| ext == "toml") {
                locators.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        locators.sort();
        Ok(locators)
    }
}

#[async_trait]
impl ResourceStore for FsSource {
    async fn exists(&self, locator: &str) -> bool {
        fs::metadata(self.resource_path(locator)).await.is_ok()
    }

    async fn fetch(&self, locator: &str) -> Result<Resource> {
        let cached = self.resources.read().get(locator).cloned();
        if let Some(resource) = cached {
            return Ok(resource);
        }

        let content = fs::read(self.resource_path(locator)).await?;
        let resource = Resource::new(locator, content, &self.marker);

        self.resources
            .write()
            .insert(locator.to_owned(), resource.clone());

        Ok(resource)
    }

    fn invalidate(&self, locator: &str) {
        self.resources.write().remove(locator);
    }

    async fn list_resources(&self, owner: &str) -> Result<Option<Vec<String>>> {
        let dir = self.resource_dir.join(owner);

        if !fs::metadata(&dir).await.map_or(false, |m| m.is_dir()) {
            return Ok(None);
        }

        let mut locators = Vec::new();

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                locators.push(format!(
                    "{}/{}",
                    owner,
                    entry.file_name().to_string_lossy()
                ));
            }
        }

        locators.sort();
        Ok(Some(locators))
    }
}

#[cfg(test)]
mod tests {
    use super::{FsSource, HandlerTable};
    use crate::definition::{Callable, ExecHandler};
    use crate::error::Error;
    use crate::source::{DefinitionSource, ResourceStore};

    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    const PING: &str = r#"
        name = "ping"
        exec = "ping"
        help = "default"

        [meta]
        desc = "Checks latency."
        long_desc = "Replies with the gateway latency."
        cooldown = 5
        aliases = ["pong"]
        flags = [{ text = "-v", value = "Verbose", default = false }]
    "#;

    fn handlers() -> HandlerTable {
        let mut handlers = HandlerTable::new();
        handlers.exec(ExecHandler::from_fn("ping", |_| async { Ok(Value::from("pong")) }));
        handlers
    }

    fn source(dir: &TempDir) -> FsSource {
        FsSource::new(
            dir.path().join("commands"),
            dir.path().join("resources"),
            "#!delete",
            handlers(),
        )
    }

    #[test]
    fn test_parse() {
        let dir = TempDir::new().unwrap();
        let source = source(&dir);

        let def = source.parse("ping.toml", PING).unwrap();
        assert_eq!(def.name.as_deref(), Some("ping"));
        assert_eq!(def.source.as_deref(), Some("ping.toml"));
        assert!(matches!(def.exec, Some(Callable::Bound(_))));
        assert!(matches!(def.meta.help, Some(Callable::Bound(_))));
        assert_eq!(def.meta.get("cooldown"), Some(&Value::from(5)));
        assert_eq!(def.meta.get("flags").unwrap()[0]["default"], false);

        let def = source
            .parse("x.toml", "name = \"x\"\nexec = \"unknown\"\n")
            .unwrap();
        match def.exec {
            Some(Callable::Dangling(name)) => assert_eq!(name, "unknown"),
            _ => panic!("expected a dangling exec handler"),
        }
        assert!(def.meta.help.is_none());

        assert!(matches!(
            source.parse("x.toml", "name = 1"),
            Err(Error::Toml(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_and_list() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("commands")).unwrap();
        fs::write(dir.path().join("commands/ping.toml"), PING).unwrap();
        fs::write(dir.path().join("commands/notes.txt"), "ignored").unwrap();

        let source = source(&dir);
        assert_eq!(source.list().await.unwrap(), vec!["ping.toml"]);

        let def = DefinitionSource::fetch(&source, "ping.toml").await.unwrap();
        assert_eq!(def.name.as_deref(), Some("ping"));

        // Served from the cache until invalidated.
        fs::write(
            dir.path().join("commands/ping.toml"),
            PING.replace("name = \"ping\"", "name = \"latency\""),
        )
        .unwrap();
        let def = DefinitionSource::fetch(&source, "ping.toml").await.unwrap();
        assert_eq!(def.name.as_deref(), Some("ping"));

        DefinitionSource::invalidate(&source, "ping.toml");
        let def = DefinitionSource::fetch(&source, "ping.toml").await.unwrap();
        assert_eq!(def.name.as_deref(), Some("latency"));

        assert!(matches!(
            DefinitionSource::fetch(&source, "missing.toml").await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_resources() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("resources/ping")).unwrap();
        fs::write(dir.path().join("resources/ping/b.json"), "{}").unwrap();
        fs::write(dir.path().join("resources/ping/a.txt"), "#!delete\n").unwrap();
        fs::write(dir.path().join("resources/ping/logo.png"), [0x89u8, 0x50, 0xff, 0xfe]).unwrap();

        let source = source(&dir);

        assert!(source.exists("ping/a.txt").await);
        assert!(!source.exists("ping/c.txt").await);

        let resource = ResourceStore::fetch(&source, "ping/a.txt").await.unwrap();
        assert!(resource.is_deleted());
        let resource = ResourceStore::fetch(&source, "ping/b.json").await.unwrap();
        assert!(!resource.is_deleted());
        assert_eq!(resource.text(), "{}");

        // Not valid UTF-8.
        let resource = ResourceStore::fetch(&source, "ping/logo.png").await.unwrap();
        assert!(!resource.is_deleted());
        assert_eq!(resource.content, vec![0x89, 0x50, 0xff, 0xfe]);

        assert_eq!(
            source.list_resources("ping").await.unwrap(),
            Some(vec![
                String::from("ping/a.txt"),
                String::from("ping/b.json"),
                String::from("ping/logo.png"),
            ])
        );
        assert_eq!(source.list_resources("math").await.unwrap(), None);
    }
}
