//! Hot-swapping of command definitions.
use crate::command::Command;
use crate::error::{Error, Result};
use crate::source::{DefinitionSource, ResourceStore};

use std::sync::Arc;

/// The resources touched by a single reload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Resources that were fetched again.
    pub refreshed: Vec<String>,
    /// Resources that carried the deletion marker and were dropped.
    pub evicted: Vec<String>,
}

#[derive(Clone)]
pub struct Reloader {
    definitions: Arc<dyn DefinitionSource>,
    resources: Arc<dyn ResourceStore>,
    sweep_resource_dir: bool,
}

impl Reloader {
    pub fn new(definitions: Arc<dyn DefinitionSource>, resources: Arc<dyn ResourceStore>) -> Self {
        Self {
            definitions,
            resources,
            sweep_resource_dir: true,
        }
    }

    /// Sets whether the resource directory named after the command is swept
    /// on reload.
    pub fn sweep_resource_dir(mut self, sweep: bool) -> Self {
        self.sweep_resource_dir = sweep;
        self
    }

    /// Fetches the command's definition again and replaces all of its
    /// metadata. Subcommands are kept. Afterwards all associated resources
    /// are refreshed.
    ///
    /// The reload stops at the first error. Steps that already completed
    /// are not undone: if refreshing a resource fails, the command keeps the
    /// new metadata.
    pub async fn reload(&self, command: &Command) -> Result<ReloadReport> {
        let source = command
            .source()
            .ok_or_else(|| Error::NoSource(command.full_label()))?
            .to_owned();

        self.definitions.invalidate(&source);
        let mut def = self.definitions.fetch(&source).await?;

        // Subcommands get the same inherited fields as when they were attached.
        if let Some(parent) = command.parent() {
            parent.inherit(&mut def);
        }

        let meta = command.validator().validate(&def, false)?;
        let resources = meta.resources.clone();
        let name = meta.name.clone();

        let old = command.replace_meta(meta);
        if old.name != name {
            log::warn!(
                "[RELOAD] Command `{}` was renamed to `{}`",
                old.name,
                name
            );
        }

        let mut report = ReloadReport::default();

        for locator in &resources {
            self.refresh(locator, &mut report).await?;
        }

        if self.sweep_resource_dir {
            if let Some(locators) = self.resources.list_resources(&name).await? {
                for locator in &locators {
                    self.refresh(locator, &mut report).await?;
                }
            }
        }

        log::info!(
            "[RELOAD] Reloaded `{}` from `{}` ({} refreshed, {} evicted)",
            command.full_label(),
            source,
            report.refreshed.len(),
            report.evicted.len()
        );

        Ok(report)
    }

    async fn refresh(&self, locator: &str, report: &mut ReloadReport) -> Result<()> {
        if !self.resources.exists(locator).await {
            log::debug!("[RELOAD] Skipping missing resource `{}`", locator);
            return Ok(());
        }

        self.resources.invalidate(locator);
        let resource = self.resources.fetch(locator).await?;

        if resource.is_deleted() {
            self.resources.invalidate(locator);
            report.evicted.push(locator.to_owned());
        } else {
            report.refreshed.push(locator.to_owned());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ReloadReport, Reloader};
    use crate::command::tests::{exec, meta, validator};
    use crate::command::Command;
    use crate::config::PermissionScale;
    use crate::definition::{Meta, RawDefinition};
    use crate::error::Error;
    use crate::handler::CommandSet;
    use crate::model::Context;
    use crate::source::{DefinitionSource, MemorySource, ResourceStore};
    use crate::validate::Validator;

    use serde_json::{json, Value};
    use std::sync::Arc;

    fn setup() -> (Arc<MemorySource>, Reloader) {
        let source = Arc::new(MemorySource::default());
        let reloader = Reloader::new(source.clone(), source.clone());
        (source, reloader)
    }

    async fn load(source: &MemorySource, locator: &str) -> Arc<Command> {
        let def = DefinitionSource::fetch(source, locator).await.unwrap();
        Command::new(&def, validator()).unwrap()
    }

    #[tokio::test]
    async fn test_reload_replaces_meta() {
        let (source, reloader) = setup();
        source.insert_definition(
            "math.toml",
            RawDefinition::new("math", meta("Does math.").set("cooldown", 5), exec("old")),
        );

        let math = load(&source, "math.toml").await;
        let add = math
            .register_subcommand("add", meta("Adds."), exec("add"))
            .unwrap();
        math.register_subcommand_alias("plus", "add").unwrap();

        source.insert_definition(
            "math.toml",
            RawDefinition::new(
                "math",
                meta("Does more math.").set("cooldown", 10),
                exec("new"),
            ),
        );

        let report = reloader.reload(&math).await.unwrap();
        assert_eq!(report, ReloadReport::default());

        assert_eq!(math.description(), "Does more math.");
        assert_eq!(math.cooldown(), 10);
        assert_eq!(
            math.run(Context::new("!math")).await.unwrap(),
            Value::from("new")
        );

        // The subtree is untouched.
        assert!(Arc::ptr_eq(&math.subcommand("add").unwrap(), &add));
        assert!(Arc::ptr_eq(&add.parent().unwrap(), &math));
        assert_eq!(math.subcommand_aliases().get("plus").unwrap(), "add");
    }

    #[tokio::test]
    async fn test_reload_without_source() {
        let (_, reloader) = setup();

        let math = load_static();
        let add = math
            .register_subcommand("add", meta("Adds."), exec("add"))
            .unwrap();

        assert!(matches!(
            reloader.reload(&add).await,
            Err(Error::NoSource(label)) if label == "math add"
        ));
    }

    fn load_static() -> Arc<Command> {
        let def = RawDefinition::new("math", meta("Does math."), exec("math")).source("math");
        Command::new(&def, validator()).unwrap()
    }

    #[tokio::test]
    async fn test_reload_invalid_definition() {
        let (source, reloader) = setup();
        source.insert_definition(
            "ping.toml",
            RawDefinition::new("ping", meta("Checks latency."), exec("ping")),
        );
        let ping = load(&source, "ping.toml").await;

        source.insert_definition(
            "ping.toml",
            RawDefinition::new("ping", meta("Checks latency.").set("cooldown", 999), exec("ping")),
        );

        assert!(matches!(
            reloader.reload(&ping).await,
            Err(Error::Validation(_))
        ));
        // Nothing was replaced.
        assert_eq!(ping.cooldown(), 3);
    }

    #[tokio::test]
    async fn test_reload_resources() {
        let (source, reloader) = setup();
        source.insert_definition(
            "ping.toml",
            RawDefinition::new(
                "ping",
                meta("Checks latency.").set("resources", json!(["data/ping.json", "data/gone.json"])),
                exec("ping"),
            ),
        );
        source.insert_resource("data/ping.json", "{}");
        source.insert_resource("ping/strings.txt", "pong");
        source.insert_resource("ping/old.txt", "#!delete\n");

        let ping = load(&source, "ping.toml").await;
        ResourceStore::fetch(&*source, "data/ping.json").await.unwrap();
        source.insert_resource("data/ping.json", "{\"v\":2}");

        let report = reloader.reload(&ping).await.unwrap();

        // `data/gone.json` doesn't exist and is skipped.
        assert_eq!(
            report.refreshed,
            vec![String::from("data/ping.json"), String::from("ping/strings.txt")]
        );
        assert_eq!(report.evicted, vec![String::from("ping/old.txt")]);

        assert_eq!(
            ResourceStore::fetch(&*source, "data/ping.json")
                .await
                .unwrap()
                .text(),
            "{\"v\":2}"
        );
        assert!(source.is_resource_cached("ping/strings.txt"));
        assert!(!source.is_resource_cached("ping/old.txt"));
    }

    #[tokio::test]
    async fn test_reload_without_sweep() {
        let (source, reloader) = setup();
        let reloader = reloader.sweep_resource_dir(false);

        source.insert_definition(
            "ping.toml",
            RawDefinition::new("ping", meta("Checks latency."), exec("ping")),
        );
        source.insert_resource("ping/strings.txt", "pong");

        let ping = load(&source, "ping.toml").await;
        let report = reloader.reload(&ping).await.unwrap();

        assert!(report.refreshed.is_empty());
        assert!(!source.is_resource_cached("ping/strings.txt"));
    }

    #[tokio::test]
    async fn test_reload_subcommand() {
        let (source, reloader) = setup();
        let set = CommandSet::new(Validator::new(PermissionScale::default()).unwrap());

        source.insert_definition(
            "math.toml",
            RawDefinition::new(
                "math",
                meta("Does math.").set("subcommand_defaults", json!({ "cooldown": 10 })),
                exec("math"),
            ),
        );
        // No help handler of its own.
        let add_meta = Meta::from_value(json!({
            "desc": "Adds.",
            "long_desc": "Adds two numbers.",
        }));
        let mut add = RawDefinition::new("add", add_meta, exec("add")).parent("math");
        source.insert_definition("add.toml", add.clone());

        set.load_all(&*source).await.unwrap();
        let (add_cmd, _) = set.find(&["math", "add"]).unwrap();
        assert_eq!(add_cmd.cooldown(), 10);

        // Unchanged definition.
        reloader.reload(&add_cmd).await.unwrap();
        assert_eq!(add_cmd.cooldown(), 10);
        assert_eq!(add_cmd.help().await.unwrap(), "math add");

        // Changed definition, still inheriting.
        add.meta = add.meta.set("desc", "Adds numbers.");
        source.insert_definition("add.toml", add);

        reloader.reload(&add_cmd).await.unwrap();
        assert_eq!(add_cmd.description(), "Adds numbers.");
        assert_eq!(add_cmd.cooldown(), 10);
        assert_eq!(add_cmd.full_label(), "math add");
    }

    /// A resource store whose fetch always fails.
    struct Broken;

    #[async_trait::async_trait]
    impl ResourceStore for Broken {
        async fn exists(&self, _: &str) -> bool {
            true
        }

        async fn fetch(&self, locator: &str) -> crate::error::Result<crate::source::Resource> {
            Err(Error::NotFound(locator.to_owned()))
        }

        fn invalidate(&self, _: &str) {}

        async fn list_resources(&self, _: &str) -> crate::error::Result<Option<Vec<String>>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_reload_is_not_transactional() {
        let source = Arc::new(MemorySource::default());
        let reloader = Reloader::new(source.clone(), Arc::new(Broken));

        source.insert_definition(
            "ping.toml",
            RawDefinition::new("ping", meta("Checks latency."), exec("ping")),
        );
        let ping = load(&source, "ping.toml").await;

        source.insert_definition(
            "ping.toml",
            RawDefinition::new(
                "ping",
                meta("Checks latency again.").set("resources", json!(["data/ping.json"])),
                exec("ping"),
            ),
        );

        assert!(matches!(
            reloader.reload(&ping).await,
            Err(Error::NotFound(_))
        ));
        // The metadata swap is kept.
        assert_eq!(ping.description(), "Checks latency again.");
    }
}
