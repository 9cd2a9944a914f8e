//! Normalizes raw definitions into [`Metadata`].
use crate::config::PermissionScale;
use crate::definition::{
    Callable, ExecHandler, HelpHandler, PostCheckHandler, PreCheckHandler, RawDefinition,
    RequirementHandler,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const MAX_DESCRIPTION: usize = 65;
pub const MAX_LONG_DESCRIPTION: usize = 300;
pub const MAX_COOLDOWN: i64 = 200;
pub const DEFAULT_COOLDOWN: i64 = 3;
pub const DEFAULT_GROUP: i64 = 1;
pub const DEFAULT_ERROR_MESSAGE: &str =
    ":x: Something went wrong while running this command. Please try again later.";
pub const DISABLED_MESSAGE: &str = ":x: This command is currently disabled.";

static NAME: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z]+$").unwrap());

/// Returns `true` if `name` is a valid command name.
pub fn is_valid_name(name: &str) -> bool {
    NAME.is_match(name)
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("MissingName: the command has no name")]
    MissingName,
    #[error("InvalidName: `{0}` must only contain lowercase letters a-z")]
    InvalidName(String),
    #[error("MissingHandler: the `{0}` handler is required")]
    MissingHandler(&'static str),
    #[error("DanglingHandler: the `{slot}` handler `{name}` cannot be called")]
    DanglingHandler { slot: &'static str, name: String },
    #[error("MissingSource: the definition has no source location")]
    MissingSource,
    #[error("InvalidAliases: aliases must be a list of strings")]
    InvalidAliases,
    #[error("InvalidPermission: the permission level must be an integer")]
    InvalidPermission,
    #[error("UnknownPermissionLevel: {0} is not a configured permission level")]
    UnknownPermissionLevel(i64),
    #[error("UnknownDefaultPermission: the default permission `{0}` is not a configured level")]
    UnknownDefaultPermission(String),
    #[error("InvalidCooldown: the cooldown must be a whole number of seconds")]
    InvalidCooldown,
    #[error("CooldownOutOfRange: {0} is not within 0..=200")]
    CooldownOutOfRange(i64),
    #[error("MissingDescription: `{0}` is required")]
    MissingDescription(&'static str),
    #[error("DescriptionTooLong: `{field}` has {len} characters, the maximum is {max}")]
    DescriptionTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("InvalidExamples: examples must be a list of strings")]
    InvalidExamples,
    #[error("EmptyExamples: examples must not be empty")]
    EmptyExamples,
    #[error("InvalidFlag: flag #{index} is malformed: {reason}")]
    InvalidFlag { index: usize, reason: String },
    #[error("InvalidMetaNote: meta note #{index} is malformed: {reason}")]
    InvalidMetaNote { index: usize, reason: String },
    #[error("InvalidResources: resources must be a list of strings")]
    InvalidResources,
    #[error("EmptyResources: resources must not be empty")]
    EmptyResources,
    #[error("InvalidField: `{0}` has the wrong type")]
    InvalidField(&'static str),
}

/// A flag accepted by a command, shown in the help message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub text: String,
    pub value: String,
    pub default: bool,
}

/// A free-form note shown in the help message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaNote {
    pub text: String,
    pub value: String,
}

/// The normalized, validated fields of a command. This is the unit
/// swapped out on reload.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub long_description: String,
    pub syntax: String,
    pub dm_allowed: bool,
    pub flags: Vec<Flag>,
    pub cooldown: u8,
    pub permission: i64,
    pub permission_denied_message: Option<String>,
    pub error_message: String,
    pub group: i64,
    pub meta_notes: Vec<MetaNote>,
    pub examples: Vec<String>,
    pub resources: Vec<String>,
    /// Meta fields copied into subcommands that don't set them.
    pub subcommand_defaults: Map<String, Value>,
    pub requirement: Option<RequirementHandler>,
    pub exec: ExecHandler,
    pub help: HelpHandler,
    pub pre_check: Option<PreCheckHandler>,
    pub post_check: Option<PostCheckHandler>,
}

#[derive(Clone, Debug)]
pub struct Validator {
    scale: PermissionScale,
    default_permission: i64,
}

impl Validator {
    /// Creates a new `Validator` resolving permission levels against
    /// `scale`. Fails if the scale's default is not one of its levels.
    pub fn new(scale: PermissionScale) -> Result<Self, ValidationError> {
        let default_permission = scale
            .default_level()
            .ok_or_else(|| ValidationError::UnknownDefaultPermission(scale.default.clone()))?;

        Ok(Self {
            scale,
            default_permission,
        })
    }

    pub fn scale(&self) -> &PermissionScale {
        &self.scale
    }

    /// Validates `def`. When `require_source` is set the definition must
    /// carry a source location.
    pub fn validate(
        &self,
        def: &RawDefinition,
        require_source: bool,
    ) -> Result<Metadata, ValidationError> {
        let name = match def.name.as_deref().map(str::trim) {
            Some("") | None => return Err(ValidationError::MissingName),
            Some(name) => name,
        };

        // Surrounding whitespace is rejected rather than trimmed.
        if !is_valid_name(def.name.as_deref().unwrap_or_default()) {
            return Err(ValidationError::InvalidName(name.to_owned()));
        }
        let name = name.to_owned();

        let exec = required_handler("exec", def.exec.as_ref())?;
        let help = required_handler("help", def.meta.help.as_ref())?;

        if require_source && def.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ValidationError::MissingSource);
        }

        let fields = &def.meta.fields;

        let aliases = match fields.get("aliases") {
            Some(value) => {
                let list = string_list(value).ok_or(ValidationError::InvalidAliases)?;

                let mut aliases: Vec<String> = Vec::with_capacity(list.len());
                for alias in list {
                    if !aliases.contains(&alias) {
                        aliases.push(alias);
                    }
                }
                aliases
            }
            None => vec![name.clone()],
        };

        let permission = match fields.get("permission") {
            Some(value) => {
                let level = value.as_i64().ok_or(ValidationError::InvalidPermission)?;
                if !self.scale.contains(level) {
                    return Err(ValidationError::UnknownPermissionLevel(level));
                }
                level
            }
            None => self.default_permission,
        };

        let cooldown = match fields.get("cooldown") {
            Some(value) => parse_cooldown(value)?,
            None => DEFAULT_COOLDOWN as u8,
        };

        let description = description_field(fields, "desc", MAX_DESCRIPTION)?;
        let long_description = description_field(fields, "long_desc", MAX_LONG_DESCRIPTION)?;

        let examples = match fields.get("examples") {
            Some(value) => {
                let examples = string_list(value).ok_or(ValidationError::InvalidExamples)?;
                if examples.is_empty() {
                    return Err(ValidationError::EmptyExamples);
                }
                examples
            }
            None => vec![name.clone()],
        };

        let flags = match fields.get("flags") {
            Some(value) => object_list(value, "flags", |index, reason| {
                ValidationError::InvalidFlag { index, reason }
            })?,
            None => Vec::new(),
        };

        let meta_notes = match fields.get("meta_notes") {
            Some(value) => object_list(value, "meta_notes", |index, reason| {
                ValidationError::InvalidMetaNote { index, reason }
            })?,
            None => Vec::new(),
        };

        let requirement = optional_handler("requirement", def.meta.requirement.as_ref())?;
        let pre_check = optional_handler("pre_check", def.meta.pre_check.as_ref())?;
        let post_check = optional_handler("post_check", def.meta.post_check.as_ref())?;

        let resources = match fields.get("resources") {
            Some(value) => {
                let resources = string_list(value).ok_or(ValidationError::InvalidResources)?;
                if resources.is_empty() {
                    return Err(ValidationError::EmptyResources);
                }
                resources
            }
            None => Vec::new(),
        };

        let syntax = string_field(fields, "syntax")?.unwrap_or_else(|| name.clone());

        let dm_allowed = match fields.get("dm") {
            Some(Value::Bool(dm)) => *dm,
            Some(_) => return Err(ValidationError::InvalidField("dm")),
            None => true,
        };

        let group = match fields.get("group") {
            Some(value) => value
                .as_i64()
                .ok_or(ValidationError::InvalidField("group"))?,
            None => DEFAULT_GROUP,
        };

        let error_message = string_field(fields, "error_message")?
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_owned());
        let permission_denied_message = string_field(fields, "permission_denied_message")?;

        let subcommand_defaults = match fields.get("subcommand_defaults") {
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(ValidationError::InvalidField("subcommand_defaults")),
            None => Map::new(),
        };

        Ok(Metadata {
            name,
            aliases,
            description,
            long_description,
            syntax,
            dm_allowed,
            flags,
            cooldown,
            permission,
            permission_denied_message,
            error_message,
            group,
            meta_notes,
            examples,
            resources,
            subcommand_defaults,
            requirement,
            exec,
            help,
            pre_check,
            post_check,
        })
    }
}

fn required_handler<H>(slot: &'static str, handler: Option<&Callable<H>>) -> Result<H, ValidationError>
where
    H: Clone,
{
    match optional_handler(slot, handler)? {
        Some(handler) => Ok(handler),
        None => Err(ValidationError::MissingHandler(slot)),
    }
}

fn optional_handler<H>(
    slot: &'static str,
    handler: Option<&Callable<H>>,
) -> Result<Option<H>, ValidationError>
where
    H: Clone,
{
    match handler {
        Some(Callable::Bound(handler)) => Ok(Some(handler.clone())),
        Some(Callable::Dangling(name)) => Err(ValidationError::DanglingHandler {
            slot,
            name: name.clone(),
        }),
        None => Ok(None),
    }
}

fn parse_cooldown(value: &Value) -> Result<u8, ValidationError> {
    let secs = match value.as_i64() {
        Some(secs) => secs,
        // Larger than i64::MAX.
        None if value.is_u64() => i64::MAX,
        // Whole-number floats such as `5.0`. Out of range values saturate.
        None => match value.as_f64() {
            Some(secs) if secs.is_finite() && secs.fract() == 0.0 => secs as i64,
            _ => return Err(ValidationError::InvalidCooldown),
        },
    };

    if !(0..=MAX_COOLDOWN).contains(&secs) {
        return Err(ValidationError::CooldownOutOfRange(secs));
    }

    Ok(secs as u8)
}

fn description_field(
    fields: &Map<String, Value>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let desc = match fields.get(field) {
        Some(Value::String(desc)) if !desc.trim().is_empty() => desc,
        Some(Value::String(_)) | None => return Err(ValidationError::MissingDescription(field)),
        Some(_) => return Err(ValidationError::InvalidField(field)),
    };

    let len = desc.chars().count();
    if len > max {
        return Err(ValidationError::DescriptionTooLong { field, len, max });
    }

    Ok(desc.clone())
}

fn string_field(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(ValidationError::InvalidField(field)),
    }
}

/// Returns `None` unless `value` is a list of only strings.
fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(ToOwned::to_owned))
        .collect()
}

fn object_list<T, F>(value: &Value, field: &'static str, err: F) -> Result<Vec<T>, ValidationError>
where
    T: for<'de> Deserialize<'de>,
    F: Fn(usize, String) -> ValidationError,
{
    let items = value
        .as_array()
        .ok_or(ValidationError::InvalidField(field))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item.clone()).map_err(|e| err(index, e.to_string()))
        })
        .collect()
}
