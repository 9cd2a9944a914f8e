//! Capabilities for fetching command definitions and their associated
//! resources, independent of where they are stored.
pub mod fs;
pub mod mem;

pub use fs::{FsSource, HandlerTable};
pub use mem::MemorySource;

use crate::definition::RawDefinition;
use crate::error::Result;

use async_trait::async_trait;

use std::borrow::Cow;

/// Loads command definitions by location. Implementations may cache
/// fetched definitions until they are invalidated.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Returns the definition at `locator`. The returned definition has its
    /// `source` set to `locator`.
    async fn fetch(&self, locator: &str) -> Result<RawDefinition>;

    /// Drops any cached definition for `locator`. The next `fetch` reads
    /// the definition again.
    fn invalidate(&self, locator: &str);

    /// Returns the locators of all known definitions.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Loads resources associated with a command.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn exists(&self, locator: &str) -> bool;

    async fn fetch(&self, locator: &str) -> Result<Resource>;

    fn invalidate(&self, locator: &str);

    /// Returns the locators of all resources belonging to the command
    /// `owner`, or `None` if the command has no resource directory.
    async fn list_resources(&self, owner: &str) -> Result<Option<Vec<String>>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub locator: String,
    /// Raw content. Resources are not required to be text.
    pub content: Vec<u8>,
    /// Set when the content carries the deletion marker.
    pub deleted: bool,
}

impl Resource {
    pub fn new<L, C>(locator: L, content: C, marker: &str) -> Self
    where
        L: ToString,
        C: Into<Vec<u8>>,
    {
        let content = content.into();
        let deleted = is_marked(&content, marker);

        Self {
            locator: locator.to_string(),
            content,
            deleted,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the content as text. Invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Returns `true` if the first line of `content` is the deletion marker.
fn is_marked(content: &[u8], marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }

    let line = content.split(|b| *b == b'\n').next().unwrap_or_default();
    trim_ascii(line) == marker.as_bytes()
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }

    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }

    bytes
}
