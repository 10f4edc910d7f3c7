//! Ordered-line view of openmw.cfg
//!
//! Lines are never parsed into a model. Directives are recognized by prefix
//! and everything else passes through untouched, so lines written by the
//! engine or the launcher survive every rewrite.

use crate::error::Result;
use crate::utils::{LineEncoding, dedup_lines, read_lines, write_lines};
use std::path::Path;

/// Base-game master directives, in load order
pub const BASE_MASTERS: [&str; 3] = [
    "content=Morrowind.esm",
    "content=Tribunal.esm",
    "content=Bloodmoon.esm",
];

/// Plugin file produced by the merge tool
pub const MERGED_PLUGIN: &str = "DeltaPluginMerged.omwaddon";

const CONTENT_PREFIX: &str = "content=";
const DATA_PREFIX: &str = "data=";
const RESOURCES_PREFIX: &str = "resources=";

/// What a single line of the document is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// `data=` asset directory
    Data,
    /// `resources=` directory
    Resources,
    /// `content=` plugin; relative order is load order
    Content,
    /// Anything else, passed through
    Other,
}

impl LineKind {
    /// Classify a line by its directive prefix
    pub fn of(line: &str) -> Self {
        let line = line.trim_start();
        if line.starts_with(CONTENT_PREFIX) {
            LineKind::Content
        } else if line.starts_with(DATA_PREFIX) {
            LineKind::Data
        } else if line.starts_with(RESOURCES_PREFIX) {
            LineKind::Resources
        } else {
            LineKind::Other
        }
    }
}

fn is_base_master(line: &str) -> bool {
    let line = line.trim();
    BASE_MASTERS.iter().any(|m| m.eq_ignore_ascii_case(line))
}

fn is_merged_plugin(line: &str) -> bool {
    line.trim()
        .strip_prefix(CONTENT_PREFIX)
        .is_some_and(|name| name.eq_ignore_ascii_case(MERGED_PLUGIN))
}

/// Render a `data="..."` directive
pub fn data_directive(path: &str) -> String {
    format!("{}\"{}\"", DATA_PREFIX, path)
}

/// Render a `resources="..."` directive
pub fn resources_directive(path: &str) -> String {
    format!("{}\"{}\"", RESOURCES_PREFIX, path)
}

/// Render a `content=` directive
pub fn content_directive(name: &str) -> String {
    format!("{}{}", CONTENT_PREFIX, name)
}

/// The two working sets threaded between unpack steps
///
/// `config_lines` holds every non-content line and `content_lines` every
/// content directive, both deduplicated with first-occurrence order kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// All lines except content directives
    pub config_lines: Vec<String>,
    /// Content directives in load order
    pub content_lines: Vec<String>,
    /// Encoding the document was read with, reused when it is written
    pub encoding: LineEncoding,
}

impl Partition {
    /// Config lines, then `added`, then content lines, with no duplicates
    ///
    /// Keeps content directives at the tail of the document.
    pub fn compose<I>(&self, added: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut lines = dedup_lines(self.config_lines.iter().cloned().chain(added));
        lines.extend(
            self.content_lines
                .iter()
                .filter(|c| !lines.contains(c))
                .cloned()
                .collect::<Vec<_>>(),
        );
        lines
    }
}

/// openmw.cfg as an ordered sequence of opaque lines
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<String>,
    encoding: LineEncoding,
}

impl ConfigDocument {
    /// Wrap existing lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            encoding: LineEncoding::Utf8,
        }
    }

    /// Read the document from disk
    ///
    /// Lines that are not UTF-8 are kept and written back byte for byte.
    pub async fn load(path: &Path) -> Result<Self> {
        let (lines, encoding) = read_lines(path, false).await?;
        Ok(Self { lines, encoding })
    }

    /// Replace the document on disk atomically
    pub async fn save(&self, path: &Path) -> Result<()> {
        write_lines(path, &self.lines, self.encoding).await
    }

    /// All lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Encoding used when saving
    pub fn encoding(&self) -> LineEncoding {
        self.encoding
    }

    /// Lines of one kind, in document order
    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &String> {
        self.lines.iter().filter(move |l| LineKind::of(l) == kind)
    }

    /// Content directives in document order
    pub fn content_lines(&self) -> impl Iterator<Item = &String> {
        self.lines_of(LineKind::Content)
    }

    /// Whether the exact line is present
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    /// Split into deduplicated config and content working sets
    pub fn partition(&self) -> Partition {
        let (content, config): (Vec<String>, Vec<String>) = self
            .lines
            .iter()
            .cloned()
            .partition(|l| LineKind::of(l) == LineKind::Content);
        Partition {
            config_lines: dedup_lines(config),
            content_lines: dedup_lines(content),
            encoding: self.encoding,
        }
    }

    /// Append a line unless an identical one is already present
    pub fn append_unique(&mut self, line: String) -> bool {
        if self.contains(&line) {
            return false;
        }
        self.lines.push(line);
        true
    }

    fn first_content_index(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| LineKind::of(l) == LineKind::Content)
    }

    /// Put the base-game masters first in load order
    ///
    /// Existing master directives are lifted out wherever they are and the
    /// three are reinserted, in order, directly above the first remaining
    /// content directive (or at the end when there is none).
    pub fn normalize_base_content(&mut self) {
        self.lines.retain(|l| !is_base_master(l));
        let at = self.first_content_index().unwrap_or(self.lines.len());
        self.lines
            .splice(at..at, BASE_MASTERS.iter().map(|m| m.to_string()));
    }

    /// Swap the base masters for the merged plugin
    ///
    /// Drops the three master directives and any previous merged-plugin
    /// directive, adds a data directive for `merge_folder` above the content
    /// block, and appends exactly one merged-plugin content directive.
    pub fn apply_merged_plugin(&mut self, merge_folder: &str) {
        self.lines
            .retain(|l| !is_base_master(l) && !is_merged_plugin(l));

        let data_line = data_directive(merge_folder);
        if !self.contains(&data_line) {
            let at = self.first_content_index().unwrap_or(self.lines.len());
            self.lines.insert(at, data_line);
        }
        self.lines.push(content_directive(MERGED_PLUGIN));
    }
}

/// Union of `existing` and `added`, first appearance wins
pub fn merge_settings(existing: Vec<String>, added: &[String]) -> Vec<String> {
    dedup_lines(existing.into_iter().chain(added.iter().cloned()))
}
