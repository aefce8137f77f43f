//! Parsed representation of a single `name=value` entry
//!
//! A [`PropertyLine`] keeps the raw text it came from, its position in the
//! input and the dotted name split into elements. Lines are replayed in name
//! order, so lines sharing a name prefix are always contiguous.

use crate::error::FormatError;
use serde::Serialize;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Name elements of a property; most keys have four segments or fewer
pub type NameElements = SmallVec<[String; 4]>;

/// One configuration datum and its dotted-name decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyLine {
    raw_text: String,
    ordinal: usize,
    name: String,
    name_elements: NameElements,
    value: String,
}

impl PropertyLine {
    /// Parses one line of properties text.
    ///
    /// Returns `Ok(None)` for blank lines and `#` comments. The line is
    /// trimmed first; the name ends at the first `=`.
    pub fn parse(line: &str, ordinal: usize) -> Result<Option<Self>, FormatError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let Some(separator) = line.find('=') else {
            return Err(FormatError::MissingSeparator {
                line: line.to_string(),
                ordinal,
            });
        };

        let name = line[..separator].trim_end();
        if name.is_empty() {
            return Err(FormatError::EmptyKey {
                line: line.to_string(),
                ordinal,
            });
        }
        let value = line[separator + 1..].trim_start();

        Ok(Some(Self {
            raw_text: line.to_string(),
            ordinal,
            name: name.to_string(),
            name_elements: split_name(name),
            value: value.to_string(),
        }))
    }

    /// Builds a line from a map entry, bypassing the text scanner
    pub fn from_entry(name: &str, value: &str, ordinal: usize) -> Result<Self, FormatError> {
        if name.is_empty() {
            return Err(FormatError::EmptyKey {
                line: format!("={}", value),
                ordinal,
            });
        }

        Ok(Self {
            raw_text: format!("{}={}", name, value),
            ordinal,
            name: name.to_string(),
            name_elements: split_name(name),
            value: value.to_string(),
        })
    }

    /// Raw text this line was built from
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Position of the line in its input
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Full dotted property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name split on `.`; never empty
    pub fn name_elements(&self) -> &[String] {
        &self.name_elements
    }

    /// Number of name elements
    pub fn name_element_count(&self) -> usize {
        self.name_elements.len()
    }

    /// Name element at `index`
    pub fn name_element(&self, index: usize) -> Option<&str> {
        self.name_elements.get(index).map(String::as_str)
    }

    /// The last name element, i.e. the leaf property name
    pub fn leaf_name(&self) -> &str {
        self.name_elements
            .last()
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Property value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name elements from `index` onwards, joined with `.`
    pub fn relative_name(&self, index: usize) -> Cow<'_, str> {
        match self.name_elements.get(index..) {
            Some([single]) => Cow::Borrowed(single.as_str()),
            Some(rest) if !rest.is_empty() => Cow::Owned(rest.join(".")),
            _ => Cow::Borrowed(""),
        }
    }

    /// Number of leading name elements shared with `path`
    pub fn common_prefix_len(&self, path: &[String]) -> usize {
        self.name_elements
            .iter()
            .zip(path)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Orders lines by full name, then by ordinal
    pub fn cmp_by_name(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

fn split_name(name: &str) -> NameElements {
    name.split('.').map(str::to_string).collect()
}

/// Sorts lines into replay order
pub fn sort_lines(lines: &mut [PropertyLine]) {
    lines.sort_by(PropertyLine::cmp_by_name);
}
