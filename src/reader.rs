//! Properties reader replaying sorted lines against a context stack
//!
//! Lines are sorted by name so every name prefix forms a contiguous run.
//! The reader then makes one pass: it closes contexts the next line no
//! longer shares a prefix with, opens contexts for new nested segments,
//! and applies the leaf property to the innermost context.

use crate::context::{ContextStack, PropertyContext};
use crate::error::{ConfigError, Result};
use crate::handler::{
    ConfigHandler, UnrecognizedNameElementHandler, UnrecognizedPolicy,
    UnrecognizedPropertyHandler, downcast_target,
};
use crate::line::{PropertyLine, sort_lines};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Behavior when the same property name appears more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateNameBehavior {
    /// Apply every occurrence; the one latest in the input wins
    Override,
    /// Return an error naming both lines
    Error,
}

/// Configuration options for the reader
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Reaction to leaf properties no handler recognized
    pub unrecognized_property: UnrecognizedPolicy,
    /// Reaction to intermediate name elements without a nested handler
    pub unrecognized_name_element: UnrecognizedPolicy,
    /// Behavior when duplicate names are encountered
    pub duplicate_names: DuplicateNameBehavior,
    /// Maximum number of nested contexts open at once
    pub max_depth: usize,
}

impl ReaderConfig {
    /// Creates a new reader configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails on unrecognized properties and name elements, and on duplicates
    pub fn strict() -> Self {
        Self::default()
            .with_unrecognized_name_element(UnrecognizedPolicy::Fail)
            .with_duplicate_names(DuplicateNameBehavior::Error)
    }

    /// Sets the unrecognized property policy
    pub fn with_unrecognized_property(mut self, policy: UnrecognizedPolicy) -> Self {
        self.unrecognized_property = policy;
        self
    }

    /// Sets the unrecognized name element policy
    pub fn with_unrecognized_name_element(mut self, policy: UnrecognizedPolicy) -> Self {
        self.unrecognized_name_element = policy;
        self
    }

    /// Sets the duplicate name behavior
    pub fn with_duplicate_names(mut self, behavior: DuplicateNameBehavior) -> Self {
        self.duplicate_names = behavior;
        self
    }

    /// Sets the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            unrecognized_property: UnrecognizedPolicy::Fail,
            unrecognized_name_element: UnrecognizedPolicy::Ignore,
            duplicate_names: DuplicateNameBehavior::Override,
            max_depth: 64,
        }
    }
}

/// Reads flat properties into the object graph built by a root handler.
///
/// Every `read_*` method consumes the reader, so one reader performs
/// exactly one read:
///
/// ```compile_fail
/// use props_config::{PropertiesConfigReader, PropertyTreeHandler};
///
/// let reader = PropertiesConfigReader::new(PropertyTreeHandler);
/// let first = reader.read_str("a=1");
/// let second = reader.read_str("b=2");
/// ```
pub struct PropertiesConfigReader<H: ConfigHandler> {
    handler: H,
    target: Option<H::Target>,
    config: ReaderConfig,
    unrecognized_property: Option<Box<dyn UnrecognizedPropertyHandler>>,
    unrecognized_name_element: Option<Box<dyn UnrecognizedNameElementHandler>>,
}

impl<H> PropertiesConfigReader<H>
where
    H: ConfigHandler + 'static,
{
    /// Creates a reader whose root target is produced by `handler`
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            target: None,
            config: ReaderConfig::default(),
            unrecognized_property: None,
            unrecognized_name_element: None,
        }
    }

    /// Populates `target` instead of a freshly produced root object
    pub fn with_target(mut self, target: H::Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the reader configuration
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the unrecognized property policy with a custom callback
    pub fn with_unrecognized_property_handler(
        mut self,
        handler: impl UnrecognizedPropertyHandler + 'static,
    ) -> Self {
        self.unrecognized_property = Some(Box::new(handler));
        self
    }

    /// Replaces the unrecognized name element policy with a custom callback
    pub fn with_unrecognized_name_element_handler(
        mut self,
        handler: impl UnrecognizedNameElementHandler + 'static,
    ) -> Self {
        self.unrecognized_name_element = Some(Box::new(handler));
        self
    }

    /// Gets a reference to the reader configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Reads a properties file
    pub fn read_file<P: AsRef<Path>>(self, path: P) -> Result<H::Target> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "reading properties file");

        let lines = collect_lines(BufReader::new(file)).map_err(|err| match err {
            ConfigError::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        self.read_lines(lines)
    }

    /// Reads properties text from any buffered reader
    pub fn read_reader<R: BufRead>(self, reader: R) -> Result<H::Target> {
        let lines = collect_lines(reader)?;
        self.read_lines(lines)
    }

    /// Reads properties text
    pub fn read_str(self, text: &str) -> Result<H::Target> {
        let mut lines = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            if let Some(line) = PropertyLine::parse(raw, index + 1)? {
                lines.push(line);
            }
        }
        self.read_lines(lines)
    }

    /// Reads `(name, value)` pairs, e.g. a `HashMap<String, String>`
    pub fn read_map<I, K, V>(self, entries: I) -> Result<H::Target>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lines = entries
            .into_iter()
            .enumerate()
            .map(|(ordinal, (name, value))| {
                PropertyLine::from_entry(name.as_ref(), value.as_ref(), ordinal)
                    .map_err(ConfigError::from)
            })
            .collect::<Result<Vec<_>>>()?;
        self.read_lines(lines)
    }

    /// Reads arbitrary items, converting each one to a [`PropertyLine`]
    pub fn read_iter<I, F>(self, items: I, mut converter: F) -> Result<H::Target>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Result<PropertyLine>,
    {
        let lines = items
            .into_iter()
            .map(&mut converter)
            .collect::<Result<Vec<_>>>()?;
        self.read_lines(lines)
    }

    /// Replays already parsed lines
    pub fn read_lines(self, mut lines: Vec<PropertyLine>) -> Result<H::Target> {
        sort_lines(&mut lines);
        if self.config.duplicate_names == DuplicateNameBehavior::Error {
            check_duplicates(&lines)?;
        }
        tracing::debug!(lines = lines.len(), "replaying properties");

        let Self {
            handler,
            target,
            config,
            unrecognized_property,
            unrecognized_name_element,
        } = self;
        let callbacks = Callbacks {
            property: unrecognized_property
                .unwrap_or_else(|| Box::new(config.unrecognized_property) as Box<_>),
            name_element: unrecognized_name_element
                .unwrap_or_else(|| Box::new(config.unrecognized_name_element) as Box<_>),
            max_depth: config.max_depth,
        };

        let target = match target {
            Some(target) => target,
            None => handler.produce()?,
        };
        let mut stack = ContextStack::new(PropertyContext::root(
            Box::new(handler),
            Box::new(target),
        ));

        for line in &lines {
            callbacks.apply_line(&mut stack, line)?;
        }

        let root = stack.into_root_target()?;
        tracing::debug!("properties read complete");
        downcast_target::<H::Target>(root, "")
    }
}

struct Callbacks {
    property: Box<dyn UnrecognizedPropertyHandler>,
    name_element: Box<dyn UnrecognizedNameElementHandler>,
    max_depth: usize,
}

impl Callbacks {
    fn apply_line(&self, stack: &mut ContextStack, line: &PropertyLine) -> Result<()> {
        let prefix_len = line.common_prefix_len(stack.current().name_elements());
        stack.unwind_to(prefix_len)?;

        let leaf_index = line.name_element_count() - 1;
        let mut index = stack.current().name_elements().len();
        while index < leaf_index {
            let segments = &line.name_elements()[index..leaf_index];
            match stack.current().nested_handler(segments) {
                Some(nested) => {
                    let consumed = nested.element_count();
                    if consumed == 0 || consumed > segments.len() {
                        return Err(ConfigError::InvalidNesting {
                            segment: segments[0].clone(),
                            consumed,
                            available: segments.len(),
                        });
                    }
                    if stack.depth() >= self.max_depth {
                        return Err(ConfigError::MaxDepthExceeded {
                            name: line.name().to_string(),
                            max_depth: self.max_depth,
                        });
                    }
                    stack.push(PropertyContext::open(line, index, nested)?);
                    index += consumed;
                }
                None => {
                    self.name_element.unrecognized_name_element(line, index)?;
                    index += 1;
                }
            }
        }

        let property = stack.current().leaf(line);
        tracing::trace!(property = line.name(), "applying property");
        if !stack.current_mut().apply(&property)? {
            self.property.unrecognized_property(&property)?;
        }
        Ok(())
    }
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<PropertyLine>> {
    let mut lines = Vec::new();
    for (index, raw) in reader.lines().enumerate() {
        if let Some(line) = PropertyLine::parse(&raw?, index + 1)? {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn check_duplicates(sorted: &[PropertyLine]) -> Result<()> {
    for pair in sorted.windows(2) {
        if pair[0].name() == pair[1].name() {
            return Err(ConfigError::DuplicateProperty {
                name: pair[0].name().to_string(),
                first: pair[0].raw_text().to_string(),
                second: pair[1].raw_text().to_string(),
            });
        }
    }
    Ok(())
}

/// Reads `path` with `handler` using the default configuration
pub fn read_file<H, P>(handler: H, path: P) -> Result<H::Target>
where
    H: ConfigHandler + 'static,
    P: AsRef<Path>,
{
    PropertiesConfigReader::new(handler).read_file(path)
}

/// Reads `(name, value)` pairs with `handler` using the default configuration
pub fn read_map<H, I, K, V>(handler: H, entries: I) -> Result<H::Target>
where
    H: ConfigHandler + 'static,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    PropertiesConfigReader::new(handler).read_map(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LeafProperty;
    use crate::handler::{NestedHandler, Target};

    #[derive(Debug, Default, PartialEq)]
    struct Flat {
        entries: Vec<(String, String)>,
    }

    struct FlatHandler;

    impl ConfigHandler for FlatHandler {
        type Target = Flat;

        fn produce(&self) -> Result<Flat> {
            Ok(Flat::default())
        }

        fn nested(&self, segments: &[String]) -> Option<NestedHandler> {
            (segments[0] == "deep").then(|| NestedHandler::new(FlatHandler))
        }

        fn set(&self, target: &mut Flat, property: &LeafProperty<'_>) -> Result<bool> {
            if property.relative_name().starts_with("bad") {
                return Ok(false);
            }
            target.entries.push((
                property.relative_name().into_owned(),
                property.value().to_string(),
            ));
            Ok(true)
        }

        fn attach(&self, target: &mut Flat, name: &str, nested: Target) -> Result<()> {
            let nested = downcast_target::<Flat>(nested, name)?;
            for (key, value) in nested.entries {
                target.entries.push((format!("{}.{}", name, key), value));
            }
            Ok(())
        }
    }

    #[test]
    fn test_config_defaults_and_builders() {
        let config = ReaderConfig::new();
        assert_eq!(config.unrecognized_property, UnrecognizedPolicy::Fail);
        assert_eq!(config.unrecognized_name_element, UnrecognizedPolicy::Ignore);
        assert_eq!(config.duplicate_names, DuplicateNameBehavior::Override);
        assert_eq!(config.max_depth, 64);

        let strict = ReaderConfig::strict().with_max_depth(2);
        assert_eq!(strict.unrecognized_name_element, UnrecognizedPolicy::Fail);
        assert_eq!(strict.duplicate_names, DuplicateNameBehavior::Error);
        assert_eq!(strict.max_depth, 2);
    }

    #[test]
    fn test_read_str_sorts_before_replaying() {
        let flat = PropertiesConfigReader::new(FlatHandler)
            .read_str("b=2\n# skipped\n\na=1\n")
            .unwrap();
        assert_eq!(
            flat.entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_unrecognized_segment_becomes_part_of_relative_name() {
        let flat = PropertiesConfigReader::new(FlatHandler)
            .read_str("other.key=v")
            .unwrap();
        assert_eq!(flat.entries, vec![("other.key".to_string(), "v".to_string())]);
    }

    #[test]
    fn test_duplicates_override_by_default() {
        let flat = PropertiesConfigReader::new(FlatHandler)
            .read_str("a=1\na=2")
            .unwrap();
        assert_eq!(
            flat.entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_duplicates_rejected_when_configured() {
        let err = PropertiesConfigReader::new(FlatHandler)
            .with_config(ReaderConfig::new().with_duplicate_names(DuplicateNameBehavior::Error))
            .read_str("a=1\na=2")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateProperty { ref first, ref second, .. }
                if first == "a=1" && second == "a=2"
        ));
    }

    #[test]
    fn test_unrecognized_leaf_fails_by_default() {
        let err = PropertiesConfigReader::new(FlatHandler)
            .read_str("bad=1")
            .unwrap_err();
        assert_eq!(err.source_line(), Some("bad=1"));
    }

    #[test]
    fn test_max_depth() {
        let err = PropertiesConfigReader::new(FlatHandler)
            .with_config(ReaderConfig::new().with_max_depth(2))
            .read_str("deep.deep.deep.x=1")
            .unwrap_err();
        assert!(matches!(err, ConfigError::MaxDepthExceeded { max_depth: 2, .. }));

        let flat = PropertiesConfigReader::new(FlatHandler)
            .with_config(ReaderConfig::new().with_max_depth(2))
            .read_str("deep.deep.x=1")
            .unwrap();
        assert_eq!(
            flat.entries,
            vec![("deep.deep.x".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_with_target_populates_existing_object() {
        let existing = Flat {
            entries: vec![("pre".to_string(), "set".to_string())],
        };
        let flat = PropertiesConfigReader::new(FlatHandler)
            .with_target(existing)
            .read_map([("k", "v")])
            .unwrap();
        assert_eq!(flat.entries.len(), 2);
    }

    #[test]
    fn test_read_iter_converter_errors_abort() {
        let err = PropertiesConfigReader::new(FlatHandler)
            .read_iter(vec!["a=1", "broken"], |raw| {
                PropertyLine::parse(raw, 0)?
                    .ok_or_else(|| ConfigError::handler("blank item"))
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Format(_)));
    }
}
