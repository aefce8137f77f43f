//! Context frames for nested configuration objects
//!
//! A [`PropertyContext`] is open for as long as consecutive lines share its
//! name prefix. Frames live on a [`ContextStack`]; the frame below a context
//! is its parent. Closing a frame hands its target to the parent's handler.

use crate::error::{ConfigError, Result};
use crate::handler::{NestedHandler, PropertiesHandler, Target};
use crate::line::PropertyLine;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// The line currently being applied, and where its unconsumed name starts
#[derive(Debug, Clone, Copy)]
pub struct LeafProperty<'a> {
    line: &'a PropertyLine,
    name_element_index: usize,
}

impl<'a> LeafProperty<'a> {
    /// Creates a leaf view of `line` starting at `name_element_index`
    pub fn new(line: &'a PropertyLine, name_element_index: usize) -> Self {
        Self {
            line,
            name_element_index,
        }
    }

    /// The full line
    pub fn line(&self) -> &'a PropertyLine {
        self.line
    }

    /// Full dotted property name
    pub fn name(&self) -> &'a str {
        self.line.name()
    }

    /// Index of the first name element not consumed by enclosing contexts
    pub fn name_element_index(&self) -> usize {
        self.name_element_index
    }

    /// Property name relative to the context applying it
    pub fn relative_name(&self) -> Cow<'a, str> {
        self.line.relative_name(self.name_element_index)
    }

    /// Name elements relative to the context applying it
    pub fn relative_elements(&self) -> &'a [String] {
        self.line
            .name_elements()
            .get(self.name_element_index..)
            .unwrap_or_default()
    }

    /// Property value
    pub fn value(&self) -> &'a str {
        self.line.value()
    }

    /// Parses the value with [`FromStr`]
    pub fn parse<T>(&self) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.value().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name: self.name().to_string(),
            value: self.value().to_string(),
            message: e.to_string(),
        })
    }

    /// `true` when the value is `true` in any letter case, `false` otherwise
    pub fn as_bool(&self) -> bool {
        self.value().eq_ignore_ascii_case("true")
    }

    /// Splits the value on `separator`, trimming items and dropping empty ones
    pub fn as_list(&self, separator: char) -> Vec<String> {
        self.value()
            .split(separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Error reporting this property as unrecognized
    pub fn unrecognized(&self) -> ConfigError {
        ConfigError::UnrecognizedProperty {
            name: self.name().to_string(),
            value: self.value().to_string(),
            line: self.line.raw_text().to_string(),
            ordinal: self.line.ordinal(),
        }
    }
}

/// One open nesting level: a handler and the object it is populating
pub struct PropertyContext {
    mapped_name: Option<String>,
    mapped_name_element_count: usize,
    name_elements: Vec<String>,
    handler: Box<dyn PropertiesHandler>,
    target: Target,
}

impl PropertyContext {
    /// Creates the root context around a caller-supplied handler and target
    pub fn root(handler: Box<dyn PropertiesHandler>, target: Target) -> Self {
        Self {
            mapped_name: None,
            mapped_name_element_count: 0,
            name_elements: Vec::new(),
            handler,
            target,
        }
    }

    /// Opens a nested context for `line` elements `start..start + count`.
    ///
    /// The new path is the line's elements up to the consumed ones, so
    /// elements skipped between the parent and `start` stay part of it.
    /// The consumed elements must be non-empty and end before the leaf.
    pub fn open(line: &PropertyLine, start: usize, nested: NestedHandler) -> Result<Self> {
        let (handler, count) = nested.into_parts();
        let elements = line.name_elements();
        let leaf_index = elements.len() - 1;
        let end = start.saturating_add(count);
        if count == 0 || end > leaf_index {
            return Err(ConfigError::InvalidNesting {
                segment: elements.get(start).cloned().unwrap_or_default(),
                consumed: count,
                available: leaf_index.saturating_sub(start),
            });
        }
        let mapped_name = elements[start..end].join(".");
        let target = handler.produce_target()?;

        tracing::trace!(context = %elements[..end].join("."), "opening context");

        Ok(Self {
            mapped_name: Some(mapped_name),
            mapped_name_element_count: count,
            name_elements: elements[..end].to_vec(),
            handler,
            target,
        })
    }

    /// Name this context was opened under, `None` for the root
    pub fn mapped_name(&self) -> Option<&str> {
        self.mapped_name.as_deref()
    }

    /// Number of name elements this context consumed
    pub fn mapped_name_element_count(&self) -> usize {
        self.mapped_name_element_count
    }

    /// Path from the root to this context
    pub fn name_elements(&self) -> &[String] {
        &self.name_elements
    }

    /// Handler bound to this context
    pub fn handler(&self) -> &dyn PropertiesHandler {
        self.handler.as_ref()
    }

    /// Object being populated
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Leaf view of `line` relative to this context
    pub fn leaf<'a>(&self, line: &'a PropertyLine) -> LeafProperty<'a> {
        LeafProperty::new(line, self.name_elements.len())
    }

    /// Applies a leaf property through this context's handler
    pub fn apply(&mut self, property: &LeafProperty<'_>) -> Result<bool> {
        self.handler.apply_property(&mut self.target, property)
    }

    /// Resolves a nested handler through this context's handler
    pub fn nested_handler(&self, segments: &[String]) -> Option<NestedHandler> {
        self.handler.nested_handler(segments)
    }

    /// Hands a closed child's target to this context's handler
    pub fn attach(&mut self, child: PropertyContext) -> Result<()> {
        let name = child.mapped_name.unwrap_or_default();
        tracing::trace!(context = %child.name_elements.join("."), "closing context");
        self.handler.attach_nested(&mut self.target, &name, child.target)
    }

    /// Consumes the context, returning its target
    pub fn into_target(self) -> Target {
        self.target
    }
}

impl fmt::Debug for PropertyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContext")
            .field("mapped_name", &self.mapped_name)
            .field("mapped_name_element_count", &self.mapped_name_element_count)
            .field("name_elements", &self.name_elements)
            .finish_non_exhaustive()
    }
}

/// Stack of open contexts; the root is always at the bottom
#[derive(Debug)]
pub struct ContextStack {
    frames: Vec<PropertyContext>,
}

impl ContextStack {
    /// Creates a stack holding only `root`
    pub fn new(root: PropertyContext) -> Self {
        Self { frames: vec![root] }
    }

    /// Number of open contexts above the root
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Innermost open context
    pub fn current(&self) -> &PropertyContext {
        &self.frames[self.frames.len() - 1]
    }

    /// Innermost open context, mutably
    pub fn current_mut(&mut self) -> &mut PropertyContext {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Makes `context` the innermost one
    pub fn push(&mut self, context: PropertyContext) {
        self.frames.push(context);
    }

    /// Closes the innermost context into its parent.
    ///
    /// Returns `false` without doing anything when only the root is open.
    pub fn close_current(&mut self) -> Result<bool> {
        if self.frames.len() < 2 {
            return Ok(false);
        }
        let Some(child) = self.frames.pop() else {
            return Ok(false);
        };
        self.current_mut().attach(child)?;
        Ok(true)
    }

    /// Closes contexts whose path is longer than `prefix_len`
    pub fn unwind_to(&mut self, prefix_len: usize) -> Result<()> {
        while self.depth() > 0 && self.current().name_elements().len() > prefix_len {
            self.close_current()?;
        }
        Ok(())
    }

    /// Closes every context above the root
    pub fn unwind_all(&mut self) -> Result<()> {
        while self.close_current()? {}
        Ok(())
    }

    /// Drains the stack and returns the root target
    pub fn into_root_target(mut self) -> Result<Target> {
        self.unwind_all()?;
        self.frames
            .pop()
            .map(PropertyContext::into_target)
            .ok_or_else(|| ConfigError::handler("context stack has no root"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ConfigHandler, downcast_target};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every attach as "parent<-child"
    #[derive(Clone)]
    struct Recording {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ConfigHandler for Recording {
        type Target = Vec<String>;

        fn produce(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn set(&self, target: &mut Vec<String>, property: &LeafProperty<'_>) -> Result<bool> {
            target.push(property.relative_name().into_owned());
            Ok(true)
        }

        fn attach(&self, _target: &mut Vec<String>, name: &str, _nested: Target) -> Result<()> {
            self.log.borrow_mut().push(format!("{}<-{}", self.label, name));
            Ok(())
        }
    }

    fn stack_with_child(log: &Rc<RefCell<Vec<String>>>) -> ContextStack {
        let root = Recording {
            label: "root",
            log: Rc::clone(log),
        };
        let child = Recording {
            label: "db",
            log: Rc::clone(log),
        };
        let mut stack =
            ContextStack::new(PropertyContext::root(Box::new(root), Box::new(Vec::<String>::new())));
        let line = PropertyLine::from_entry("db.host", "localhost", 0).unwrap();
        let context = PropertyContext::open(&line, 0, NestedHandler::new(child)).unwrap();
        stack.push(context);
        stack
    }

    #[test]
    fn test_leaf_property_views() {
        let line = PropertyLine::from_entry("db.pool.size", "10", 0).unwrap();
        let leaf = LeafProperty::new(&line, 1);
        assert_eq!(leaf.relative_name(), "pool.size");
        assert_eq!(leaf.relative_elements(), ["pool", "size"]);
        assert_eq!(leaf.parse::<u32>().unwrap(), 10);
        assert!(!leaf.as_bool());

        let err = leaf.parse::<bool>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_leaf_bool_and_list() {
        let line = PropertyLine::from_entry("flag", "TRUE", 0).unwrap();
        assert!(LeafProperty::new(&line, 0).as_bool());

        let line = PropertyLine::from_entry("args", "-H:A, -H:B,,", 0).unwrap();
        assert_eq!(LeafProperty::new(&line, 0).as_list(','), vec!["-H:A", "-H:B"]);
    }

    #[test]
    fn test_open_sets_path_and_mapped_name() {
        let line = PropertyLine::from_entry("a.skipped.b.c.leaf", "v", 0).unwrap();
        let context = PropertyContext::open(
            &line,
            2,
            NestedHandler::spanning(
                Recording {
                    label: "bc",
                    log: Rc::default(),
                },
                2,
            ),
        )
        .unwrap();

        assert_eq!(context.mapped_name(), Some("b.c"));
        assert_eq!(context.mapped_name_element_count(), 2);
        assert_eq!(context.name_elements(), ["a", "skipped", "b", "c"]);
        assert_eq!(context.leaf(&line).relative_name(), "leaf");
    }

    #[test]
    fn test_open_rejects_out_of_range_elements() {
        let line = PropertyLine::from_entry("a.b.leaf", "v", 0).unwrap();
        let recording = || Recording {
            label: "x",
            log: Rc::default(),
        };

        let err = PropertyContext::open(&line, 1, NestedHandler::spanning(recording(), 2))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNesting { ref segment, consumed: 2, available: 1 } if segment == "b"
        ));

        let err = PropertyContext::open(&line, 7, NestedHandler::new(recording())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNesting { available: 0, .. }));

        let err = PropertyContext::open(&line, 0, NestedHandler::spanning(recording(), 0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNesting { consumed: 0, .. }));
    }

    #[test]
    fn test_close_attaches_to_parent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = stack_with_child(&log);
        assert_eq!(stack.depth(), 1);

        assert!(stack.close_current().unwrap());
        assert_eq!(stack.depth(), 0);
        assert_eq!(*log.borrow(), vec!["root<-db"]);
    }

    #[test]
    fn test_unwind_all_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = stack_with_child(&log);

        stack.unwind_all().unwrap();
        stack.unwind_all().unwrap();
        assert!(!stack.close_current().unwrap());
        assert_eq!(log.borrow().len(), 1);

        let target = stack.into_root_target().unwrap();
        assert_eq!(log.borrow().len(), 1);
        assert!(downcast_target::<Vec<String>>(target, "root").unwrap().is_empty());
    }

    #[test]
    fn test_unwind_to_keeps_matching_prefix() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut stack = stack_with_child(&log);

        stack.unwind_to(1).unwrap();
        assert_eq!(stack.depth(), 1);
        stack.unwind_to(0).unwrap();
        assert_eq!(stack.depth(), 0);
        assert_eq!(*log.borrow(), vec!["root<-db"]);
    }
}
