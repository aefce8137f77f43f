//! Handler contract for populating configuration targets
//!
//! A handler produces the object for one nesting level, resolves handlers
//! for nested name segments, applies leaf properties and attaches finished
//! nested objects. Targets travel between levels type-erased as [`Target`];
//! most implementations use the typed [`ConfigHandler`] trait and let the
//! blanket adapter do the downcasting.

use crate::context::LeafProperty;
use crate::error::{ConfigError, Result};
use crate::line::PropertyLine;
use std::any::Any;

/// A type-erased configuration object
pub type Target = Box<dyn Any>;

/// Type-erased handler used by the reader for every nesting level
pub trait PropertiesHandler {
    /// Creates a fresh instance of the managed type
    fn produce_target(&self) -> Result<Target>;

    /// Resolves the handler for a nested object.
    ///
    /// `segments[0]` is the name element under consideration; the rest are
    /// the remaining intermediate elements of the line, available to handlers
    /// that group several elements into one nesting level.
    fn nested_handler(&self, _segments: &[String]) -> Option<NestedHandler> {
        None
    }

    /// Applies a leaf property to `target`, returning whether it was recognized
    fn apply_property(&self, target: &mut Target, property: &LeafProperty<'_>) -> Result<bool>;

    /// Wires a finished nested object into its parent
    fn attach_nested(&self, _target: &mut Target, _name: &str, _nested: Target) -> Result<()> {
        Ok(())
    }
}

/// Typed handler; every implementation is usable as a [`PropertiesHandler`]
pub trait ConfigHandler {
    /// Type of the object this handler populates
    type Target: 'static;

    /// Creates a fresh instance of the managed type
    fn produce(&self) -> Result<Self::Target>;

    /// See [`PropertiesHandler::nested_handler`]
    fn nested(&self, _segments: &[String]) -> Option<NestedHandler> {
        None
    }

    /// Applies a leaf property, returning whether it was recognized
    fn set(&self, target: &mut Self::Target, property: &LeafProperty<'_>) -> Result<bool>;

    /// Wires a finished nested object into `target`.
    ///
    /// Use [`downcast_target`] to recover the concrete nested type.
    fn attach(&self, _target: &mut Self::Target, _name: &str, _nested: Target) -> Result<()> {
        Ok(())
    }
}

impl<H: ConfigHandler> PropertiesHandler for H {
    fn produce_target(&self) -> Result<Target> {
        Ok(Box::new(self.produce()?))
    }

    fn nested_handler(&self, segments: &[String]) -> Option<NestedHandler> {
        self.nested(segments)
    }

    fn apply_property(&self, target: &mut Target, property: &LeafProperty<'_>) -> Result<bool> {
        let target = target
            .downcast_mut::<H::Target>()
            .ok_or_else(|| ConfigError::TargetType {
                name: property.name().to_string(),
                expected: std::any::type_name::<H::Target>(),
            })?;
        self.set(target, property)
    }

    fn attach_nested(&self, target: &mut Target, name: &str, nested: Target) -> Result<()> {
        let target = target
            .downcast_mut::<H::Target>()
            .ok_or_else(|| ConfigError::TargetType {
                name: name.to_string(),
                expected: std::any::type_name::<H::Target>(),
            })?;
        self.attach(target, name, nested)
    }
}

/// Recovers the concrete type of a nested target
pub fn downcast_target<T: 'static>(target: Target, name: &str) -> Result<T> {
    target
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| ConfigError::TargetType {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// Handler resolved for a nested name segment
pub struct NestedHandler {
    handler: Box<dyn PropertiesHandler>,
    element_count: usize,
}

impl NestedHandler {
    /// Nested handler consuming a single name element
    pub fn new(handler: impl PropertiesHandler + 'static) -> Self {
        Self::spanning(handler, 1)
    }

    /// Nested handler consuming `element_count` consecutive name elements
    pub fn spanning(handler: impl PropertiesHandler + 'static, element_count: usize) -> Self {
        Self {
            handler: Box::new(handler),
            element_count,
        }
    }

    /// Wraps an already boxed handler
    pub fn from_boxed(handler: Box<dyn PropertiesHandler>, element_count: usize) -> Self {
        Self {
            handler,
            element_count,
        }
    }

    /// Number of name elements this nesting level consumes
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub(crate) fn into_parts(self) -> (Box<dyn PropertiesHandler>, usize) {
        (self.handler, self.element_count)
    }
}

impl std::fmt::Debug for NestedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedHandler")
            .field("element_count", &self.element_count)
            .finish_non_exhaustive()
    }
}

/// Callback for leaf properties no handler recognized
pub trait UnrecognizedPropertyHandler {
    /// Returning an error aborts the read
    fn unrecognized_property(&self, property: &LeafProperty<'_>) -> Result<()>;
}

/// Callback for intermediate name elements without a nested handler
pub trait UnrecognizedNameElementHandler {
    /// `index` points at the unrecognized element of `line`; returning an
    /// error aborts the read
    fn unrecognized_name_element(&self, line: &PropertyLine, index: usize) -> Result<()>;
}

impl<F> UnrecognizedPropertyHandler for F
where
    F: Fn(&LeafProperty<'_>) -> Result<()>,
{
    fn unrecognized_property(&self, property: &LeafProperty<'_>) -> Result<()> {
        self(property)
    }
}

impl<F> UnrecognizedNameElementHandler for F
where
    F: Fn(&PropertyLine, usize) -> Result<()>,
{
    fn unrecognized_name_element(&self, line: &PropertyLine, index: usize) -> Result<()> {
        self(line, index)
    }
}

/// Built-in reactions to unrecognized names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrecognizedPolicy {
    /// Abort the read with an error naming the line
    Fail,
    /// Log a warning and continue
    Warn,
    /// Continue silently
    Ignore,
}

impl UnrecognizedPropertyHandler for UnrecognizedPolicy {
    fn unrecognized_property(&self, property: &LeafProperty<'_>) -> Result<()> {
        match self {
            UnrecognizedPolicy::Fail => Err(property.unrecognized()),
            UnrecognizedPolicy::Warn => {
                tracing::warn!(
                    property = property.name(),
                    line = property.line().ordinal(),
                    "unrecognized property"
                );
                Ok(())
            }
            UnrecognizedPolicy::Ignore => Ok(()),
        }
    }
}

impl UnrecognizedNameElementHandler for UnrecognizedPolicy {
    fn unrecognized_name_element(&self, line: &PropertyLine, index: usize) -> Result<()> {
        let element = line.name_element(index).unwrap_or_default();
        match self {
            UnrecognizedPolicy::Fail => Err(ConfigError::UnrecognizedNameElement {
                element: element.to_string(),
                name: line.name().to_string(),
                line: line.raw_text().to_string(),
                ordinal: line.ordinal(),
            }),
            UnrecognizedPolicy::Warn => {
                tracing::warn!(
                    element,
                    property = line.name(),
                    line = line.ordinal(),
                    "unrecognized name element"
                );
                Ok(())
            }
            UnrecognizedPolicy::Ignore => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter;

    impl ConfigHandler for Counter {
        type Target = u32;

        fn produce(&self) -> Result<u32> {
            Ok(0)
        }

        fn set(&self, target: &mut u32, property: &LeafProperty<'_>) -> Result<bool> {
            if property.relative_name() == "inc" {
                *target += property.parse::<u32>()?;
                return Ok(true);
            }
            Ok(false)
        }
    }

    #[test]
    fn test_typed_handler_through_erased_contract() {
        let handler: &dyn PropertiesHandler = &Counter;
        let mut target = handler.produce_target().unwrap();
        let line = PropertyLine::from_entry("inc", "5", 0).unwrap();
        let property = LeafProperty::new(&line, 0);

        assert!(handler.apply_property(&mut target, &property).unwrap());
        assert!(handler.apply_property(&mut target, &property).unwrap());
        assert_eq!(downcast_target::<u32>(target, "root").unwrap(), 10);
    }

    #[test]
    fn test_wrong_target_type_is_reported() {
        let handler: &dyn PropertiesHandler = &Counter;
        let mut target: Target = Box::new("not a counter".to_string());
        let line = PropertyLine::from_entry("inc", "1", 0).unwrap();
        let err = handler
            .apply_property(&mut target, &LeafProperty::new(&line, 0))
            .unwrap_err();
        assert!(matches!(err, ConfigError::TargetType { .. }));

        let err = downcast_target::<u32>(Box::new(1u8), "x").unwrap_err();
        assert!(matches!(err, ConfigError::TargetType { name, .. } if name == "x"));
    }

    #[test]
    fn test_nested_handler_element_count() {
        assert_eq!(NestedHandler::new(Counter).element_count(), 1);
        assert_eq!(NestedHandler::spanning(Counter, 3).element_count(), 3);
    }

    #[test]
    fn test_policies() {
        let line = PropertyLine::from_entry("a.b.c", "v", 9).unwrap();
        let property = LeafProperty::new(&line, 1);

        let err = UnrecognizedPolicy::Fail
            .unrecognized_property(&property)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnrecognizedProperty { ordinal: 9, .. }));
        assert!(UnrecognizedPolicy::Warn.unrecognized_property(&property).is_ok());
        assert!(UnrecognizedPolicy::Ignore.unrecognized_property(&property).is_ok());

        let err = UnrecognizedPolicy::Fail
            .unrecognized_name_element(&line, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnrecognizedNameElement { ref element, .. } if element == "b"
        ));
        assert!(UnrecognizedPolicy::Ignore.unrecognized_name_element(&line, 1).is_ok());
    }

    #[test]
    fn test_closures_as_callbacks() {
        let line = PropertyLine::from_entry("x.y", "1", 0).unwrap();
        let strict = |line: &PropertyLine, index: usize| -> Result<()> {
            Err(ConfigError::handler(format!(
                "{} at {}",
                line.name(),
                index
            )))
        };
        let err = strict.unrecognized_name_element(&line, 0).unwrap_err();
        assert_eq!(err.to_string(), "Handler error: x.y at 0");
    }
}
