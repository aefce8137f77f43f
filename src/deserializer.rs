//! Serde deserializer over property trees
//!
//! Properties are read into a [`PropertyTree`] and then deserialized into
//! any type implementing `Deserialize`. All values are strings in the
//! source, so scalars are parsed on demand from the node value.

use crate::error::{ConfigError, Result};
use crate::reader::{PropertiesConfigReader, ReaderConfig};
use crate::tree::{PropertyChildren, PropertyTree, PropertyTreeHandler};
use serde::de::value::StringDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, Visitor};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Deserializer for one node of a property tree
pub struct TreeDeserializer {
    node: PropertyTree,
    path: String,
}

impl TreeDeserializer {
    /// Creates a deserializer for the root of `tree`
    pub fn new(tree: PropertyTree) -> Self {
        Self {
            node: tree,
            path: String::new(),
        }
    }

    fn child(node: PropertyTree, parent: &str, name: &str) -> Self {
        let path = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", parent, name)
        };
        Self { node, path }
    }

    fn value_str(&self) -> Result<&str> {
        self.node.value().ok_or_else(|| {
            de::Error::custom(format!("expected a value at '{}'", self.display_path()))
        })
    }

    fn parse<T>(&self) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self.value_str()?.trim();
        value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name: self.display_path().to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
    }

    fn display_path(&self) -> &str {
        if self.path.is_empty() {
            "<root>"
        } else {
            &self.path
        }
    }

    fn into_map_access(self) -> TreeMapAccess {
        let (_, children) = self.node.into_parts();
        TreeMapAccess::new(children, self.path)
    }
}

impl<'de> de::Deserializer<'de> for TreeDeserializer {
    type Error = ConfigError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if !self.node.children().is_empty() {
            return self.deserialize_map(visitor);
        }
        match self.node.into_parts() {
            (Some(value), _) => visitor.visit_string(value),
            (None, _) => visitor.visit_unit(),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let value = self.value_str()?.trim();
        if value.eq_ignore_ascii_case("true") {
            visitor.visit_bool(true)
        } else if value.eq_ignore_ascii_case("false") {
            visitor.visit_bool(false)
        } else {
            Err(ConfigError::InvalidValue {
                name: self.display_path().to_string(),
                value: value.to_string(),
                message: "expected 'true' or 'false'".to_string(),
            })
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i8(self.parse()?)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i16(self.parse()?)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i32(self.parse()?)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_i64(self.parse()?)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u8(self.parse()?)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u16(self.parse()?)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u32(self.parse()?)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_u64(self.parse()?)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f32(self.parse()?)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_f64(self.parse()?)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_char(self.parse()?)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let value = self.value_str()?.to_string();
        visitor.visit_string(value)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_bytes(self.value_str()?.as_bytes())
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if self.node.is_empty() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let path = self.path;
        let (value, children) = self.node.into_parts();
        if !children.is_empty() {
            return visitor.visit_seq(TreeSeqAccess::from_children(children, path));
        }
        let items: Vec<PropertyTree> = value
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(PropertyTree::leaf)
                    .collect()
            })
            .unwrap_or_default();
        visitor.visit_seq(TreeSeqAccess::new(items, path))
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(self.into_map_access())
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let path = self.path;
        let (value, children) = self.node.into_parts();
        if children.is_empty() {
            let Some(variant) = value else {
                return Err(de::Error::custom(format!(
                    "expected an enum variant at '{}'",
                    path
                )));
            };
            return visitor.visit_enum(variant.trim().to_string().into_deserializer());
        }
        if children.len() != 1 {
            return Err(de::Error::custom(format!(
                "expected a single variant key at '{}', found {}",
                path,
                children.len()
            )));
        }
        let Some((variant, content)) = children.into_iter().next() else {
            return Err(de::Error::custom("empty enum node"));
        };
        visitor.visit_enum(TreeEnumAccess {
            content: TreeDeserializer::child(content, &path, &variant),
            variant,
        })
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Sequence access over numbered children or comma-separated items
struct TreeSeqAccess {
    items: std::vec::IntoIter<(String, PropertyTree)>,
    path: String,
}

impl TreeSeqAccess {
    fn new(items: Vec<PropertyTree>, path: String) -> Self {
        let items: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect();
        Self {
            items: items.into_iter(),
            path,
        }
    }

    /// Numeric child names are ordered numerically, others keep tree order
    fn from_children(children: PropertyChildren, path: String) -> Self {
        let mut items: Vec<_> = children.into_iter().collect();
        if items.iter().all(|(name, _)| name.parse::<u64>().is_ok()) {
            items.sort_by_key(|(name, _)| name.parse::<u64>().unwrap_or(u64::MAX));
        }
        Self {
            items: items.into_iter(),
            path,
        }
    }
}

impl<'de> de::SeqAccess<'de> for TreeSeqAccess {
    type Error = ConfigError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some((name, node)) => seed
                .deserialize(TreeDeserializer::child(node, &self.path, &name))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Map access over the children of a node
struct TreeMapAccess {
    children: indexmap::map::IntoIter<String, PropertyTree>,
    current: Option<(String, PropertyTree)>,
    path: String,
}

impl TreeMapAccess {
    fn new(children: PropertyChildren, path: String) -> Self {
        Self {
            children: children.into_iter(),
            current: None,
            path,
        }
    }
}

impl<'de> de::MapAccess<'de> for TreeMapAccess {
    type Error = ConfigError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.children.next() {
            Some((name, node)) => {
                let key_deserializer: StringDeserializer<ConfigError> =
                    name.clone().into_deserializer();
                let key = seed.deserialize(key_deserializer)?;
                self.current = Some((name, node));
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current.take() {
            Some((name, node)) => seed.deserialize(TreeDeserializer::child(node, &self.path, &name)),
            None => Err(de::Error::custom("No value available for map entry")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.children.len())
    }
}

/// Enum access for `variant.field=value` style enums
struct TreeEnumAccess {
    variant: String,
    content: TreeDeserializer,
}

impl<'de> de::EnumAccess<'de> for TreeEnumAccess {
    type Error = ConfigError;
    type Variant = TreeDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant_deserializer: StringDeserializer<ConfigError> =
            self.variant.into_deserializer();
        let variant = seed.deserialize(variant_deserializer)?;
        Ok((variant, self.content))
    }
}

impl<'de> de::VariantAccess<'de> for TreeDeserializer {
    type Error = ConfigError;

    fn unit_variant(self) -> Result<()> {
        if self.node.is_empty() {
            Ok(())
        } else {
            Err(de::Error::custom(format!(
                "expected unit variant at '{}', found data",
                self.display_path()
            )))
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }
}

/// Deserializes an already built property tree
pub fn from_tree<T>(tree: PropertyTree) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(TreeDeserializer::new(tree))
}

/// Convenience function to deserialize properties text into a Rust type
pub fn from_str<T>(text: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    from_tree(PropertiesConfigReader::new(PropertyTreeHandler).read_str(text)?)
}

/// Convenience function to deserialize `(name, value)` pairs into a Rust type
pub fn from_map<T, I, K, V>(entries: I) -> Result<T>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    from_tree(PropertiesConfigReader::new(PropertyTreeHandler).read_map(entries)?)
}

/// Convenience function to deserialize a properties file into a Rust type
pub fn from_file<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    from_tree(PropertiesConfigReader::new(PropertyTreeHandler).read_file(path)?)
}

/// Deserializes properties text with a custom reader configuration
pub fn from_str_with_config<T>(text: &str, config: ReaderConfig) -> Result<T>
where
    T: DeserializeOwned,
{
    let tree = PropertiesConfigReader::new(PropertyTreeHandler)
        .with_config(config)
        .read_str(text)?;
    from_tree(tree)
}
