//! # Props Config Reader
//!
//! A hierarchical properties reader that maps flat, dotted `key=value` lines
//! onto a nested object graph built by pluggable handlers.
//!
//! ## Overview
//!
//! Each configuration entry is parsed into a [`PropertyLine`]. Lines are
//! sorted by name and replayed against a stack of [`PropertyContext`]s:
//! when a name enters a new nested segment the current handler is asked for
//! a nested handler and a child context is opened; when the next name no
//! longer shares a context's prefix, the context is closed and its object
//! attached to its parent. The last name element is always a leaf property
//! applied to the innermost object.
//!
//! ## Key Features
//!
//! - **Handler delegation**: implement [`ConfigHandler`] for each type in the graph
//! - **Multiple sources**: files, strings, readers, maps, or any iterator with a converter
//! - **Pluggable leniency**: policies or callbacks for unrecognized names
//! - **Serde integration**: deserialize properties straight into `#[derive(Deserialize)]` types
//! - **Generic tree**: read anything into a [`PropertyTree`] and flatten it back
//!
//! ## Basic Usage
//!
//! ```rust
//! use props_config::{
//!     ConfigHandler, LeafProperty, NestedHandler, PropertiesConfigReader, Result, Target,
//!     downcast_target,
//! };
//!
//! #[derive(Default)]
//! struct Database {
//!     host: String,
//!     port: u16,
//! }
//!
//! #[derive(Default)]
//! struct App {
//!     name: String,
//!     db: Option<Database>,
//! }
//!
//! struct DatabaseHandler;
//!
//! impl ConfigHandler for DatabaseHandler {
//!     type Target = Database;
//!
//!     fn produce(&self) -> Result<Database> {
//!         Ok(Database::default())
//!     }
//!
//!     fn set(&self, db: &mut Database, property: &LeafProperty<'_>) -> Result<bool> {
//!         match &*property.relative_name() {
//!             "host" => db.host = property.value().to_string(),
//!             "port" => db.port = property.parse()?,
//!             _ => return Ok(false),
//!         }
//!         Ok(true)
//!     }
//! }
//!
//! struct AppHandler;
//!
//! impl ConfigHandler for AppHandler {
//!     type Target = App;
//!
//!     fn produce(&self) -> Result<App> {
//!         Ok(App::default())
//!     }
//!
//!     fn nested(&self, segments: &[String]) -> Option<NestedHandler> {
//!         (segments[0] == "db").then(|| NestedHandler::new(DatabaseHandler))
//!     }
//!
//!     fn set(&self, app: &mut App, property: &LeafProperty<'_>) -> Result<bool> {
//!         if property.relative_name() == "name" {
//!             app.name = property.value().to_string();
//!             return Ok(true);
//!         }
//!         Ok(false)
//!     }
//!
//!     fn attach(&self, app: &mut App, name: &str, nested: Target) -> Result<()> {
//!         app.db = Some(downcast_target(nested, name)?);
//!         Ok(())
//!     }
//! }
//!
//! let app = PropertiesConfigReader::new(AppHandler).read_str(
//!     "# shop service\n\
//!      db.port=5432\n\
//!      name=shop\n\
//!      db.host=localhost\n",
//! )?;
//! let db = app.db.unwrap();
//! assert_eq!((db.host.as_str(), db.port), ("localhost", 5432));
//! # Ok::<(), props_config::ConfigError>(())
//! ```
//!
//! ## Serde Integration
//!
//! ```rust
//! use serde::Deserialize;
//! use props_config::from_str;
//!
//! #[derive(Debug, Deserialize)]
//! #[serde(rename_all = "kebab-case")]
//! struct NativeImage {
//!     output: String,
//!     debug_symbols: bool,
//!     additional_build_args: Vec<String>,
//! }
//!
//! let config: NativeImage = from_str(
//!     "output=target/native\n\
//!      debug-symbols=true\n\
//!      additional-build-args=-H:+ReportExceptionStackTraces,-H:-AddAllCharsets\n",
//! )?;
//! assert!(config.debug_symbols);
//! assert_eq!(config.additional_build_args.len(), 2);
//! # Ok::<(), props_config::ConfigError>(())
//! ```
//!
//! ## Handling Unrecognized Names
//!
//! Unrecognized leaf properties fail the read by default, while unrecognized
//! intermediate segments are skipped. Both reactions are configurable:
//!
//! ```rust
//! use props_config::{
//!     PropertiesConfigReader, PropertyTreeHandler, ReaderConfig, UnrecognizedPolicy,
//! };
//!
//! let config = ReaderConfig::new()
//!     .with_unrecognized_name_element(UnrecognizedPolicy::Fail)
//!     .with_unrecognized_property(UnrecognizedPolicy::Warn);
//!
//! let tree = PropertiesConfigReader::new(PropertyTreeHandler)
//!     .with_config(config)
//!     .read_map([("server.port", "8080")])?;
//! assert_eq!(tree.get_value("server.port"), Some("8080"));
//! # Ok::<(), props_config::ConfigError>(())
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use props_config::{ConfigError, FormatError, PropertiesConfigReader, PropertyTreeHandler};
//!
//! match PropertiesConfigReader::new(PropertyTreeHandler).read_str("novalue") {
//!     Err(ConfigError::Format(FormatError::MissingSeparator { line, ordinal })) => {
//!         assert_eq!((line.as_str(), ordinal), ("novalue", 1));
//!     }
//!     other => panic!("unexpected result: {:?}", other.map(|_| ())),
//! }
//! ```

pub mod context;
pub mod deserializer;
pub mod error;
pub mod handler;
pub mod line;
pub mod reader;
pub mod tree;


// Re-export main types and functions
pub use context::{ContextStack, LeafProperty, PropertyContext};
pub use deserializer::{TreeDeserializer, from_file, from_map, from_str, from_str_with_config, from_tree};
pub use error::{ConfigError, FormatError, Result, SerdeError};
pub use handler::{
    ConfigHandler, NestedHandler, PropertiesHandler, Target, UnrecognizedNameElementHandler,
    UnrecognizedPolicy, UnrecognizedPropertyHandler, downcast_target,
};
pub use line::{NameElements, PropertyLine, sort_lines};
pub use reader::{DuplicateNameBehavior, PropertiesConfigReader, ReaderConfig, read_file, read_map};
pub use tree::{PropertyChildren, PropertyTree, PropertyTreeHandler};
