//! Basic usage example for the properties reader
//!
//! Reads a native-image build configuration twice: once through hand-written
//! handlers and once through serde.

use props_config::{
    ConfigError, ConfigHandler, LeafProperty, NestedHandler, PropertiesConfigReader, ReaderConfig,
    Result, Target, UnrecognizedPolicy, downcast_target, from_str,
};
use serde::Deserialize;

#[derive(Debug, Default)]
struct Agent {
    enabled: bool,
    options: Vec<String>,
}

#[derive(Debug, Default)]
struct NativeImage {
    output: String,
    debug_symbols: bool,
    build_args: Vec<String>,
    agent: Option<Agent>,
}

struct AgentHandler;

impl ConfigHandler for AgentHandler {
    type Target = Agent;

    fn produce(&self) -> Result<Agent> {
        Ok(Agent::default())
    }

    fn set(&self, agent: &mut Agent, property: &LeafProperty<'_>) -> Result<bool> {
        match &*property.relative_name() {
            "enabled" => agent.enabled = property.as_bool(),
            "options" => agent.options = property.as_list(','),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

struct NativeImageHandler;

impl ConfigHandler for NativeImageHandler {
    type Target = NativeImage;

    fn produce(&self) -> Result<NativeImage> {
        Ok(NativeImage::default())
    }

    fn nested(&self, segments: &[String]) -> Option<NestedHandler> {
        (segments[0] == "agent").then(|| NestedHandler::new(AgentHandler))
    }

    fn set(&self, image: &mut NativeImage, property: &LeafProperty<'_>) -> Result<bool> {
        match &*property.relative_name() {
            "output" => image.output = property.value().to_string(),
            "debug-symbols" => image.debug_symbols = property.as_bool(),
            "additional-build-args" => image.build_args = property.as_list(','),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn attach(&self, image: &mut NativeImage, name: &str, nested: Target) -> Result<()> {
        image.agent = Some(downcast_target(nested, name)?);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImageSettings {
    output: String,
    debug_symbols: bool,
    additional_build_args: Vec<String>,
}

fn main() -> std::result::Result<(), ConfigError> {
    let properties = r#"
        # native image build
        output=target/native/app
        debug-symbols=true
        additional-build-args=-H:+ReportExceptionStackTraces, --no-fallback
        agent.enabled=TRUE
        agent.options=config-output-dir=target/agent
        experimental.pgo=true
    "#;

    // Unknown keys such as `experimental.pgo` are logged instead of failing
    let image = PropertiesConfigReader::new(NativeImageHandler)
        .with_config(ReaderConfig::new().with_unrecognized_property(UnrecognizedPolicy::Warn))
        .read_str(properties)?;

    println!("Handler-built configuration:");
    println!("  output: {}", image.output);
    println!("  debug symbols: {}", image.debug_symbols);
    println!("  build args: {:?}", image.build_args);
    if let Some(agent) = &image.agent {
        println!("  agent: enabled={} options={:?}", agent.enabled, agent.options);
    }

    let settings: ImageSettings = from_str(
        "output=target/native/app\n\
         debug-symbols=false\n\
         additional-build-args=--no-fallback\n",
    )?;
    println!("Serde-built configuration:");
    println!("  output: {}", settings.output);
    println!("  debug symbols: {}", settings.debug_symbols);
    println!("  build args: {:?}", settings.additional_build_args);

    match PropertiesConfigReader::new(NativeImageHandler).read_str("unknown=1") {
        Ok(_) => println!("Unexpectedly accepted an unknown property"),
        Err(e) => println!("Strict read failed as expected: {}", e),
    }

    Ok(())
}
