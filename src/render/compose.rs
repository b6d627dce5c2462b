//! Compose file generation from decoded entities

use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::model::{roscore_host, scalar_text, Attributes, Entity, Image, Package, Robot, RosVersion};

/// Robot fields that only matter to the compiler
const ROBOT_EXCLUDED: &[&str] = &[
    "area",
    "images",
    "packages",
    "ros",
    "ros_metadata",
    "ros_version",
    "vars",
];

/// Image fields folded into `image` or only used by the compiler
const IMAGE_EXCLUDED: &[&str] = &["tag", "vars"];

/// Package fields consumed by the Dockerfile instead of the compose service
const PACKAGE_EXCLUDED: &[&str] = &[
    "apt",
    "command",
    "files",
    "git",
    "git_cmds",
    "ros",
    "rosinstall",
    "ssh",
    "vars",
];

/// Build the compose document incrementally
pub struct ComposeBuilder {
    version: String,
    services: Mapping,
    networks: Vec<String>,
    volumes: Vec<String>,
}

impl ComposeBuilder {
    /// Create a builder writing the given compose `version`
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            services: Mapping::new(),
            networks: vec![],
            volumes: vec![],
        }
    }

    /// Add the `roscore-<id>` master service of a ROS1 robot
    ///
    /// ROS2 has no master, so ROS2 robots add nothing.
    pub fn add_robot(&mut self, robot: &Robot) {
        if robot.ros().version == RosVersion::Ros2 {
            return;
        }
        let service = service(robot.attributes(), ROBOT_EXCLUDED, |field, text| match field {
            "id" => Some(("container_name", roscore_host(text))),
            "ros_distro" => Some(("image", format!("ros:{}", text))),
            _ => None,
        });
        self.add_service(roscore_host(robot.id()), service);
    }

    /// Add the service of a robot-bound or global image
    pub fn add_image(&mut self, image: &Image) {
        let attributes = image.attributes();
        let tag = attributes.get("tag").and_then(scalar_text);
        let service = service(attributes, IMAGE_EXCLUDED, |field, text| match field {
            "id" => Some(("container_name", text.to_string())),
            "image" => Some((
                "image",
                match &tag {
                    Some(tag) => format!("{}:{}", text, tag),
                    None => text.to_string(),
                },
            )),
            _ => None,
        });
        self.collect_resources(attributes);
        self.add_service(image.id().to_string(), service);
    }

    /// Add the service of a package, built from its own context
    pub fn add_package(&mut self, package: &Package) {
        let attributes = package.attributes();
        let id = package.id();
        let service = service(attributes, PACKAGE_EXCLUDED, |field, text| match field {
            "id" => Some(("container_name", text.to_string())),
            "path" => Some(("build", format!("{}{}", text, id))),
            _ => None,
        });
        self.collect_resources(attributes);
        self.add_service(id.to_string(), service);
    }

    fn add_service(&mut self, name: String, service: Mapping) {
        if self
            .services
            .insert(Value::from(name.as_str()), Value::Mapping(service))
            .is_some()
        {
            warn!(service = %name, "service declared twice, keeping the last one");
        }
    }

    /// Record networks and labeled volumes an entity uses
    fn collect_resources(&mut self, attributes: &Attributes) {
        for network in string_entries(attributes, "networks") {
            if !self.networks.contains(&network) {
                self.networks.push(network);
            }
        }
        for volume in string_entries(attributes, "volumes") {
            let source = volume.split(':').next().unwrap_or_default();
            if source.contains('/') || source.is_empty() {
                continue;
            }
            if !self.volumes.iter().any(|v| v == source) {
                self.volumes.push(source.to_string());
            }
        }
    }

    /// Assemble the compose document
    pub fn into_document(self) -> Mapping {
        let mut document = Mapping::new();
        document.insert(Value::from("version"), Value::from(self.version));
        document.insert(Value::from("services"), Value::Mapping(self.services));
        for (section, names) in [("networks", self.networks), ("volumes", self.volumes)] {
            if names.is_empty() {
                continue;
            }
            let entries = names
                .into_iter()
                .map(|name| (Value::from(name), Value::Mapping(Mapping::new())))
                .collect();
            document.insert(Value::from(section), Value::Mapping(entries));
        }
        document
    }

    /// Produce the compose file text
    pub fn build(self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.into_document())
    }
}

/// Build one service mapping
///
/// `special` may replace a scalar field with a differently named string.
/// Null fields and empty sequences are left out.
fn service<F>(attributes: &Attributes, excluded: &[&str], special: F) -> Mapping
where
    F: Fn(&str, &str) -> Option<(&'static str, String)>,
{
    let mut service = Mapping::new();
    for (key, value) in attributes {
        let Some(field) = scalar_text(key) else {
            continue;
        };
        if excluded.contains(&field.as_str()) || is_blank(value) {
            continue;
        }
        match scalar_text(value).and_then(|text| special(&field, &text)) {
            Some((renamed, text)) => service.insert(Value::from(renamed), Value::from(text)),
            None => service.insert(key.clone(), typed(value)),
        };
    }
    service
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

/// Give decoded string leaves their YAML type back
///
/// Decoding turns every leaf into a string; compose expects `privileged: true`
/// and `cpu_shares: 512`, not their quoted forms. Only booleans and numbers
/// that print back exactly as written are retyped.
fn typed(value: &Value) -> Value {
    match value {
        Value::String(text) => retyped(text),
        Value::Sequence(items) => Value::Sequence(items.iter().map(typed).collect()),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(k, v)| (k.clone(), typed(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => typed(&tagged.value),
        other => other.clone(),
    }
}

fn retyped(text: &str) -> Value {
    match serde_yaml::from_str::<Value>(text) {
        Ok(value @ (Value::Bool(_) | Value::Number(_)))
            if scalar_text(&value).as_deref() == Some(text) =>
        {
            value
        }
        _ => Value::from(text),
    }
}

/// Every scalar entry of a sequence field
fn string_entries(attributes: &Attributes, field: &str) -> Vec<String> {
    attributes
        .get(field)
        .and_then(Value::as_sequence)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}
