//! Robots: ROS agents that own images and packages

use serde_yaml::Value;

use crate::error::ConfigError;

use super::attributes::{
    extendable_sequence, optional_sequence, required_identifier, required_string, scalar_text,
    set, set_default, string_sequence, Attributes,
};
use super::ros::{area_network, roscore_host, RosRuntime, RosVersion};
use super::{namespaced_id, Entity, EntityKind};

/// A robot's reference to an image or package declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Identifier of the declaration in the document
    pub local: String,
    /// `<robot_id>-<local>`, the identifier of the instance owned by the robot
    pub id: String,
}

/// A robotic agent declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    id: String,
    area: String,
    ros: RosRuntime,
    images: Vec<Reference>,
    packages: Vec<Reference>,
    variables: Vec<(String, Value)>,
    attributes: Attributes,
}

impl Robot {
    /// Validate and normalize a robot declared inside area `area_id`
    pub fn parse(mut attributes: Attributes, area_id: &str) -> Result<Self, ConfigError> {
        set(&mut attributes, "area", area_id);

        let id = required_identifier(&attributes, EntityKind::Robot)?;
        let declaration = required_string(&attributes, "ros", EntityKind::Robot, &id)?;
        let ros = RosRuntime::parse(&declaration, &id)?;

        set(&mut attributes, "ros_version", ros.version.as_str());
        set(&mut attributes, "ros_distro", ros.distro.as_str());
        set(&mut attributes, "ros_metadata", ros.metadata);

        let mut environment = extendable_sequence(&attributes, "environment", EntityKind::Robot, &id)?;
        match ros.version {
            RosVersion::Ros1 => {
                environment.push(Value::from(format!("ROS_HOSTNAME={}", roscore_host(&id))));
                environment.push(Value::from(format!(
                    "ROS_MASTER_URI=http://{}:{}",
                    roscore_host(&id),
                    ros.metadata
                )));
            }
            RosVersion::Ros2 => {
                environment.push(Value::from(format!("ROS_DOMAIN_ID={}", ros.metadata)));
            }
        }
        set(&mut attributes, "environment", environment);

        if ros.is_ros1() {
            set(
                &mut attributes,
                "ports",
                string_sequence([format!("{}:{}", ros.metadata, ros.metadata)]),
            );
            set(
                &mut attributes,
                "command",
                format!("roscore --port {}", ros.metadata),
            );
        }

        let images = namespace_references(&attributes, "images", EntityKind::Image, &id)?;
        set(&mut attributes, "images", string_sequence(images.iter().map(|r| r.id.as_str())));
        let packages = namespace_references(&attributes, "packages", EntityKind::Package, &id)?;
        set(&mut attributes, "packages", string_sequence(packages.iter().map(|r| r.id.as_str())));
        if images.is_empty() && packages.is_empty() {
            return Err(ConfigError::NoWorkload { robot: id });
        }

        // Connectivity comes from the area only.
        set(
            &mut attributes,
            "networks",
            string_sequence([area_network(area_id)]),
        );
        set_default(&mut attributes, "restart", "always");

        let variables = parse_variables(&attributes, &id)?;

        Ok(Self {
            id,
            area: area_id.to_string(),
            ros,
            images,
            packages,
            variables,
            attributes,
        })
    }

    /// Identifier of the owning area
    pub fn area(&self) -> &str {
        &self.area
    }

    /// The parsed ROS runtime
    pub fn ros(&self) -> &RosRuntime {
        &self.ros
    }

    /// Branch cloned for git entries that do not name one
    pub fn default_branch(&self) -> &str {
        &self.ros.distro
    }

    /// Image references, in declaration order
    pub fn images(&self) -> &[Reference] {
        &self.images
    }

    /// Package references, in declaration order
    pub fn packages(&self) -> &[Reference] {
        &self.packages
    }

    /// User-defined variables from the `vars` field, raw and in declaration order
    pub fn variables(&self) -> &[(String, Value)] {
        &self.variables
    }
}

impl Entity for Robot {
    fn kind(&self) -> EntityKind {
        EntityKind::Robot
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}

fn namespace_references(
    attributes: &Attributes,
    field: &str,
    kind: EntityKind,
    robot: &str,
) -> Result<Vec<Reference>, ConfigError> {
    let Some(declared) = optional_sequence(attributes, field, EntityKind::Robot, robot)? else {
        return Ok(Vec::new());
    };

    let mut references: Vec<Reference> = Vec::with_capacity(declared.len());
    for entry in declared {
        let local = scalar_text(entry).unwrap_or_default();
        if local.is_empty() {
            return Err(ConfigError::invalid(
                EntityKind::Robot,
                robot,
                field,
                format!("a {} with no identifier was listed", kind),
            ));
        }
        let id = namespaced_id(robot, &local);
        if references.iter().any(|r| r.id == id) {
            return Err(ConfigError::DuplicateReference {
                kind,
                id: local,
                owner_kind: EntityKind::Robot,
                owner: robot.to_string(),
            });
        }
        references.push(Reference { local, id });
    }
    Ok(references)
}

/// `vars` is a list of single-entry mappings: `[{NAME: value}, ...]`
fn parse_variables(
    attributes: &Attributes,
    robot: &str,
) -> Result<Vec<(String, Value)>, ConfigError> {
    let Some(entries) = optional_sequence(attributes, "vars", EntityKind::Robot, robot)? else {
        return Ok(Vec::new());
    };

    let invalid = |reason: &str| ConfigError::invalid(EntityKind::Robot, robot, "vars", reason);
    let mut variables = Vec::new();
    for entry in entries {
        let Value::Mapping(entry) = entry else {
            return Err(invalid("expected a list of mappings"));
        };
        for (name, value) in entry {
            let name = scalar_text(name).ok_or_else(|| invalid("variable names must be strings"))?;
            if scalar_text(value).is_none() {
                return Err(invalid(&format!("variable \"{}\" must have a scalar value", name)));
            }
            variables.push((name, value.clone()));
        }
    }
    Ok(variables)
}
