//! Images: prebuilt container images, bound to a robot or global

use serde_yaml::Value;

use crate::error::ConfigError;

use super::attributes::{
    extendable_sequence, required_identifier, required_string, set, set_default, Attributes,
};
use super::ros::{area_network, roscore_host, RosVersion};
use super::{builtin, namespaced_id, placeholder, Entity, EntityKind, Robot};

/// Tag used by global images that do not declare one
pub const DEFAULT_GLOBAL_TAG: &str = "latest";

/// A reference to a prebuilt container image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    id: String,
    robot: Option<String>,
    attributes: Attributes,
}

impl Image {
    /// Validate and normalize an image owned by `robot`, or a global image when `robot` is `None`
    pub fn parse(mut attributes: Attributes, robot: Option<&Robot>) -> Result<Self, ConfigError> {
        let kind = match robot {
            Some(_) => EntityKind::Image,
            None => EntityKind::GlobalImage,
        };

        let local = required_identifier(&attributes, kind)?;
        let id = match robot {
            Some(robot) => namespaced_id(robot.id(), &local),
            None => local,
        };
        set(&mut attributes, "id", id.as_str());

        let reference = required_string(&attributes, "image", kind, &id)?;
        let (repository, tag) = split_reference(&reference);
        if tag == Some("") {
            return Err(ConfigError::invalid(kind, &id, "image", "empty tag"));
        }
        let tag = match (tag, robot) {
            (Some(tag), _) => tag.to_string(),
            (None, Some(_)) => placeholder(builtin::ROBOT_ROS_DISTRO),
            (None, None) => DEFAULT_GLOBAL_TAG.to_string(),
        };
        set(&mut attributes, "image", repository);
        set(&mut attributes, "tag", tag);

        let mut environment = extendable_sequence(&attributes, "environment", kind, &id)?;
        if let Some(robot) = robot {
            environment.extend(ros_environment(&id, robot.ros().version));
        }
        set(&mut attributes, "environment", environment);

        if let Some(robot) = robot {
            let mut networks = extendable_sequence(&attributes, "networks", kind, &id)?;
            networks.push(Value::from(area_network(robot.area())));
            set(&mut attributes, "networks", networks);

            let mut depends_on = extendable_sequence(&attributes, "depends_on", kind, &id)?;
            if robot.ros().is_ros1() {
                depends_on.push(Value::from(roscore_host(robot.id())));
            }
            set(&mut attributes, "depends_on", depends_on);
        }

        set_default(&mut attributes, "restart", "always");

        Ok(Self {
            id,
            robot: robot.map(|r| r.id().to_string()),
            attributes,
        })
    }

    /// Identifier of the owning robot, `None` for global images
    pub fn robot(&self) -> Option<&str> {
        self.robot.as_deref()
    }

    pub fn is_global(&self) -> bool {
        self.robot.is_none()
    }
}

impl Entity for Image {
    fn kind(&self) -> EntityKind {
        if self.is_global() {
            EntityKind::GlobalImage
        } else {
            EntityKind::Image
        }
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

/// Split `repository[:tag]`
///
/// A colon followed by a path (as in `registry:5000/name`) belongs to the
/// repository, so only the last colon with no `/` after it starts a tag.
fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, Some(tag)),
        _ => (reference, None),
    }
}

/// ROS environment for a container that talks to its robot's master or domain
pub(crate) fn ros_environment(container_id: &str, version: RosVersion) -> Vec<Value> {
    match version {
        RosVersion::Ros1 => vec![
            Value::from(format!("ROS_HOSTNAME={}", container_id)),
            Value::from(format!(
                "ROS_MASTER_URI=http://roscore-{}:{}",
                placeholder(builtin::ROBOT_ID),
                placeholder(builtin::ROBOT_ROS_PORT)
            )),
        ],
        RosVersion::Ros2 => vec![Value::from(format!(
            "ROS_DOMAIN_ID={}",
            placeholder(builtin::ROBOT_ROS_DOMAIN)
        ))],
    }
}
