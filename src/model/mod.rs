//! Entity model for deployment declarations
//!
//! Every entity wraps an ordered attribute bag that mirrors its declaration in
//! the configuration document, plus the fields injected while validating it.
//! Only a handful of fields are interpreted here; everything else is opaque
//! payload that flows through to the renderer untouched.

mod area;
mod attributes;
mod image;
mod package;
mod robot;
mod ros;

use std::fmt;

pub use area::Area;
pub use attributes::{scalar_text, Attributes};
pub use image::Image;
pub use package::{Package, ROS_WORKSPACE_SRC};
pub use robot::{Reference, Robot};
pub use ros::{
    area_network, roscore_host, RosRuntime, RosVersion, ROS1_DEFAULT_PORT, ROS1_DISTROS,
    ROS2_DEFAULT_DOMAIN, ROS2_DISTROS,
};

/// The kinds of entity a configuration declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Area,
    Robot,
    Image,
    GlobalImage,
    Package,
}

impl EntityKind {
    /// Human-readable name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Area => "area",
            EntityKind::Robot => "robot",
            EntityKind::Image => "image",
            EntityKind::GlobalImage => "global image",
            EntityKind::Package => "package",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of all entities
///
/// Cloning an entity deep-copies its attribute bag, which is what lets the
/// decoder substitute variables without touching the loaded template.
pub trait Entity: Clone {
    /// The kind of this entity
    fn kind(&self) -> EntityKind;

    /// Unique identifier within the entity's pool
    fn id(&self) -> &str;

    /// The attribute bag
    fn attributes(&self) -> &Attributes;

    /// Mutable access to the attribute bag
    fn attributes_mut(&mut self) -> &mut Attributes;
}

/// Variables bound by the decoder for every area and robot scope
pub mod builtin {
    pub const AREA_ID: &str = "AREA_ID";
    pub const ROBOT_ID: &str = "ROBOT_ID";
    pub const ROBOT_ROS_DISTRO: &str = "ROBOT_ROS_DISTRO";
    pub const ROBOT_ROS_PORT: &str = "ROBOT_ROS_PORT";
    pub const ROBOT_ROS_DOMAIN: &str = "ROBOT_ROS_DOMAIN";
}

/// Wrap a variable name in placeholder markers: `NAME` becomes `{{NAME}}`
pub fn placeholder(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Prefix a robot-local identifier with its owning robot's identifier
pub fn namespaced_id(robot_id: &str, local_id: &str) -> String {
    format!("{}-{}", robot_id, local_id)
}
