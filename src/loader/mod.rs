//! Loader: builds the validated entity graph from a configuration document
//!
//! Entity constructors validate each declaration on its own; the loader adds
//! the checks that need the whole document: references must resolve,
//! identifiers must be unique per pool and ROS ports/domains unique per family.

mod pool;

use std::collections::HashSet;

use serde_yaml::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::ConfigError;
use crate::model::{
    scalar_text, Area, Attributes, Entity, EntityKind, Image, Package, Robot, RosVersion,
};

pub use pool::EntityPool;

/// All loaded entities, validated but not yet decoded
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGraph {
    pub areas: EntityPool<Area>,
    pub robots: EntityPool<Robot>,
    pub images: EntityPool<Image>,
    pub packages: EntityPool<Package>,
    pub global_images: EntityPool<Image>,
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self {
            areas: EntityPool::new(EntityKind::Area),
            robots: EntityPool::new(EntityKind::Robot),
            images: EntityPool::new(EntityKind::Image),
            packages: EntityPool::new(EntityKind::Package),
            global_images: EntityPool::new(EntityKind::GlobalImage),
        }
    }
}

/// Builds an [`EntityGraph`] out of a [`Document`]
pub struct Loader<'a> {
    document: &'a Document,
    graph: EntityGraph,
    used_ports: HashSet<u32>,
    used_domains: HashSet<u32>,
}

impl<'a> Loader<'a> {
    /// Create a loader over a parsed document
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            graph: EntityGraph::default(),
            used_ports: HashSet::new(),
            used_domains: HashSet::new(),
        }
    }

    /// Load every area (with its robots, images and packages) and every global image
    pub fn load(mut self) -> Result<EntityGraph, ConfigError> {
        let document = self.document;
        let areas = document.areas.as_ref().ok_or(ConfigError::NoAreas)?;
        for raw in areas {
            self.add_area(raw)?;
        }

        for raw in &document.globals {
            let image = Image::parse(as_attributes(raw, EntityKind::GlobalImage)?, None)?;
            debug!(id = image.id(), "loaded global image");
            self.graph.global_images.insert(image)?;
        }

        Ok(self.graph)
    }

    fn add_area(&mut self, raw: &Value) -> Result<(), ConfigError> {
        let area = Area::parse(as_attributes(raw, EntityKind::Area)?)?;
        let area_id = area.id().to_string();
        let robots = area.robots().to_vec();
        self.graph.areas.insert(area)?;
        debug!(id = %area_id, robots = robots.len(), "loaded area");

        for robot_id in &robots {
            let declaration = find_declaration(
                &self.document.robots,
                robot_id,
                EntityKind::Robot,
                Owner::new(EntityKind::Area, &area_id),
                robot_id,
            )?;
            self.add_robot(declaration, &area_id)?;
        }
        Ok(())
    }

    fn add_robot(&mut self, raw: Attributes, area_id: &str) -> Result<(), ConfigError> {
        let robot = Robot::parse(raw, area_id)?;
        if self.graph.robots.contains(robot.id()) {
            return Err(ConfigError::duplicate(EntityKind::Robot, robot.id()));
        }
        self.claim_ros_endpoint(&robot)?;

        let owner = Owner::new(EntityKind::Robot, robot.id());
        for reference in robot.packages() {
            let declaration = find_declaration(
                &self.document.packages,
                &reference.local,
                EntityKind::Package,
                owner,
                &reference.id,
            )?;
            let package = Package::parse(declaration, &robot)?;
            debug!(id = package.id(), robot = robot.id(), "loaded package");
            self.graph.packages.insert(package)?;
        }
        for reference in robot.images() {
            let declaration = find_declaration(
                &self.document.images,
                &reference.local,
                EntityKind::Image,
                owner,
                &reference.id,
            )?;
            let image = Image::parse(declaration, Some(&robot))?;
            debug!(id = image.id(), robot = robot.id(), "loaded image");
            self.graph.images.insert(image)?;
        }

        debug!(
            id = robot.id(),
            ros = %robot.ros().version,
            distro = %robot.ros().distro,
            "loaded robot"
        );
        self.graph.robots.insert(robot)
    }

    /// ROS1 robots each need their own master port, ROS2 robots their own domain
    fn claim_ros_endpoint(&mut self, robot: &Robot) -> Result<(), ConfigError> {
        let ros = robot.ros();
        match ros.version {
            RosVersion::Ros1 => {
                if !self.used_ports.insert(ros.metadata) {
                    return Err(ConfigError::PortCollision {
                        robot: robot.id().to_string(),
                        port: ros.metadata,
                    });
                }
            }
            RosVersion::Ros2 => {
                if !self.used_domains.insert(ros.metadata) {
                    return Err(ConfigError::DomainCollision {
                        robot: robot.id().to_string(),
                        domain: ros.metadata,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Load the entity graph of a document
pub fn load(document: &Document) -> Result<EntityGraph, ConfigError> {
    Loader::new(document).load()
}

/// The entity that references a declaration
#[derive(Debug, Clone, Copy)]
struct Owner<'a> {
    kind: EntityKind,
    id: &'a str,
}

impl<'a> Owner<'a> {
    fn new(kind: EntityKind, id: &'a str) -> Self {
        Self { kind, id }
    }
}

fn as_attributes(raw: &Value, kind: EntityKind) -> Result<Attributes, ConfigError> {
    match raw {
        Value::Mapping(mapping) => Ok(mapping.clone()),
        Value::Null => Ok(Attributes::new()),
        _ => Err(ConfigError::NotAMapping { kind }),
    }
}

/// Find the single declaration whose `id` is `local_id`
///
/// `instance_id` names the entity the declaration would become, for the
/// duplicate error raised when two declarations share `local_id`.
fn find_declaration(
    declarations: &[Value],
    local_id: &str,
    kind: EntityKind,
    owner: Owner<'_>,
    instance_id: &str,
) -> Result<Attributes, ConfigError> {
    let mut found: Option<&Value> = None;
    for declaration in declarations {
        let Value::Mapping(mapping) = declaration else {
            return Err(ConfigError::NotAMapping { kind });
        };
        if mapping.get("id").and_then(scalar_text).as_deref() != Some(local_id) {
            continue;
        }
        if found.is_some() {
            return Err(ConfigError::duplicate(kind, instance_id));
        }
        found = Some(declaration);
    }

    match found {
        Some(declaration) => as_attributes(declaration, kind),
        None => Err(ConfigError::Undeclared {
            kind,
            id: local_id.to_string(),
            owner_kind: owner.kind,
            owner: owner.id.to_string(),
        }),
    }
}
