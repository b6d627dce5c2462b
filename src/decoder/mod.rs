//! Decoder: resolves `{{NAME}}` template variables across the entity hierarchy
//!
//! The walk is Area → Robot → {Image, Package}. Each area starts with a fresh
//! variable table holding `AREA_ID`; each robot extends it with its own
//! bindings and `vars`, and the extended table is applied to the robot's
//! images and packages. Entities are decoded on copies, so a template
//! shared by several robots is never mutated.

pub mod placeholder;
mod scope;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::loader::{EntityGraph, EntityPool};
use crate::model::{
    builtin, scalar_text, Area, Entity, EntityKind, Image, Package, Reference, Robot, RosVersion,
};

pub use placeholder::Unbound;
pub use scope::VariableScope;

/// Field never substituted where it is declared
const VARIABLES_FIELD: &str = "vars";

/// Renderer-ready entities, with every placeholder resolved
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGraph {
    pub areas: EntityPool<Area>,
    pub robots: EntityPool<Robot>,
    pub images: EntityPool<Image>,
    pub packages: EntityPool<Package>,
    pub global_images: EntityPool<Image>,
}

impl Default for DecodedGraph {
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

/// Walks a loaded [`EntityGraph`] and produces a [`DecodedGraph`]
pub struct Decoder<'g> {
    graph: &'g EntityGraph,
    scope: VariableScope,
    decoded: DecodedGraph,
}

impl<'g> Decoder<'g> {
    pub fn new(graph: &'g EntityGraph) -> Self {
        Self {
            graph,
            scope: VariableScope::new(),
            decoded: DecodedGraph::default(),
        }
    }

    /// Decode every area in declaration order, then pass global images through
    pub fn decode(mut self) -> Result<DecodedGraph, ConfigError> {
        let graph = self.graph;
        for area in graph.areas.iter() {
            self.decode_area(area)?;
        }
        for image in graph.global_images.iter() {
            self.decoded.global_images.upsert(image.clone());
        }
        Ok(self.decoded)
    }

    fn decode_area(&mut self, area: &Area) -> Result<(), ConfigError> {
        self.scope.clear();
        self.scope.bind(builtin::AREA_ID, area.id());
        self.decoded.areas.upsert(area.clone());
        debug!(area = area.id(), "entered area scope");

        let graph = self.graph;
        for robot_id in area.robots() {
            let robot = graph.robots.get(robot_id).ok_or_else(|| ConfigError::Undeclared {
                kind: EntityKind::Robot,
                id: robot_id.clone(),
                owner_kind: EntityKind::Area,
                owner: area.id().to_string(),
            })?;
            self.decode_robot(robot)?;
        }
        Ok(())
    }

    fn decode_robot(&mut self, robot: &Robot) -> Result<(), ConfigError> {
        // The robot itself only sees the bindings of its enclosing scope.
        let decoded = decode_entity(robot, &self.scope)?;
        self.decoded.robots.upsert(decoded);

        bind_robot(&mut self.scope, robot);
        debug!(robot = robot.id(), bindings = self.scope.len(), "entered robot scope");

        let graph = self.graph;
        for reference in robot.images() {
            let image = lookup(&graph.images, reference, robot)?;
            let decoded = decode_entity(image, &self.scope)?;
            self.decoded.images.upsert(decoded);
        }
        for reference in robot.packages() {
            let package = lookup(&graph.packages, reference, robot)?;
            let decoded = decode_entity(package, &self.scope)?;
            self.decoded.packages.upsert(decoded);
        }
        Ok(())
    }
}

/// Decode a loaded entity graph
pub fn decode(graph: &EntityGraph) -> Result<DecodedGraph, ConfigError> {
    Decoder::new(graph).decode()
}

/// Bind the robot's built-in variables and its raw `vars`
///
/// Values come from the undecoded robot. `vars` values are bound verbatim.
fn bind_robot(scope: &mut VariableScope, robot: &Robot) {
    let ros = robot.ros();
    scope.bind(builtin::ROBOT_ID, robot.id());
    scope.bind(builtin::ROBOT_ROS_DISTRO, ros.distro.as_str());
    match ros.version {
        RosVersion::Ros1 => scope.bind(builtin::ROBOT_ROS_PORT, ros.metadata.to_string()),
        RosVersion::Ros2 => scope.bind(builtin::ROBOT_ROS_DOMAIN, ros.metadata.to_string()),
    }
    for (name, value) in robot.variables() {
        if let Some(text) = scalar_text(value) {
            scope.bind(name.as_str(), text);
        }
    }
}

fn lookup<'p, E: Entity>(
    pool: &'p EntityPool<E>,
    reference: &Reference,
    robot: &Robot,
) -> Result<&'p E, ConfigError> {
    pool.get(&reference.id).ok_or_else(|| ConfigError::Undeclared {
        kind: pool.kind(),
        id: reference.local.clone(),
        owner_kind: EntityKind::Robot,
        owner: robot.id().to_string(),
    })
}

/// Substitute placeholders in a copy of `entity`
pub fn decode_entity<E: Entity>(entity: &E, scope: &VariableScope) -> Result<E, ConfigError> {
    let mut copy = entity.clone();
    substitute_mapping(copy.attributes_mut(), scope).map_err(|Unbound(placeholder)| {
        ConfigError::UnresolvedVariable {
            placeholder,
            kind: entity.kind(),
            id: entity.id().to_string(),
        }
    })?;
    Ok(copy)
}

fn substitute_mapping(mapping: &mut Mapping, scope: &VariableScope) -> Result<(), Unbound> {
    for (key, value) in mapping.iter_mut() {
        if key.as_str() == Some(VARIABLES_FIELD) {
            continue;
        }
        substitute_value(value, scope)?;
    }
    Ok(())
}

/// Substitute placeholders in a value tree
///
/// Every scalar leaf comes out as a string, placeholder or not. Null is left as is.
pub fn substitute_value(value: &mut Value, scope: &VariableScope) -> Result<(), Unbound> {
    match value {
        Value::Sequence(items) => {
            for item in items {
                substitute_value(item, scope)?;
            }
        }
        Value::Mapping(mapping) => substitute_mapping(mapping, scope)?,
        Value::Tagged(tagged) => substitute_value(&mut tagged.value, scope)?,
        Value::Null => {}
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            let text = scalar_text(value).unwrap_or_default();
            let substituted = placeholder::substitute(&text, |name| scope.get(name))?;
            *value = Value::String(substituted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::loader;
    use pretty_assertions::assert_eq;

    fn graph(yaml: &str) -> EntityGraph {
        loader::load(&Document::from_str(yaml).expect("Should parse")).expect("Should load")
    }

    fn text(attributes: &Mapping, field: &str) -> Option<String> {
        attributes.get(field).and_then(scalar_text)
    }

    #[test]
    fn test_leaves_become_strings() {
        let mut scope = VariableScope::new();
        scope.bind("ROBOT_ID", "r1");
        let mut value: Value =
            serde_yaml::from_str("[1, 2.5, true, '{{ROBOT_ID}}', null, {nested: false}]").unwrap();
        substitute_value(&mut value, &scope).expect("Should substitute");

        let expected: Value =
            serde_yaml::from_str("['1', '2.5', 'true', 'r1', null, {nested: 'false'}]").unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_vars_field_is_skipped() {
        let scope = VariableScope::new();
        let mut value: Value =
            serde_yaml::from_str("{vars: [{FOO: '{{UNBOUND}}'}], port: 1}").unwrap();
        substitute_value(&mut value, &scope).expect("vars should not be decoded");

        let expected: Value = serde_yaml::from_str("{vars: [{FOO: '{{UNBOUND}}'}], port: '1'}").unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_robot_is_decoded_with_area_scope_only() {
        let graph = graph(
            r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: melodic
    labels: {area: '{{AREA_ID}}'}
    packages: [p1]
packages:
  - id: p1
    path: ./
    command: run
    apt: [x]
"#,
        );
        let decoded = decode(&graph).expect("Should decode");
        let robot = decoded.robots.get("r1").expect("r1");
        let labels = robot.attributes().get("labels").and_then(Value::as_mapping).unwrap();
        assert_eq!(text(labels, "area").as_deref(), Some("zone1"));
    }

    #[test]
    fn test_robot_cannot_use_its_own_id() {
        let graph = graph(
            r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: melodic
    hostname: '{{ROBOT_ID}}'
    packages: [p1]
packages:
  - id: p1
    path: ./
    command: run
    apt: [x]
"#,
        );
        assert_eq!(
            decode(&graph).unwrap_err(),
            ConfigError::UnresolvedVariable {
                placeholder: "{{ROBOT_ID}}".to_string(),
                kind: EntityKind::Robot,
                id: "r1".to_string(),
            }
        );
    }

    #[test]
    fn test_ros2_binds_domain_not_port() {
        let graph = graph(
            r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: foxy:7
    images: [cam]
images:
  - id: cam
    image: camera
    labels: ['{{ROBOT_ROS_PORT}}']
"#,
        );
        assert_eq!(
            decode(&graph).unwrap_err(),
            ConfigError::UnresolvedVariable {
                placeholder: "{{ROBOT_ROS_PORT}}".to_string(),
                kind: EntityKind::Image,
                id: "r1-cam".to_string(),
            }
        );
    }

    #[test]
    fn test_scope_is_reset_between_areas() {
        let graph = graph(
            r#"
areas:
  - id: zone1
    robots: [r1]
  - id: zone2
    robots: [r2]
robots:
  - id: r1
    ros: melodic
    vars:
      - SITE: north
    images: [cam]
  - id: r2
    ros: noetic:11312
    packages: [p1]
images:
  - id: cam
    image: camera
packages:
  - id: p1
    path: ./
    command: 'run {{SITE}}'
    apt: [x]
"#,
        );
        assert!(matches!(
            decode(&graph).unwrap_err(),
            ConfigError::UnresolvedVariable { ref placeholder, .. } if placeholder == "{{SITE}}"
        ));
    }

    #[test]
    fn test_global_images_pass_through() {
        let graph = graph(
            r#"
areas: []
globals:
  - id: db
    image: postgres
    labels: ['{{NOT_DECODED}}']
    port: 5432
"#,
        );
        let decoded = decode(&graph).expect("Should decode");
        assert_eq!(decoded.global_images, graph.global_images);
    }
}
