//! Areas: zones that group robots on a shared network

use serde_yaml::Value;

use crate::error::ConfigError;

use super::attributes::{required, required_identifier, scalar_text, Attributes};
use super::{Entity, EntityKind};

/// A physical or logical zone where several robots operate
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    id: String,
    robots: Vec<String>,
    attributes: Attributes,
}

impl Area {
    /// Validate an area declaration
    ///
    /// The attribute bag is kept as declared.
    pub fn parse(attributes: Attributes) -> Result<Self, ConfigError> {
        if attributes.is_empty() {
            return Err(ConfigError::EmptyDeclaration {
                kind: EntityKind::Area,
            });
        }

        let id = required_identifier(&attributes, EntityKind::Area)?;
        let declared = required(&attributes, "robots", EntityKind::Area, Some(&id))?;
        let Value::Sequence(declared) = declared else {
            return Err(ConfigError::invalid(
                EntityKind::Area,
                &id,
                "robots",
                "expected a list of robot ids",
            ));
        };

        let mut seen: Vec<&Value> = Vec::with_capacity(declared.len());
        let mut robots = Vec::with_capacity(declared.len());
        for entry in declared {
            let robot = scalar_text(entry).ok_or_else(|| {
                ConfigError::invalid(EntityKind::Area, &id, "robots", "expected a list of robot ids")
            })?;
            if seen.contains(&entry) {
                return Err(ConfigError::DuplicateReference {
                    kind: EntityKind::Robot,
                    id: robot,
                    owner_kind: EntityKind::Area,
                    owner: id,
                });
            }
            seen.push(entry);
            robots.push(robot);
        }

        Ok(Self {
            id,
            robots,
            attributes,
        })
    }

    /// Identifiers of the robots in this area, in declaration order
    pub fn robots(&self) -> &[String] {
        &self.robots
    }
}

impl Entity for Area {
    fn kind(&self) -> EntityKind {
        EntityKind::Area
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
