//! Error types for loading and decoding deployment configurations

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::model::{EntityKind, RosVersion};

/// Broad classification of configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing, empty or malformed field, or unsupported value
    Structural,
    /// Reference to an entity that was never declared
    Referential,
    /// Identifier, port or domain used more than once
    Uniqueness,
    /// Template variable without a binding in scope
    Decoding,
}

/// Errors raised while turning a configuration document into decoded entities
///
/// Every error is fatal: the pipeline stops at the first one and produces no output.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The document has no `areas` key
    #[error("no robotic areas were declared")]
    NoAreas,

    /// A declaration is not a mapping of fields
    #[error("{kind} declaration is not a mapping of fields")]
    NotAMapping { kind: EntityKind },

    /// A declaration has no fields at all
    #[error("{kind} was declared with empty data")]
    EmptyDeclaration { kind: EntityKind },

    /// A required field is absent
    #[error("{} was declared without required field \"{field}\"", subject(.kind, .id))]
    MissingField {
        kind: EntityKind,
        id: Option<String>,
        field: String,
    },

    /// A field is present but empty
    #[error("{} was declared with an empty \"{field}\"", subject(.kind, .id))]
    EmptyField {
        kind: EntityKind,
        id: Option<String>,
        field: String,
    },

    /// A field has the wrong shape
    #[error("field \"{field}\" of {kind} \"{id}\" is invalid: {reason}")]
    InvalidField {
        kind: EntityKind,
        id: String,
        field: String,
        reason: String,
    },

    /// The robot's ROS distribution is not supported
    #[error("robot \"{robot}\" uses invalid or unsupported ROS distribution \"{distro}\"")]
    UnsupportedDistro { robot: String, distro: String },

    /// The port (ROS1) or domain (ROS2) after the distribution is not a number
    #[error("robot \"{robot}\" was declared with an invalid value for {} \"{value}\"", .version.metadata_name())]
    InvalidRosMetadata {
        robot: String,
        version: RosVersion,
        value: String,
    },

    /// An entity lists the same reference twice
    #[error("{kind} \"{id}\" was declared multiple times within {owner_kind} \"{owner}\"")]
    DuplicateReference {
        kind: EntityKind,
        id: String,
        owner_kind: EntityKind,
        owner: String,
    },

    /// A robot declares neither images nor packages
    #[error("robot \"{robot}\" was declared without images or packages")]
    NoWorkload { robot: String },

    /// A package declares none of apt, git or rosinstall
    #[error("package \"{package}\" was declared without any of \"apt\", \"git\" or \"rosinstall\"")]
    NoPackageSource { package: String },

    /// A referenced entity has no declaration
    #[error("{kind} \"{id}\" was listed by {owner_kind} \"{owner}\" but not declared")]
    Undeclared {
        kind: EntityKind,
        id: String,
        owner_kind: EntityKind,
        owner: String,
    },

    /// Two entities of the same pool share an identifier
    #[error("found multiple {kind} entities with id \"{id}\"")]
    Duplicate { kind: EntityKind, id: String },

    /// Two ROS1 robots share a master port
    #[error("robot \"{robot}\" uses ROS port {port} which is already taken")]
    PortCollision { robot: String, port: u32 },

    /// Two ROS2 robots share a domain
    #[error("robot \"{robot}\" uses ROS2 domain {domain} which is already taken")]
    DomainCollision { robot: String, domain: u32 },

    /// A placeholder has no binding in the current scope
    #[error("invalid template variable \"{placeholder}\" found while decoding {kind} \"{id}\"")]
    UnresolvedVariable {
        placeholder: String,
        kind: EntityKind,
        id: String,
    },
}

impl ConfigError {
    /// Create a missing field error
    pub fn missing(kind: EntityKind, id: Option<&str>, field: impl Into<String>) -> Self {
        Self::MissingField {
            kind,
            id: id.map(str::to_string),
            field: field.into(),
        }
    }

    /// Create an empty field error
    pub fn empty(kind: EntityKind, id: Option<&str>, field: impl Into<String>) -> Self {
        Self::EmptyField {
            kind,
            id: id.map(str::to_string),
            field: field.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid(
        kind: EntityKind,
        id: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            kind,
            id: id.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate identifier error
    pub fn duplicate(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            id: id.into(),
        }
    }

    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Undeclared { .. } => ErrorCategory::Referential,
            Self::DuplicateReference { .. }
            | Self::Duplicate { .. }
            | Self::PortCollision { .. }
            | Self::DomainCollision { .. } => ErrorCategory::Uniqueness,
            Self::UnresolvedVariable { .. } => ErrorCategory::Decoding,
            _ => ErrorCategory::Structural,
        }
    }
}

fn subject(kind: &EntityKind, id: &Option<String>) -> String {
    match id {
        Some(id) => format!("{} \"{}\"", kind, id),
        None => format!("a {}", kind),
    }
}

/// Format a YAML syntax error with source context using ariadne
///
/// Falls back to the plain error message when the error carries no location.
pub fn format_yaml_error(error: &serde_yaml::Error, source: &str, filename: &str) -> String {
    let Some(location) = error.location() else {
        return error.to_string();
    };

    let start = location.index().min(source.len());
    let end = (start + 1).min(source.len()).max(start);
    let message = error.to_string();

    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, start)
        .with_message("invalid configuration document")
        .with_label(
            Label::new((filename, start..end))
                .with_message(&message)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8(buf).unwrap_or(message),
        Err(_) => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_without_id_display() {
        let err = ConfigError::missing(EntityKind::Robot, None, "id");
        assert_eq!(
            err.to_string(),
            "a robot was declared without required field \"id\""
        );
    }

    #[test]
    fn test_empty_field_with_id_display() {
        let err = ConfigError::empty(EntityKind::Package, Some("r1-p1"), "command");
        assert_eq!(
            err.to_string(),
            "package \"r1-p1\" was declared with an empty \"command\""
        );
    }

    #[test]
    fn test_metadata_name_in_display() {
        let err = ConfigError::InvalidRosMetadata {
            robot: "r1".to_string(),
            version: RosVersion::Ros2,
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("domain \"abc\""));
    }

    #[test]
    fn test_categories() {
        assert_eq!(ConfigError::NoAreas.category(), ErrorCategory::Structural);
        assert_eq!(
            ConfigError::duplicate(EntityKind::Area, "a").category(),
            ErrorCategory::Uniqueness
        );
        assert_eq!(
            ConfigError::PortCollision {
                robot: "r2".to_string(),
                port: 11311
            }
            .category(),
            ErrorCategory::Uniqueness
        );
        assert_eq!(
            ConfigError::Undeclared {
                kind: EntityKind::Robot,
                id: "r9".to_string(),
                owner_kind: EntityKind::Area,
                owner: "zone1".to_string(),
            }
            .category(),
            ErrorCategory::Referential
        );
        assert_eq!(
            ConfigError::UnresolvedVariable {
                placeholder: "{{NOPE}}".to_string(),
                kind: EntityKind::Package,
                id: "r1-p1".to_string(),
            }
            .category(),
            ErrorCategory::Decoding
        );
    }

    #[test]
    fn test_format_yaml_error_includes_filename() {
        let source = "areas: [unclosed\n";
        let err = serde_yaml::from_str::<serde_yaml::Value>(source).unwrap_err();
        let formatted = format_yaml_error(&err, source, "deploy.yml");
        assert!(formatted.contains("deploy.yml"));
    }
}
