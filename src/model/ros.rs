//! ROS runtime declarations: distribution family and master port / domain

use std::fmt;

use crate::error::ConfigError;

use super::EntityKind;

/// ROS1 distributions that are known to work
pub const ROS1_DISTROS: &[&str] = &["melodic", "noetic"];

/// ROS2 distributions that are known to work
pub const ROS2_DISTROS: &[&str] = &["foxy"];

/// Master port used when a ROS1 robot does not declare one
pub const ROS1_DEFAULT_PORT: u32 = 11311;

/// Domain used when a ROS2 robot does not declare one
pub const ROS2_DEFAULT_DOMAIN: u32 = 42;

/// ROS distribution family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosVersion {
    Ros1,
    Ros2,
}

impl RosVersion {
    /// Classify a distribution name
    pub fn from_distro(distro: &str) -> Option<Self> {
        if ROS1_DISTROS.contains(&distro) {
            Some(RosVersion::Ros1)
        } else if ROS2_DISTROS.contains(&distro) {
            Some(RosVersion::Ros2)
        } else {
            None
        }
    }

    /// Port (ROS1) or domain (ROS2) used when none is declared
    pub fn default_metadata(&self) -> u32 {
        match self {
            RosVersion::Ros1 => ROS1_DEFAULT_PORT,
            RosVersion::Ros2 => ROS2_DEFAULT_DOMAIN,
        }
    }

    /// What the number after the distribution means for this family
    pub fn metadata_name(&self) -> &'static str {
        match self {
            RosVersion::Ros1 => "port",
            RosVersion::Ros2 => "domain",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RosVersion::Ros1 => "ROS1",
            RosVersion::Ros2 => "ROS2",
        }
    }
}

impl fmt::Display for RosVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `"<distro>[:<port-or-domain>]"` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosRuntime {
    pub version: RosVersion,
    pub distro: String,
    /// Master port for ROS1, domain id for ROS2
    pub metadata: u32,
}

impl RosRuntime {
    /// Parse the `ros` field of robot `robot`
    pub fn parse(declaration: &str, robot: &str) -> Result<Self, ConfigError> {
        let (distro, metadata) = match declaration.split_once(':') {
            Some((distro, metadata)) => (distro, Some(metadata)),
            None => (declaration, None),
        };

        if distro.is_empty() {
            return Err(ConfigError::invalid(
                EntityKind::Robot,
                robot,
                "ros",
                "empty ROS distribution",
            ));
        }

        let version =
            RosVersion::from_distro(distro).ok_or_else(|| ConfigError::UnsupportedDistro {
                robot: robot.to_string(),
                distro: distro.to_string(),
            })?;

        let metadata = match metadata {
            None => version.default_metadata(),
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidRosMetadata {
                    robot: robot.to_string(),
                    version,
                    value: value.to_string(),
                })?,
        };

        Ok(Self {
            version,
            distro: distro.to_string(),
            metadata,
        })
    }

    pub fn is_ros1(&self) -> bool {
        self.version == RosVersion::Ros1
    }
}

/// Host name of the ROS master container for a robot
pub fn roscore_host(robot_id: &str) -> String {
    format!("roscore-{}", robot_id)
}

/// Name of the network shared by all containers of an area
pub fn area_network(area_id: &str) -> String {
    format!("{}-network", area_id)
}
