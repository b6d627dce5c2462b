//! Packages: ROS software built into a container from apt, git or rosinstall

use serde_yaml::Value;

use crate::error::ConfigError;

use super::attributes::{
    extendable_sequence, is_blank, optional_string_list, required, required_identifier, set, set_default,
    string_sequence, Attributes,
};
use super::image::ros_environment;
use super::ros::{area_network, roscore_host};
use super::{builtin, namespaced_id, placeholder, Entity, EntityKind, Robot};

/// Source directory of the catkin/colcon workspace inside package containers
pub const ROS_WORKSPACE_SRC: &str = "/ros_workspace/src";

/// Fields a package must declare
const REQUIRED_FIELDS: [&str; 3] = ["id", "path", "command"];

/// Fields of which a package must declare at least one
const SOURCE_FIELDS: [&str; 3] = ["apt", "git", "rosinstall"];

/// A ROS software unit built into its own container
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    id: String,
    robot: String,
    attributes: Attributes,
}

impl Package {
    /// Validate and normalize a package owned by `robot`
    pub fn parse(mut attributes: Attributes, robot: &Robot) -> Result<Self, ConfigError> {
        let local = required_identifier(&attributes, EntityKind::Package)?;
        let id = namespaced_id(robot.id(), &local);
        for field in &REQUIRED_FIELDS[1..] {
            required(&attributes, field, EntityKind::Package, Some(&id))?;
        }
        set(&mut attributes, "id", id.as_str());

        if let Some(repositories) =
            optional_string_list(&attributes, "git", EntityKind::Package, &id)?
        {
            let commands: Vec<String> = repositories
                .iter()
                .map(|entry| clone_command(entry, robot.default_branch()))
                .collect();
            set(&mut attributes, "git_cmds", string_sequence(commands));
        }

        if !SOURCE_FIELDS.iter().any(|f| attributes.contains_key(*f)) {
            return Err(ConfigError::NoPackageSource { package: id });
        }
        for field in ["apt", "rosinstall"] {
            if let Some(value) = attributes.get(field) {
                if is_blank(value) {
                    return Err(ConfigError::empty(EntityKind::Package, Some(&id), field));
                }
            }
        }
        for field in ["files", "ssh"] {
            optional_string_list(&attributes, field, EntityKind::Package, &id)?;
        }

        let mut environment = extendable_sequence(&attributes, "environment", EntityKind::Package, &id)?;
        environment.extend(ros_environment(&id, robot.ros().version));
        set(&mut attributes, "environment", environment);

        set(&mut attributes, "ros", placeholder(builtin::ROBOT_ROS_DISTRO));

        let mut networks = extendable_sequence(&attributes, "networks", EntityKind::Package, &id)?;
        networks.push(Value::from(area_network(robot.area())));
        set(&mut attributes, "networks", networks);

        let mut depends_on = extendable_sequence(&attributes, "depends_on", EntityKind::Package, &id)?;
        if robot.ros().is_ros1() {
            depends_on.push(Value::from(roscore_host(robot.id())));
        }
        set(&mut attributes, "depends_on", depends_on);

        set_default(&mut attributes, "restart", "always");

        Ok(Self {
            id,
            robot: robot.id().to_string(),
            attributes,
        })
    }

    /// Identifier of the owning robot
    pub fn robot(&self) -> &str {
        &self.robot
    }
}

impl Entity for Package {
    fn kind(&self) -> EntityKind {
        EntityKind::Package
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

/// Shell command cloning a `git` entry into the workspace
///
/// Entries are `<repo>` or `<repo>:<branch>`. The text after the last colon is
/// the branch unless it continues a URL (`https://...`) or an scp-style remote
/// (`git@host:org/repo.git`). A bare last-colon split would clone branch
/// `//github.com/org/repo.git` of repository `https`, so those colons are kept
/// in the repository.
fn clone_command(entry: &str, default_branch: &str) -> String {
    let (repository, branch) = match entry.rsplit_once(':') {
        Some((repository, branch)) if is_branch(repository, branch) => (repository, branch),
        _ => (entry, default_branch),
    };
    format!(
        "git -C {} clone -b {} {}",
        ROS_WORKSPACE_SRC, branch, repository
    )
}

fn is_branch(repository: &str, candidate: &str) -> bool {
    if candidate.is_empty() || candidate.starts_with("//") {
        return false;
    }
    // `user@host:path` has its only colon right after the host
    let scp_like = repository.contains('@') && !repository.contains(':') && !repository.contains('/');
    !scp_like
}
