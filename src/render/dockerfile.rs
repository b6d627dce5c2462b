//! Dockerfile generation for package build contexts

use serde_yaml::Value;

use crate::model::{scalar_text, Attributes, Entity, Package, RosVersion, ROS_WORKSPACE_SRC};

use super::RenderError;

/// Workspace root inside package images
const ROS_WORKSPACE: &str = "/ros_workspace";

/// Render the Dockerfile of a decoded package
pub fn render_dockerfile(package: &Package) -> Result<String, RenderError> {
    let attributes = package.attributes();
    let distro = attributes
        .get("ros")
        .and_then(scalar_text)
        .unwrap_or_default();
    let version = RosVersion::from_distro(&distro).ok_or_else(|| RenderError::UnknownDistro {
        package: package.id().to_string(),
        distro: distro.clone(),
    })?;

    let apt = entries(attributes, "apt");
    let git_cmds = entries(attributes, "git_cmds");
    let rosinstall = entries(attributes, "rosinstall");
    let ssh = entries(attributes, "ssh");
    let command = attributes
        .get("command")
        .and_then(scalar_text)
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(&format!("FROM ros:{}\n", distro));
    out.push_str(&format!("SHELL {}\n\n", serde_json::to_string(&["/bin/bash", "-c"])?));

    let mut system = vec!["git".to_string()];
    if !rosinstall.is_empty() {
        system.push(format!("{}-vcstool", python(&distro)));
    }
    system.extend(apt);
    out.push_str("RUN apt-get update && apt-get install -y --no-install-recommends \\\n");
    for name in &system {
        out.push_str(&format!("    {} \\\n", name));
    }
    out.push_str("    && rm -rf /var/lib/apt/lists/*\n\n");

    out.push_str(&format!("RUN mkdir -p {}\n", ROS_WORKSPACE_SRC));
    out.push_str(&format!("WORKDIR {}\n\n", ROS_WORKSPACE));

    if !ssh.is_empty() {
        out.push_str("COPY ssh/ /root/.ssh/\n");
        out.push_str("RUN chmod 700 /root/.ssh && chmod 600 /root/.ssh/*\n");
        out.push_str("ENV GIT_SSH_COMMAND=\"ssh -o StrictHostKeyChecking=no\"\n\n");
    }

    for cmd in &git_cmds {
        out.push_str(&format!("RUN {}\n", cmd));
    }
    for input in &rosinstall {
        out.push_str(&format!("RUN vcs import {} --input {}\n", ROS_WORKSPACE_SRC, input));
    }
    if !git_cmds.is_empty() || !rosinstall.is_empty() {
        out.push('\n');
    }

    let setup = format!("source /opt/ros/{}/setup.bash", distro);
    out.push_str(&format!(
        "RUN {} \\\n    && apt-get update \\\n    && rosdep install --from-paths src --ignore-src -r -y \\\n    && rm -rf /var/lib/apt/lists/*\n",
        setup
    ));
    let (build, devel) = match version {
        RosVersion::Ros1 => ("catkin_make", "devel"),
        RosVersion::Ros2 => ("colcon build", "install"),
    };
    out.push_str(&format!("RUN {} && {}\n\n", setup, build));

    let entrypoint = format!("source {}/{}/setup.bash && {}", ROS_WORKSPACE, devel, command);
    let cmd = serde_json::to_string(&["/bin/bash", "-c", entrypoint.as_str()])?;
    out.push_str(&format!("CMD {}\n", cmd));
    Ok(out)
}

/// Python flavour of the distro's tooling packages
fn python(distro: &str) -> &'static str {
    match distro {
        "melodic" => "python",
        _ => "python3",
    }
}

/// Entries of a list field; a lone scalar counts as a single entry
fn entries(attributes: &Attributes, field: &str) -> Vec<String> {
    match attributes.get(field) {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(value) => scalar_text(value).into_iter().collect(),
        None => vec![],
    }
}
