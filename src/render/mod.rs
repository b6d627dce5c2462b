//! Renderer: turns decoded entities into deployment artifacts
//!
//! Rendering happens in two steps. [`ArtifactPlan::build`] is pure and
//! produces the compose text plus one build context per package;
//! [`ArtifactPlan::write`] puts them on disk.

mod compose;
mod dockerfile;

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::decoder::DecodedGraph;
use crate::model::{scalar_text, Entity, Package};
use crate::settings::Settings;

pub use compose::ComposeBuilder;
pub use dockerfile::render_dockerfile;

/// Errors that can occur while rendering or writing artifacts
#[derive(Debug, Error)]
pub enum RenderError {
    /// A `files` entry is not `<host path>:<container path>`
    #[error("invalid file declaration \"{entry}\" in package \"{package}\"")]
    InvalidFileEntry { package: String, entry: String },

    /// A package's `ros` field does not name a supported distribution
    #[error("package \"{package}\" uses unknown ROS distribution \"{distro}\"")]
    UnknownDistro { package: String, distro: String },

    /// A file to copy into a build context does not exist
    #[error("file \"{}\" was not found", .path.display())]
    SourceNotFound { path: PathBuf },

    /// The compose document could not be serialized
    #[error("failed to serialize compose file: {0}")]
    Compose(#[from] serde_yaml::Error),

    /// A Dockerfile exec-form array could not be serialized
    #[error("failed to serialize Dockerfile instruction: {0}")]
    Instruction(#[from] serde_json::Error),

    /// Filesystem error while writing artifacts
    #[error("failed to write \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RenderError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A host file copied into a build context
#[derive(Debug, Clone, PartialEq)]
pub struct FileCopy {
    /// Path on the host, relative to the working directory
    pub source: PathBuf,
    /// Path inside the build context
    pub destination: PathBuf,
}

/// The build context of one package
#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
    /// Package identifier, also the context directory name
    pub id: String,
    pub dockerfile: String,
    pub copies: Vec<FileCopy>,
}

/// Every artifact of a deployment, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPlan {
    /// Compose file text
    pub compose: String,
    /// Directory, relative to the compose file, holding the build contexts
    pub packages_dir: String,
    pub packages: Vec<BuildContext>,
}

impl ArtifactPlan {
    /// Render the artifacts of a decoded graph
    pub fn build(graph: &DecodedGraph, settings: &Settings) -> Result<Self, RenderError> {
        let mut compose = ComposeBuilder::new(settings.compose_version.as_str());
        for robot in graph.robots.iter() {
            compose.add_robot(robot);
        }
        for image in graph.images.iter().chain(graph.global_images.iter()) {
            compose.add_image(image);
        }

        let mut packages = Vec::with_capacity(graph.packages.len());
        for package in graph.packages.iter() {
            let (package, copies) = mount_files(package, &settings.packages_dir)?;
            compose.add_package(&package);
            packages.push(BuildContext {
                id: package.id().to_string(),
                dockerfile: render_dockerfile(&package)?,
                copies,
            });
        }

        Ok(Self {
            compose: compose.build()?,
            packages_dir: settings.packages_dir.clone(),
            packages,
        })
    }

    /// Write the compose file to `output` and the build contexts next to it
    ///
    /// Every copy source is checked before anything is created, so a missing
    /// file leaves the output directory untouched.
    pub fn write(&self, output: &Path) -> Result<(), RenderError> {
        if let Some(missing) = self
            .packages
            .iter()
            .flat_map(|context| &context.copies)
            .find(|copy| !copy.source.is_file())
        {
            return Err(RenderError::SourceNotFound {
                path: missing.source.clone(),
            });
        }

        let root = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let packages_dir = root.join(&self.packages_dir);

        for context in &self.packages {
            let dir = packages_dir.join(&context.id);
            fs::create_dir_all(&dir).map_err(|e| RenderError::io(&dir, e))?;

            let dockerfile = dir.join("Dockerfile");
            fs::write(&dockerfile, &context.dockerfile)
                .map_err(|e| RenderError::io(&dockerfile, e))?;

            for copy in &context.copies {
                let destination = dir.join(&copy.destination);
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent).map_err(|e| RenderError::io(parent, e))?;
                }
                fs::copy(&copy.source, &destination)
                    .map_err(|e| RenderError::io(&destination, e))?;
            }
            debug!(package = %context.id, copies = context.copies.len(), "wrote build context");
        }

        fs::write(output, &self.compose).map_err(|e| RenderError::io(output, e))?;
        info!(
            output = %output.display(),
            packages = self.packages.len(),
            "wrote deployment artifacts"
        );
        Ok(())
    }
}

/// Plan the `ssh` and `files` copies of a package
///
/// Every `files` entry also becomes a volume of the package's service, so the
/// returned package carries the extended `volumes` list.
fn mount_files(package: &Package, packages_dir: &str) -> Result<(Package, Vec<FileCopy>), RenderError> {
    let attributes = package.attributes();
    let mut copies = Vec::new();

    for source in string_list(attributes.get("ssh")) {
        let name = file_name(&source).ok_or_else(|| RenderError::InvalidFileEntry {
            package: package.id().to_string(),
            entry: source.clone(),
        })?;
        let destination = Path::new("ssh").join(name);
        copies.push(FileCopy {
            source: PathBuf::from(source),
            destination,
        });
    }

    let files = string_list(attributes.get("files"));
    if files.is_empty() {
        return Ok((package.clone(), copies));
    }

    let mut volumes: Vec<Value> = attributes
        .get("volumes")
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();
    for entry in &files {
        let invalid = || RenderError::InvalidFileEntry {
            package: package.id().to_string(),
            entry: entry.clone(),
        };
        let parts: Vec<&str> = entry.split(':').collect();
        let (host, container) = match parts.as_slice() {
            [host, container] => (host.trim(), container.trim()),
            _ => return Err(invalid()),
        };
        let name = file_name(host).ok_or_else(invalid)?;
        volumes.push(Value::from(format!(
            "./{}/{}/files/{}:{}",
            packages_dir,
            package.id(),
            name,
            container
        )));
        copies.push(FileCopy {
            source: PathBuf::from(host),
            destination: Path::new("files").join(name),
        });
    }

    let mut mounted = package.clone();
    mounted
        .attributes_mut()
        .insert(Value::from("volumes"), Value::Sequence(volumes));
    Ok((mounted, copies))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_sequence)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}

fn file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Robot;
    use pretty_assertions::assert_eq;

    fn package(body: &str) -> Package {
        let robot = Robot::parse(
            serde_yaml::from_str("id: r1\nros: noetic\npackages: [p1]").unwrap(),
            "zone1",
        )
        .unwrap();
        Package::parse(
            serde_yaml::from_str(&format!(
                "id: p1\npath: ./packages/\ncommand: run\napt: [x]\n{}",
                body
            ))
            .unwrap(),
            &robot,
        )
        .unwrap()
    }

    fn volumes(package: &Package) -> Vec<String> {
        string_list(package.attributes().get("volumes"))
    }

    #[test]
    fn test_files_become_copies_and_volumes() {
        let package = package("volumes: [data:/data]\nfiles: ['config/robot.yaml:/etc/robot.yaml']\nssh: [keys/id_rsa]");
        let (mounted, copies) = mount_files(&package, "packages").unwrap();

        assert_eq!(
            copies,
            vec![
                FileCopy {
                    source: PathBuf::from("keys/id_rsa"),
                    destination: PathBuf::from("ssh/id_rsa"),
                },
                FileCopy {
                    source: PathBuf::from("config/robot.yaml"),
                    destination: PathBuf::from("files/robot.yaml"),
                },
            ]
        );
        assert_eq!(
            volumes(&mounted),
            vec![
                "data:/data".to_string(),
                "./packages/r1-p1/files/robot.yaml:/etc/robot.yaml".to_string(),
            ]
        );
        assert_eq!(volumes(&package), vec!["data:/data".to_string()]);
    }

    #[test]
    fn test_file_entry_needs_exactly_one_colon() {
        for entry in ["config/robot.yaml", "a:b:c"] {
            let package = package(&format!("files: ['{}']", entry));
            assert!(matches!(
                mount_files(&package, "packages"),
                Err(RenderError::InvalidFileEntry { .. })
            ));
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("keys/id_rsa"), Some("id_rsa"));
        assert_eq!(file_name("id_rsa"), Some("id_rsa"));
        assert_eq!(file_name("keys/"), None);
    }
}
