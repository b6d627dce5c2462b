//! Integration tests for compose and build context generation

use std::fs;

use enlil::model::scalar_text;
use enlil::{decode, plan, ArtifactPlan, EnlilError, Entity, RenderError, Settings};
use pretty_assertions::assert_eq;
use serde_yaml::Value;

const DEPLOYMENT: &str = r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: melodic:11311
    packages: [p1]
    images: [cam]
packages:
  - id: p1
    path: ./packages/
    command: roslaunch p1 p1.launch
    git: [repo1]
images:
  - id: cam
    image: drivers/camera
    volumes: [calib:/calib]
globals:
  - id: db
    image: postgres:13
"#;

fn parsed(compose: &str) -> Value {
    serde_yaml::from_str(compose).expect("Should be YAML")
}

#[test]
fn test_compose_file() {
    let plan = plan(DEPLOYMENT, &Settings::default()).expect("Should render");
    let compose = parsed(&plan.compose);

    let expected: Value = serde_yaml::from_str(
        r#"
version: '3.8'
services:
  roscore-r1:
    container_name: roscore-r1
    image: ros:melodic
    environment:
      - ROS_HOSTNAME=roscore-r1
      - ROS_MASTER_URI=http://roscore-r1:11311
    ports:
      - '11311:11311'
    command: roscore --port 11311
    networks:
      - zone1-network
    restart: always
  r1-cam:
    container_name: r1-cam
    image: drivers/camera:melodic
    volumes:
      - calib:/calib
    environment:
      - ROS_HOSTNAME=r1-cam
      - ROS_MASTER_URI=http://roscore-r1:11311
    networks:
      - zone1-network
    depends_on:
      - roscore-r1
    restart: always
  db:
    container_name: db
    image: postgres:13
    restart: always
  r1-p1:
    container_name: r1-p1
    build: ./packages/r1-p1
    environment:
      - ROS_HOSTNAME=r1-p1
      - ROS_MASTER_URI=http://roscore-r1:11311
    networks:
      - zone1-network
    depends_on:
      - roscore-r1
    restart: always
networks:
  zone1-network: {}
volumes:
  calib: {}
"#,
    )
    .expect("expected compose");
    assert_eq!(compose, expected);

    let services: Vec<&str> = compose["services"]
        .as_mapping()
        .expect("services")
        .keys()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(services, vec!["roscore-r1", "r1-cam", "db", "r1-p1"]);
}

#[test]
fn test_compose_output_is_valid_yaml() {
    let plan = plan(DEPLOYMENT, &Settings::default()).expect("Should render");
    let compose = parsed(&plan.compose);

    let ports = &compose["services"]["roscore-r1"]["ports"][0];
    assert_eq!(ports.as_str(), Some("11311:11311"));
    assert_eq!(compose["version"].as_str(), Some("3.8"));
}

/// Leaves come back as written, with booleans and numbers typed again
fn stringified(value: &Value) -> Value {
    match value {
        Value::Bool(_) | Value::Number(_) => Value::from(scalar_text(value).unwrap_or_default()),
        Value::Sequence(items) => Value::Sequence(items.iter().map(stringified).collect()),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(k, v)| (k.clone(), stringified(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

const NESTED: &str = r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: foxy
    images: [cam]
images:
  - id: cam
    image: camera
    privileged: true
    x-matrix: [[{a: 1}, b], [null, c], [], {}]
    x-meta:
      owner: '{{ROBOT_ID}}'
      limits: {cpus: 0.5, pids: [1, {soft: 2, hard: null}]}
      empty: {}
    healthcheck:
      test: [CMD, curl, -f, 'http://localhost:8080']
      retries: 3
"#;

#[test]
fn test_nested_attributes_survive_rendering() {
    let decoded = decode(NESTED).expect("Should decode");
    let image = decoded.images.get("r1-cam").expect("r1-cam");
    let plan = plan(NESTED, &Settings::default()).expect("Should render");
    let service = parsed(&plan.compose)["services"]["r1-cam"].clone();

    for field in ["x-matrix", "x-meta", "healthcheck", "privileged"] {
        assert_eq!(
            Some(&stringified(&service[field])),
            image.attributes().get(field),
            "field {}",
            field
        );
    }
    assert_eq!(service["privileged"], Value::Bool(true));
    assert_eq!(service["x-meta"]["owner"].as_str(), Some("r1"));
    assert_eq!(
        service["x-matrix"],
        serde_yaml::from_str::<Value>("[[{a: 1}, b], [null, c], [], {}]").expect("matrix")
    );
}

#[test]
fn test_ros2_robot_has_no_master_service() {
    let plan = plan(
        r#"
areas:
  - id: lab
    robots: [r2]
robots:
  - id: r2
    ros: foxy:7
    images: [talker]
images:
  - id: talker
    image: osrf/ros:foxy-desktop
    command: ros2 run demo_nodes_cpp talker
"#,
        &Settings::default(),
    )
    .expect("Should render");

    assert!(!plan.compose.contains("roscore"));
    let talker = &parsed(&plan.compose)["services"]["r2-talker"];
    assert_eq!(talker["environment"][0].as_str(), Some("ROS_DOMAIN_ID=7"));
    assert_eq!(
        talker["command"].as_str(),
        Some("ros2 run demo_nodes_cpp talker")
    );
}

#[test]
fn test_package_dockerfile() {
    let plan = plan(DEPLOYMENT, &Settings::default()).expect("Should render");
    assert_eq!(plan.packages.len(), 1);

    let context = &plan.packages[0];
    assert_eq!(context.id, "r1-p1");
    assert!(context.copies.is_empty());
    insta::assert_snapshot!(context.dockerfile, @r###"
FROM ros:melodic
SHELL ["/bin/bash","-c"]

RUN apt-get update && apt-get install -y --no-install-recommends \
    git \
    && rm -rf /var/lib/apt/lists/*

RUN mkdir -p /ros_workspace/src
WORKDIR /ros_workspace

RUN git -C /ros_workspace/src clone -b melodic repo1

RUN source /opt/ros/melodic/setup.bash \
    && apt-get update \
    && rosdep install --from-paths src --ignore-src -r -y \
    && rm -rf /var/lib/apt/lists/*
RUN source /opt/ros/melodic/setup.bash && catkin_make

CMD ["/bin/bash","-c","source /ros_workspace/devel/setup.bash && roslaunch p1 p1.launch"]
"###);
}

#[test]
fn test_write_artifacts() {
    let input = tempfile::tempdir().expect("temp dir");
    let config = input.path().join("robot.yaml");
    fs::write(&config, "rate: 10\n").expect("write config");

    let source = format!(
        r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: noetic
    packages: [p1]
packages:
  - id: p1
    path: ./build/
    command: roslaunch p1 p1.launch
    apt: [ros-noetic-rospy]
    files: ['{}:/etc/robot.yaml']
"#,
        config.display()
    );
    let settings = Settings::default().with_packages_dir("build");
    let plan = plan(&source, &settings).expect("Should render");

    let output = tempfile::tempdir().expect("temp dir");
    let compose = output.path().join("docker-compose.yml");
    plan.write(&compose).expect("Should write");

    let written = fs::read_to_string(&compose).expect("compose file");
    assert_eq!(written, plan.compose);
    let service = &parsed(&written)["services"]["r1-p1"];
    assert_eq!(service["build"].as_str(), Some("./build/r1-p1"));
    assert_eq!(
        service["volumes"][0].as_str(),
        Some("./build/r1-p1/files/robot.yaml:/etc/robot.yaml")
    );

    let context = output.path().join("build").join("r1-p1");
    let dockerfile = fs::read_to_string(context.join("Dockerfile")).expect("Dockerfile");
    assert!(dockerfile.contains("catkin_make"));
    let copied = fs::read_to_string(context.join("files").join("robot.yaml")).expect("copy");
    assert_eq!(copied, "rate: 10\n");
}

#[test]
fn test_missing_file_is_reported() {
    let plan = plan(
        r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: noetic
    packages: [p1]
packages:
  - id: p1
    path: ./packages/
    command: run
    apt: [x]
    ssh: [/nonexistent/enlil/id_rsa]
"#,
        &Settings::default(),
    )
    .expect("Should render");

    let output = tempfile::tempdir().expect("temp dir");
    let result = plan.write(&output.path().join("docker-compose.yml"));
    assert!(matches!(result, Err(RenderError::SourceNotFound { .. })));
}

#[test]
fn test_missing_file_leaves_no_partial_output() {
    let plan = plan(
        r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: noetic
    packages: [p1, p2]
packages:
  - id: p1
    path: ./packages/
    command: run
    apt: [x]
  - id: p2
    path: ./packages/
    command: run
    apt: [x]
    ssh: [/nonexistent/enlil/id_rsa]
"#,
        &Settings::default(),
    )
    .expect("Should render");

    let output = tempfile::tempdir().expect("temp dir");
    let compose = output.path().join("docker-compose.yml");
    let result = plan.write(&compose);

    assert!(matches!(result, Err(RenderError::SourceNotFound { .. })));
    assert!(!output.path().join("packages").exists());
    assert!(!compose.exists());
}

#[test]
fn test_invalid_file_entry() {
    let result = plan(
        r#"
areas:
  - id: zone1
    robots: [r1]
robots:
  - id: r1
    ros: noetic
    packages: [p1]
packages:
  - id: p1
    path: ./packages/
    command: run
    apt: [x]
    files: [just/a/path]
"#,
        &Settings::default(),
    );
    assert!(matches!(
        result,
        Err(EnlilError::Render(RenderError::InvalidFileEntry { .. }))
    ));
}

#[test]
fn test_plan_is_deterministic() {
    let first: ArtifactPlan = plan(DEPLOYMENT, &Settings::default()).expect("Should render");
    let second: ArtifactPlan = plan(DEPLOYMENT, &Settings::default()).expect("Should render");
    assert_eq!(first, second);
}
