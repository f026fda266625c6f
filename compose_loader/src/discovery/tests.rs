//! Tests for compose-file discovery and project options.

use super::*;
use crate::MemorySource;
use crate::types::Environment;
use anyhow::{Result, anyhow, ensure};
use rstest::{fixture, rstest};
use serial_test::serial;
use test_helpers::env::compose_scope;
use test_helpers::figment::{figment_error, with_jail};

const WEB: &str = "services:\n  web:\n    image: nginx\n";

fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}

#[fixture]
fn workspace() -> MemorySource {
    MemorySource::default()
        .with_file("/work/shop/compose.yml", WEB)
        .with_file("/work/shop/docker-compose.yml", WEB)
        .with_file("/work/shop/docker-compose.override.yml", "services:\n  web:\n    image: nginx:alpine\n")
        .with_file("/work/shop/app/src/main.rs", "fn main() {}")
}

#[rstest]
#[case::same_dir("/work/shop")]
#[case::nested("/work/shop/app/src")]
fn discovery_walks_up_to_the_first_directory_with_a_compose_file(workspace: MemorySource, #[case] start: &str) {
    let files = find_compose_files(Utf8Path::new(start), &workspace).unwrap_or_default();
    assert_eq!(
        files,
        ["/work/shop/compose.yml", "/work/shop/docker-compose.override.yml"]
    );
}

#[test]
fn discovery_without_a_candidate_fails() {
    let source = MemorySource::default().with_file("/work/readme.md", "");
    let err = find_compose_files(Utf8Path::new("/work"), &source)
        .err()
        .map(|e| e.to_string());
    assert_eq!(
        err.as_deref(),
        Some("no compose file found in /work or any parent directory")
    );
}

#[rstest]
#[case(None, "a.yml:b.yml", &["a.yml", "b.yml"])]
#[case(Some(";"), "a.yml;;b.yml", &["a.yml", "b.yml"])]
#[case(Some(","), "", &[])]
fn compose_file_is_split_on_the_separator(
    #[case] separator: Option<&str>,
    #[case] files: &str,
    #[case] expected: &[&str],
) {
    let settings = ComposeSettings {
        file: Some(files.to_owned()),
        path_separator: separator.map(str::to_owned),
        ..ComposeSettings::default()
    };
    if cfg!(windows) && separator.is_none() {
        return;
    }
    assert_eq!(settings.files(), expected);
}

#[test]
fn settings_come_from_prefixed_variables() -> Result<()> {
    let environment = env(&[
        ("COMPOSE_PROJECT_NAME", "2024"),
        ("COMPOSE_PROFILES", "debug, jobs,"),
        ("PROJECT_NAME", "ignored"),
    ]);
    let settings = ComposeSettings::gather(ComposeEnv::from_environment(&environment))
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(settings.project_name.as_deref() == Some("2024"));
    ensure!(settings.profiles() == ["debug", "jobs"]);
    ensure!(settings.file.is_none());
    Ok(())
}

#[rstest]
#[case(Some("explicit"), "from-env", Some("explicit"))]
#[case(None, "from-env", Some("from-env"))]
#[case(None, "", None)]
fn project_name_precedence(#[case] explicit: Option<&str>, #[case] variable: &str, #[case] expected: Option<&str>) -> Result<()> {
    let mut builder = ProjectOptions::builder()
        .working_dir("/work/shop")
        .environment(env(&[("COMPOSE_PROJECT_NAME", variable)]));
    if let Some(name) = explicit {
        builder = builder.name(name);
    }
    let options = builder
        .build_with_source(&MemorySource::default())
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(options.name() == expected, "got {:?}", options.name());
    Ok(())
}

#[test]
fn invalid_convert_windows_paths_is_rejected() {
    let err = ProjectOptions::builder()
        .working_dir("/work")
        .environment(env(&[("COMPOSE_CONVERT_WINDOWS_PATHS", "maybe")]))
        .build_with_source(&MemorySource::default())
        .err()
        .map(|e| e.to_string());
    assert_eq!(
        err.as_deref(),
        Some("COMPOSE_CONVERT_WINDOWS_PATHS: invalid boolean: maybe")
    );
}

#[test]
fn dotenv_fills_without_overriding() -> Result<()> {
    let source = MemorySource::default().with_file(
        "/work/shop/.env",
        "TAG=dev\nREGISTRY=registry.local\nCOMPOSE_PROFILES=debug\n",
    );
    let options = ProjectOptions::builder()
        .working_dir("/work/shop")
        .environment(env(&[("TAG", "1.0")]))
        .dotenv(true)
        .build_with_source(&source)
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(options.environment().get("TAG").map(String::as_str) == Some("1.0"));
    ensure!(options.environment().get("REGISTRY").map(String::as_str) == Some("registry.local"));
    ensure!(options.profiles() == ["debug"]);
    Ok(())
}

#[test]
fn missing_explicit_env_file_is_an_error() {
    let err = ProjectOptions::builder()
        .working_dir("/work/shop")
        .environment(Environment::new())
        .env_file("prod.env")
        .build_with_source(&MemorySource::default())
        .err();
    assert!(matches!(
        err.as_deref(),
        Some(crate::ComposeError::Io { path, .. }) if path == "/work/shop/prod.env"
    ));
}

#[rstest]
fn load_project_discovers_files_and_names_the_project(workspace: MemorySource) -> Result<()> {
    let options = ProjectOptions::builder()
        .working_dir("/work/shop/app")
        .environment(Environment::new())
        .build_with_source(&workspace)
        .map_err(|e| anyhow!(e.to_string()))?;
    let err = options.load_project_with_source(&workspace).err();
    ensure!(err.is_none(), "load failed: {err:?}");

    let explicit = ProjectOptions::builder()
        .environment(Environment::new())
        .config_path("/work/shop/compose.yml")
        .config_path("/work/shop/docker-compose.override.yml")
        .build_with_source(&workspace)
        .map_err(|e| anyhow!(e.to_string()))?;
    let project = explicit
        .load_project_with_source(&workspace)
        .map_err(|e| anyhow!(e.to_string()))?;
    ensure!(project.name == "shop");
    ensure!(project.working_dir == "/work/shop");
    ensure!(project.services.get("web").map(|s| s.image.as_str()) == Some("nginx:alpine"));
    Ok(())
}

#[test]
fn profiles_disable_services() -> Result<()> {
    let yaml = "services:\n  web:\n    image: nginx\n  debug:\n    image: busybox\n    profiles: [debug]\n";
    let source = MemorySource::default().with_file("/work/compose.yaml", yaml);
    let load = |profiles: &str| -> Result<Vec<String>> {
        let options = ProjectOptions::builder()
            .working_dir("/work")
            .environment(env(&[("COMPOSE_PROFILES", profiles)]))
            .build_with_source(&source)
            .map_err(|e| anyhow!(e.to_string()))?;
        let project = options
            .load_project_with_source(&source)
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(project.service_names().into_iter().map(str::to_owned).collect())
    };
    ensure!(load("")? == ["web"]);
    ensure!(load("debug")? == ["debug", "web"]);
    Ok(())
}

#[test]
#[serial]
fn process_environment_is_read_through_figment() -> Result<()> {
    let _scope = compose_scope(&[("COMPOSE_PROFILES", "debug, ops")]);
    let (name, files, profiles) = with_jail(|jail| {
        jail.set_env("COMPOSE_PROJECT_NAME", "jailed");
        jail.set_env("COMPOSE_FILE", "one.yml,two.yml");
        jail.set_env("COMPOSE_PATH_SEPARATOR", ",");
        let options = ProjectOptions::builder()
            .working_dir("/work")
            .build_with_source(&MemorySource::default())
            .map_err(figment_error)?;
        Ok((
            options.name().map(str::to_owned),
            options.config_paths().to_vec(),
            options.profiles().to_vec(),
        ))
    })?;
    ensure!(name.as_deref() == Some("jailed"));
    ensure!(files == [Utf8PathBuf::from("one.yml"), Utf8PathBuf::from("two.yml")]);
    ensure!(profiles == ["debug", "ops"]);
    Ok(())
}
