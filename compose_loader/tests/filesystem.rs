//! Loading projects that live on disk.

use anyhow::{Result, anyhow, ensure};
use compose_loader::discovery::ProjectOptions;
use compose_loader::types::{Environment, Project};
use compose_loader::{ConfigDetails, Document, LoadOptions, load};
use serial_test::serial;
use test_helpers::env;
use test_helpers::project::ComposeProject;

fn shop_project() -> Result<ComposeProject> {
    let files = [
        (
            "compose.yaml",
            concat!(
                "services:\n",
                "  web:\n",
                "    extends: {file: common/base.yml, service: app}\n",
                "    env_file: [web.env]\n",
                "    environment: {MODE: prod}\n",
                "    secrets: [token]\n",
                "secrets:\n",
                "  token: {file: ./secrets/token.txt}\n",
            ),
        ),
        (
            "common/base.yml",
            "services:\n  app:\n    build: ./app\n    volumes: [\"./static:/srv/static\"]\n",
        ),
        ("common/app/Dockerfile", "FROM scratch\n"),
        ("web.env", "MODE=dev\nGREETING=\"hello ${USER_NAME:-there}\"\n"),
        ("secrets/token.txt", "s3cr3t\n"),
    ];
    files
        .into_iter()
        .try_fold(ComposeProject::new()?, |project, (name, contents)| project.with_file(name, contents))
}

fn load_from(project: &ComposeProject, options: &LoadOptions, environment: Environment) -> Result<Project> {
    let compose = project.join("compose.yaml");
    let bytes = std::fs::read(&compose)?;
    let details = ConfigDetails::new(
        project.path(),
        vec![Document::from_bytes(compose.as_str(), bytes)],
        environment,
    );
    load(details, options).map_err(|err| anyhow!(err.to_string()))
}

#[test]
fn env_files_and_extends_are_read_from_disk() -> Result<()> {
    let shop = shop_project()?;
    let environment = Environment::from([("USER_NAME".to_owned(), "ada".to_owned())]);
    let project = load_from(&shop, &LoadOptions::new().project_name("shop", true), environment)?;
    let web = project.get_service("web").map_err(|err| anyhow!(err.to_string()))?;

    ensure!(web.environment.get("MODE") == Some(&Some("prod".to_owned())));
    ensure!(web.environment.get("GREETING") == Some(&Some("hello ada".to_owned())));
    let build = web.build.as_ref().ok_or_else(|| anyhow!("web has no build"))?;
    ensure!(build.context == "common/app", "context {}", build.context);
    ensure!(web.volumes.first().map(|v| v.source.as_str()) == Some("common/static"));
    Ok(())
}

#[test]
fn resolved_paths_point_into_the_project() -> Result<()> {
    let shop = shop_project()?;
    let options = LoadOptions::new().project_name("shop", true).resolve_paths(true);
    let project = load_from(&shop, &options, Environment::new())?;
    let web = project.get_service("web").map_err(|err| anyhow!(err.to_string()))?;

    let context = web.build.as_ref().map(|build| build.context.clone());
    ensure!(context == Some(shop.join("common/app").to_string()));
    ensure!(web.volumes.first().map(|v| v.source.clone()) == Some(shop.join("common/static").to_string()));
    let token = project.secrets.get("token").map(|secret| secret.file.clone());
    ensure!(token == Some(shop.join("secrets/token.txt").to_string()));
    Ok(())
}

#[test]
#[serial]
fn tilde_expands_to_the_home_directory() -> Result<()> {
    let shop = shop_project()?;
    shop.write("home/ctx/Dockerfile", "FROM scratch\n")?;
    shop.write("tilde.yaml", "services:\n  tool:\n    build: ~/ctx\n    env_file: [~/tool.env]\n")?;
    shop.write("home/tool.env", "FROM_HOME=1\n")?;
    let _home = env::set_var("HOME", shop.join("home").as_str());

    let path = shop.join("tilde.yaml");
    let details = ConfigDetails::new(
        shop.path(),
        vec![Document::from_bytes(path.as_str(), std::fs::read(&path)?)],
        Environment::new(),
    );
    let options = LoadOptions::new().project_name("shop", true).resolve_paths(true);
    let project = load(details, &options).map_err(|err| anyhow!(err.to_string()))?;
    let tool = project.get_service("tool").map_err(|err| anyhow!(err.to_string()))?;

    ensure!(tool.build.as_ref().map(|b| b.context.clone()) == Some(shop.join("home/ctx").to_string()));
    ensure!(tool.environment.get("FROM_HOME") == Some(&Some("1".to_owned())));
    Ok(())
}

#[test]
fn project_options_discover_files_and_read_dotenv() -> Result<()> {
    let shop = shop_project()?;
    shop.write(".env", "COMPOSE_PROJECT_NAME=storefront\nCOMPOSE_PROFILES=debug\nUSER_NAME=grace\n")?;
    shop.write(
        "compose.override.yaml",
        "services:\n  shell:\n    image: busybox\n    profiles: [debug]\n  ops:\n    image: busybox\n    profiles: [ops]\n",
    )?;

    let options = ProjectOptions::builder()
        .working_dir(shop.path())
        .dotenv(true)
        .environment(Environment::new())
        .build()
        .map_err(|err| anyhow!(err.to_string()))?;
    ensure!(options.name() == Some("storefront"));
    ensure!(options.profiles() == ["debug"]);

    let project = options.load_project().map_err(|err| anyhow!(err.to_string()))?;
    ensure!(project.name == "storefront");
    ensure!(project.service_names() == ["shell", "web"]);
    ensure!(project.disabled_services.contains_key("ops"));
    ensure!(project.compose_files == [shop.join("compose.yaml"), shop.join("compose.override.yaml")]);
    let web = project.get_service("web").map_err(|err| anyhow!(err.to_string()))?;
    ensure!(web.environment.get("GREETING") == Some(&Some("hello grace".to_owned())));
    Ok(())
}

#[test]
fn missing_env_file_names_the_path() -> Result<()> {
    let shop = shop_project()?;
    std::fs::remove_file(shop.join("web.env"))?;
    let err = load_from(&shop, &LoadOptions::new().project_name("shop", true), Environment::new())
        .err()
        .map(|err| err.to_string())
        .unwrap_or_default();
    let expected = format!("cannot read '{}'", shop.join("web.env"));
    ensure!(err.starts_with(&expected), "unexpected error: {err}");
    Ok(())
}
