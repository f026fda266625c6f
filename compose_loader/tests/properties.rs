//! End-to-end checks of the loader's guarantees: idempotent normalization,
//! order-independent merging, cycle reporting, shorthand equivalence,
//! referential integrity, deprecated-field conflicts and default networks.

mod common;

use anyhow::{Result, anyhow, ensure};
use common::{APP_DIR, load_documents, load_error, load_yaml};
use compose_loader::normalize::normalize;
use compose_loader::types::{Environment, Project};
use compose_loader::{ComposeError, LoadOptions, MemorySource};
use rstest::rstest;

const FULL_PROJECT: &str = r#"
name: Shop
services:
  web:
    image: nginx:${TAG:-latest}
    scale: 2
    log_driver: json-file
    pull_policy: if_not_present
    ports: ["8080:80", "443"]
    volumes: ["./html:/usr/share/nginx/html:ro", "cache:/var/cache"]
    environment: [MODE=prod, DEBUG]
    depends_on: [api]
    secrets: [token]
  api:
    build: ./api
    dockerfile: api.Dockerfile
    networks: [back]
    healthcheck:
      test: curl -f http://localhost/health
      interval: 30s
    ulimits:
      nofile: 1024
networks:
  back: {}
volumes:
  cache: {}
secrets:
  token:
    file: ./token.txt
"#;

#[test]
fn normalizing_a_loaded_project_again_changes_nothing() -> Result<()> {
    let loaded = load_yaml(FULL_PROJECT)?;
    let mut again = loaded.clone();
    normalize(&mut again, false, &MemorySource::default()).map_err(|err| anyhow!(err.to_string()))?;
    ensure!(again == loaded, "second normalization changed the project");
    ensure!(loaded.name == "demo");
    Ok(())
}

const BASE: &str = "services:\n  web:\n    image: nginx\n    environment: {A: base}\n";
const LAYERS: [(&str, &str); 3] = [
    (
        "ports.yml",
        "services:\n  web:\n    ports: [\"80:80\"]\n    labels: {tier: front, owner: web}\n",
    ),
    (
        "worker.yml",
        "services:\n  worker:\n    environment: {Z: last, B: first}\n    image: busybox\n",
    ),
    (
        "volumes.yml",
        "volumes:\n  data: {labels: {b: two, a: one}}\nservices:\n  web:\n    volumes: [\"data:/data\"]\n",
    ),
];

fn load_in_order(order: [usize; 3]) -> Result<Project> {
    let mut files = vec![("compose.yml", BASE)];
    files.extend(order.iter().filter_map(|index| LAYERS.get(*index).copied()));
    let mut project = load_documents(
        &files,
        Environment::new(),
        &LoadOptions::new().project_name("demo", true),
        &MemorySource::default(),
    )
    .map_err(|err| anyhow!(err.to_string()))?;
    project.compose_files.clear();
    Ok(project)
}

#[test]
fn override_order_does_not_change_the_result() -> Result<()> {
    let reference = load_in_order([0, 1, 2])?;
    for order in [[0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]] {
        let permuted = load_in_order(order)?;
        ensure!(permuted == reference, "order {order:?} produced a different project");
    }
    ensure!(reference.service_names() == ["web", "worker"]);
    Ok(())
}

/// Deterministic Fisher-Yates shuffle driven by a linear congruential
/// generator, so a failing seed can be replayed.
fn shuffled<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    const MULTIPLIER: u64 = 6_364_136_223_846_793_005;
    const INCREMENT: u64 = 1_442_695_040_888_963_407;
    let mut output = items.to_vec();
    let mut state = seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
    for upper in (1..output.len()).rev() {
        state = state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        let bound = u64::try_from(upper + 1).unwrap_or(u64::MAX);
        let pick = usize::try_from((state >> 33).checked_rem(bound).unwrap_or(0)).unwrap_or(0);
        output.swap(upper, pick);
    }
    output
}

fn flow_list(items: &[&str], seed: u64) -> String {
    let quoted: Vec<String> = shuffled(items, seed).iter().map(|item| format!("\"{item}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

fn flow_map(entries: &[(&str, &str)], seed: u64) -> String {
    let pairs: Vec<String> = shuffled(entries, seed)
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

fn service_block(name: &str, fields: &[String], seed: u64) -> String {
    let body: String = shuffled(fields, seed).iter().map(|field| format!("    {field}\n")).collect();
    format!("  {name}:\n{body}")
}

/// A base document and an override touching the same services, with every
/// mapping and keyed list written in a seed-dependent order.
fn keyed_documents(seed: u64) -> (String, String) {
    let web = [
        "image: nginx".to_owned(),
        format!("environment: {}", flow_map(&[("A", "a"), ("B", "b"), ("C", "c"), ("D", "d")], seed)),
        format!("ports: {}", flow_list(&["8080:80", "8443:443", "9000:9000"], seed + 1)),
        format!("volumes: {}", flow_list(&["data:/data", "logs:/logs", "./html:/html"], seed + 2)),
        format!("secrets: {}", flow_list(&["token", "cert"], seed + 3)),
        format!("configs: {}", flow_list(&["nginx", "mime"], seed + 4)),
    ];
    let api = [
        "image: busybox".to_owned(),
        format!("labels: {}", flow_map(&[("c", "three"), ("a", "one"), ("b", "two")], seed + 5)),
    ];
    let db = ["image: postgres".to_owned(), "environment: [PGDATA=/var/lib/pg]".to_owned()];
    let services = shuffled(
        &[
            service_block("web", &web, seed + 6),
            service_block("api", &api, seed + 7),
            service_block("db", &db, seed + 8),
        ],
        seed + 9,
    );
    let file = "{file: ./resource}";
    let sections = shuffled(
        &[
            format!("volumes: {}\n", flow_map(&[("data", "{}"), ("logs", "{}"), ("cache", "{}")], seed + 10)),
            format!("secrets: {}\n", flow_map(&[("token", file), ("cert", file), ("key", file)], seed + 11)),
            format!("configs: {}\n", flow_map(&[("nginx", file), ("mime", file), ("extra", file)], seed + 12)),
        ],
        seed + 13,
    );
    let base = format!("services:\n{}{}", services.concat(), sections.concat());

    let web_layer = [
        format!("environment: {}", flow_map(&[("E", "e"), ("B", "layer")], seed + 14)),
        format!("ports: {}", flow_list(&["53:53/udp", "7000:7000"], seed + 15)),
        format!("volumes: {}", flow_list(&["cache:/cache", "./static:/data"], seed + 16)),
        format!("secrets: {}", flow_list(&["key", "token"], seed + 17)),
        format!("configs: {}", flow_list(&["extra"], seed + 18)),
    ];
    let api_layer = [
        format!("labels: {}", flow_map(&[("d", "four"), ("a", "override")], seed + 19)),
        format!("environment: {}", flow_map(&[("Z", "z"), ("Y", "y")], seed + 20)),
    ];
    let layers = shuffled(
        &[
            service_block("web", &web_layer, seed + 21),
            service_block("api", &api_layer, seed + 22),
        ],
        seed + 23,
    );
    (base, format!("services:\n{}", layers.concat()))
}

fn load_keyed(seed: u64) -> Result<Project> {
    let (base, layer) = keyed_documents(seed);
    load_documents(
        &[("compose.yml", base.as_str()), ("override.yml", layer.as_str())],
        Environment::new(),
        &LoadOptions::new().project_name("demo", true),
        &MemorySource::default(),
    )
    .map_err(|err| anyhow!("seed {seed}: {err}"))
}

#[test]
fn key_and_list_order_inside_documents_does_not_change_the_result() -> Result<()> {
    let reference = load_keyed(0)?;
    for seed in 1..24 {
        let shuffled_project = load_keyed(seed)?;
        ensure!(shuffled_project == reference, "seed {seed} produced a different project");
    }

    let web = reference.get_service("web").map_err(|err| anyhow!(err.to_string()))?;
    let targets: Vec<u32> = web.ports.iter().map(|port| port.target).collect();
    ensure!(targets == [53, 80, 443, 7000, 9000], "ports {targets:?}");
    let mounts: Vec<(&str, &str)> = web.volumes.iter().map(|v| (v.target.as_str(), v.source.as_str())).collect();
    ensure!(mounts == [("/cache", "cache"), ("/data", "./static"), ("/html", "./html"), ("/logs", "logs")]);
    let secrets: Vec<&str> = web.secrets.iter().map(|secret| secret.source.as_str()).collect();
    ensure!(secrets == ["cert", "key", "token"]);
    ensure!(web.environment.get("B") == Some(&Some("layer".to_owned())));
    Ok(())
}

fn cycle_document(length: usize) -> String {
    let mut yaml = String::from("services:\n");
    for index in 0..length {
        let next = if index + 1 == length { 0 } else { index + 1 };
        yaml.push_str(&format!("  s{index}:\n    image: busybox\n    extends: s{next}\n"));
    }
    yaml
}

#[rstest]
#[case::self_reference(1)]
#[case::pair(2)]
#[case::three(3)]
#[case::five(5)]
fn extends_cycles_list_every_participant(#[case] length: usize) {
    let file = format!("{APP_DIR}/compose.yml");
    let mut expected = vec!["Circular reference:".to_owned(), format!("  s0 in {file}")];
    expected.extend((1..length).map(|index| format!("  extends s{index} in {file}")));
    expected.push(format!("  extends s0 in {file}"));

    assert_eq!(load_error(&cycle_document(length)), Some(expected.join("\n")));
}

#[test]
fn cycles_across_files_report_each_file() {
    let main = "services:\n  web:\n    image: nginx\n    extends: {file: base.yml, service: app}\n";
    let base = "services:\n  app:\n    image: nginx\n    extends: {file: compose.yml, service: web}\n";
    let source = MemorySource::default()
        .with_file("/app/compose.yml", main)
        .with_file("/app/base.yml", base);
    let err = load_documents(&[("compose.yml", main)], Environment::new(), &LoadOptions::new(), &source).err();
    assert!(matches!(err.as_deref(), Some(ComposeError::CircularReference { chain }) if chain.len() == 3));
    assert_eq!(
        err.map(|e| e.to_string()).as_deref(),
        Some("Circular reference:\n  web in /app/compose.yml\n  extends app in /app/base.yml\n  extends web in /app/compose.yml")
    );
}

#[rstest]
#[case::ports("ports: [\"8080:80\"]", "ports: [{published: \"8080\", target: 80}]")]
#[case::port_protocol("ports: [\"53/udp\"]", "ports: [{target: 53, protocol: udp, mode: ingress}]")]
#[case::bind_volume(
    "volumes: [\"./data:/data:ro\"]",
    "volumes: [{type: bind, source: ./data, target: /data, read_only: true, bind: {create_host_path: true}}]"
)]
#[case::named_volume("volumes: [\"logs:/logs\"]", "volumes: [{type: volume, source: logs, target: /logs}]")]
#[case::environment("environment: [A=1, B]", "environment: {A: \"1\", B: null}")]
#[case::depends_on("depends_on: [db]", "depends_on: {db: {condition: service_started}}")]
#[case::healthcheck(
    "healthcheck: {test: curl -f http://localhost}",
    "healthcheck: {test: [CMD-SHELL, curl -f http://localhost]}"
)]
#[case::ulimits("ulimits: {nofile: 1024}", "ulimits: {nofile: {soft: 1024, hard: 1024}}")]
#[case::command("command: echo \"hello world\"", "command: [echo, hello world]")]
#[case::ssh(
    "build: {context: ., ssh: [default, key=/run/key]}",
    "build: {context: ., ssh: {default: null, key: /run/key}}"
)]
fn shorthand_and_canonical_forms_agree(#[case] short: &str, #[case] canonical: &str) -> Result<()> {
    let service = |field: &str| -> Result<Project> {
        let image = if field.starts_with("build") { "" } else { "    image: nginx\n" };
        load_yaml(&format!(
            "services:\n  db:\n    image: postgres\n  web:\n{image}    {field}\nvolumes:\n  logs: {{}}\n"
        ))
    };
    let from_short = service(short)?;
    let from_canonical = service(canonical)?;
    ensure!(
        from_short.services.get("web") == from_canonical.services.get("web"),
        "{short} and {canonical} decode differently"
    );
    Ok(())
}

#[rstest]
#[case::network("networks: [back]", "service \"web\" refers to undefined network back")]
#[case::volume("volumes: [\"data:/data\"]", "service \"web\" refers to undefined volume data")]
#[case::secret("secrets: [token]", "service \"web\" refers to undefined secret token")]
#[case::config("configs: [nginx]", "service \"web\" refers to undefined config nginx")]
#[case::service(
    "network_mode: \"service:proxy\"",
    "service \"web\" depends on undefined service proxy for its network mode"
)]
fn dangling_references_are_rejected(#[case] field: &str, #[case] expected: &str) {
    let yaml = format!("services:\n  web:\n    image: nginx\n    {field}\n");
    assert_eq!(load_error(&yaml).as_deref(), Some(expected));
}

#[test]
fn defined_references_are_accepted() {
    let yaml = concat!(
        "services:\n",
        "  proxy:\n    image: envoy\n",
        "  web:\n    image: nginx\n    networks: [back]\n    volumes: [\"data:/data\"]\n",
        "    secrets: [token]\n    configs: [nginx]\n",
        "  sidecar:\n    image: busybox\n    network_mode: \"service:proxy\"\n",
        "networks: {back: {}}\nvolumes: {data: {}}\n",
        "secrets: {token: {file: ./token}}\nconfigs: {nginx: {file: ./nginx.conf}}\n",
    );
    assert_eq!(load_error(yaml), None);
}

#[test]
fn scale_and_replicas_conflict() {
    let yaml = "services:\n  web:\n    image: nginx\n    scale: 3\n    deploy: {replicas: 5}\n";
    assert_eq!(
        load_error(yaml).as_deref(),
        Some("service web: can't use both 'scale' (deprecated) and 'deploy.replicas'")
    );
}

#[test]
fn scale_alone_becomes_replicas() -> Result<()> {
    let project = load_yaml("services:\n  web:\n    image: nginx\n    scale: 3\n")?;
    let web = project.get_service("web").map_err(|err| anyhow!(err.to_string()))?;
    ensure!(web.deploy.as_ref().and_then(|deploy| deploy.replicas) == Some(3));
    ensure!(web.scale.is_none());
    Ok(())
}

#[test]
fn default_network_is_injected_and_attached() -> Result<()> {
    let project = load_yaml("services:\n  web:\n    image: nginx\n")?;
    ensure!(project.network_names() == ["default"]);
    ensure!(project.networks.get("default").map(|n| n.name.as_str()) == Some("demo_default"));
    let web = project.get_service("web").map_err(|err| anyhow!(err.to_string()))?;
    ensure!(web.networks.keys().collect::<Vec<_>>() == ["default"]);
    Ok(())
}
