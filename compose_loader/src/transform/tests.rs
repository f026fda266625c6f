//! Tests for shorthand expansion.

use super::*;
use anyhow::{Result, anyhow, ensure};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn table() -> TransformTable {
    default_transforms()
}

fn service_field(table: &TransformTable, field: &str, value: Value) -> ComposeResult<Value> {
    let doc = json!({ "services": { "web": { field: value } } });
    let out = transform(doc, &FieldPath::root(), table)?;
    Ok(out
        .pointer(&format!("/services/web/{field}"))
        .cloned()
        .unwrap_or(Value::Null))
}

fn expand(table: &TransformTable, field: &str, value: Value) -> Result<Value> {
    service_field(table, field, value).map_err(|err| anyhow!(err.to_string()))
}

#[rstest]
#[case::short_string(json!(["8080:80"]))]
#[case::long_form(json!([{"published": 8080, "target": 80}]))]
#[case::long_form_explicit(json!([{"published": "8080", "target": 80, "protocol": "tcp", "mode": "ingress"}]))]
fn port_spellings_agree(table: TransformTable, #[case] ports: Value) -> Result<()> {
    let canonical: Vec<crate::types::ServicePortConfig> = serde_json::from_value(expand(&table, "ports", ports)?)?;
    let expected = crate::types::ServicePortConfig {
        mode: "ingress".to_owned(),
        target: 80,
        published: "8080".to_owned(),
        protocol: "tcp".to_owned(),
        ..Default::default()
    };
    ensure!(canonical == [expected], "unexpected ports {canonical:?}");
    Ok(())
}

#[rstest]
fn port_lists_expand_ranges_and_numbers(table: TransformTable) -> Result<()> {
    let out = expand(&table, "ports", json!([3000, "9000-9001:90-91/udp", "[::1]:53:53"]))?;
    let summary: Vec<(String, String, u64, String)> = out
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|p| {
                    (
                        p["host_ip"].as_str().unwrap_or_default().to_owned(),
                        p["published"].as_str().unwrap_or_default().to_owned(),
                        p["target"].as_u64().unwrap_or_default(),
                        p["protocol"].as_str().unwrap_or_default().to_owned(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    let expected = [
        ("", "", 3000, "tcp"),
        ("", "9000", 90, "udp"),
        ("", "9001", 91, "udp"),
        ("::1", "53", 53, "tcp"),
    ]
    .map(|(ip, published, target, protocol)| (ip.to_owned(), published.to_owned(), target, protocol.to_owned()));
    ensure!(summary == expected, "unexpected expansion {summary:?}");
    Ok(())
}

#[rstest]
#[case("80-82:90-91", "invalid ranges specified for container and host Ports: 90-91 and 80-82")]
#[case("http", "invalid containerPort: http")]
#[case("80:70000", "invalid containerPort: 70000")]
#[case("80/icmp", "invalid proto: icmp")]
fn rejects_malformed_port_specs(#[case] spec: &str, #[case] message: &str) {
    assert_eq!(parse_port_spec(spec).err().as_deref(), Some(message));
}

#[test]
fn host_range_with_single_container_port_stays_whole() {
    let ports = parse_port_spec("8000-8010:80").unwrap_or_default();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports.first().map(|p| p.published.as_str()), Some("8000-8010"));
}

#[rstest]
#[case::short(json!(["./data:/var/lib/data/:ro"]))]
#[case::long(json!([{
    "type": "bind",
    "source": "./data",
    "target": "/var/lib/data",
    "read_only": true,
    "bind": {"create_host_path": true}
}]))]
fn volume_spellings_agree(table: TransformTable, #[case] volumes: Value) -> Result<()> {
    let canonical: Vec<crate::types::ServiceVolumeConfig> = serde_json::from_value(expand(&table, "volumes", volumes)?)?;
    let first = canonical.first().ok_or_else(|| anyhow!("no volume"))?;
    ensure!(first.kind == "bind" && first.source == "./data" && first.target == "/var/lib/data");
    ensure!(first.read_only);
    ensure!(first.bind.as_ref().is_some_and(|b| b.create_host_path));
    Ok(())
}

#[rstest]
#[case("/data", "volume", "", "/data")]
#[case("db:/var/lib/db", "volume", "db", "/var/lib/db")]
#[case("~/cfg:/etc/cfg", "bind", "~/cfg", "/etc/cfg")]
#[case("\\\\host\\share:/mnt", "bind", "\\\\host\\share", "/mnt")]
#[case("c:\\logs:/logs:rw", "bind", "c:\\logs", "/logs")]
#[case("/a", "volume", "", "/a")]
fn classifies_volume_sources(#[case] spec: &str, #[case] kind: &str, #[case] source: &str, #[case] target: &str) {
    let volume = parse_volume(spec).unwrap_or_default();
    assert_eq!(
        (volume.kind.as_str(), volume.source.as_str(), volume.target.as_str()),
        (kind, source, target)
    );
}

#[rstest]
#[case("", "invalid empty volume spec")]
#[case("data::/x", "invalid spec: data::/x: empty section between colons")]
#[case("ab:/b:ro:extra", "invalid spec: ab:/b:ro:extra: too many colons")]
fn rejects_malformed_volume_specs(#[case] spec: &str, #[case] message: &str) {
    assert_eq!(parse_volume(spec).err().as_deref(), Some(message));
}

#[test]
fn volume_options_set_propagation_and_selinux() {
    let volume = parse_volume("./src:/src:ro,rshared,z").unwrap_or_default();
    let bind = volume.bind.unwrap_or_default();
    assert!(volume.read_only);
    assert_eq!((bind.propagation.as_str(), bind.selinux.as_str()), ("rshared", "z"));
}

#[rstest]
#[case::environment_list("environment", json!(["A=1", "B", "C="]), json!({"A": "1", "B": null, "C": ""}))]
#[case::environment_map("environment", json!({"A": 1, "B": null, "C": true}), json!({"A": "1", "B": null, "C": "true"}))]
#[case::labels_list("labels", json!(["tier=web", "bare"]), json!({"tier": "web", "bare": ""}))]
#[case::extra_hosts("extra_hosts", json!(["db:10.0.0.2", "v6:::1"]), json!({"db": "10.0.0.2", "v6": "::1"}))]
#[case::depends_on_list("depends_on", json!(["db", "cache"]), json!({
    "db": {"condition": "service_started"},
    "cache": {"condition": "service_started"}
}))]
#[case::depends_on_map("depends_on", json!({"db": {"condition": "service_healthy"}, "cache": null}), json!({
    "db": {"condition": "service_healthy"},
    "cache": {"condition": "service_started"}
}))]
#[case::healthcheck("healthcheck", json!({"test": "curl -f localhost"}), json!({"test": ["CMD-SHELL", "curl -f localhost"]}))]
#[case::ulimit("ulimits", json!({"nofile": 1024, "nproc": {"soft": 1, "hard": 2}}), json!({
    "nofile": {"soft": 1024, "hard": 1024},
    "nproc": {"soft": 1, "hard": 2}
}))]
#[case::command("command", json!("sh -c 'echo hi'"), json!(["sh", "-c", "echo hi"]))]
#[case::networks("networks", json!(["front", "back"]), json!({"front": null, "back": null}))]
#[case::secrets("secrets", json!(["token", {"source": "cert", "target": "/run//certs/./a"}]), json!([
    {"source": "token"},
    {"source": "cert", "target": "/run/certs/a"}
]))]
#[case::build("build", json!("./app"), json!({"context": "./app"}))]
#[case::extends("extends", json!("base"), json!({"service": "base"}))]
#[case::dns("dns", json!("8.8.8.8"), json!(["8.8.8.8"]))]
#[case::expose("expose", json!([80, "443"]), json!(["80", "443"]))]
#[case::memory("mem_limit", json!("1.5k"), json!(1536))]
#[case::grace("stop_grace_period", json!("1m30s"), json!(90_000_000_000_i64))]
#[case::grace_int("stop_grace_period", json!(5), json!(5))]
fn expands_service_shorthands(
    table: TransformTable,
    #[case] field: &str,
    #[case] input: Value,
    #[case] expected: Value,
) -> Result<()> {
    let out = expand(&table, field, input)?;
    ensure!(out == expected, "{field}: expected {expected}, got {out}");
    Ok(())
}

#[rstest]
#[case::empty_string(json!(""))]
#[case::default_string(json!("default"))]
#[case::list(json!(["default"]))]
#[case::map(json!({"default": null}))]
fn ssh_spellings_agree(table: TransformTable, #[case] ssh: Value) -> Result<()> {
    let out = expand(&table, "build", json!({"ssh": ssh}))?;
    ensure!(out == json!({"ssh": [{"id": "default", "path": ""}]}), "got {out}");
    Ok(())
}

#[rstest]
fn ssh_pairs_keep_paths(table: TransformTable) -> Result<()> {
    let out = expand(&table, "build", json!({"ssh": ["agent=/tmp/agent.sock", "key"]}))?;
    ensure!(out == json!({"ssh": [
        {"id": "agent", "path": "/tmp/agent.sock"},
        {"id": "key", "path": ""}
    ]}));
    Ok(())
}

#[rstest]
fn device_count_accepts_all(table: TransformTable) -> Result<()> {
    let deploy = json!({"resources": {"reservations": {"devices": [{"count": "all"}, {"count": "2"}]}}});
    let out = expand(&table, "deploy", deploy)?;
    ensure!(out.pointer("/resources/reservations/devices/0/count") == Some(&json!(-1)));
    ensure!(out.pointer("/resources/reservations/devices/1/count") == Some(&json!(2)));
    Ok(())
}

#[rstest]
#[case::bool(json!(true), json!({"external": true}))]
#[case::legacy_name(json!({"name": "shared"}), json!({"external": true, "name": "shared"}))]
fn expands_external_flags(table: TransformTable, #[case] external: Value, #[case] expected: Value) -> Result<()> {
    let doc = json!({"volumes": {"data": {"external": external}}});
    let out = transform(doc, &FieldPath::root(), &table).map_err(|err| anyhow!(err.to_string()))?;
    ensure!(out.pointer("/volumes/data/external") == Some(&expected));
    Ok(())
}

#[rstest]
#[case::ports("ports", json!({"80": 80}), "services.web.ports: invalid type mapping for ports")]
#[case::build("build", json!(3), "services.web.build: invalid type number for build")]
#[case::env_item("environment", json!([["A"]]), "services.web.environment[0]: invalid type sequence for mapping or list")]
#[case::command("command", json!("echo 'oops"), "services.web.command: invalid command line \"echo 'oops\"")]
#[case::ulimit("ulimits", json!({"nofile": "lots"}), "services.web.ulimits.nofile: invalid type string for ulimits")]
#[case::duration("stop_grace_period", json!("soon"), "services.web.stop_grace_period: time: invalid duration \"soon\"")]
fn reports_unrecognized_shapes(
    table: TransformTable,
    #[case] field: &str,
    #[case] value: Value,
    #[case] message: &str,
) {
    let err = service_field(&table, field, value).err().map(|e| e.to_string());
    assert_eq!(err.as_deref(), Some(message));
}
