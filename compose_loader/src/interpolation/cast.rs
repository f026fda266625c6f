//! Conversions applied to interpolated strings at typed field positions.

use serde_json::{Number, Value};

use crate::path::PathTable;
use crate::types::{Duration, UnitBytes};

/// Semantic type an interpolated string is converted back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Int64,
    /// Double-precision float.
    Float,
    /// Single-precision float.
    Float32,
    /// YAML 1.1 boolean literal (`yes`, `off`, `True`, ...).
    Bool,
    /// Unit-suffixed duration, stored as nanoseconds.
    Duration,
    /// Unit-suffixed byte size, stored as bytes.
    UnitBytes,
}

/// Field-path patterns mapped to the cast applied at matching positions.
pub type CastTable = PathTable<Cast>;

impl Cast {
    /// Convert `raw` into a value of this type.
    ///
    /// # Errors
    ///
    /// Returns a message naming the expected type and the rejected literal.
    pub fn apply(self, raw: &str) -> Result<Value, String> {
        match self {
            Self::Int => raw
                .parse::<i32>()
                .map(Value::from)
                .map_err(|err| format!("invalid integer {raw:?}: {err}")),
            Self::Int64 => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|err| format!("invalid integer {raw:?}: {err}")),
            Self::Float | Self::Float32 => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float {raw:?}")),
            Self::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("invalid boolean: {raw}")),
            Self::Duration => Duration::parse(raw).map(|d| Value::from(d.as_nanos())),
            Self::UnitBytes => UnitBytes::parse(raw).map(|b| Value::from(b.bytes())),
        }
    }
}

/// Read a YAML 1.1 boolean literal.
///
/// # Examples
///
/// ```
/// use compose_loader::interpolation::parse_bool;
/// assert_eq!(parse_bool("Yes"), Some(true));
/// assert_eq!(parse_bool("off"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => Some(true),
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => Some(false),
        _ => None,
    }
}

/// Casts for every typed scalar of the compose file format.
#[must_use]
pub fn default_casts() -> CastTable {
    let service = [
        ("configs.[].mode", Cast::Int),
        ("cpu_count", Cast::Int64),
        ("cpu_percent", Cast::Float),
        ("cpu_period", Cast::Int64),
        ("cpu_quota", Cast::Int64),
        ("cpu_rt_period", Cast::Int64),
        ("cpu_rt_runtime", Cast::Int64),
        ("cpus", Cast::Float32),
        ("cpu_shares", Cast::Int64),
        ("init", Cast::Bool),
        ("deploy.replicas", Cast::Int),
        ("deploy.update_config.parallelism", Cast::Int),
        ("deploy.update_config.max_failure_ratio", Cast::Float),
        ("deploy.update_config.delay", Cast::Duration),
        ("deploy.update_config.monitor", Cast::Duration),
        ("deploy.rollback_config.parallelism", Cast::Int),
        ("deploy.rollback_config.max_failure_ratio", Cast::Float),
        ("deploy.rollback_config.delay", Cast::Duration),
        ("deploy.rollback_config.monitor", Cast::Duration),
        ("deploy.restart_policy.max_attempts", Cast::Int),
        ("deploy.restart_policy.delay", Cast::Duration),
        ("deploy.restart_policy.window", Cast::Duration),
        ("deploy.placement.max_replicas_per_node", Cast::Int),
        ("deploy.resources.limits.memory", Cast::UnitBytes),
        ("deploy.resources.reservations.memory", Cast::UnitBytes),
        ("healthcheck.retries", Cast::Int),
        ("healthcheck.disable", Cast::Bool),
        ("healthcheck.interval", Cast::Duration),
        ("healthcheck.timeout", Cast::Duration),
        ("healthcheck.start_period", Cast::Duration),
        ("mem_limit", Cast::UnitBytes),
        ("mem_reservation", Cast::UnitBytes),
        ("memswap_limit", Cast::UnitBytes),
        ("mem_swappiness", Cast::UnitBytes),
        ("oom_kill_disable", Cast::Bool),
        ("oom_score_adj", Cast::Int64),
        ("pids_limit", Cast::Int64),
        ("ports.[].target", Cast::Int),
        ("privileged", Cast::Bool),
        ("read_only", Cast::Bool),
        ("scale", Cast::Int),
        ("secrets.[].mode", Cast::Int),
        ("shm_size", Cast::UnitBytes),
        ("stdin_open", Cast::Bool),
        ("stop_grace_period", Cast::Duration),
        ("tty", Cast::Bool),
        ("ulimits.*", Cast::Int),
        ("ulimits.*.hard", Cast::Int),
        ("ulimits.*.soft", Cast::Int),
        ("volumes.[].read_only", Cast::Bool),
        ("volumes.[].volume.nocopy", Cast::Bool),
        ("volumes.[].tmpfs.size", Cast::UnitBytes),
    ]
    .map(|(suffix, cast)| (format!("services.*.{suffix}"), cast));
    let resources = [
        ("networks.*.external", Cast::Bool),
        ("networks.*.internal", Cast::Bool),
        ("networks.*.attachable", Cast::Bool),
        ("networks.*.enable_ipv6", Cast::Bool),
        ("volumes.*.external", Cast::Bool),
        ("secrets.*.external", Cast::Bool),
        ("configs.*.external", Cast::Bool),
    ]
    .map(|(pattern, cast)| (pattern.to_owned(), cast));
    PathTable::new(service.into_iter().chain(resources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Cast::Int, "42", json!(42))]
    #[case(Cast::Int64, "-9000000000", json!(-9_000_000_000_i64))]
    #[case(Cast::Float, "0.5", json!(0.5))]
    #[case(Cast::Bool, "on", json!(true))]
    #[case(Cast::Bool, "NO", json!(false))]
    #[case(Cast::Duration, "1m30s", json!(90_000_000_000_i64))]
    #[case(Cast::UnitBytes, "512m", json!(536_870_912))]
    fn casts_valid_literals(#[case] cast: Cast, #[case] raw: &str, #[case] expected: Value) {
        assert_eq!(cast.apply(raw), Ok(expected));
    }

    #[rstest]
    #[case(Cast::Int, "4.2")]
    #[case(Cast::Int, "9000000000")]
    #[case(Cast::Float, "fast")]
    #[case(Cast::Bool, "enabled")]
    #[case(Cast::Duration, "10")]
    #[case(Cast::UnitBytes, "lots")]
    fn rejects_invalid_literals(#[case] cast: Cast, #[case] raw: &str) {
        assert!(cast.apply(raw).is_err());
    }

    #[test]
    fn default_table_covers_nested_positions() {
        let table = default_casts();
        let target = FieldPath::from_keys(["services", "web", "ports"]).index(1).key("target");
        assert_eq!(table.lookup(&target), Some(&Cast::Int));
        let nofile = FieldPath::from_keys(["services", "web", "ulimits", "nofile"]);
        assert_eq!(table.lookup(&nofile), Some(&Cast::Int));
        let external = FieldPath::from_keys(["networks", "front", "external"]);
        assert_eq!(table.lookup(&external), Some(&Cast::Bool));
        let image = FieldPath::from_keys(["services", "web", "image"]);
        assert_eq!(table.lookup(&image), None);
    }
}
