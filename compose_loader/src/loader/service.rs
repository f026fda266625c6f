//! Typed decoding of one service and the steps that need its document's
//! working directory: environment files and bind-mount sources.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use super::Pipeline;
use crate::dotenv;
use crate::paths::{absolutize, convert_windows_path, expand_user};
use crate::types::{MappingWithEquals, ServiceConfig, VOLUME_TYPE_BIND};
use crate::{ComposeError, ComposeResult};

/// Decode the service `name` from its canonical tree.
pub(super) fn load_service(
    pipeline: &Pipeline<'_>,
    name: &str,
    raw: Value,
    working_dir: &Utf8Path,
) -> ComposeResult<ServiceConfig> {
    let tree = if raw.is_null() { Value::Object(Map::new()) } else { raw };
    let mut service: ServiceConfig = serde_json::from_value(tree)
        .map_err(|err| ComposeError::decode(format!("services.{name}"), err.to_string()))?;
    service.name = name.to_owned();
    resolve_environment(pipeline, &mut service, working_dir)?;
    resolve_binds(pipeline, &mut service, working_dir)?;
    Ok(service)
}

/// Fold `env_file` values into `environment`. Entries from later files
/// win, and the service's own `environment` wins over every file.
fn resolve_environment(
    pipeline: &Pipeline<'_>,
    service: &mut ServiceConfig,
    working_dir: &Utf8Path,
) -> ComposeResult<()> {
    let lookup = |key: &str| pipeline.lookup(key);
    let mut environment = MappingWithEquals::new();
    for file in &service.env_file {
        let path = Utf8PathBuf::from(absolutize(working_dir, &expand_user(file)));
        let bytes = pipeline.source.read(&path)?;
        let content = String::from_utf8(bytes)
            .map_err(|_| ComposeError::decode(path.as_str(), "env file is not valid UTF-8"))?;
        let values = dotenv::parse(&content, &lookup)
            .map_err(|err| ComposeError::decode(path.as_str(), err.to_string()))?;
        environment.extend(values.into_iter().filter(|(_, value)| value.is_some()));
    }
    for (key, value) in std::mem::take(&mut service.environment) {
        let resolved = value.or_else(|| lookup(&key));
        environment.insert(key, resolved);
    }
    service.environment = environment;
    Ok(())
}

fn resolve_binds(pipeline: &Pipeline<'_>, service: &mut ServiceConfig, working_dir: &Utf8Path) -> ComposeResult<()> {
    let options = pipeline.options;
    for (index, volume) in service.volumes.iter_mut().enumerate() {
        if volume.kind != VOLUME_TYPE_BIND {
            continue;
        }
        if volume.source.is_empty() {
            return Err(ComposeError::decode(
                format!("services.{}.volumes[{index}]", service.name),
                "invalid mount config for type \"bind\": field Source must not be empty",
            ));
        }
        if options.resolve_paths {
            volume.source = absolutize(working_dir, &expand_user(&volume.source));
        }
        if options.convert_windows_paths {
            volume.source = convert_windows_path(&volume.source);
        }
    }
    Ok(())
}
