//! Short volume syntax: `[SOURCE:]TARGET[:OPTIONS]`.

use crate::paths::clean_path;
use crate::types::{ServiceVolumeBind, ServiceVolumeConfig, ServiceVolumeVolume, VOLUME_TYPE_BIND, VOLUME_TYPE_VOLUME};

const PROPAGATION_MODES: [&str; 6] = ["rprivate", "private", "rshared", "shared", "rslave", "slave"];
const SELINUX_MODES: [&str; 2] = ["z", "Z"];

/// Parse a short volume spec such as `./data:/var/lib/data:ro`.
///
/// Sources that look like paths (`.`, `/`, `~`, `\\` or a drive letter)
/// produce bind mounts that create the host path when missing. Anything
/// else names a volume. A spec with a single part mounts an anonymous
/// volume at that target. Unknown options are ignored.
///
/// # Errors
///
/// Returns a message for empty specs, empty sections and extra colons.
///
/// # Examples
///
/// ```
/// use compose_loader::transform::parse_volume;
///
/// let bind = parse_volume("C:\\data:/srv/data/:ro").unwrap_or_default();
/// assert_eq!((bind.kind.as_str(), bind.source.as_str(), bind.target.as_str()), ("bind", "C:\\data", "/srv/data"));
/// assert!(bind.read_only);
///
/// let named = parse_volume("cache:/tmp/cache:nocopy").unwrap_or_default();
/// assert_eq!(named.kind, "volume");
/// assert!(named.volume.is_some_and(|v| v.nocopy));
/// ```
pub fn parse_volume(spec: &str) -> Result<ServiceVolumeConfig, String> {
    let mut volume = ServiceVolumeConfig::default();
    match spec.chars().count() {
        0 => return Err("invalid empty volume spec".to_owned()),
        1 | 2 => {
            volume.kind = VOLUME_TYPE_VOLUME.to_owned();
            volume.target = spec.to_owned();
            return Ok(volume);
        }
        _ => {}
    }
    let mut buffer = String::new();
    for ch in spec.chars().map(Some).chain(std::iter::once(None)) {
        match ch {
            Some(':') if is_drive_letter(&buffer) => buffer.push(':'),
            Some(':') | None => {
                populate_field(&buffer, ch.is_none(), &mut volume).map_err(|message| format!("invalid spec: {spec}: {message}"))?;
                buffer.clear();
            }
            Some(other) => buffer.push(other),
        }
    }
    populate_type(&mut volume);
    volume.target = clean_path(&volume.target);
    Ok(volume)
}

fn is_drive_letter(buffer: &str) -> bool {
    let mut chars = buffer.chars();
    matches!((chars.next(), chars.next()), (Some(letter), None) if letter.is_alphabetic())
}

fn populate_field(section: &str, last: bool, volume: &mut ServiceVolumeConfig) -> Result<(), &'static str> {
    if section.is_empty() {
        return Err("empty section between colons");
    }
    if volume.source.is_empty() && last {
        section.clone_into(&mut volume.target);
        return Ok(());
    }
    if volume.source.is_empty() {
        section.clone_into(&mut volume.source);
        return Ok(());
    }
    if volume.target.is_empty() {
        section.clone_into(&mut volume.target);
        return Ok(());
    }
    if !last {
        return Err("too many colons");
    }
    for option in section.split(',') {
        match option {
            "ro" => volume.read_only = true,
            "rw" => volume.read_only = false,
            "nocopy" => {
                volume.volume = Some(ServiceVolumeVolume {
                    nocopy: true,
                    ..ServiceVolumeVolume::default()
                });
            }
            mode if PROPAGATION_MODES.contains(&mode) => {
                volume.bind.get_or_insert_with(ServiceVolumeBind::default).propagation = mode.to_owned();
            }
            mode if SELINUX_MODES.contains(&mode) => {
                volume.bind.get_or_insert_with(ServiceVolumeBind::default).selinux = mode.to_owned();
            }
            _ => {}
        }
    }
    Ok(())
}

fn populate_type(volume: &mut ServiceVolumeConfig) {
    if is_file_path(&volume.source) {
        volume.kind = VOLUME_TYPE_BIND.to_owned();
        volume.bind.get_or_insert_with(ServiceVolumeBind::default).create_host_path = true;
    } else {
        volume.kind = VOLUME_TYPE_VOLUME.to_owned();
    }
}

/// `true` when a short-syntax source names a host path rather than a
/// volume.
pub(crate) fn is_file_path(source: &str) -> bool {
    if source.starts_with(['.', '/', '~']) || source.starts_with("\\\\") {
        return true;
    }
    let mut chars = source.chars();
    matches!((chars.next(), chars.next()), (Some(letter), Some(':')) if letter.is_alphabetic())
}
