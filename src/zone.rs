use log::trace;
use thiserror::Error;

use crate::provider::Zone;

#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ZoneError {
    #[error("no zone found for dns-name={0}")]
    NotFound(String),
}

// Names are compared case-insensitively and without the root label
fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Find the zone that `hostname` belongs to.
///
/// A zone matches if its name equals the hostname or if the hostname ends in `.` followed by the zone name.
/// If several zones match, the longest (most specific) one is returned.
pub fn find_zone<'a>(zones: &'a [Zone], hostname: &str) -> Result<&'a Zone, ZoneError> {
    let hostname = normalize(hostname);

    zones
        .iter()
        .filter(|z| {
            let name = normalize(&z.name);
            !name.is_empty()
                && (hostname == name
                    || hostname
                        .strip_suffix(name.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
        .inspect(|z| trace!("Zone {} matches {}", z, hostname))
        .max_by_key(|z| normalize(&z.name).len())
        .ok_or(ZoneError::NotFound(hostname))
}
