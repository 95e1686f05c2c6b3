use super::LogError;
use ::log::LevelFilter;
use std::{collections::BTreeMap, str::FromStr};

/// Parsed form of a `RUST_LOG`-like expression such as `info,granary_blockstore=debug`.
///
/// A bare level sets the root level, `target=level` sets a per-target level and a bare target
/// enables everything for it. Malformed fragments are skipped and reported via [`LogFilters::rejected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilters {
    root: LevelFilter,
    targets: BTreeMap<String, LevelFilter>,
    rejected: Vec<LogError>,
}

impl Default for LogFilters {
    fn default() -> Self {
        Self { root: LevelFilter::Info, targets: BTreeMap::new(), rejected: Vec::new() }
    }
}

impl LogFilters {
    pub fn parse(expression: &str) -> Self {
        let mut filters = Self::default();
        for fragment in expression.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let mut parts = fragment.split('=').map(str::trim);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(single), None, None) => match single.parse::<LevelFilter>() {
                    Ok(level) => filters.root = level,
                    Err(_) => {
                        filters.targets.insert(single.to_owned(), LevelFilter::max());
                    }
                },
                (Some(target), Some(""), None) => {
                    filters.targets.insert(target.to_owned(), LevelFilter::max());
                }
                (Some(target), Some(level), None) => match level.parse::<LevelFilter>() {
                    Ok(level) => {
                        filters.targets.insert(target.to_owned(), level);
                    }
                    Err(_) => filters.rejected.push(LogError::InvalidFilter(fragment.to_owned())),
                },
                _ => filters.rejected.push(LogError::InvalidFilter(fragment.to_owned())),
            }
        }
        filters
    }

    pub fn root(&self) -> LevelFilter {
        self.root
    }

    pub fn targets(&self) -> impl Iterator<Item = (&str, LevelFilter)> {
        self.targets.iter().map(|(target, level)| (target.as_str(), *level))
    }

    pub fn rejected(&self) -> &[LogError] {
        &self.rejected
    }
}

impl FromStr for LogFilters {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
