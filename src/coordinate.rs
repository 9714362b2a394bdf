//! Version filters and the coordinates that embed them.
//!
//! A [`StampFilter`] decides which version of a chronology is "the current
//! one": versions are restricted to a path, a point in time, and optionally
//! to sets of modules and authors. Among the survivors the latest time wins,
//! and equal times are resolved by module priority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::construct::Version;
use crate::datatype::{Nid, Premise, Status};

// ------------- Position -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct StampPosition {
    pub time: DateTime<Utc>,
    pub path: Nid,
}

// ------------- StampFilter -------------
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StampFilter {
    pub allowed_states: Vec<Status>,
    pub position: StampPosition,
    /// Empty means any module. Earlier entries take precedence on ties.
    #[serde(default)]
    pub module_priority: Vec<Nid>,
    /// Empty means any author.
    #[serde(default)]
    pub authors: Vec<Nid>,
}

impl StampFilter {
    /// Every status, on `path`, as of `time`.
    pub fn latest_on(path: Nid, time: DateTime<Utc>) -> Self {
        Self {
            allowed_states: vec![
                Status::Active,
                Status::Inactive,
                Status::Withdrawn,
                Status::Canceled,
                Status::Primordial,
            ],
            position: StampPosition { time, path },
            module_priority: Vec::new(),
            authors: Vec::new(),
        }
    }
    /// Only active versions, on `path`, as of `time`.
    pub fn active_on(path: Nid, time: DateTime<Utc>) -> Self {
        Self {
            allowed_states: vec![Status::Active],
            ..Self::latest_on(path, time)
        }
    }
    pub fn with_modules(mut self, modules: Vec<Nid>) -> Self {
        self.module_priority = modules;
        self
    }
    pub fn with_authors(mut self, authors: Vec<Nid>) -> Self {
        self.authors = authors;
        self
    }
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.position.time = time;
        self
    }

    fn module_rank(&self, module: Nid) -> Option<usize> {
        if self.module_priority.is_empty() {
            return Some(0);
        }
        self.module_priority.iter().position(|m| *m == module)
    }

    fn admits(&self, version: &Version) -> bool {
        let stamp = version.stamp();
        stamp.path() == self.position.path
            && stamp.time() <= self.position.time
            && self.module_rank(stamp.module()).is_some()
            && (self.authors.is_empty() || self.authors.contains(&stamp.author()))
    }

    /// The latest admitted version, or `None` when nothing is visible or the
    /// latest version's status is not allowed.
    pub fn latest<'a>(&self, versions: &'a [Version]) -> Option<&'a Version> {
        let mut latest: Option<&Version> = None;
        for version in versions.iter().filter(|v| self.admits(v)) {
            latest = match latest {
                None => Some(version),
                Some(current) => {
                    let (t, c) = (version.stamp().time(), current.stamp().time());
                    if t > c {
                        Some(version)
                    } else if t == c
                        && self.module_rank(version.stamp().module())
                            < self.module_rank(current.stamp().module())
                    {
                        Some(version)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        latest.filter(|v| self.allowed_states.contains(&v.stamp().status()))
    }
}

// ------------- LanguageCoordinate -------------
/// How descriptions are chosen when a concept needs a name.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LanguageCoordinate {
    pub language: Nid,
    pub description_assemblage: Nid,
    pub fully_qualified_name_type: Nid,
    pub regular_name_type: Nid,
    /// Acceptability assemblages, most preferred dialect first.
    pub dialect_assemblages: Vec<Nid>,
    pub preferred_acceptability: Nid,
}

// ------------- ManifoldCoordinate -------------
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ManifoldCoordinate {
    pub stamp: StampFilter,
    pub premise: Premise,
    pub language: LanguageCoordinate,
}

impl ManifoldCoordinate {
    pub fn new(stamp: StampFilter, premise: Premise, language: LanguageCoordinate) -> Self {
        Self {
            stamp,
            premise,
            language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construct::Stamp;
    use crate::datatype::Payload;
    use chrono::TimeZone;

    fn version(status: Status, year: i32, module: Nid) -> Version {
        let time = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        Version::new(Stamp::new(status, time, 1, module, 7), Payload::Member)
    }

    #[test]
    fn latest_respects_time_and_module_priority() {
        let versions = vec![
            version(Status::Active, 2010, 20),
            version(Status::Inactive, 2015, 20),
            version(Status::Active, 2015, 10),
            version(Status::Active, 2030, 10),
        ];
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let filter = StampFilter::latest_on(7, now).with_modules(vec![10, 20]);
        let latest = filter.latest(&versions).unwrap();
        assert_eq!(latest.stamp().module(), 10);
        assert!(latest.is_active());

        let filter = StampFilter::latest_on(7, now).with_modules(vec![20, 10]);
        assert!(!filter.latest(&versions).unwrap().is_active());
    }

    #[test]
    fn disallowed_latest_status_is_absent() {
        let versions = vec![
            version(Status::Active, 2010, 20),
            version(Status::Inactive, 2015, 20),
        ];
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(StampFilter::active_on(7, now).latest(&versions).is_none());
        assert!(StampFilter::latest_on(8, now).latest(&versions).is_none());
    }
}
