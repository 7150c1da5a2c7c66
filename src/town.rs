//! The town version value object: one validity slice of one
//! administrative identity, and the derive-with-overrides builder used
//! to produce new slices from it.

use crate::temporal::{compute_id, end_datetime, start_datetime};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One validity slice of one `depcom`.
///
/// Never mutated in place once published to a [`crate::collection::TownCollection`];
/// handlers obtain new versions through [`TownVersion::derive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownVersion {
    pub dep: String,
    pub com: String,
    pub depcom: String,
    pub nccenr: String,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    /// Modification kind that produced or closed this version; 0 = none.
    pub modification: u16,
    #[serde(with = "successors_string")]
    pub successors: Vec<String>,
    pub actual: i32,
}

impl TownVersion {
    pub fn new(dep: impl Into<String>, com: impl Into<String>, nccenr: impl Into<String>, actual: i32) -> Self {
        let dep = dep.into();
        let com = com.into();
        let depcom = format!("{dep}{com}");
        TownVersion {
            dep,
            com,
            depcom,
            nccenr: nccenr.into(),
            start_datetime: start_datetime(),
            end_datetime: end_datetime(),
            modification: 0,
            successors: Vec::new(),
            actual,
        }
    }

    /// `fr:commune:<depcom>@<start_date iso>` — a pure function of
    /// `depcom` and `start_date`, never stored directly so it can never
    /// drift from the fields it's computed from.
    pub fn id(&self) -> String {
        compute_id(&self.depcom, self.start_date())
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_datetime.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_datetime.date()
    }

    pub fn valid_at(&self, t: NaiveDateTime) -> bool {
        self.start_datetime <= t && t <= self.end_datetime
    }

    pub fn successors_joined(&self) -> String {
        self.successors.join(";")
    }

    pub fn has_successor(&self, id: &str) -> bool {
        self.successors.iter().any(|s| s == id)
    }

    /// Returns a copy with `id` appended to `successors` if not already present.
    pub fn add_successor(&self, id: impl Into<String>) -> TownVersion {
        let mut v = self.clone();
        let id = id.into();
        if !v.has_successor(&id) {
            v.successors.push(id);
        }
        v
    }

    /// Starts a derive-with-overrides builder seeded from this version.
    pub fn derive(&self) -> Derive {
        Derive { base: self.clone() }
    }
}

/// Builder that clones a base [`TownVersion`] and applies field
/// overrides, mirroring the source's `town.generate(**overrides)`.
pub struct Derive {
    base: TownVersion,
}

impl Derive {
    pub fn dep(mut self, dep: impl Into<String>) -> Self {
        self.base.dep = dep.into();
        self
    }

    pub fn com(mut self, com: impl Into<String>) -> Self {
        self.base.com = com.into();
        self
    }

    pub fn depcom(mut self, depcom: impl Into<String>) -> Self {
        self.base.depcom = depcom.into();
        self
    }

    pub fn start_datetime(mut self, dt: NaiveDateTime) -> Self {
        self.base.start_datetime = dt;
        self
    }

    pub fn end_datetime(mut self, dt: NaiveDateTime) -> Self {
        self.base.end_datetime = dt;
        self
    }

    pub fn nccenr(mut self, name: impl Into<String>) -> Self {
        self.base.nccenr = name.into();
        self
    }

    pub fn modification(mut self, modification: u16) -> Self {
        self.base.modification = modification;
        self
    }

    pub fn successors(mut self, successors: Vec<String>) -> Self {
        self.base.successors = successors;
        self
    }

    pub fn no_successors(self) -> Self {
        self.successors(Vec::new())
    }

    pub fn build(self) -> TownVersion {
        self.base
    }
}

/// `;`-joined string at the serialization boundary; an ordered `Vec`
/// everywhere else in the program.
mod successors_string {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(successors: &[String], s: S) -> Result<S::Ok, S::Error> {
        successors.join(";").serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::delta;

    #[test]
    fn derive_overrides_only_named_fields() {
        let base = TownVersion::new("10", "263", "Neuville-sur-Vannes", 1);
        let moved = base.derive().nccenr("Neuville-sur-Vanne").build();
        assert_eq!(moved.nccenr, "Neuville-sur-Vanne");
        assert_eq!(moved.dep, base.dep);
        assert_eq!(moved.start_datetime, base.start_datetime);
    }

    #[test]
    fn add_successor_is_idempotent() {
        let base = TownVersion::new("10", "263", "Neuville", 1);
        let once = base.add_successor("fr:commune:10263@2008-10-06");
        let twice = once.add_successor("fr:commune:10263@2008-10-06");
        assert_eq!(once.successors, twice.successors);
        assert_eq!(once.successors.len(), 1);
    }

    #[test]
    fn id_tracks_depcom_and_start_date() {
        let v = TownVersion::new("10", "263", "Neuville", 1);
        assert_eq!(v.id(), "fr:commune:10263@1942-01-01");
        let moved = v.derive().start_datetime(start_datetime() + delta()).build();
        assert_ne!(moved.id(), v.id());
    }
}
