//! The mutable working set that action handlers read and write: every
//! town version currently known, indexed for the two access patterns
//! the dispatcher needs — by id, and by `depcom` ordered in time.

use crate::error::DbError;
use crate::error::Result;
use crate::town::TownVersion;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Holds every [`TownVersion`] produced so far, indexed by id
/// (`BTreeMap` so iteration is always ascending by id — the ordering
/// the final output requires) and by `depcom` (kept sorted by
/// `start_datetime` so the temporal lookups in this module stay O(log n)
/// instead of re-sorting on every call).
#[derive(Debug, Default, Clone)]
pub struct TownCollection {
    by_id: BTreeMap<String, TownVersion>,
    by_depcom: BTreeMap<String, Vec<String>>,
}

impl TownCollection {
    pub fn new() -> Self {
        TownCollection::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<TownVersion> {
        self.by_id.get(id).cloned()
    }

    /// Every version currently held, ascending by id. `BTreeMap` makes
    /// this always true, so unlike the source there is no separate
    /// sort pass required before reading in order.
    pub fn values(&self) -> impl Iterator<Item = &TownVersion> {
        self.by_id.values()
    }

    /// Documents the ordering guarantee explicitly; a no-op because
    /// `by_id` is a `BTreeMap` and is never out of order.
    pub fn sort_by_id(&self) {}

    /// Inserts or replaces a version. Same id always means same
    /// `depcom` (the id is derived from it), so the `depcom` index
    /// only ever needs a new entry, never a move between buckets.
    pub fn upsert(&mut self, v: TownVersion) {
        let id = v.id();
        let depcom = v.depcom.clone();
        let start = v.start_datetime;
        self.by_id.insert(id.clone(), v);

        let starts: Vec<NaiveDateTime> = self
            .by_depcom
            .get(&depcom)
            .map(|ids| ids.iter().map(|existing| self.by_id[existing].start_datetime).collect())
            .unwrap_or_default();

        let bucket = self.by_depcom.entry(depcom).or_default();
        if !bucket.contains(&id) {
            let pos = starts.binary_search(&start).unwrap_or_else(|p| p);
            bucket.insert(pos, id);
        }
    }

    pub fn delete(&mut self, id: &str) {
        if let Some(v) = self.by_id.remove(id) {
            if let Some(bucket) = self.by_depcom.get_mut(&v.depcom) {
                bucket.retain(|existing| existing != id);
            }
        }
    }

    /// All versions for `depcom`, ascending by `start_datetime`.
    pub fn filter(&self, depcom: &str) -> Vec<TownVersion> {
        self.by_depcom
            .get(depcom)
            .map(|ids| ids.iter().map(|id| self.by_id[id].clone()).collect())
            .unwrap_or_default()
    }

    /// Every version valid at `t`, optionally restricted to one `depcom`.
    pub fn valid_at(&self, t: NaiveDateTime, depcom: Option<&str>) -> Vec<TownVersion> {
        match depcom {
            Some(depcom) => self
                .filter(depcom)
                .into_iter()
                .filter(|v| v.valid_at(t))
                .collect(),
            None => self.by_id.values().filter(|v| v.valid_at(t)).cloned().collect(),
        }
    }

    /// The version of `depcom` effective at `t`: the one whose interval
    /// contains `t` if any does, otherwise the most recently closed
    /// version preceding `t`, otherwise the earliest version starting
    /// after `t`. Fails only when `depcom` has never been registered,
    /// which is a caller error against the seeded roster.
    pub fn get_current(&self, depcom: &str, t: NaiveDateTime) -> Result<TownVersion> {
        let ids = self
            .by_depcom
            .get(depcom)
            .ok_or_else(|| DbError::NotFound(format!("unknown depcom {depcom}")))?;

        let mut preceding: Option<&TownVersion> = None;
        let mut subsequent: Option<&TownVersion> = None;

        for id in ids {
            let v = &self.by_id[id];
            if v.valid_at(t) {
                return Ok(v.clone());
            }
            if v.end_datetime < t {
                if preceding.map_or(true, |p| v.end_datetime > p.end_datetime) {
                    preceding = Some(v);
                }
            } else if v.start_datetime > t
                && subsequent.map_or(true, |s| v.start_datetime < s.start_datetime)
            {
                subsequent = Some(v);
            }
        }

        preceding
            .or(subsequent)
            .cloned()
            .ok_or_else(|| DbError::Internal(format!("depcom {depcom} has no versions")))
    }

    /// Rewrites every reference to `old_id` into `new_id`, wherever it
    /// appears in any version's successor list.
    fn rewrite_successor(&mut self, old_id: &str, new_id: &str) {
        let holders: Vec<String> = self
            .by_id
            .values()
            .filter(|v| v.has_successor(old_id))
            .map(|v| v.id())
            .collect();
        for holder_id in holders {
            let holder = self.by_id.get(&holder_id).expect("just matched above");
            let mut successors = holder.successors.clone();
            for s in successors.iter_mut() {
                if s == old_id {
                    *s = new_id.to_string();
                }
            }
            let updated = holder.derive().successors(successors).build();
            self.by_id.insert(holder_id, updated);
        }
    }

    /// Retargets every reference to `from_town`'s id onto `v`'s id.
    pub fn update_successors_from(&mut self, v: &TownVersion, from_town: &TownVersion) {
        self.rewrite_successor(&from_town.id(), &v.id());
    }

    /// Retargets every reference to `v`'s id onto `to_town`'s id.
    pub fn update_successors_to(&mut self, v: &TownVersion, to_town: &TownVersion) {
        self.rewrite_successor(&v.id(), &to_town.id());
    }

    /// Every version, of any `depcom`, whose interval ends exactly one
    /// delta before `v` begins — i.e. the version(s) `v` directly
    /// continues. Deliberately not restricted to `v.depcom`: a fusion
    /// can hand a version's lineage over to a different identity, and
    /// the cross-depcom repair `change_name_reinstatement` performs
    /// with this depends on finding that predecessor regardless of
    /// which `depcom` it belongs to.
    pub fn ancestors(&self, v: &TownVersion) -> Vec<TownVersion> {
        use crate::temporal::delta;
        self.by_id
            .values()
            .filter(|candidate| candidate.end_datetime + delta() == v.start_datetime)
            .cloned()
            .collect()
    }

    /// In `holder`'s successor list, replaces whichever entry currently
    /// resolves to a version valid at `valid_datetime` with `new`'s id.
    pub fn replace_successor(&mut self, holder: &TownVersion, new: &TownVersion, valid_datetime: NaiveDateTime) {
        let holder_id = holder.id();
        let Some(current) = self.by_id.get(&holder_id) else {
            return;
        };
        let mut successors = current.successors.clone();
        for s in successors.iter_mut() {
            if self.by_id.get(s).map_or(false, |target| target.valid_at(valid_datetime)) {
                *s = new.id();
            }
        }
        let updated = current.derive().successors(successors).build();
        self.by_id.insert(holder_id, updated);
    }
}
