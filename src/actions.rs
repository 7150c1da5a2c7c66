//! One function per modification kind. Each handler reads the current
//! version of the record's `depcom`, derives whatever new or closed
//! versions the kind implies, and publishes them back through the
//! collection. Handlers never see each other directly.

use crate::collection::TownCollection;
use crate::error::Result;
use crate::record::ModificationRecord;
use crate::temporal::{delta, end_datetime, start_datetime};
use std::cmp::{max, min};

/// `record.nccoff or current.nccenr` — Python's `or` treats an empty
/// string as falsy, so an explicit empty override still falls back.
fn name_or(preferred: &Option<String>, fallback: &str) -> String {
    match preferred {
        Some(s) if !s.is_empty() => s.clone(),
        _ => fallback.to_string(),
    }
}

/// `record.nccanc or record.nccoff` — no fallback to the current town's
/// name; an absent `nccanc` falls through to `nccoff`, and an absent
/// `nccoff` is an explicit blank.
fn nccanc_or_nccoff(record: &ModificationRecord) -> String {
    match &record.nccanc {
        Some(s) if !s.is_empty() => s.clone(),
        _ => record.nccoff.clone().unwrap_or_default(),
    }
}

pub fn change_name(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let mut end = end_datetime();
    let mut successors = Vec::new();
    // In case the change name is referenced in the history after a split.
    if current.end_datetime != end_datetime() && current.end_datetime > record.eff {
        end = current.end_datetime;
        successors = towns
            .valid_at(end + delta(), Some(&record.depcom))
            .into_iter()
            .map(|s| s.id())
            .collect();
    }

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(end)
        .nccenr(name_or(&record.nccoff, &current.nccenr))
        .successors(successors)
        .build();
    towns.upsert(new_town.clone());

    let old_town = current
        .derive()
        .nccenr(record.nccanc.clone().unwrap_or_default())
        .end_datetime(record.eff - delta())
        .modification(record.mod_tag())
        .build();
    let old_town = old_town.add_successor(new_town.id());
    towns.upsert(old_town.clone());
    towns.update_successors_to(&old_town, &new_town);
    Ok(())
}

pub fn creation(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(end_datetime())
        .nccenr(name_or(&record.nccoff, &current.nccenr))
        .modification(record.mod_tag())
        .no_successors()
        .build();
    towns.upsert(new_town.clone());

    if new_town.id() != current.id() {
        towns.update_successors_from(&new_town, &current);
        towns.delete(&current.id());
        towns.update_successors_to(&current, &new_town);
    }
    Ok(())
}

pub fn creation_delegated_pole(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let is_already_created = current.modification == record.modification.as_tag();
    let has_the_same_name = record.nccoff.as_deref() == Some(current.nccenr.as_str());

    let new_town = if is_already_created && has_the_same_name {
        current.clone()
    } else {
        current
            .derive()
            .start_datetime(record.eff)
            .end_datetime(end_datetime())
            .nccenr(name_or(&record.nccoff, &current.nccenr))
            .modification(record.mod_tag())
            .no_successors()
            .build()
    };

    if !towns.contains(&new_town.id()) {
        towns.upsert(new_town.clone());
    }
    if record.last {
        towns.update_successors_from(&new_town, &current);
    }

    // Ancestors of a town created since then also need their outbound
    // edges repointed at the pole.
    for ancestor in towns.valid_at(current.start_datetime - delta(), Some(&record.depcom)) {
        towns.update_successors_to(&ancestor, &new_town);
    }

    if !record.last {
        return Ok(());
    }

    let has_different_ids = new_town.id() != current.id();
    let has_the_same_name = new_town.nccenr == current.nccenr;
    if has_different_ids && has_the_same_name {
        towns.delete(&current.id());
    }
    Ok(())
}

pub fn reinstatement(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let candidate_id = crate::temporal::compute_id(&current.depcom, record.effdate);
    // Same-day name change already registered this id; a later handler resolves it.
    if towns.contains(&candidate_id) {
        return Ok(());
    }

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(end_datetime())
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .no_successors()
        .modification(0)
        .build();
    towns.upsert(new_town.clone());

    let mut old_town = current
        .derive()
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .end_datetime(min(current.end_datetime, record.eff - delta()))
        .modification(record.mod_tag())
        .build();
    if new_town.valid_at(old_town.end_datetime + delta()) {
        old_town = old_town.add_successor(new_town.id());
    }
    towns.upsert(old_town.clone());
    towns.replace_successor(&old_town, &new_town, new_town.start_datetime - delta());
    Ok(())
}

pub fn change_name_reinstatement(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(end_datetime())
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .no_successors()
        .modification(0)
        .build();
    towns.upsert(new_town.clone());

    let mut old_town = current
        .derive()
        .nccenr(nccanc_or_nccoff(record))
        .end_datetime(min(current.end_datetime, record.eff - delta()))
        .modification(record.mod_tag())
        .build();
    old_town = old_town.add_successor(new_town.id());

    for ancestor in towns.ancestors(&old_town) {
        for guessed in towns.valid_at(old_town.end_datetime + delta(), Some(&ancestor.depcom)) {
            if guessed.id() != old_town.id() && guessed.id() != new_town.id() {
                old_town = old_town.add_successor(guessed.id());
            }
        }
    }
    towns.upsert(old_town);
    Ok(())
}

pub fn spliting(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;
    let current = current.derive().modification(record.mod_tag()).build();
    towns.upsert(current);
    Ok(())
}

pub fn deletion(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;
    let old_town = current
        .derive()
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .end_datetime(record.eff - delta())
        .modification(record.mod_tag())
        .build();
    let successor = towns.get_current(record.comech.as_deref().unwrap_or_default(), record.eff)?;
    let old_town = old_town.add_successor(successor.id());
    towns.upsert(old_town);
    Ok(())
}

pub fn fusion_association_associated(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    // `Lamarche-en-Woëvre`: the reinstatement lands on the same date as
    // the (re)fusion, so the interval must be a 1-microsecond "temporary
    // existence" rather than empty.
    let end = if current.start_datetime == record.eff {
        record.eff + delta()
    } else {
        record.eff - delta()
    };

    let old_town = current
        .derive()
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .end_datetime(end)
        .modification(record.mod_tag())
        .build();
    let successor = towns.get_current(record.comech.as_deref().unwrap_or_default(), record.eff)?;
    let old_town = old_town.add_successor(successor.id());

    if successor.modification == crate::record::ModificationKind::ChangeNameReinstatement.as_tag() {
        // Fusions then splits declared out of order.
        if !successor.successors.iter().any(|s| s == &old_town.depcom) {
            let new_town = towns.get_current(&old_town.depcom, successor.end_datetime + delta())?;
            let successor = successor.add_successor(new_town.id());
            towns.upsert(successor);
        }
    }
    towns.upsert(old_town);
    Ok(())
}

pub fn creation_not_delegated(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let has_same_depcom = record.comech.as_deref() == Some(record.depcom.as_str());
    let has_different_name = record.nccoff.as_deref() != Some(current.nccenr.as_str());

    if has_same_depcom && has_different_name {
        let new_town = current
            .derive()
            .start_datetime(record.eff)
            .modification(crate::record::ModificationKind::CreationNotDelegatedPole.as_tag())
            .build();
        towns.upsert(new_town.clone());
        towns.update_successors_from(&new_town, &current);

        let old_town = current
            .derive()
            .nccenr(record.nccoff.clone().unwrap_or_default())
            .end_datetime(record.eff - delta())
            .modification(record.mod_tag())
            .build();
        let old_town = old_town.add_successor(new_town.id());
        towns.upsert(old_town);
    } else {
        let successor = towns.get_current(record.comech.as_deref().unwrap_or_default(), record.eff)?;
        let old_town = current
            .derive()
            .end_datetime(record.eff - delta())
            .modification(record.mod_tag())
            .build();
        let old_town = old_town.add_successor(successor.id());
        towns.upsert(old_town);
    }
    Ok(())
}

pub fn creation_not_delegated_pole(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let end = if current.start_datetime < record.eff {
        record.eff - delta()
    } else {
        end_datetime()
    };
    let old_town = current
        .derive()
        .end_datetime(end)
        .modification(record.mod_tag())
        .no_successors()
        .build();
    towns.upsert(old_town.clone());

    if !record.last {
        return Ok(());
    }

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(end_datetime())
        .nccenr(record.nccoff.clone().unwrap_or_default())
        .modification(crate::record::ModificationKind::CreationNotDelegatedPole.as_tag())
        .build();
    let old_town = old_town.add_successor(new_town.id());
    towns.upsert(old_town);
    // The upstream historiq data never actually records `current`'s id as
    // one of `new_town`'s successors here; known anomaly, kept verbatim
    // (see the `Sylvains-les-Moulins` scenario).
    towns.upsert(new_town.clone());
    towns.update_successors_from(&new_town, &current);
    Ok(())
}

pub fn change_county(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;

    let new_town = current
        .derive()
        .start_datetime(record.eff)
        .end_datetime(max(current.end_datetime, record.eff + delta()))
        .build();
    towns.upsert(new_town.clone());
    towns.delete(&current.id());
    towns.update_successors_to(&current, &new_town);

    let depanc = record.depanc.clone().unwrap_or_default();
    let ancient = towns.get_current(&depanc, record.eff)?;

    let mut old_town = if ancient.valid_at(record.eff) {
        let candidate_id = crate::temporal::compute_id(&ancient.depcom, current.start_date());
        let is_new_entry = !towns.contains(&candidate_id);

        let old_town = ancient
            .derive()
            .start_datetime(current.start_datetime)
            .end_datetime(record.eff - delta())
            .modification(record.mod_tag())
            .build();
        towns.update_successors_from(&old_town, &current);
        towns.delete(&ancient.id());
        towns.update_successors_to(&ancient, &old_town);

        if is_new_entry {
            // The initial seeded entry for this depcom was created under
            // the wrong county code; correct it now that we know better.
            let initial_town = towns.get_current(&record.depcom, start_datetime())?;
            let initial_updated = initial_town
                .derive()
                .dep(depanc[..2].to_string())
                .com(depanc[2..].to_string())
                .depcom(depanc.clone())
                .build();
            towns.upsert(initial_updated);
            towns.delete(&initial_town.id());
        }
        old_town
    } else {
        // Multiple county changes in sequence, e.g. `Châteaufort`.
        ancient
            .derive()
            .start_datetime(start_datetime())
            .end_datetime(record.eff - delta())
            .modification(record.mod_tag())
            .build()
    };

    old_town = old_town.add_successor(new_town.id());
    towns.upsert(old_town);
    Ok(())
}

pub fn change_county_creation(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;
    let depanc = record.depanc.clone().unwrap_or_default();
    let old = towns.get_current(&depanc, record.eff)?;

    let depcom = record.depcom.clone();
    let new_town = current
        .derive()
        .depcom(depcom.clone())
        .dep(depcom[..2].to_string())
        .com(depcom[2..].to_string())
        .start_datetime(record.eff)
        .end_datetime(record.eff + delta())
        .build();
    towns.upsert(new_town.clone());
    towns.delete(&current.id());

    let old_town_new = old
        .derive()
        .end_datetime(record.eff - delta())
        .successors(vec![new_town.id()])
        .modification(record.mod_tag())
        .build();
    towns.upsert(old_town_new.clone());
    towns.update_successors_from(&new_town, &old_town_new);
    Ok(())
}

pub fn obsolete(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    let current = towns.get_current(&record.depcom, record.eff)?;
    let old_town = current
        .derive()
        .end_datetime(record.eff - delta())
        .modification(record.mod_tag())
        .build();
    towns.upsert(old_town);
    Ok(())
}
