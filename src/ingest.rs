//! Tab-delimited roster and history loaders, and the CSV writer for the
//! reconstructed collection. Kept outside `dispatch`/`actions`: the core
//! only ever sees an already-materialized [`TownCollection`] and
//! [`Vec<ModificationRecord>`].

use crate::collection::TownCollection;
use crate::error::DbError;
use crate::record::{ModificationKind, ModificationRecord};
use crate::temporal::start_datetime;
use crate::town::TownVersion;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TownRow {
    dep: String,
    com: String,
    nccenr: String,
    #[serde(default)]
    actual: i32,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    dep: String,
    com: String,
    #[serde(rename = "mod")]
    modification: u16,
    effdate: NaiveDate,
    #[serde(default)]
    nccoff: String,
    #[serde(default)]
    nccanc: String,
    #[serde(default)]
    comech: String,
    #[serde(default)]
    depanc: String,
    #[serde(default)]
    rangcom: String,
    #[serde(default)]
    last: String,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Reads the present-day roster, seeding one epoch-anchored, open-ended
/// version per row.
pub fn load_towns(path: impl AsRef<Path>) -> Result<TownCollection, DbError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;

    let mut towns = TownCollection::new();
    for (line, row) in reader.deserialize::<TownRow>().enumerate() {
        let row: TownRow = row.map_err(|e| {
            DbError::Validation(format!("{}:{}: {e}", path.as_ref().display(), line + 2))
        })?;
        towns.upsert(TownVersion::new(row.dep, row.com, row.nccenr, row.actual));
    }
    Ok(towns)
}

/// Reads the modification log in file order; the engine never re-sorts it.
///
/// `strict` governs what happens to a row whose `mod` tag is not one of
/// the recognized kinds in [`ModificationKind`]: in non-strict mode the
/// row is kept (dispatched as [`ModificationKind::Unhandled`]) and a
/// warning is logged; in strict mode it is rejected outright.
pub fn load_history(path: impl AsRef<Path>, strict: bool) -> Result<Vec<ModificationRecord>, DbError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path.as_ref())?;

    let mut history = Vec::new();
    for (line, row) in reader.deserialize::<HistoryRow>().enumerate() {
        let row: HistoryRow = row.map_err(|e| {
            DbError::Validation(format!("{}:{}: {e}", path.as_ref().display(), line + 2))
        })?;
        let depcom = format!("{}{}", row.dep, row.com);
        let eff = row.effdate.and_hms_opt(0, 0, 0).ok_or_else(|| {
            DbError::Validation(format!("{}:{}: invalid effdate", path.as_ref().display(), line + 2))
        })?;
        let modification = ModificationKind::from_tag(row.modification);
        if modification == ModificationKind::Unhandled && row.modification != 0 {
            let message = format!(
                "{}:{}: unrecognized modification tag {}",
                path.as_ref().display(),
                line + 2,
                row.modification
            );
            if strict {
                return Err(DbError::Validation(message));
            }
            tracing::warn!(tag = row.modification, line = line + 2, "{message}");
        }
        history.push(ModificationRecord {
            depcom,
            modification,
            effdate: row.effdate,
            eff,
            nccoff: non_empty(row.nccoff),
            nccanc: non_empty(row.nccanc),
            comech: non_empty(row.comech),
            depanc: non_empty(row.depanc),
            last: matches!(row.last.trim(), "1" | "true" | "TRUE" | "True"),
            rangcom: row.rangcom.trim().parse().ok(),
            line: line + 2,
        });
    }
    Ok(history)
}

/// Writes the reconstructed collection back out, one row per version,
/// in whatever order the collection currently iterates (ascending by
/// id, since [`TownCollection`] is backed by a `BTreeMap`).
pub fn write_output(towns: &TownCollection, path: impl AsRef<Path>) -> Result<(), DbError> {
    let mut writer = csv::WriterBuilder::new().from_path(path.as_ref())?;
    writer.write_record([
        "id", "dep", "com", "depcom", "nccenr", "start_date", "end_date", "modification",
        "successors", "actual",
    ])?;
    for v in towns.values() {
        writer.write_record([
            v.id(),
            v.dep.clone(),
            v.com.clone(),
            v.depcom.clone(),
            v.nccenr.clone(),
            v.start_date().format("%Y-%m-%d").to_string(),
            v.end_date().format("%Y-%m-%d").to_string(),
            v.modification.to_string(),
            v.successors_joined(),
            v.actual.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_towns_seeds_epoch_anchored_versions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dep\tcom\tnccenr\tactual").unwrap();
        writeln!(file, "10\t263\tNeuville-sur-Vannes\t1").unwrap();
        let towns = load_towns(file.path()).unwrap();

        assert_eq!(towns.len(), 1);
        let v = towns.get("fr:commune:10263@1942-01-01").unwrap();
        assert_eq!(v.start_datetime, start_datetime());
        assert_eq!(v.nccenr, "Neuville-sur-Vannes");
    }

    #[test]
    fn load_history_preserves_file_order_and_blank_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dep\tcom\tmod\teffdate\tnccoff\tnccanc\tcomech\tdepanc\trangcom\tlast").unwrap();
        writeln!(file, "10\t263\t10\t2008-10-06\tNeuville-sur-Vanne\tNeuville-sur-Vannes\t\t\t\t0").unwrap();
        let history = load_history(file.path(), false).unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].depcom, "10263");
        assert_eq!(history[0].nccoff.as_deref(), Some("Neuville-sur-Vanne"));
        assert_eq!(history[0].comech, None);
        assert!(!history[0].last);
    }

    #[test]
    fn load_history_rejects_unrecognized_tags_only_in_strict_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dep\tcom\tmod\teffdate\tnccoff\tnccanc\tcomech\tdepanc\trangcom\tlast").unwrap();
        writeln!(file, "10\t263\t999\t2008-10-06\t\t\t\t\t\t0").unwrap();

        let lenient = load_history(file.path(), false).unwrap();
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].modification, ModificationKind::Unhandled);

        assert!(load_history(file.path(), true).is_err());
    }
}
