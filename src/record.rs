//! One entry of the modification history log, and the tagged kind that
//! drives the dispatcher.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The modification kind a history record carries. The numeric
/// discriminant is preserved only so it can round-trip through
/// `TownVersion::modification`; dispatch itself matches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ModificationKind {
    ChangeName = 10,
    ChangeNameFusion = 11,
    ChangeNameCreation = 20,
    Creation = 21,
    CreationDelegatedPole = 30,
    Reinstatement = 40,
    ChangeNameReinstatement = 41,
    Spliting = 50,
    DeletionPartition = 60,
    DeletionFusion = 61,
    CreationDelegated = 62,
    FusionAssociationAssociated = 70,
    CreationNotDelegated = 80,
    CreationNotDelegatedPole = 81,
    ChangeCounty = 90,
    ChangeCountyCreation = 91,
    Obsolete = 100,
    /// Recognized in real history data but dispatched as a no-op: e.g.
    /// `FUSION_ABSORPTION`, `CREATION_PREEXISTING_ASSOCIATED`.
    Unhandled = 0,
}

impl ModificationKind {
    pub fn as_tag(self) -> u16 {
        self as u16
    }

    /// Maps a raw tag to its variant; anything unrecognized is treated
    /// as a pass-through no-op rather than an ingestion error.
    pub fn from_tag(tag: u16) -> Self {
        use ModificationKind::*;
        match tag {
            10 => ChangeName,
            11 => ChangeNameFusion,
            20 => ChangeNameCreation,
            21 => Creation,
            30 => CreationDelegatedPole,
            40 => Reinstatement,
            41 => ChangeNameReinstatement,
            50 => Spliting,
            60 => DeletionPartition,
            61 => DeletionFusion,
            62 => CreationDelegated,
            70 => FusionAssociationAssociated,
            80 => CreationNotDelegated,
            81 => CreationNotDelegatedPole,
            90 => ChangeCounty,
            91 => ChangeCountyCreation,
            100 => Obsolete,
            _ => Unhandled,
        }
    }
}

/// One row of the history log.
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationRecord {
    pub depcom: String,
    pub modification: ModificationKind,
    pub effdate: NaiveDate,
    pub eff: NaiveDateTime,
    /// New name, when the record carries one.
    pub nccoff: Option<String>,
    /// Prior name, when the record carries one.
    pub nccanc: Option<String>,
    /// Partner identity: successor's `depcom`, pole's `depcom`, etc.
    pub comech: Option<String>,
    /// Prior county code, for county-change records.
    pub depanc: Option<String>,
    /// Marks the last record of a multi-record group (grouped pole creations).
    pub last: bool,
    /// Rank within a grouped creation; used only for diagnostics and to
    /// sanity-check `last` ordering, never consumed by dispatch logic.
    pub rangcom: Option<u32>,
    /// 1-based line number in the source history file, for error messages.
    pub line: usize,
}

impl ModificationRecord {
    /// `mod` as an output-friendly numeric tag.
    pub fn mod_tag(&self) -> u16 {
        self.modification.as_tag()
    }
}
