//! Routes each history record to the handler for its modification kind.
//! Unknown kinds are a deliberate no-op; a handler error is always fatal.

use crate::actions;
use crate::collection::TownCollection;
use crate::error::Result;
use crate::record::{ModificationKind, ModificationRecord};
use tracing::{debug, error};

/// Applies one record to `towns`, logging and propagating any failure.
pub fn dispatch(towns: &mut TownCollection, record: &ModificationRecord) -> Result<()> {
    use ModificationKind::*;

    debug!(depcom = %record.depcom, modification = record.mod_tag(), effdate = %record.effdate, "dispatching record");

    let outcome = match record.modification {
        ChangeName | ChangeNameFusion => actions::change_name(towns, record),
        ChangeNameCreation | Creation => actions::creation(towns, record),
        CreationDelegatedPole => actions::creation_delegated_pole(towns, record),
        Reinstatement => actions::reinstatement(towns, record),
        ChangeNameReinstatement => actions::change_name_reinstatement(towns, record),
        Spliting => actions::spliting(towns, record),
        DeletionPartition | DeletionFusion | CreationDelegated => actions::deletion(towns, record),
        FusionAssociationAssociated => actions::fusion_association_associated(towns, record),
        CreationNotDelegated => actions::creation_not_delegated(towns, record),
        CreationNotDelegatedPole => actions::creation_not_delegated_pole(towns, record),
        ChangeCounty => actions::change_county(towns, record),
        ChangeCountyCreation => actions::change_county_creation(towns, record),
        Obsolete => actions::obsolete(towns, record),
        Unhandled => Ok(()),
    };

    if let Err(e) = &outcome {
        error!(depcom = %record.depcom, modification = record.mod_tag(), effdate = %record.effdate, error = %e, "record failed to apply");
    }
    outcome
}

/// Applies the full history in file order, then establishes the final
/// deterministic ordering.
pub fn compute(towns: &mut TownCollection, history: &[ModificationRecord]) -> Result<()> {
    for record in history {
        dispatch(towns, record)?;
    }
    towns.sort_by_id();
    Ok(())
}
