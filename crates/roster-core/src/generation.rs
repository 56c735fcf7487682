//! Motor de generación y conflictos.
//!
//! Dado un conjunto objetivo de (staff, día), un patrón y una acción,
//! produce el conjunto de mutaciones propuesto junto con los descriptores
//! de conflicto. Política deliberada del sistema: los conflictos ADVIERTEN,
//! no bloquean; la propuesta siempre incluye las mutaciones y el llamador
//! decide si procede. La única exclusión dura es la autorización por
//! sucursal: el personal fuera del alcance del llamador ni siquiera entra
//! en la propuesta (salvo acceso elevado).

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use roster_domain::{LeaveRequest, RecordId, ScheduleRecord, ScheduleStatus, StaffId, StaffProfile};
use roster_policies::{BranchAccessPolicy, SessionContext};

use crate::store::ScheduleStore;
use crate::ShiftPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationAction {
    Create,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// La celda ya tiene asignación y la acción es `Create`.
    AlreadyAssigned,
    /// El código propuesto es jornada laboral sobre una licencia aprobada.
    LeaveOverlap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDescriptor {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProposedMutation {
    Create(ScheduleRecord),
    /// Reemplazo in-place de la clave natural existente (conserva el id).
    Update(ScheduleRecord),
    Delete { staff_id: StaffId, date: NaiveDate, id: RecordId },
}

impl ProposedMutation {
    pub fn staff_id(&self) -> &StaffId {
        match self {
            ProposedMutation::Create(r) | ProposedMutation::Update(r) => &r.staff_id,
            ProposedMutation::Delete { staff_id, .. } => staff_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ProposedMutation::Create(r) | ProposedMutation::Update(r) => r.date,
            ProposedMutation::Delete { date, .. } => *date,
        }
    }
}

/// Resultado de la generación: mutaciones + advertencias, nunca un error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Proposal {
    pub mutations: Vec<ProposedMutation>,
    pub conflicts: Vec<ConflictDescriptor>,
}

pub struct GenerationEngine<'a> {
    store: &'a ScheduleStore,
    directory: &'a HashMap<StaffId, StaffProfile>,
    leaves: &'a [LeaveRequest],
    policy: &'a dyn BranchAccessPolicy,
    session: &'a SessionContext,
}

impl<'a> GenerationEngine<'a> {
    pub fn new(store: &'a ScheduleStore,
               directory: &'a HashMap<StaffId, StaffProfile>,
               leaves: &'a [LeaveRequest],
               policy: &'a dyn BranchAccessPolicy,
               session: &'a SessionContext)
               -> Self {
        Self { store, directory, leaves, policy, session }
    }

    /// Expande el patrón sobre los objetivos y arma la propuesta.
    ///
    /// El cursor de rotación es independiente por staff y se ancla en el
    /// primer día objetivo de ese staff.
    pub fn propose(&self,
                   targets: &[(StaffId, NaiveDate)],
                   pattern: &ShiftPattern,
                   action: GenerationAction)
                   -> Proposal {
        let accessible = self.policy.accessible_branches(self.session);
        let elevated = self.policy.is_elevated(self.session);

        // ancla por staff: el menor día objetivo
        let mut anchors: HashMap<&StaffId, NaiveDate> = HashMap::new();
        for (staff, date) in targets {
            anchors.entry(staff)
                   .and_modify(|a| {
                       if *date < *a {
                           *a = *date;
                       }
                   })
                   .or_insert(*date);
        }

        let mut proposal = Proposal::default();
        for (staff_id, date) in targets {
            let profile = match self.directory.get(staff_id) {
                Some(p) => p,
                None => {
                    log::warn!("generation target {staff_id} not in staff directory, skipped");
                    continue;
                }
            };
            // exclusión dura por sucursal, no una advertencia
            if !elevated && !accessible.contains(&profile.home_branch) {
                continue;
            }

            let existing = self.store.get(staff_id, *date);
            match action {
                GenerationAction::Delete => {
                    if let Some(rec) = existing {
                        proposal.mutations.push(ProposedMutation::Delete { staff_id: staff_id.clone(),
                                                                           date: *date,
                                                                           id: rec.id });
                    }
                }
                GenerationAction::Create | GenerationAction::Edit => {
                    let anchor = anchors[staff_id];
                    let offset = (*date - anchor).num_days();
                    let Some((code, overtime_hours)) = pattern.day_at(offset) else {
                        continue; // día libre del ciclo
                    };

                    if existing.is_some() && action == GenerationAction::Create {
                        proposal.conflicts.push(ConflictDescriptor { staff_id: staff_id.clone(),
                                                                     date: *date,
                                                                     kind: ConflictKind::AlreadyAssigned });
                    }
                    if code.is_working() && self.has_approved_leave(staff_id, *date) {
                        proposal.conflicts.push(ConflictDescriptor { staff_id: staff_id.clone(),
                                                                     date: *date,
                                                                     kind: ConflictKind::LeaveOverlap });
                    }

                    let record = ScheduleRecord { id: existing.map(|r| r.id).unwrap_or_else(RecordId::new_temp),
                                                  staff_id: staff_id.clone(),
                                                  branch: profile.home_branch.clone(),
                                                  date: *date,
                                                  shift_code: code,
                                                  overtime_hours,
                                                  status: ScheduleStatus::Pending,
                                                  updated_at: Utc::now() };
                    if existing.is_some() {
                        proposal.mutations.push(ProposedMutation::Update(record));
                    } else {
                        proposal.mutations.push(ProposedMutation::Create(record));
                    }
                }
            }
        }
        proposal
    }

    fn has_approved_leave(&self, staff_id: &StaffId, date: NaiveDate) -> bool {
        self.leaves
            .iter()
            .any(|l| l.staff_id == *staff_id && l.is_approved() && l.covers(date))
    }
}
