//! Demo de la consola de roster: sesión con gateways en memoria.
//!
//! Recorre el núcleo completo: generación con conflictos no bloqueantes,
//! edición optimista con confirmación del servidor, eco suprimido y un
//! cambio remoto de otro cliente mezclado por last-writer-wins.

mod config;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use roster_core::gateway::{ChangeEvent, ChangeOp, DayRange};
use roster_core::{CellEdit, EditOutcome, GenerationAction, InMemoryAuditLog, RosterSession, SessionConfig,
                  ShiftPattern};
use roster_domain::{BranchId, LeaveRequest, LeaveStatus, RecordId, ScheduleRecord, ScheduleStatus,
                    ShiftCode, StaffId, StaffProfile, StaffRole};
use roster_gateways::{ChannelNotificationGateway, InMemoryPersistenceGateway};
use roster_policies::{SessionContext, StandardAccessPolicy};

use crate::config::DemoConfig;

fn staff(id: &str, name: &str, branch: &str) -> (StaffId, StaffProfile) {
    (StaffId::from(id),
     StaffProfile { id: StaffId::from(id),
                    display_name: name.to_string(),
                    role: StaffRole::Member,
                    home_branch: BranchId::from(branch),
                    department: "operations".to_string() })
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).expect("valid demo day")
}

#[tokio::main]
async fn main() {
    let cfg = DemoConfig::from_env();

    let directory: HashMap<StaffId, StaffProfile> =
        [staff("A", "Ana", "north"), staff("B", "Bruno", "north"), staff("C", "Carla", "south")].into_iter()
                                                                                                .collect();
    let leaves = vec![LeaveRequest { staff_id: StaffId::from("B"),
                                     start_date: day(12),
                                     end_date: day(12),
                                     status: LeaveStatus::Approved }];

    let persistence = Arc::new(InMemoryPersistenceGateway::new());
    let notifications = Arc::new(ChannelNotificationGateway::new());
    let session_ctx = SessionContext::new(StaffId::from("mgr"), StaffRole::Manager, BranchId::from("north"));
    let session = RosterSession::new(SessionConfig { session: session_ctx,
                                                     calendar: cfg.calendar,
                                                     directory,
                                                     leaves },
                                     persistence.clone(),
                                     notifications.clone(),
                                     Arc::new(StandardAccessPolicy::new()),
                                     Arc::new(Mutex::new(InMemoryAuditLog::new())));

    let range = DayRange::new(day(1), day(31));
    session.set_visible_scope(vec![BranchId::from("north")], range)
           .await
           .expect("scope within manager access");

    // 1. Generación: 5 días de "Day" para B, con licencia aprobada el día 12
    let targets: Vec<_> = (10..=14).map(|d| (StaffId::from("B"), day(d))).collect();
    let proposal = session.propose_generation(&targets,
                                              &ShiftPattern::Uniform { code: ShiftCode::Day,
                                                                       overtime_hours: 0.0 },
                                              GenerationAction::Create);
    println!("generation: {} mutations, {} conflicts (warn, don't block)",
             proposal.mutations.len(),
             proposal.conflicts.len());
    for c in &proposal.conflicts {
        println!("  conflict: {:?} for {} on {}", c.kind, c.staff_id, c.date);
    }

    // 2. Edición optimista con confirmación
    let outcome = session.apply_cell_edit(StaffId::from("A"),
                                          day(10),
                                          CellEdit::Assign { shift_code: ShiftCode::Day, overtime_hours: 2.0 })
                         .await
                         .expect("valid edit");
    match &outcome {
        EditOutcome::Confirmed { id, .. } => println!("edit confirmed with server id {}", id.uuid()),
        EditOutcome::RolledBack { error } => println!("edit rolled back: {error}"),
    }

    // 3. El backend difunde el eco y además llega un cambio de otro cliente
    if let EditOutcome::Confirmed { id, .. } = outcome {
        if let Some(committed) = persistence.row(id.uuid()) {
            notifications.publish(ChangeEvent { op: ChangeOp::Insert, record: committed }).await;
        }
    }
    notifications.publish(ChangeEvent { op: ChangeOp::Insert,
                                        record: ScheduleRecord { id: RecordId::Server(Uuid::new_v4()),
                                                                 staff_id: StaffId::from("B"),
                                                                 branch: BranchId::from("north"),
                                                                 date: day(11),
                                                                 shift_code: ShiftCode::Evening,
                                                                 overtime_hours: 0.0,
                                                                 status: ScheduleStatus::Confirmed,
                                                                 updated_at: Utc::now() } })
                 .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("\nroster ({:?}):", session.connection_state());
    for rec in session.visible_schedules(range) {
        println!("  {} {} -> {}", rec.staff_id, rec.date, rec.display_code());
    }
    println!("\naudit trail:");
    for entry in session.audit_trail() {
        println!("  [{}] {} ({})", entry.ts, entry.action, entry.actor);
    }
}
