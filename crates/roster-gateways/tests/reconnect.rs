//! Caída y recuperación del stream de notificaciones.
//!
//! El stream no garantiza entrega a través de una ventana de desconexión:
//! tras reconectar, el reconciliador debe re-traer el rango visible
//! completo desde la persistencia.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use roster_core::gateway::DayRange;
use roster_core::{ConnectionState, InMemoryAuditLog, RosterSession, SessionConfig};
use roster_domain::{BranchId, OrgCalendar, RecordId, ScheduleRecord, ScheduleStatus, ShiftCode, StaffId,
                    StaffProfile, StaffRole};
use roster_gateways::{ChannelNotificationGateway, InMemoryPersistenceGateway};
use roster_policies::{SessionContext, StandardAccessPolicy};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn march() -> DayRange {
    DayRange::new(day(1), day(31))
}

fn make_session(persistence: Arc<InMemoryPersistenceGateway>,
                notifications: Arc<ChannelNotificationGateway>)
                -> RosterSession {
    let directory: HashMap<StaffId, StaffProfile> =
        [(StaffId::from("A"),
          StaffProfile { id: StaffId::from("A"),
                         display_name: "A".to_string(),
                         role: StaffRole::Member,
                         home_branch: BranchId::from("north"),
                         department: "ops".to_string() })].into_iter()
                                                          .collect();
    let ctx = SessionContext::new(StaffId::from("mgr"), StaffRole::Manager, BranchId::from("north"));
    RosterSession::new(SessionConfig { session: ctx,
                                       calendar: OrgCalendar::utc(),
                                       directory,
                                       leaves: vec![] },
                       persistence,
                       notifications,
                       Arc::new(StandardAccessPolicy::new()),
                       Arc::new(StdMutex::new(InMemoryAuditLog::new())))
}

fn server_row(d: u32) -> ScheduleRecord {
    ScheduleRecord { id: RecordId::Server(uuid::Uuid::new_v4()),
                     staff_id: StaffId::from("A"),
                     branch: BranchId::from("north"),
                     date: day(d),
                     shift_code: ShiftCode::Evening,
                     overtime_hours: 0.0,
                     status: ScheduleStatus::Confirmed,
                     updated_at: Utc::now() }
}

#[tokio::test(start_paused = true)]
async fn transport_drop_reconnects_and_resyncs_the_visible_range() {
    let persistence = Arc::new(InMemoryPersistenceGateway::new());
    let notifications = Arc::new(ChannelNotificationGateway::new());
    let session = make_session(persistence.clone(), notifications.clone());

    session.set_visible_scope(vec![BranchId::from("north")], march()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.connection_state(), ConnectionState::Connected);

    // cae el transporte; mientras tanto otro cliente escribe en el servidor
    notifications.drop_connections(true);
    persistence.seed(server_row(12));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.connection_state(), ConnectionState::Connected, "must reconnect automatically");

    let rows = session.visible_schedules(march());
    assert_eq!(rows.len(), 1, "resync must pull the write missed during the gap");
    assert_eq!(rows[0].date, day(12));
}

#[tokio::test(start_paused = true)]
async fn reconnect_backs_off_while_the_transport_stays_down() {
    let persistence = Arc::new(InMemoryPersistenceGateway::new());
    let notifications = Arc::new(ChannelNotificationGateway::new());
    let session = make_session(persistence.clone(), notifications.clone());

    session.set_visible_scope(vec![BranchId::from("north")], march()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // transporte caído y rechazando suscripciones
    notifications.drop_connections(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.connection_state(), ConnectionState::Reconnecting);

    persistence.seed(server_row(15));
    notifications.restore();
    // backoff: el siguiente intento llega dentro de pocos segundos
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    let rows = session.visible_schedules(march());
    assert_eq!(rows.len(), 1);
}
