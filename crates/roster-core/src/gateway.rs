//! Contratos hacia el backend: persistencia y stream de notificaciones.
//!
//! El core asume semántica request/response con errores tipados; no asume
//! transacciones multi-fila ni un formato de wire concreto. Las
//! implementaciones viven en `roster-gateways`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use roster_domain::{BranchId, SchedulePatch, ScheduleRecord, StaffId};

/// Rango de días inclusivo en ambos extremos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DayRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Respuesta del backend a un insert: id definitivo y timestamp autoritativo.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAck {
    pub id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAck {
    pub updated_at: DateTime<Utc>,
}

/// Errores del gateway, mapeados a variantes semánticas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("record not found")]
    NotFound,
    #[error("transient transport failure: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn insert(&self, record: &ScheduleRecord) -> Result<WriteAck, GatewayError>;
    async fn update(&self, id: Uuid, patch: &SchedulePatch) -> Result<UpdateAck, GatewayError>;
    async fn delete(&self, id: Uuid) -> Result<(), GatewayError>;
    async fn query(&self, staff_ids: &[StaffId], range: DayRange) -> Result<Vec<ScheduleRecord>, GatewayError>;
}

/// Operación reportada por el stream de cambios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub record: ScheduleRecord,
}

/// Alcance de una suscripción: una sucursal y un rango visible de días.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    pub branch: BranchId,
    pub range: DayRange,
}

impl ScopeFilter {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.record.branch == self.branch && self.range.contains(event.record.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Suscripción viva: handle para cancelar y receptor de eventos.
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub events: mpsc::Receiver<ChangeEvent>,
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn subscribe(&self, scope: ScopeFilter) -> Result<Subscription, GatewayError>;
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), GatewayError>;
}
