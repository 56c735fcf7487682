//! Entradas de auditoría append-only.
//!
//! Las crea exclusivamente el coordinador de mutaciones después de que una
//! escritura persistida confirma; nunca se mutan ni se borran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Descripción legible, p. ej. "Updated shift for A on 2025-03-10".
    pub action: String,
    pub actor: String,
    pub ts: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, actor: impl Into<String>) -> Self {
        Self { action: action.into(), actor: actor.into(), ts: Utc::now() }
    }
}
