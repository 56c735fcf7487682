//! Bitácora de auditoría append-only.

use roster_domain::AuditEntry;

/// Contrato mínimo: agregar y listar. Nunca se muta ni se borra una entrada.
pub trait AuditLog: Send {
    fn append(&mut self, entry: AuditEntry);
    fn list(&self) -> Vec<AuditEntry>;
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: Vec<AuditEntry>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    fn list(&self) -> Vec<AuditEntry> {
        self.entries.clone()
    }
}
