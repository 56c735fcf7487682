//! roster-policies – Política de acceso por sucursal
//!
//! Decide qué sucursales puede ver/editar un usuario y si la vista dual
//! está permitida. La sucursal activa es configuración explícita de sesión
//! (se construye una vez al inicio), no una preferencia global mutable; la
//! persistencia de esa preferencia es un efecto de borde detrás de
//! `PreferenceSink`, nunca parte de la lógica de negocio.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use roster_domain::{BranchId, StaffId, StaffRole};

/// Contexto de sesión construido explícitamente al iniciar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub user_id: StaffId,
    pub role: StaffRole,
    pub home_branch: BranchId,
    /// Sucursales adicionales concedidas explícitamente (además de la base).
    pub extra_branches: BTreeSet<BranchId>,
    /// Sucursales conocidas por el despliegue; los roles elevados las ven todas.
    pub all_branches: BTreeSet<BranchId>,
}

impl SessionContext {
    pub fn new(user_id: StaffId, role: StaffRole, home_branch: BranchId) -> Self {
        Self { user_id,
               role,
               home_branch,
               extra_branches: BTreeSet::new(),
               all_branches: BTreeSet::new() }
    }

    pub fn with_extra_branch(mut self, branch: BranchId) -> Self {
        self.extra_branches.insert(branch);
        self
    }

    pub fn with_all_branches(mut self, branches: impl IntoIterator<Item = BranchId>) -> Self {
        self.all_branches = branches.into_iter().collect();
        self
    }
}

/// Contrato de autorización consumido por el motor de generación y el
/// coordinador de mutaciones.
pub trait BranchAccessPolicy {
    fn accessible_branches(&self, session: &SessionContext) -> BTreeSet<BranchId>;
    fn can_use_dual_view(&self, session: &SessionContext) -> bool;
    /// Los roles elevados pueden incluir personal fuera de sus sucursales
    /// accesibles en una generación.
    fn is_elevated(&self, session: &SessionContext) -> bool;
}

/// Política estándar:
/// - miembros y managers ven su sucursal base más las concedidas;
/// - admin y super-admin ven todas las sucursales del despliegue;
/// - vista dual requiere admin o manager con ≥2 sucursales accesibles.
pub struct StandardAccessPolicy;

impl StandardAccessPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StandardAccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchAccessPolicy for StandardAccessPolicy {
    fn accessible_branches(&self, session: &SessionContext) -> BTreeSet<BranchId> {
        if self.is_elevated(session) && !session.all_branches.is_empty() {
            return session.all_branches.clone();
        }
        let mut branches = session.extra_branches.clone();
        branches.insert(session.home_branch.clone());
        branches
    }

    fn can_use_dual_view(&self, session: &SessionContext) -> bool {
        if self.is_elevated(session) {
            return true;
        }
        session.role >= StaffRole::Manager && self.accessible_branches(session).len() >= 2
    }

    fn is_elevated(&self, session: &SessionContext) -> bool {
        matches!(session.role, StaffRole::Admin | StaffRole::SuperAdmin)
    }
}

/// Efecto de borde: recordar la sucursal activa entre sesiones.
pub trait PreferenceSink {
    fn remember_active_branch(&mut self, user: &StaffId, branch: &BranchId);
    fn recall_active_branch(&self, user: &StaffId) -> Option<BranchId>;
}
