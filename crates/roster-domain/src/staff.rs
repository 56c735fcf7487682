//! Perfiles de personal y particiones por sucursal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identificador de miembro del personal (opaco, viene del backend).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub String);

impl StaffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StaffId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identificador de sucursal; controla visibilidad y derechos de edición.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(pub String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Rol del usuario; junto con la sucursal base alimenta la política de
/// acceso por sucursal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StaffRole {
    Member,
    Manager,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffProfile {
    pub id: StaffId,
    pub display_name: String,
    pub role: StaffRole,
    pub home_branch: BranchId,
    pub department: String,
}
