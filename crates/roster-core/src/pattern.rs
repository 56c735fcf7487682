//! Patrones de turno para generación masiva.
//!
//! Un patrón uniforme asigna el mismo código a cada día objetivo; una
//! rotación ("3 de trabajo / 2 de descanso") avanza un cursor por staff,
//! anclado en el inicio del rango de ese staff.

use serde::{Deserialize, Serialize};

use roster_domain::ShiftCode;

/// Un día dentro del ciclo de rotación.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PatternDay {
    On { code: ShiftCode, overtime_hours: f64 },
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShiftPattern {
    /// Mismo código (y horas extra) para cada día objetivo.
    Uniform { code: ShiftCode, overtime_hours: f64 },
    /// Ciclo repetitivo; el índice avanza un paso por día calendario desde
    /// el ancla.
    Rotation { cycle: Vec<PatternDay> },
}

impl ShiftPattern {
    /// Ciclo "n de trabajo / m de descanso" con el código dado.
    pub fn on_off(code: ShiftCode, days_on: usize, days_off: usize) -> Self {
        let mut cycle = Vec::with_capacity(days_on + days_off);
        for _ in 0..days_on {
            cycle.push(PatternDay::On { code, overtime_hours: 0.0 });
        }
        for _ in 0..days_off {
            cycle.push(PatternDay::Off);
        }
        ShiftPattern::Rotation { cycle }
    }

    /// Código concreto para el día `offset` (días calendario desde el ancla
    /// del staff). `None` significa día libre: no se propone mutación.
    pub fn day_at(&self, offset: i64) -> Option<(ShiftCode, f64)> {
        match self {
            ShiftPattern::Uniform { code, overtime_hours } => Some((*code, *overtime_hours)),
            ShiftPattern::Rotation { cycle } => {
                if cycle.is_empty() || offset < 0 {
                    return None;
                }
                match cycle[(offset as usize) % cycle.len()] {
                    PatternDay::On { code, overtime_hours } => Some((code, overtime_hours)),
                    PatternDay::Off => None,
                }
            }
        }
    }
}
