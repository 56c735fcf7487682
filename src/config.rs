//! Configuración del demo desde variables de entorno.
//! Convención: `ROSTER_TZ_OFFSET_HOURS` (offset canónico de la organización).

use std::env;

use chrono::FixedOffset;
use dotenvy::dotenv;
use once_cell::sync::Lazy;

use roster_domain::OrgCalendar;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub calendar: OrgCalendar,
}

impl DemoConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let hours: i32 = env::var("ROSTER_TZ_OFFSET_HOURS").ok()
                                                           .and_then(|v| v.parse().ok())
                                                           .unwrap_or(8);
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| {
                                                            log::warn!("invalid offset {hours}h, falling back to UTC");
                                                            FixedOffset::east_opt(0).expect("zero offset is valid")
                                                        });
        Self { calendar: OrgCalendar::new(offset) }
    }
}
