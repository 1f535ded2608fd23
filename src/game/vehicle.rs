//! Vehicle catalogue and combat multipliers

use serde::{Deserialize, Serialize};

/// Vehicles a player can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    /// Fast but fragile
    Sport,
    /// Baseline stats
    #[default]
    Balanced,
    /// Slow and armoured
    Tank,
}

impl VehicleKind {
    /// Resolve a client-supplied id. Anything unrecognised is `Balanced`.
    pub fn from_client_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "sport" => Self::Sport,
            "tank" => Self::Tank,
            _ => Self::Balanced,
        }
    }

    pub fn stats(self) -> VehicleStats {
        VehicleStats::for_kind(self)
    }
}

/// Combat stats per vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleStats {
    pub damage_dealt_multiplier: f64,
    pub damage_taken_multiplier: f64,
    pub max_health: u32,
}

impl VehicleStats {
    pub fn for_kind(kind: VehicleKind) -> Self {
        match kind {
            VehicleKind::Sport => Self {
                damage_dealt_multiplier: 1.15,
                damage_taken_multiplier: 1.2,
                max_health: 80,
            },
            VehicleKind::Balanced => Self {
                damage_dealt_multiplier: 1.0,
                damage_taken_multiplier: 1.0,
                max_health: 100,
            },
            VehicleKind::Tank => Self {
                damage_dealt_multiplier: 0.9,
                damage_taken_multiplier: 0.8,
                max_health: 130,
            },
        }
    }
}
