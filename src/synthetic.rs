//! Synthetic signals for demos
//!
//! Nothing here reads the ledger or a real sensor. The demand curve is a
//! noisy sine and sensor readings are uniform draws around typical
//! cold-chain values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DEMAND_FLOOR: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPrediction {
    pub crop: String,
    pub season: i32,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub shipment: String,
    pub temperature: f64,
    pub humidity: f64,
    pub at: String,
}

pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn from_entropy() -> Self {
        SyntheticGenerator {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible output for a given seed.
    pub fn seeded(seed: u64) -> Self {
        SyntheticGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Twelve monthly demand figures, never below 10.
    pub fn predict_demand(&mut self, crop: &str, season: i32) -> DemandPrediction {
        let data = (1..=12i32)
            .map(|month| {
                let base = 50.0
                    + 30.0 * ((f64::from(month) + f64::from(season)) / 2.0).sin()
                    + self.rng.gen_range(0.0..20.0);
                base.max(DEMAND_FLOOR).round() as u32
            })
            .collect();

        DemandPrediction {
            crop: crop.to_string(),
            season,
            data,
        }
    }

    pub fn sensor_reading(&mut self, shipment: &str) -> SensorReading {
        SensorReading {
            shipment: shipment.to_string(),
            temperature: round1(self.rng.gen_range(2.0..8.0)),
            humidity: round1(self.rng.gen_range(55.0..95.0)),
            at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
