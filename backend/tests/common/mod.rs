//! Fixtures shared by the backend integration tests

#![allow(dead_code)]

use std::sync::Arc;

use roast_backend::config::{
    BackfillConfig, Config, DatabaseConfig, ImportConfig, JwtConfig, ServerConfig,
};
use roast_backend::store::MemoryRoastStore;
use roast_backend::AppState;
use serde_json::{json, Value};
use shared::TemperatureUnit;

pub const JWT_SECRET: &str = "test-secret";

/// Seven samples, 30 s apart, with charge/dry/FCs/drop/cool recorded
pub fn reference_payload() -> Value {
    json!({
        "title": "Ethiopia Guji",
        "roastertype": "Aillio Bullet R1",
        "roastersize": 1.0,
        "mode": "F",
        "timex": [0, 30, 60, 90, 120, 150, 180],
        "temp1": [400, 380, 390, 400, 410, 420, 300],
        "temp2": [200, 180, 250, 330, 380, 410, 300],
        "timeindex": [0, 1, 3, 0, 0, 0, 5, 6],
        "weight": [200, 170, "g"],
        "beans": "Guji natural",
        "roastisodate": "2024-03-01",
        "extradevices": [25],
        "extraname1": ["ET2"],
        "extraname2": ["Fan"],
        "extratemp1": [[400, -1, 390, 400, 410, 420, 300]],
        "extratemp2": [[50, 50, 60, 60, 70, 70, 0]],
        "specialevents": [1, 3],
        "specialeventstype": [0, 3],
        "specialeventsvalue": [5.0, 8.0],
        "specialeventsStrings": ["Air 40", "Burner 70"]
    })
}

/// Same shape with first crack recorded before dry end
pub fn out_of_order_payload() -> Value {
    let mut payload = reference_payload();
    payload["timeindex"] = json!([0, 4, 2, 0, 0, 0, 5, 6]);
    payload
}

pub fn test_config(target_unit: TemperatureUnit) -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        import: ImportConfig {
            target_unit,
            ..ImportConfig::default()
        },
        backfill: BackfillConfig { batch_size: 2 },
    }
}

pub fn test_state(store: Arc<MemoryRoastStore>) -> AppState {
    AppState {
        store,
        config: Arc::new(test_config(TemperatureUnit::Fahrenheit)),
    }
}
