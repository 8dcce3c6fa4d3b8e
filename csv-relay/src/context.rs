use std::time::Duration;

use health::{HealthHandle, HealthRegistry};

use crate::config::Config;

pub struct AppContext {
    pub config: Config,
    pub liveness: HealthRegistry,
    pub relay_liveness: HealthHandle,
}

impl AppContext {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let liveness = HealthRegistry::new("liveness");
        let relay_liveness = liveness
            .register("relay_loop".to_string(), Duration::from_secs(30))
            .await;

        Ok(AppContext {
            config,
            liveness,
            relay_liveness,
        })
    }
}
