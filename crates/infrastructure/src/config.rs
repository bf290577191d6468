use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

fn default_actions_q_size() -> usize {
    1000
}
fn default_camera_q_size() -> usize {
    500
}
fn default_storage_q_size() -> usize {
    1000
}
fn default_storage_root() -> String {
    "/app/storage".to_string()
}

/// Process configuration. Every field name below is a wire contract: the
/// env var names are fixed (`MQTT_HOST`, `ACTIONS_Q_SIZE`, …), unprefixed,
/// unlike the admin API's own `SCADA__`-style config layering.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoreConfig {
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    pub mqtt_user: Option<String>,
    pub mqtt_password: Option<String>,
    #[serde(default = "default_actions_q_size")]
    pub actions_q_size: usize,
    #[serde(default = "default_camera_q_size")]
    pub camera_q_size: usize,
    #[serde(default = "default_storage_q_size")]
    pub storage_q_size: usize,
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}
fn default_mqtt_port() -> u16 {
    1883
}

impl CoreConfig {
    /// Loads from the environment only — this core has no admin-configured
    /// file layer of its own, unlike the edge agent's `AgentConfig`.
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("mqtt_host", default_mqtt_host())?
            .set_default("mqtt_port", default_mqtt_port() as i64)?
            .set_default("actions_q_size", default_actions_q_size() as i64)?
            .set_default("camera_q_size", default_camera_q_size() as i64)?
            .set_default("storage_q_size", default_storage_q_size() as i64)?
            .set_default("storage_root", default_storage_root())?
            .add_source(Environment::default())
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_when_env_is_unset() {
        let config = CoreConfig::load().expect("defaults alone must be loadable");
        assert_eq!(config.mqtt_host, "localhost");
        assert_eq!(config.actions_q_size, 1000);
        assert_eq!(config.camera_q_size, 500);
        assert_eq!(config.storage_q_size, 1000);
        assert_eq!(config.storage_root, "/app/storage");
    }
}
