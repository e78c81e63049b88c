pub mod http_mock;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokrot::secrets::StoreError;
use tokrot::{RotationConfig, RotationInputs, Secret, SecretStore, SecretTarget};

/// In-memory secret store. Targets named in `deny` fail with a 403.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FakeStore {
    pub deny: Vec<String>,
    pub writes: Arc<Mutex<Vec<(String, String)>>>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn denying(names: &[&str]) -> Self {
        Self {
            deny: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn written(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for FakeStore {
    async fn update(&self, target: &SecretTarget, value: &Secret) -> Result<(), StoreError> {
        if self.deny.iter().any(|n| n == target.name()) {
            return Err(StoreError::classify(
                "HTTP 403: Resource not accessible by integration",
            ));
        }
        self.writes
            .lock()
            .unwrap()
            .push((target.name().to_string(), value.expose().to_string()));
        Ok(())
    }
}

/// Inputs pointing at a mock token endpoint.
#[allow(dead_code)]
pub fn inputs(endpoint: &str) -> RotationInputs {
    RotationInputs {
        refresh_token: Some("r1".into()),
        token_endpoint: Some(endpoint.to_string()),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn config(inputs: RotationInputs) -> RotationConfig {
    RotationConfig::from_inputs(inputs).unwrap()
}
