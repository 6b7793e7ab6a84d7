use serde::{Deserialize, Serialize};

/// Value of `status` a healthy backend reports.
pub const HEALTHY_STATUS: &str = "ok";

/// Reply to `GET /healthz`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// `"ok"` when the backend is up.
    #[serde(default)]
    pub status: Option<String>,
}

impl HealthResponse {
    /// Returns true if the backend reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.as_deref() == Some(HEALTHY_STATUS)
    }
}
