// Public modules
pub mod clear_history;
pub mod error_body;
pub mod health;
pub mod message;
pub mod request_payload;
pub mod response_payload;
pub mod usage;

// Re-exports
pub use clear_history::{CLEAR_SUCCESS_STATUS, ClearHistoryRequest, ClearHistoryResponse};
pub use error_body::ErrorBody;
pub use health::{HEALTHY_STATUS, HealthResponse};
pub use message::{Message, Role};
pub use request_payload::RequestPayload;
pub use response_payload::ResponsePayload;
pub use usage::Usage;
