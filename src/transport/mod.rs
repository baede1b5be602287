mod error_body;
mod gateway_client;

pub use error_body::sanitize_upstream_error;
pub use gateway_client::{ByteStream, ChatCompletionRequest, GatewayClient};
