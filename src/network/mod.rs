pub mod http_client;
pub mod types;

pub use http_client::{HttpApi, HttpApiOptions};
pub use types::{ApiPort, ApiResponse, HttpMethod, NetworkError};
