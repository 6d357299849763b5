use serde_json::{json, Value};

use crate::server::response::ApiResponse;

pub async fn health_handler() -> ApiResponse<Value> {
    ApiResponse::ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
