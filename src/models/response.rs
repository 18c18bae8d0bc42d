use serde::Serialize;

/// Envelope shared by every response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: 200, error: "OK".into(), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self { status: 200, error: "OK".into(), data: None }
    }
}
