use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) ai_enabled: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StyleOption {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) font_family: &'static str,
}
