use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type QbResult<T> = Result<T, QbError>;

#[derive(Debug, thiserror::Error)]
pub enum QbError {
    #[error("[Display Error] {0}")]
    DisplayError(String),

    #[error("[HTTP Request Error] {0}")]
    HttpRequestError(#[from] ::reqwest::Error),

    #[error("[HTTP Status Error] [{request}] {status}")]
    HttpStatusError { status: String, request: String },

    #[error("[Invalid] {message}")]
    Invalid { code: &'static str, message: String },

    #[error("[IO Error] {0}")]
    IoError(#[from] std::io::Error),

    #[error("[Missing Config] '{key}' is not set")]
    MissingConfig { key: &'static str },

    #[error("[Parse Config Error] {0}")]
    ParseConfigError(#[from] ::confy::ConfyError),

    #[error("[Parse URL Error] {0}")]
    ParseUrlError(#[from] url::ParseError),

    #[error("[Parse XML Error] {0}")]
    ParseXmlError(#[from] ::quick_xml::DeError),

    #[error("[Read XML Error] {0}")]
    ReadXmlError(#[from] ::quick_xml::Error),
}

impl QbError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QbError::Invalid { .. } => StatusCode::BAD_REQUEST,
            QbError::DisplayError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QbError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
