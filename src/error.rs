use thiserror::Error;

/// Why a describe or edit run failed.
///
/// Every variant carries a message suitable for showing to the user as-is; the
/// controller stores `to_string()` and nothing else reaches the page.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoothError {
    /// The uploaded file could not be read or turned into an inline payload.
    #[error("Failed to read image file: {0}")]
    Encoding(String),

    /// Transport, authentication, quota or request rejection from Gemini.
    #[error("{0}")]
    Service(String),

    /// Gemini answered but without any usable text.
    #[error("{0}")]
    EmptyResponse(String),

    /// Gemini answered an edit request without image data.
    #[error("No image was generated. Please try a different prompt.")]
    NoImageGenerated,

    /// An edit was requested with nothing but whitespace as instruction.
    #[error("Please describe the edit you want to make.")]
    BlankPrompt,
}

impl BoothError {
    pub fn empty_response() -> Self {
        BoothError::EmptyResponse("The service returned an empty response.".to_string())
    }
}

impl From<reqwest::Error> for BoothError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BoothError::Service(format!("Request to Gemini timed out: {err}"))
        } else {
            BoothError::Service(format!("Request to Gemini failed: {err}"))
        }
    }
}

/// Startup configuration problems. These abort the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or API_KEY) environment variable not set")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

pub type Result<T, E = BoothError> = std::result::Result<T, E>;
