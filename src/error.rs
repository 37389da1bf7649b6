use derive_more::{Display, From};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    /// A credential the call needs has not been supplied.
    #[display("configuration error: {_0}")]
    #[from(skip)]
    Configuration(String),

    /// The remote API answered with a structured error payload.
    #[display("{message}")]
    #[from(skip)]
    Upstream { status: Option<u16>, message: String },

    /// The response did not match the expected shape.
    #[display("unexpected response: {_0}")]
    #[from(skip)]
    Parse(String),

    #[display("{_0}")]
    #[from(skip)]
    Custom(String),

    // -- Externals
    #[display("io error: {_0}")]
    Io(std::io::Error),

    #[display("http error: {_0}")]
    Http(reqwest::Error),

    #[display("json error: {_0}")]
    Json(serde_json::Error),
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }

    pub fn configuration(val: impl std::fmt::Display) -> Self {
        Self::Configuration(val.to_string())
    }

    pub fn parse(val: impl std::fmt::Display) -> Self {
        Self::Parse(val.to_string())
    }

    #[cfg(test)]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl std::error::Error for Error {}
