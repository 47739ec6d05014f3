pub type LottiecapResult<T> = Result<T, LottiecapError>;

#[derive(thiserror::Error, Debug)]
pub enum LottiecapError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("render init timeout: {0}")]
    RenderInitTimeout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LottiecapError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::InvalidDimension(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    pub fn init_timeout(msg: impl Into<String>) -> Self {
        Self::RenderInitTimeout(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
