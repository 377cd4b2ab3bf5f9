/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the pipeline
/// can handle failures consistently (fatal at startup vs recovered
/// per-message).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("gateway setup error: {0}")]
    GatewaySetup(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
