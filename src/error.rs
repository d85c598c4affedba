use thiserror::Error;

/// Precondition failures when building or querying hand landmarks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("no landmarks in hand")]
    EmptyHand,

    #[error("hand has {0} landmarks, expected 21")]
    PartialHand(usize),

    #[error("landmark id {0} is outside 0..=20")]
    LandmarkOutOfRange(usize),
}

/// Failure reported by an OS-level actuator. Never retried by the core.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("input injection failed: {0}")]
    Input(#[from] enigo::InputError),

    #[error("could not connect to input backend: {0}")]
    Connection(#[from] enigo::NewConError),

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Command { program: String, status: String },

    #[error("no command configured for {0}")]
    Unconfigured(&'static str),

    #[error("value {0} out of range")]
    InvalidValue(f32),
}

pub type ActuatorResult<T> = Result<T, ActuatorError>;
