//! Error type shared by the factory, the coordinator and config loading.
//!
//! Precondition violations are returned as `Err` and are fatal for the run;
//! the frame host logs them and stops scheduling frames. Transient states
//! (a body whose motion state is not yet available) are never errors.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum ArenaError {
    /// `step` was called before a camera was attached.
    MissingCamera,
    /// Mass is negative, non-finite, or zero where a dynamic body is required.
    InvalidMass {
        mass: f32,
    },
    /// Box dimensions or sphere radius are not strictly positive and finite.
    DegenerateShape {
        reason: &'static str,
    },
    /// Position or orientation contains NaN or infinity.
    NonFinitePose,
    /// A `BodyId` refers to a slot that was evicted or reused.
    StaleBody,
    /// A configuration value is out of its valid range.
    InvalidConfiguration {
        reason: String,
    },
    /// A JSON configuration document could not be parsed.
    ConfigParse {
        message: String,
    },
    /// Window, canvas or GPU setup failed.
    Platform {
        message: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCamera => write!(f, "no camera attached to the simulation"),
            Self::InvalidMass { mass } => write!(f, "invalid body mass {mass}"),
            Self::DegenerateShape { reason } => write!(f, "degenerate shape: {reason}"),
            Self::NonFinitePose => write!(f, "body pose is not finite"),
            Self::StaleBody => write!(f, "body id refers to an evicted slot"),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::ConfigParse { message } => write!(f, "config parse error: {message}"),
            Self::Platform { message } => write!(f, "platform error: {message}"),
        }
    }
}

impl std::error::Error for ArenaError {}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse {
            message: err.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl From<ArenaError> for wasm_bindgen::JsValue {
    fn from(err: ArenaError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
