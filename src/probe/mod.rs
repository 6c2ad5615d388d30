pub mod error;
pub mod probe;
pub mod result;
pub mod tls;

pub mod prelude {
    pub use super::error::ProbeError;
    pub use super::result::{
        ConnectionState, FailureStage, Phase, PhaseTimings, ProbeFailure, ProbeOutcome,
        ProbeResult, ProbeSuccess,
    };
    pub use crate::target::ProbeTarget;
}
