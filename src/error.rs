use thiserror::Error;

use crate::interfaces::BodyId;

// ---------------------------------------------------------------------------
// Configuration errors (fatal for the session)
// ---------------------------------------------------------------------------

/// Raised while loading parameters or attaching to the host.
///
/// Any of these disables the accelerator for the rest of the session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("required collaborator missing: {0}")]
    MissingCollaborator(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter { name, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Launch failures (recoverable, always reported, never propagated as faults)
// ---------------------------------------------------------------------------

/// Coarse classification of a launch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The requested maneuver does not fit the structure, energy or time budget.
    Feasibility,
    /// Craft or target not ready at a gate before any physical commitment.
    Preflight,
    /// Zone occupancy or target identity violated during the burn.
    Runtime,
    /// Operator requested the abort.
    User,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LaunchError {
    #[error("unable to find target body {0:?}")]
    TargetNotFound(BodyId),

    #[error("target doesn't have a maneuver node")]
    NoManeuverNode,

    #[error("no body in the capture zone")]
    CaptureZoneEmpty,

    #[error("a body is in the acceleration zone")]
    AccelerationZoneOccupied,

    #[error("multiple bodies in the capture zone")]
    MultipleInCaptureZone,

    #[error("multiple bodies in the acceleration zone")]
    MultipleInAccelerationZone,

    #[error("multiple bodies inside the accelerator")]
    MultipleInsideAccelerator,

    #[error("insufficient structural strength: acceleration tolerance is {tolerance:.3} m/s^2")]
    InsufficientStrength { tolerance: f64 },

    #[error("unable to calculate launch path: acceleration channel end is unknown")]
    LaunchPathUnavailable,

    #[error("insufficient travel distance: {distance:.2} m left in the channel")]
    InsufficientTravel { distance: f64 },

    #[error(
        "accelerator is too short for the planned maneuver: maximum possible dV is \
         {max_delta_v:.1} m/s, which is {shortage:.1} m/s less than required"
    )]
    InsufficientDeltaV { max_delta_v: f64, shortage: f64 },

    #[error(
        "accelerator is too short for the planned maneuver: maximum possible acceleration \
         time is {max_time:.2} s, which is {shortage:.2} s less than required"
    )]
    InsufficientTime { max_time: f64, shortage: f64 },

    #[error("not enough energy for the maneuver: additional {shortage:.1} units required")]
    InsufficientEnergy { required: f64, shortage: f64 },

    #[error("accelerator is not aligned with the maneuver node")]
    Misaligned,

    #[error("accelerator is rotating")]
    CraftRotating,

    #[error("target is rotating")]
    TargetRotating,

    #[error("target is moving")]
    TargetMoving,

    #[error("target is not at the center of the channel")]
    TargetOffCenter,

    #[error("missed launch window")]
    MissedLaunchWindow,

    #[error("pre-launch checks failed: {0}")]
    FinalCheckFailed(Box<LaunchError>),

    #[error("target lost")]
    TargetLost,

    #[error("target left the accelerator early")]
    TargetLeftEarly,

    #[error("target replaced")]
    TargetReplaced,

    #[error("multiple bodies detected")]
    MultipleBodies,

    #[error("launch aborted by operator")]
    UserAbort,
}

impl LaunchError {
    pub fn kind(&self) -> FailureKind {
        use LaunchError::*;
        match self {
            TargetNotFound(_)
            | NoManeuverNode
            | CaptureZoneEmpty
            | AccelerationZoneOccupied
            | MultipleInCaptureZone
            | MultipleInAccelerationZone
            | MultipleInsideAccelerator
            | InsufficientStrength { .. }
            | LaunchPathUnavailable
            | InsufficientTravel { .. }
            | InsufficientDeltaV { .. }
            | InsufficientTime { .. }
            | InsufficientEnergy { .. } => FailureKind::Feasibility,
            Misaligned
            | CraftRotating
            | TargetRotating
            | TargetMoving
            | TargetOffCenter
            | MissedLaunchWindow
            | FinalCheckFailed(_) => FailureKind::Preflight,
            TargetLost | TargetLeftEarly | TargetReplaced | MultipleBodies => FailureKind::Runtime,
            UserAbort => FailureKind::User,
        }
    }
}
