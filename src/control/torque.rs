use nalgebra::{UnitQuaternion, Vector3};

/// Geometry the torque sources need to express their torque in the craft frame.
#[derive(Debug, Clone, Copy)]
pub struct TorqueFrame {
    /// World-to-local rotation.
    pub to_local: UnitQuaternion<f64>,
    /// Centre of mass, world.
    pub com: Vector3<f64>,
    /// The craft is shielded from the airstream.
    pub shielded: bool,
}

/// Anything that can produce torque about the craft's local axes.
pub trait TorqueSource {
    /// Available `(positive, negative)` torque per local axis, N m.
    /// Both vectors hold non-negative magnitudes.
    fn potential_torque(&self, frame: &TorqueFrame) -> (Vector3<f64>, Vector3<f64>);

    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Per-axis positive and negative torque summed over all sources.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TorqueEnvelope {
    pub positive: Vector3<f64>,
    pub negative: Vector3<f64>,
}

impl TorqueEnvelope {
    /// Split `torque` by component sign and accumulate.
    pub fn add(&mut self, torque: &Vector3<f64>) {
        for i in 0..3 {
            if torque[i] > 0.0 {
                self.positive[i] += torque[i];
            } else {
                self.negative[i] += torque[i];
            }
        }
    }

    pub fn add_source(&mut self, source: &dyn TorqueSource, frame: &TorqueFrame) {
        let (pos, neg) = source.potential_torque(frame);
        self.add(&pos);
        self.add(&-neg);
    }

    /// Larger magnitude of the two directions on each axis.
    pub fn max(&self) -> Vector3<f64> {
        self.positive.zip_map(&self.negative, |p, n| p.max(-n))
    }
}

/// Angular acceleration (deg/s^2) from torque and principal inertia; zero inertia gives zero.
pub fn angular_acceleration_deg(torque: &Vector3<f64>, inertia: &Vector3<f64>) -> Vector3<f64> {
    torque.zip_map(inertia, |t, i| if i > 0.0 { (t / i).to_degrees() } else { 0.0 })
}

// ---------------------------------------------------------------------------
// Reaction wheel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReactionWheel {
    pub name: String,
    pub enabled: bool,
    pub positive: Vector3<f64>,
    pub negative: Vector3<f64>,
    /// Percent of the rated torque the wheel may use.
    pub authority: f64,
}

impl ReactionWheel {
    /// Symmetric wheel with full authority.
    pub fn new(name: impl Into<String>, torque: Vector3<f64>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            positive: torque,
            negative: torque,
            authority: 100.0,
        }
    }

    pub fn with_authority(mut self, percent: f64) -> Self {
        self.authority = percent;
        self
    }
}

impl TorqueSource for ReactionWheel {
    fn potential_torque(&self, _frame: &TorqueFrame) -> (Vector3<f64>, Vector3<f64>) {
        if !self.enabled {
            return (Vector3::zeros(), Vector3::zeros());
        }
        let limit = self.authority / 100.0;
        (self.positive * limit, self.negative * limit)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Thruster cluster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Nozzle {
    pub position: Vector3<f64>,  // world
    pub direction: Vector3<f64>, // world, unit, direction of the force on the craft
}

#[derive(Debug, Clone)]
pub struct ThrusterCluster {
    pub name: String,
    pub enabled: bool,
    pub flamed_out: bool,
    pub can_thrust_shielded: bool,
    /// Thrust per nozzle at full power, N.
    pub thrust: f64,
    /// Thrust limiter, percent.
    pub thrust_percentage: f64,
    pub pitch: bool,
    pub roll: bool,
    pub yaw: bool,
    pub nozzles: Vec<Nozzle>,
}

impl ThrusterCluster {
    pub fn new(name: impl Into<String>, thrust: f64, nozzles: Vec<Nozzle>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            flamed_out: false,
            can_thrust_shielded: false,
            thrust,
            thrust_percentage: 100.0,
            pitch: true,
            roll: true,
            yaw: true,
            nozzles,
        }
    }

    fn active(&self, frame: &TorqueFrame) -> bool {
        self.enabled
            && !self.flamed_out
            && !(frame.shielded && !self.can_thrust_shielded)
            && self.thrust * self.thrust_percentage > 0.0
    }
}

impl TorqueSource for ThrusterCluster {
    fn potential_torque(&self, frame: &TorqueFrame) -> (Vector3<f64>, Vector3<f64>) {
        let mut envelope = TorqueEnvelope::default();
        if !self.active(frame) {
            return (envelope.positive, envelope.negative);
        }
        let thrust = self.thrust * self.thrust_percentage / 100.0;
        for nozzle in &self.nozzles {
            let lever = nozzle.position - frame.com;
            let mut specific = frame.to_local * lever.cross(&nozzle.direction);
            if !self.pitch {
                specific.x = 0.0;
            }
            if !self.roll {
                specific.y = 0.0;
            }
            if !self.yaw {
                specific.z = 0.0;
            }
            envelope.add(&(specific * thrust));
        }
        (envelope.positive, -envelope.negative)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
