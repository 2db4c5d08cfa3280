use crate::config::Config;
use crate::context::ExecutionContext;
use crate::geometry::ellipsoid::{ecef_offset_to_lla, lla_angle_jacobian, observer_to_ecef, Ellipsoid};
use crate::geometry::position::AzAlt;

/// ∂(azimuth°, altitude°)/∂(x, y, z) for one body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleJacobian {
    pub azimuth: [f64; 3],
    pub altitude: [f64; 3],
}

/// Turns a body's predicted ECEF position into the observer's azimuth/altitude.
///
/// The body position is taken relative to the observer and pushed through the
/// closed-form geodetic inverse; the resulting latitude is read as altitude and
/// the longitude as azimuth. That reading is the model's definition of the
/// sky position, not a topocentric rotation.
#[derive(Debug, Clone)]
pub struct CoordinateTransformer {
    observer: [f64; 3],
    ctx: ExecutionContext,
}

impl CoordinateTransformer {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64, ctx: ExecutionContext) -> Self {
        CoordinateTransformer { observer: observer_to_ecef(latitude, longitude, altitude_m), ctx }
    }

    pub fn from_config(config: &Config, ctx: ExecutionContext) -> Self {
        Self::new(config.latitude, config.longitude, config.altitude, ctx)
    }

    /// Observer position in metres.
    pub fn observer_ecef(&self) -> [f64; 3] {
        self.observer
    }

    fn offset(&self, body: [f64; 3]) -> [f64; 3] {
        [body[0] - self.observer[0], body[1] - self.observer[1], body[2] - self.observer[2]]
    }

    pub fn to_sky(&self, body: [f64; 3]) -> AzAlt {
        let [x, y, z] = self.offset(body);
        let lla = ecef_offset_to_lla(x, y, z);
        AzAlt { azimuth: lla.longitude, altitude: lla.latitude }
    }

    /// Converts a flat list of body positions.
    pub fn convert(&self, bodies: &[[f64; 3]]) -> Vec<AzAlt> {
        self.ctx.map_indexed(bodies.len(), |i| self.to_sky(bodies[i]))
    }

    /// Like [`convert`](Self::convert), also returning each conversion's Jacobian.
    pub fn convert_with_jacobian(&self, bodies: &[[f64; 3]]) -> Vec<(AzAlt, AngleJacobian)> {
        self.ctx.map_indexed(bodies.len(), |i| {
            let [x, y, z] = self.offset(bodies[i]);
            let (altitude, azimuth) = lla_angle_jacobian(&Ellipsoid::SOLVER_M, x, y, z);
            (self.to_sky(bodies[i]), AngleJacobian { azimuth, altitude })
        })
    }
}
