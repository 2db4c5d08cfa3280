//! Observer-relative geometry: geodetic ⇄ ECEF conversions on an oblate earth
//! and the transformer that turns a raw Cartesian prediction into an
//! azimuth/altitude pair.

pub mod ellipsoid;
pub mod position;
pub mod transform;

pub use ellipsoid::{
    Ellipsoid, ZTerm, Lla, geodetic_to_ecef, observer_to_ecef, ecef_to_lla_on, ecef_offset_to_lla,
    lla_angle_jacobian,
};
pub use position::AzAlt;
pub use transform::{AngleJacobian, CoordinateTransformer};
