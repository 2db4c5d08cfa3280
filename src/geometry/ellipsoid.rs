use std::f64::consts::FRAC_PI_2;

const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// An oblate reference ellipsoid. Units are whatever the radii are given in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major: f64,
    pub semi_minor: f64,
}

impl Ellipsoid {
    /// Ellipsoid used to place the observer, in kilometres.
    pub const OBSERVER_KM: Ellipsoid = Ellipsoid { semi_major: 6378.1370, semi_minor: 6356.7523 };

    /// Ellipsoid used by the closed-form inverse, in metres.
    ///
    /// The minor axis is the rounded 6.3568e6 m, not the WGS84 6356752.3 m.
    pub const SOLVER_M: Ellipsoid = Ellipsoid { semi_major: 6_378_137.0, semi_minor: 6.3568e6 };

    /// First eccentricity squared, (a² − b²) / a².
    pub fn first_ecc_sq(&self) -> f64 {
        let (a2, b2) = (self.semi_major.powi(2), self.semi_minor.powi(2));
        (a2 - b2) / a2
    }

    /// Second eccentricity squared, (a² − b²) / b².
    pub fn second_ecc_sq(&self) -> f64 {
        let (a2, b2) = (self.semi_major.powi(2), self.semi_minor.powi(2));
        (a2 - b2) / b2
    }

    /// Prime-vertical radius of curvature N(φ) for a latitude in radians.
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        self.semi_major / (1.0 - self.first_ecc_sq() * lat_rad.sin().powi(2)).sqrt()
    }
}

/// Which trigonometric factor scales the ECEF z component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZTerm {
    /// z = (N(1−e²) + h)·cos φ·cos λ. The form the regressor was built and
    /// trained around; it is kept as-is.
    #[default]
    Longitude,
    /// z = (N(1−e²) + h)·sin φ, the textbook geodetic form.
    Latitude,
}

/// Geodetic latitude/longitude in degrees and height in the solver's unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lla {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

/// Geodetic to Cartesian conversion on `ellipsoid`.
///
/// # Arguments
/// * `lat_deg`, `lon_deg` - geodetic coordinates in degrees
/// * `alt` - height above the ellipsoid, same unit as the radii
/// * `z_term` - see [`ZTerm`]
pub fn geodetic_to_ecef(ellipsoid: &Ellipsoid, lat_deg: f64, lon_deg: f64, alt: f64, z_term: ZTerm) -> [f64; 3] {
    let phi = lat_deg * DEG2RAD;
    let lambda = lon_deg * DEG2RAD;
    let e2 = ellipsoid.first_ecc_sq();
    let n = ellipsoid.prime_vertical_radius(phi);

    let x = (n + alt) * phi.cos() * lambda.cos();
    let y = (n + alt) * phi.cos() * lambda.sin();
    let z = match z_term {
        ZTerm::Longitude => (n * (1.0 - e2) + alt) * phi.cos() * lambda.cos(),
        ZTerm::Latitude => (n * (1.0 - e2) + alt) * phi.sin(),
    };
    [x, y, z]
}

/// The observer's ECEF position in metres.
///
/// Computed on [`Ellipsoid::OBSERVER_KM`] with the altitude converted from
/// metres, then scaled back to metres to match [`ecef_offset_to_lla`].
pub fn observer_to_ecef(lat_deg: f64, lon_deg: f64, alt_m: f64) -> [f64; 3] {
    let km = geodetic_to_ecef(&Ellipsoid::OBSERVER_KM, lat_deg, lon_deg, alt_m / 1000.0, ZTerm::Longitude);
    [km[0] * 1000.0, km[1] * 1000.0, km[2] * 1000.0]
}

/// Closed-form (Bowring, non-iterative) Cartesian to geodetic conversion.
///
/// The longitude is the principal `atan(y/x)`, so it lies in [-90°, 90°] and
/// loses the half-turn a two-argument arctangent would keep. Degenerate inputs
/// resolve without failing:
/// * x = 0 gives ±90° following the sign of y (0° when y is also 0);
/// * a point on the polar axis gives ±90° following the sign of z;
/// * a latitude of exactly ±90° gives a height of ±infinity.
pub fn ecef_to_lla_on(ellipsoid: &Ellipsoid, x: f64, y: f64, z: f64) -> Lla {
    let a = ellipsoid.semi_major;
    let b = ellipsoid.semi_minor;
    let e2 = ellipsoid.first_ecc_sq();
    let ep2 = ellipsoid.second_ecc_sq();

    let p = (x * x + y * y).sqrt();
    let lon = principal_longitude(x, y);

    // cos(π/2) rounds to a small positive value, which would flip the sign
    // of the closed form on the axis.
    if p == 0.0 {
        let lat = FRAC_PI_2.copysign(z);
        return Lla { latitude: lat * RAD2DEG, longitude: lon * RAD2DEG, height: f64::INFINITY.copysign(z) };
    }

    let theta = ((z * a) / (p * b)).atan();

    let first = z + ep2 * b * theta.sin().powi(3);
    let second = p - e2 * a * theta.cos().powi(3);
    let lat = (first / second).atan();

    let n = ellipsoid.prime_vertical_radius(lat);
    let height = if lat.abs() >= FRAC_PI_2 {
        f64::INFINITY.copysign(lat)
    } else {
        p / lat.cos() - n
    };

    Lla { latitude: lat * RAD2DEG, longitude: lon * RAD2DEG, height }
}

/// [`ecef_to_lla_on`] with the metre-based solver ellipsoid, for a point given
/// relative to the observer.
pub fn ecef_offset_to_lla(x: f64, y: f64, z: f64) -> Lla {
    ecef_to_lla_on(&Ellipsoid::SOLVER_M, x, y, z)
}

/// Partial derivatives of (latitude°, longitude°) with respect to (x, y, z).
///
/// Non-finite entries (p = 0, the origin) are reported as 0.
pub fn lla_angle_jacobian(ellipsoid: &Ellipsoid, x: f64, y: f64, z: f64) -> ([f64; 3], [f64; 3]) {
    let a = ellipsoid.semi_major;
    let b = ellipsoid.semi_minor;
    let e2 = ellipsoid.first_ecc_sq();
    let ep2 = ellipsoid.second_ecc_sq();

    let rho2 = x * x + y * y;
    let p = rho2.sqrt();
    let u = (z * a) / (p * b);
    let theta = u.atan();
    let (s, c) = theta.sin_cos();

    let dtheta_du = 1.0 / (1.0 + u * u);
    let dtheta_dz = dtheta_du * a / (p * b);
    let dtheta_dp = -dtheta_du * z * a / (p * p * b);

    let first = z + ep2 * b * s.powi(3);
    let second = p - e2 * a * c.powi(3);
    let dfirst_dtheta = 3.0 * ep2 * b * s * s * c;
    let dsecond_dtheta = 3.0 * e2 * a * c * c * s;

    let dfirst_dz = 1.0 + dfirst_dtheta * dtheta_dz;
    let dfirst_dp = dfirst_dtheta * dtheta_dp;
    let dsecond_dz = dsecond_dtheta * dtheta_dz;
    let dsecond_dp = 1.0 + dsecond_dtheta * dtheta_dp;

    // d atan(F/G) = (G dF − F dG) / (F² + G²)
    let denom = first * first + second * second;
    let dlat_dz = (second * dfirst_dz - first * dsecond_dz) / denom;
    let dlat_dp = (second * dfirst_dp - first * dsecond_dp) / denom;

    let lat = [dlat_dp * x / p, dlat_dp * y / p, dlat_dz].map(|v| finite_or_zero(v * RAD2DEG));
    let lon = [-y / rho2, x / rho2, 0.0].map(|v| finite_or_zero(v * RAD2DEG));
    (lat, lon)
}

fn principal_longitude(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        if y > 0.0 {
            FRAC_PI_2
        } else if y < 0.0 {
            -FRAC_PI_2
        } else {
            0.0
        }
    } else {
        (y / x).atan()
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_on_equator_at_prime_meridian() {
        let [x, y, z] = observer_to_ecef(0.0, 0.0, 0.0);
        assert!((x - 6_378_137.0).abs() < 1e-6);
        assert_eq!(y, 0.0);
        // cos λ = 1 here, so z is the polar-scaled radius rather than 0
        let expected_z = 6356.7523_f64.powi(2) / 6378.137 * 1000.0;
        assert!((z - expected_z).abs() < 1e-3);
    }

    #[test]
    fn observer_altitude_is_in_metres() {
        let ground = observer_to_ecef(0.0, 0.0, 0.0);
        let raised = observer_to_ecef(0.0, 0.0, 250.0);
        assert!((raised[0] - ground[0] - 250.0).abs() < 1e-6);
    }

    #[test]
    fn longitude_z_term_differs_from_textbook_form() {
        let ell = Ellipsoid::OBSERVER_KM;
        let trained = geodetic_to_ecef(&ell, 45.0, 60.0, 0.0, ZTerm::Longitude);
        let textbook = geodetic_to_ecef(&ell, 45.0, 60.0, 0.0, ZTerm::Latitude);
        assert_eq!(trained[0], textbook[0]);
        assert!((trained[2] * 2.0 - textbook[2]).abs() < 1e-9);
    }

    #[test]
    fn offset_of_one_radius_along_x_is_the_origin_point() {
        let lla = ecef_offset_to_lla(6_378_137.0, 0.0, 0.0);
        assert!(lla.latitude.abs() < 1e-9);
        assert!(lla.longitude.abs() < 1e-9);
        assert!(lla.height.abs() < 1e-6);
    }

    #[test]
    fn zero_x_resolves_to_signed_right_angle() {
        assert!((ecef_offset_to_lla(0.0, 5.0e6, 1.0e5).longitude - 90.0).abs() < 1e-12);
        assert!((ecef_offset_to_lla(0.0, -5.0e6, 1.0e5).longitude + 90.0).abs() < 1e-12);
        assert_eq!(ecef_offset_to_lla(-0.0, 0.0, 1.0e5).longitude, 0.0);
    }

    #[test]
    fn pole_height_is_an_infinite_sentinel() {
        let up = ecef_offset_to_lla(1.0, 0.0, f64::INFINITY);
        assert!((up.latitude - 90.0).abs() < 1e-12);
        assert_eq!(up.height, f64::INFINITY);
        let down = ecef_offset_to_lla(1.0, 0.0, f64::NEG_INFINITY);
        assert_eq!(down.height, f64::NEG_INFINITY);
    }

    #[test]
    fn point_on_the_polar_axis_keeps_its_hemisphere() {
        let north = ecef_offset_to_lla(0.0, 0.0, 1.0e6);
        assert_eq!((north.latitude, north.longitude, north.height), (90.0, 0.0, f64::INFINITY));
        let south = ecef_offset_to_lla(0.0, 0.0, -1.0e6);
        assert_eq!((south.latitude, south.longitude, south.height), (-90.0, 0.0, f64::NEG_INFINITY));
    }

    #[test]
    fn negative_x_folds_longitude_by_half_turn() {
        let lla = ecef_offset_to_lla(-4.0e6, 4.0e6, 0.0);
        assert!((lla.longitude + 45.0).abs() < 1e-9);
    }

    #[test]
    fn jacobian_matches_central_differences() {
        let ell = Ellipsoid::SOLVER_M;
        let point = [3.1e6, -2.4e6, 4.5e6];
        let (dlat, dlon) = lla_angle_jacobian(&ell, point[0], point[1], point[2]);
        let h = 1.0;
        for axis in 0..3 {
            let mut plus = point;
            let mut minus = point;
            plus[axis] += h;
            minus[axis] -= h;
            let lp = ecef_to_lla_on(&ell, plus[0], plus[1], plus[2]);
            let lm = ecef_to_lla_on(&ell, minus[0], minus[1], minus[2]);
            let num_lat = (lp.latitude - lm.latitude) / (2.0 * h);
            let num_lon = (lp.longitude - lm.longitude) / (2.0 * h);
            assert!((num_lat - dlat[axis]).abs() < 1e-10, "lat axis {axis}: {num_lat} vs {}", dlat[axis]);
            assert!((num_lon - dlon[axis]).abs() < 1e-10, "lon axis {axis}: {num_lon} vs {}", dlon[axis]);
        }
    }

    #[test]
    fn jacobian_on_the_axis_is_finite() {
        let (dlat, dlon) = lla_angle_jacobian(&Ellipsoid::SOLVER_M, 0.0, 0.0, 1.0e6);
        assert!(dlat.iter().chain(dlon.iter()).all(|v| v.is_finite()));
    }
}
