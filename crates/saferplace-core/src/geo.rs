//! Great-circle distance between coordinate pairs.

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two points given in degrees.
///
/// Inputs are not range-checked; NaN propagates.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
  let phi1 = lat1.to_radians();
  let phi2 = lat2.to_radians();
  let d_phi = (lat2 - lat1).to_radians();
  let d_lambda = (lon2 - lon1).to_radians();

  let a = (d_phi / 2.0).sin().powi(2)
    + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
  // Clamp guards asin against rounding just above 1.0 for antipodal points.
  let c = 2.0 * a.sqrt().min(1.0).asin();

  EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f64 = 1e-9;

  #[test]
  fn coincident_points_are_zero() {
    assert_eq!(distance(51.5, -0.12, 51.5, -0.12), 0.0);
    assert_eq!(distance(0.0, 0.0, 0.0, 0.0), 0.0);
  }

  #[test]
  fn symmetric() {
    let ab = distance(53.35, -6.26, 48.85, 2.35);
    let ba = distance(48.85, 2.35, 53.35, -6.26);
    assert!((ab - ba).abs() < EPS);
  }

  #[test]
  fn one_degree_of_latitude_on_meridian() {
    let expected = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;
    assert!((distance(0.0, 0.0, 1.0, 0.0) - expected).abs() < EPS);
  }

  #[test]
  fn dublin_to_paris_is_about_780_km() {
    let d = distance(53.3498, -6.2603, 48.8566, 2.3522);
    assert!((770.0..790.0).contains(&d), "got {d}");
  }

  #[test]
  fn antipodal_points_are_half_circumference() {
    let d = distance(0.0, 0.0, 0.0, 180.0);
    assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);
  }

  #[test]
  fn nan_propagates() {
    assert!(distance(f64::NAN, 0.0, 0.0, 0.0).is_nan());
  }
}
