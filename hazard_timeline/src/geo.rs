//! Great-circle distance and small-offset displacement on a spherical earth.

use std::f64::consts::TAU;

use crate::LatLng;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude used by the flat-earth offset helpers.
pub const KM_PER_DEGREE: f64 = 111.32;

// Floor for cos(lat) so offsets from a pole stay finite.
const MIN_COS_LAT: f64 = 1e-6;

/// Haversine distance in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let to_rad = |deg: f64| deg.to_radians();
    let dlat = to_rad(b.lat - a.lat);
    let dlng = to_rad(b.lng - a.lng);
    let h = (dlat / 2.0).sin().powi(2)
        + to_rad(a.lat).cos() * to_rad(b.lat).cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Move `origin` by `distance_km` along `bearing_rad` (0 = north, clockwise).
///
/// Uses the equirectangular approximation, which is accurate to well under a
/// percent for the tens-of-kilometers offsets used by forecasts. The result
/// is always a valid coordinate: latitude is clamped to the poles and
/// longitude wraps across the antimeridian.
pub fn displace(origin: LatLng, distance_km: f64, bearing_rad: f64) -> LatLng {
    let cos_lat = origin.lat.to_radians().cos().max(MIN_COS_LAT);
    let lat_offset = (distance_km / KM_PER_DEGREE) * bearing_rad.cos();
    let lng_offset = (distance_km / (KM_PER_DEGREE * cos_lat)) * bearing_rad.sin();
    LatLng::new(
        (origin.lat + lat_offset).clamp(-90.0, 90.0),
        wrap_lng(origin.lng + lng_offset),
    )
}

/// Fold a longitude into `[-180, 180)`.
pub fn wrap_lng(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Bearing from `from` to `to` in `[0, 2π)`, in the same frame as [`displace`].
///
/// Returns `None` when the points coincide.
pub fn bearing_rad(from: LatLng, to: LatLng) -> Option<f64> {
    let north_km = (to.lat - from.lat) * KM_PER_DEGREE;
    let east_km = (to.lng - from.lng) * KM_PER_DEGREE * from.lat.to_radians().cos();
    if north_km.abs() < 1e-12 && east_km.abs() < 1e-12 {
        return None;
    }
    Some(east_km.atan2(north_km).rem_euclid(TAU))
}

/// Linear interpolation between two coordinates.
pub fn lerp(a: LatLng, b: LatLng, t: f64) -> LatLng {
    LatLng::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t)
}

/// Arithmetic mean of a set of coordinates; `None` if empty.
pub fn centroid<'a, I>(points: I) -> Option<LatLng>
where
    I: IntoIterator<Item = &'a LatLng>,
{
    let (mut lat, mut lng, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        lat += p.lat;
        lng += p.lng;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(LatLng::new(lat / n as f64, lng / n as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUMBAI: LatLng = LatLng::new(18.9220, 72.8347);
    const CHENNAI: LatLng = LatLng::new(13.0827, 80.2707);

    #[test]
    fn test_haversine_one_degree_at_equator() {
        let dist = haversine_km(LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0));
        assert!((dist - 111.195).abs() < 0.2);
    }

    #[test]
    fn test_haversine_identity_symmetry_non_negative() {
        let points = [
            MUMBAI,
            CHENNAI,
            LatLng::new(-33.9, 151.2),
            LatLng::new(89.9, -179.9),
            LatLng::new(0.0, 0.0),
        ];
        for &a in &points {
            assert_eq!(haversine_km(a, a), 0.0);
            for &b in &points {
                let ab = haversine_km(a, b);
                let ba = haversine_km(b, a);
                assert!(ab >= 0.0);
                assert!((ab - ba).abs() < 1e-9, "{ab} vs {ba}");
            }
        }
    }

    #[test]
    fn test_haversine_known_city_pair() {
        // Mumbai to Chennai is roughly 1030 km great-circle.
        let dist = haversine_km(MUMBAI, CHENNAI);
        assert!((dist - 1030.0).abs() < 15.0, "{dist}");
    }

    #[test]
    fn test_displace_matches_haversine_distance() {
        for step in 0..8 {
            let bearing = step as f64 * TAU / 8.0;
            let moved = displace(MUMBAI, 20.0, bearing);
            let dist = haversine_km(MUMBAI, moved);
            assert!((dist - 20.0).abs() < 0.2, "bearing {bearing}: {dist}");
        }
    }

    #[test]
    fn test_displace_stays_on_the_globe() {
        let seeds = [
            LatLng::new(90.0, 73.0),
            LatLng::new(-90.0, -10.0),
            LatLng::new(89.99, 0.0),
            LatLng::new(10.0, 179.9),
            LatLng::new(-5.0, -179.95),
        ];
        for seed in seeds {
            for step in 0..8 {
                let moved = displace(seed, 20.0, step as f64 * TAU / 8.0);
                assert!(moved.is_valid(), "{seed:?} -> {moved:?}");
            }
        }
        // Due east across the antimeridian lands just past -180.
        let moved = displace(LatLng::new(0.0, 179.9), 20.0, TAU / 4.0);
        assert!(moved.lng < -179.7 && moved.lng >= -180.0, "{moved:?}");
        assert!((haversine_km(LatLng::new(0.0, 179.9), moved) - 20.0).abs() < 0.2);
    }

    #[test]
    fn test_wrap_lng() {
        assert_eq!(wrap_lng(0.0), 0.0);
        assert!((wrap_lng(190.0) + 170.0).abs() < 1e-9);
        assert!((wrap_lng(-190.0) - 170.0).abs() < 1e-9);
        assert_eq!(wrap_lng(180.0), -180.0);
    }

    #[test]
    fn test_bearing_round_trips_through_displace() {
        let moved = displace(CHENNAI, 15.0, 1.0);
        let bearing = bearing_rad(CHENNAI, moved).unwrap();
        assert!((bearing - 1.0).abs() < 1e-9);
        assert!(bearing_rad(CHENNAI, CHENNAI).is_none());
    }

    #[test]
    fn test_centroid_and_lerp() {
        let mid = lerp(MUMBAI, CHENNAI, 0.5);
        let c = centroid([MUMBAI, CHENNAI].iter()).unwrap();
        assert!((mid.lat - c.lat).abs() < 1e-12);
        assert!((mid.lng - c.lng).abs() < 1e-12);
        assert!(centroid(std::iter::empty::<&LatLng>()).is_none());
    }
}
