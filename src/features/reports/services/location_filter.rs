//! Great-circle distance and radius filtering for report listings.

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Relative slack added to the bounding box so float error never excludes
/// a point the exact check would keep
const BOX_MARGIN: f64 = 1.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance between two points in kilometers
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coarse pre-filter for the database query.
///
/// `lon` is `None` when the circle reaches a pole or crosses the
/// antimeridian; only latitude is bounded then.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lon: Option<(f64, f64)>,
}

/// Keep points within `radius_km` of `center`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFilter {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl RadiusFilter {
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// A box containing every point within the radius
    pub fn bounding_box(&self) -> BoundingBox {
        let angular = self.radius_km / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees() * BOX_MARGIN;

        let min_lat = self.center.lat - lat_delta;
        let max_lat = self.center.lat + lat_delta;

        let lon = if min_lat <= -90.0 || max_lat >= 90.0 {
            None
        } else {
            let ratio = angular.sin() / self.center.lat.to_radians().cos();
            if ratio >= 1.0 {
                None
            } else {
                let lon_delta = ratio.asin().to_degrees() * BOX_MARGIN;
                let (min_lon, max_lon) = (self.center.lon - lon_delta, self.center.lon + lon_delta);
                (min_lon >= -180.0 && max_lon <= 180.0).then_some((min_lon, max_lon))
            }
        };

        BoundingBox {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            lon,
        }
    }

    /// Distance from the center rounded to two decimals, or `None` when
    /// the point lies outside the radius
    pub fn distance_within(&self, point: GeoPoint) -> Option<f64> {
        let distance = haversine_km(self.center, point);
        (distance <= self.radius_km).then(|| round2(distance))
    }

    /// Keep the items inside the radius, preserving order, paired with their
    /// rounded distance
    pub fn apply<T, F>(&self, items: Vec<T>, point_of: F) -> Vec<(T, f64)>
    where
        F: Fn(&T) -> GeoPoint,
    {
        items
            .into_iter()
            .filter_map(|item| {
                let distance = self.distance_within(point_of(&item))?;
                Some((item, distance))
            })
            .collect()
    }
}
