use crate::types::Region;
use anyhow::{Result, anyhow};
use geo::MapCoordsInPlace;
use rayon::prelude::*;

/// Mean spherical earth radius used by the projected coordinate system, in meters.
const EARTH_RADIUS_M: f64 = 6_370_997.0;

/// Albers equal-area conic projection (spherical form).
///
/// Geographic coordinates in degrees map to meters on a plane; relative area
/// is preserved between the two standard parallels.
#[derive(Debug, Clone, Copy)]
pub struct AlbersEqualArea {
    n: f64,
    c: f64,
    rho0: f64,
    lambda0: f64,
}

impl AlbersEqualArea {
    pub fn new(parallel1: f64, parallel2: f64, origin_lat: f64, origin_lon: f64) -> Self {
        let phi1 = parallel1.to_radians();
        let phi2 = parallel2.to_radians();
        let phi0 = origin_lat.to_radians();

        let n = (phi1.sin() + phi2.sin()) / 2.0;
        let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
        let rho0 = EARTH_RADIUS_M / n * (c - 2.0 * n * phi0.sin()).sqrt();

        Self {
            n,
            c,
            rho0,
            lambda0: origin_lon.to_radians(),
        }
    }

    /// USA Contiguous Albers Equal Area Conic (ESRI:102003):
    /// standard parallels 29.5/45.5, origin 37.5N 96W.
    pub fn usa_contiguous() -> Self {
        Self::new(29.5, 45.5, 37.5, -96.0)
    }

    /// Projects (longitude, latitude) in degrees to planar (x, y) in meters.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = lon.to_radians();

        let rho = EARTH_RADIUS_M / self.n * (self.c - 2.0 * self.n * phi.sin()).sqrt();
        let theta = self.n * (lambda - self.lambda0);

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }
}

/// Resolves a projection identifier from configuration.
pub fn named(name: &str) -> Result<AlbersEqualArea> {
    match name.to_lowercase().as_str() {
        "esri:102003" | "albers-usa" => Ok(AlbersEqualArea::usa_contiguous()),
        _ => Err(anyhow!("Unknown projection: {}", name)),
    }
}

/// Reprojects every region from geographic coordinates in place.
pub fn project_regions(regions: &mut [Region], projection: &AlbersEqualArea) {
    regions.par_iter_mut().for_each(|region| {
        region.geometry.map_coords_in_place(|coord| {
            let (x, y) = projection.project(coord.x, coord.y);
            geo::Coord { x, y }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{MultiPolygon, polygon};

    #[test]
    fn origin_projects_to_zero() {
        let proj = AlbersEqualArea::usa_contiguous();
        let (x, y) = proj.project(-96.0, 37.5);
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn central_meridian_stays_at_x_zero() {
        let proj = AlbersEqualArea::usa_contiguous();
        for lat in [25.0, 37.5, 49.0] {
            let (x, _) = proj.project(-96.0, lat);
            assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn east_is_positive_x_north_is_positive_y() {
        let proj = AlbersEqualArea::usa_contiguous();
        let (x_east, _) = proj.project(-80.0, 37.5);
        let (_, y_north) = proj.project(-96.0, 45.0);
        assert!(x_east > 0.0);
        assert!(y_north > 0.0);
    }

    #[test]
    fn unknown_projection_name_is_an_error() {
        assert!(named("epsg:3857").is_err());
        assert!(named("ESRI:102003").is_ok());
    }

    #[test]
    fn reprojects_regions_in_place() {
        let geometry: MultiPolygon<f64> = MultiPolygon::new(vec![polygon![
            (x: -96.0, y: 37.5),
            (x: -95.0, y: 37.5),
            (x: -95.0, y: 38.5),
            (x: -96.0, y: 37.5),
        ]]);
        let mut regions = vec![crate::types::Region {
            state_fp: "20".to_string(),
            geoid: "20001".to_string(),
            geometry,
        }];

        project_regions(&mut regions, &AlbersEqualArea::usa_contiguous());

        let first = regions[0].geometry.0[0].exterior().0[0];
        assert_relative_eq!(first.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(first.y, 0.0, epsilon = 1e-6);
    }
}
