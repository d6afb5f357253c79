use crate::types::Region;
use geo::{Centroid, MultiPolygon, Point, Rotate, Scale, Translate};

/// Affine adjustment applied to one territory partition. Scale and rotation
/// are anchored at the centroid of the partition's dissolved geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub dx: f64,
    pub dy: f64,
    pub scale: f64,
    pub rotate_deg: f64,
}

impl Adjustment {
    pub const fn new(dx: f64, dy: f64, scale: f64, rotate_deg: f64) -> Self {
        Self {
            dx,
            dy,
            scale,
            rotate_deg,
        }
    }

    pub const IDENTITY: Adjustment = Adjustment::new(0.0, 0.0, 1.0, 0.0);
}

/// Layout constants per repositioned territory, keyed by FIPS code, tuned for
/// the USA Contiguous Albers projection at basemap scale. Recombination
/// follows this order, mainland first.
pub const TERRITORY_ADJUSTMENTS: [(&str, Adjustment); 7] = [
    // Alaska
    ("02", Adjustment::new(1_000_000.0, -4_900_000.0, 0.7, 32.0)),
    // Hawaii
    ("15", Adjustment::new(5_400_000.0, -1_500_000.0, 1.5, 24.0)),
    // Puerto Rico
    ("72", Adjustment::new(-2_500_000.0, 300_000.0, 3.0, 0.0)),
    // Northern Mariana Islands
    ("69", Adjustment::new(7_400_000.0, -4_000_000.0, 2.0, 70.0)),
    // American Samoa
    ("60", Adjustment::new(6_500_000.0, 1_000_000.0, 2.0, 0.0)),
    // Guam
    ("66", Adjustment::new(7_700_000.0, -5_000_000.0, 2.0, 0.0)),
    // U.S. Virgin Islands
    ("78", Adjustment::new(-2_500_000.0, 300_000.0, 3.0, 0.0)),
];

/// Centroid of the dissolved union of all geometries in the collection.
/// `None` when the collection is empty.
pub fn dissolved_centroid(regions: &[Region]) -> Option<Point<f64>> {
    let polygons: Vec<_> = regions
        .iter()
        .flat_map(|r| r.geometry.0.iter().cloned())
        .collect();
    MultiPolygon::new(polygons).centroid()
}

/// Applies one adjustment to a whole collection. Order is fixed: translate,
/// recompute the dissolved centroid, scale about it, rotate about it.
/// Rotation is in degrees, counter-clockwise. An empty collection is a no-op.
pub fn transform_regions(regions: &mut [Region], adjustment: &Adjustment) {
    for region in regions.iter_mut() {
        region.geometry.translate_mut(adjustment.dx, adjustment.dy);
    }

    let center = match dissolved_centroid(regions) {
        Some(center) => center,
        None => return,
    };

    for region in regions.iter_mut() {
        region.geometry =
            region
                .geometry
                .scale_around_point(adjustment.scale, adjustment.scale, center.0);
        region.geometry = region
            .geometry
            .rotate_around_point(adjustment.rotate_deg, center);
    }
}

/// Repositions Alaska, Hawaii, and the island territories for compact display.
///
/// Partitions the collection by the territory table, applies each territory's
/// adjustment to its partition, and recombines mainland first. Territories
/// absent from the input yield empty partitions and are skipped silently.
pub fn adjust_layout(regions: Vec<Region>) -> Vec<Region> {
    let mut mainland = Vec::new();
    let mut partitions: Vec<Vec<Region>> = vec![Vec::new(); TERRITORY_ADJUSTMENTS.len()];

    for region in regions {
        match TERRITORY_ADJUSTMENTS
            .iter()
            .position(|(code, _)| *code == region.state_fp)
        {
            Some(i) => partitions[i].push(region),
            None => mainland.push(region),
        }
    }

    let mut combined = mainland;
    for (partition, (_, adjustment)) in partitions.iter_mut().zip(TERRITORY_ADJUSTMENTS.iter()) {
        transform_regions(partition, adjustment);
        combined.append(partition);
    }

    combined
}
