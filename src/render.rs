use crate::config::MapConfig;
use crate::map::UsBasemap;
use crate::types::Region;
use anyhow::{Result, anyhow};
use geo::BoundingRect;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use tracing::info;

const COUNTY_FILL: RGBColor = RGBColor(0xdc, 0xe3, 0xea);
const COUNTY_EDGE: RGBColor = RGBColor(0xb8, 0xc2, 0xcc);
const STATE_EDGE: RGBColor = RGBColor(0x5a, 0x5f, 0x5a);
const LABEL_COLOR: RGBColor = RGBColor(0x4d, 0x52, 0x4d);

/// Fixed annotations naming the repositioned territories. Coordinates are in
/// projected meters and are coupled to the projection and the territory
/// layout constants; changing either invalidates these positions.
const MAP_LABELS: [(&str, (f64, f64)); 9] = [
    ("ALASKA", (-2_900_000.0, -900_000.0)),
    ("HAWAII", (-500_000.0, -1_700_000.0)),
    ("PUERTO RICO", (370_000.0, -1_600_000.0)),
    ("AMERICAN", (-3_500_000.0, -400_000.0)),
    ("SAMOA", (-3_500_000.0, -470_000.0)),
    ("GUAM", (-2_800_000.0, 0.0)),
    ("NORTHERN", (-3_200_000.0, 1_200_000.0)),
    ("MARIANA", (-3_200_000.0, 1_130_000.0)),
    ("ISLANDS", (-3_200_000.0, 1_060_000.0)),
];

type MapChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Renders the assembled basemap to the configured PNG: filled counties,
/// state outlines, then the territory labels.
pub fn render_basemap(config: &MapConfig, basemap: &UsBasemap) -> Result<()> {
    let root = BitMapBackend::new(&config.output, (config.width, config.height))
        .into_drawing_area();
    root.fill(&WHITE)?;

    let (min, max) = data_bounds(basemap)
        .ok_or_else(|| anyhow!("Basemap is empty, nothing to render"))?;
    let margin_x = (max.0 - min.0) * 0.02;
    let margin_y = (max.1 - min.1) * 0.02;

    let mut chart = ChartBuilder::on(&root).build_cartesian_2d(
        (min.0 - margin_x)..(max.0 + margin_x),
        (min.1 - margin_y)..(max.1 + margin_y),
    )?;

    for region in &basemap.counties {
        draw_region_fill(&mut chart, region)?;
    }
    for region in &basemap.states {
        draw_region_outline(&mut chart, region)?;
    }

    label_overlay(&mut chart)?;

    root.present()?;
    info!(output = ?config.output, "basemap rendered");

    Ok(())
}

/// Stamps the fixed territory labels onto the chart.
pub fn label_overlay(chart: &mut MapChart<'_, '_>) -> Result<()> {
    for (text, position) in MAP_LABELS {
        chart.draw_series(std::iter::once(Text::new(
            text,
            position,
            ("monospace", 12).into_font().color(&LABEL_COLOR),
        )))?;
    }
    Ok(())
}

fn draw_region_fill(chart: &mut MapChart<'_, '_>, region: &Region) -> Result<()> {
    for polygon in &region.geometry {
        let points: Vec<(f64, f64)> = polygon
            .exterior()
            .coords()
            .map(|c| (c.x, c.y))
            .collect();
        chart.draw_series(std::iter::once(Polygon::new(
            points.clone(),
            COUNTY_FILL.filled(),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            points,
            COUNTY_EDGE.stroke_width(1),
        )))?;
    }
    Ok(())
}

fn draw_region_outline(chart: &mut MapChart<'_, '_>, region: &Region) -> Result<()> {
    for polygon in &region.geometry {
        let points: Vec<(f64, f64)> = polygon
            .exterior()
            .coords()
            .map(|c| (c.x, c.y))
            .collect();
        chart.draw_series(std::iter::once(PathElement::new(
            points,
            STATE_EDGE.stroke_width(1),
        )))?;
    }
    Ok(())
}

fn data_bounds(basemap: &UsBasemap) -> Option<((f64, f64), (f64, f64))> {
    let mut bounds: Option<((f64, f64), (f64, f64))> = None;

    for region in basemap.counties.iter().chain(basemap.states.iter()) {
        let rect = match region.geometry.bounding_rect() {
            Some(rect) => rect,
            None => continue,
        };
        bounds = Some(match bounds {
            None => ((rect.min().x, rect.min().y), (rect.max().x, rect.max().y)),
            Some((min, max)) => (
                (min.0.min(rect.min().x), min.1.min(rect.min().y)),
                (max.0.max(rect.max().x), max.1.max(rect.max().y)),
            ),
        });
    }

    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, polygon};

    fn region(state_fp: &str, geoid: &str, origin: (f64, f64), size: f64) -> Region {
        let (x, y) = origin;
        Region {
            state_fp: state_fp.to_string(),
            geoid: geoid.to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]]),
        }
    }

    #[test]
    fn bounds_cover_both_collections() {
        let basemap = UsBasemap {
            counties: vec![region("06", "06001", (0.0, 0.0), 10.0)],
            states: vec![region("02", "02", (-50.0, 20.0), 5.0)],
        };
        let (min, max) = data_bounds(&basemap).unwrap();
        assert_eq!(min, (-50.0, 0.0));
        assert_eq!(max, (10.0, 25.0));
    }

    #[test]
    fn empty_basemap_has_no_bounds() {
        let basemap = UsBasemap {
            counties: vec![],
            states: vec![],
        };
        assert!(data_bounds(&basemap).is_none());
    }

    #[test]
    fn renders_a_nonempty_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("basemap.png");
        let config = MapConfig {
            projection: "esri:102003".to_string(),
            width: 320,
            height: 200,
            output: output.clone(),
        };
        let basemap = UsBasemap {
            counties: vec![
                region("06", "06001", (-4_000_000.0, -2_000_000.0), 1_000_000.0),
                region("36", "36001", (1_000_000.0, 500_000.0), 800_000.0),
            ],
            states: vec![region("06", "06", (-4_000_000.0, -2_000_000.0), 1_000_000.0)],
        };

        render_basemap(&config, &basemap).unwrap();

        let metadata = std::fs::metadata(&output).unwrap();
        assert!(metadata.len() > 0);
    }
}
