use crate::colormap;
use crate::config::HeatmapConfig;
use crate::types::Table;
use anyhow::{Result, anyhow};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use plotters::backend::DrawingBackend;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::element::BitMapElement;
use plotters::prelude::*;
use tracing::{info, warn};

const BAND_COLOR: RGBColor = RGBColor(255, 165, 0);

/// Count levels for the default-subset contour bands, grouped in threes:
/// [4,12), [12,20), [20,28]. Counts outside stay unfilled.
const BAND_EDGES: [f64; 4] = [4.0, 12.0, 20.0, 28.0];

/// 2-D histogram with the value ranges it was binned over.
#[derive(Debug, Clone)]
pub struct Histogram2d {
    /// counts[[i, j]] = rows with x in bin i and y in bin j.
    pub counts: Array2<f64>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

/// Bins two equal-length columns over their full value range. The right edge
/// of the last bin is inclusive; a zero-span axis expands to value±0.5 so a
/// constant column lands in a single bin. Non-finite pairs are skipped.
pub fn histogram2d(xs: &[f64], ys: &[f64], bins: usize) -> Histogram2d {
    let x_range = value_range(xs);
    let y_range = value_range(ys);

    let mut counts = Array2::zeros((bins, bins));
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let i = bin_index(x, x_range, bins);
        let j = bin_index(y, y_range, bins);
        counts[[i, j]] += 1.0;
    }

    Histogram2d {
        counts,
        x_range,
        y_range,
    }
}

fn value_range(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        return (0.0, 1.0);
    }
    if lo == hi {
        return (lo - 0.5, hi + 0.5);
    }
    (lo, hi)
}

fn bin_index(value: f64, (lo, hi): (f64, f64), bins: usize) -> usize {
    let t = (value - lo) / (hi - lo);
    ((t * bins as f64) as usize).min(bins - 1)
}

/// Separable Gaussian smoothing with reflected boundaries; kernel truncated
/// at four standard deviations. Total mass is preserved.
pub fn gaussian_filter(grid: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let kernel = gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return grid.clone();
    }
    let pass = convolve_rows(grid, &kernel);
    let pass = convolve_rows(&pass.t().to_owned(), &kernel);
    pass.t().to_owned()
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (4.0 * sigma + 0.5) as i64;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-(i as f64).powi(2) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

fn reflect(index: i64, len: i64) -> usize {
    let mut i = index;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}

fn convolve_rows(grid: &Array2<f64>, kernel: &[f64]) -> Array2<f64> {
    let (rows, cols) = grid.dim();
    let radius = (kernel.len() / 2) as i64;

    let mut out = Array2::zeros((rows, cols));
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(r, mut out_row)| {
            for c in 0..cols {
                let mut acc = 0.0;
                for (k, &w) in kernel.iter().enumerate() {
                    let source = reflect(c as i64 + k as i64 - radius, cols as i64);
                    acc += grid[[r, source]] * w;
                }
                out_row[c] = acc;
            }
        });
    out
}

/// Opacity schedule for the contour bands: 1 / (1 + e^-(7a - 4)).
pub fn logistic_opacity(a: f64) -> f64 {
    1.0 / (1.0 + (-(7.0 * a - 4.0)).exp())
}

/// Band opacity for a coarse-histogram count, `None` when unfilled.
fn band_alpha(count: f64) -> Option<f64> {
    if count < BAND_EDGES[0] || count > BAND_EDGES[3] {
        return None;
    }
    let band = BAND_EDGES[1..]
        .iter()
        .position(|&edge| count < edge)
        .unwrap_or(2);
    Some(logistic_opacity((2 * (band + 1)) as f64 / 7.0))
}

type HeatmapChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Renders the smoothed density of two columns with the defaulted-loan
/// subset overlaid as orange contour bands.
pub fn render_heatmap(config: &HeatmapConfig, table: &Table) -> Result<()> {
    let xs = table.column(&config.x_column)?;
    let ys = table.column(&config.y_column)?;
    let labels = table.column(&config.label_column)?;
    if xs.is_empty() {
        return Err(anyhow!("Heatmap dataset is empty"));
    }

    let fine = histogram2d(&xs, &ys, config.fine_bins);
    let smoothed = gaussian_filter(&fine.counts, config.sigma);

    let (default_xs, default_ys): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys.iter())
        .zip(labels.iter())
        .filter(|(_, &label)| label == config.default_value)
        .map(|((&x, &y), _)| (x, y))
        .unzip();

    let coarse = if default_xs.is_empty() {
        warn!(
            label = config.default_value,
            "no rows match the default label, skipping overlay"
        );
        None
    } else {
        Some(histogram2d(&default_xs, &default_ys, config.coarse_bins))
    };

    let root =
        BitMapBackend::new(&config.output, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .x_label_area_size(46)
        .y_label_area_size(68)
        .build_cartesian_2d(
            config.x_limits[0]..config.x_limits[1],
            config.y_limits[0]..config.y_limits[1],
        )?;

    draw_density_raster(&mut chart, &smoothed, &fine, config)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(&config.x_label)
        .y_desc(&config.y_label)
        .draw()?;

    if let Some(coarse) = coarse {
        draw_default_bands(&mut chart, &coarse, config)?;
    }

    root.present()?;
    info!(output = ?config.output, "heatmap rendered");

    Ok(())
}

/// Paints the plot window pixel by pixel, sampling the smoothed grid and
/// quantizing to `levels` bands of the Blues ramp.
fn draw_density_raster(
    chart: &mut HeatmapChart<'_, '_>,
    smoothed: &Array2<f64>,
    fine: &Histogram2d,
    config: &HeatmapConfig,
) -> Result<()> {
    let (pw, ph) = chart.plotting_area().dim_in_pixel();
    let levels = config.levels;
    let (x0, x1) = (config.x_limits[0], config.x_limits[1]);
    let (y0, y1) = (config.y_limits[0], config.y_limits[1]);

    let vmax = smoothed.iter().cloned().fold(f64::MIN, f64::max).max(f64::MIN_POSITIVE);
    let bins = smoothed.dim().0;

    let mut element = BitMapElement::new((x0, y1), (pw, ph));
    {
        let mut backend = element.as_bitmap_backend();
        for py in 0..ph {
            let y = y1 - (py as f64 + 0.5) * (y1 - y0) / ph as f64;
            for px in 0..pw {
                let x = x0 + (px as f64 + 0.5) * (x1 - x0) / pw as f64;
                let color = sample_color(smoothed, fine, bins, vmax, levels, x, y);
                backend.draw_pixel((px as i32, py as i32), color.to_backend_color())?;
            }
        }
    }
    chart.draw_series(std::iter::once(element))?;

    Ok(())
}

fn sample_color(
    smoothed: &Array2<f64>,
    fine: &Histogram2d,
    bins: usize,
    vmax: f64,
    levels: usize,
    x: f64,
    y: f64,
) -> RGBColor {
    let (xlo, xhi) = fine.x_range;
    let (ylo, yhi) = fine.y_range;
    if x < xlo || x > xhi || y < ylo || y > yhi {
        return WHITE;
    }
    let i = bin_index(x, fine.x_range, bins);
    let j = bin_index(y, fine.y_range, bins);
    let t = (smoothed[[i, j]] / vmax).clamp(0.0, 1.0);
    let level = ((t * levels as f64) as usize).min(levels - 1);
    colormap::blues((level as f64 + 0.5) / levels as f64)
}

fn draw_default_bands(
    chart: &mut HeatmapChart<'_, '_>,
    coarse: &Histogram2d,
    config: &HeatmapConfig,
) -> Result<()> {
    let bins = coarse.counts.dim().0;
    let (xlo, xhi) = coarse.x_range;
    let (ylo, yhi) = coarse.y_range;
    let cell_w = (xhi - xlo) / bins as f64;
    let cell_h = (yhi - ylo) / bins as f64;

    for i in 0..bins {
        for j in 0..bins {
            let alpha = match band_alpha(coarse.counts[[i, j]]) {
                Some(alpha) => alpha,
                None => continue,
            };

            // Clip the cell to the fixed axis window.
            let x0 = (xlo + i as f64 * cell_w).max(config.x_limits[0]);
            let x1 = (xlo + (i + 1) as f64 * cell_w).min(config.x_limits[1]);
            let y0 = (ylo + j as f64 * cell_h).max(config.y_limits[0]);
            let y1 = (ylo + (j + 1) as f64 * cell_h).min(config.y_limits[1]);
            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x1, y1)],
                BAND_COLOR.mix(alpha).filled(),
            )))?;
        }
    }

    Ok(())
}
