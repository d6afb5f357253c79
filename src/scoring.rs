use crate::config::{PairConfig, ScoringConfig};
use crate::data;
use anyhow::{Context, Result, anyhow};
use ndarray::{Array1, Array2};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// A trained binary classifier producing a continuous score per row.
pub trait Classifier {
    fn predict(&self, features: &Array2<f64>) -> Array1<f64>;
}

/// Logistic-regression coefficients stored as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {:?}", path))?;
        let model = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse model JSON: {:?}", path))?;
        Ok(model)
    }
}

impl Classifier for LinearModel {
    fn predict(&self, features: &Array2<f64>) -> Array1<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row
                    .iter()
                    .zip(self.weights.iter())
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + self.bias;
                1.0 / (1.0 + (-z).exp())
            })
            .collect()
    }
}

/// Thresholds continuous predictions: 1 if p >= threshold else 0.
pub fn binarize(predictions: &Array1<f64>, threshold: f64) -> Vec<u8> {
    predictions.iter().map(|&p| u8::from(p >= threshold)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut matrix = ConfusionMatrix {
            tn: 0,
            fp: 0,
            fn_: 0,
            tp: 0,
        };
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t, p) {
                (0, 0) => matrix.tn += 1,
                (0, _) => matrix.fp += 1,
                (_, 0) => matrix.fn_ += 1,
                _ => matrix.tp += 1,
            }
        }
        matrix
    }

    /// Rows are true labels (0 then 1), columns predicted labels.
    pub fn cells(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn max_count(&self) -> usize {
        self.tn.max(self.fp).max(self.fn_).max(self.tp)
    }
}

/// One labeled data set with its panel title.
pub struct ScoringPair {
    pub title: String,
    pub features: Array2<f64>,
    pub labels: Vec<u8>,
}

/// Loads a scoring pair from CSV: the configured label column becomes the
/// binary label vector, every other column a feature.
pub fn load_pair(pair: &PairConfig) -> Result<ScoringPair> {
    let table = data::load_table(&pair.data_csv)?;
    let label_idx = table.column_index(&pair.label_column)?;

    let n_rows = table.rows.len();
    let n_features = table.headers.len() - 1;

    let mut flat = Vec::with_capacity(n_rows * n_features);
    let mut labels = Vec::with_capacity(n_rows);
    for row in &table.rows {
        for (i, value) in row.iter().enumerate() {
            if i != label_idx {
                flat.push(*value);
            }
        }
        labels.push(u8::from(row[label_idx] != 0.0));
    }

    let features = Array2::from_shape_vec((n_rows, n_features), flat)
        .with_context(|| format!("Malformed feature matrix in {:?}", pair.data_csv))?;

    Ok(ScoringPair {
        title: pair.title.clone(),
        features,
        labels,
    })
}

fn validate_dimensions(model: &LinearModel, pairs: &[ScoringPair]) -> Result<()> {
    for pair in pairs {
        if pair.features.ncols() != model.weights.len() {
            return Err(anyhow!(
                "Model has {} weights but pair '{}' has {} features",
                model.weights.len(),
                pair.title,
                pair.features.ncols()
            ));
        }
    }
    Ok(())
}

/// Loads the model and every configured pair, then renders the scoring figure.
pub fn run_scoring(config: &ScoringConfig) -> Result<()> {
    if config.pairs.is_empty() {
        return Err(anyhow!("No scoring pairs configured"));
    }

    let model = LinearModel::load(&config.model)?;
    let pairs: Vec<ScoringPair> = config
        .pairs
        .iter()
        .map(load_pair)
        .collect::<Result<Vec<_>>>()?;
    validate_dimensions(&model, &pairs)?;

    render_scoring(&model, &pairs, config.threshold, &config.output)
}

/// Renders one confusion-matrix panel per pair in a single row.
pub fn render_scoring(
    model: &dyn Classifier,
    pairs: &[ScoringPair],
    threshold: f64,
    output: &Path,
) -> Result<()> {
    let width = 360 * pairs.len() as u32;
    let root = BitMapBackend::new(output, (width, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((1, pairs.len()));
    for (panel, pair) in panels.iter().zip(pairs.iter()) {
        let predictions = model.predict(&pair.features);
        let predicted = binarize(&predictions, threshold);
        let matrix = ConfusionMatrix::from_labels(&pair.labels, &predicted);
        draw_matrix_panel(panel, &matrix, &pair.title)?;
    }

    root.present()?;
    info!(output = ?output, panels = pairs.len(), "scoring figure rendered");

    Ok(())
}

fn draw_matrix_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    matrix: &ConfusionMatrix,
    title: &str,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(12)
        .build_cartesian_2d(-0.4f64..2.0f64, -0.4f64..2.0f64)?;

    let cells = matrix.cells();
    let max = matrix.max_count().max(1);

    for (t, row) in cells.iter().enumerate() {
        for (p, &count) in row.iter().enumerate() {
            let shade = count as f64 / max as f64;
            let gray = (255.0 * (1.0 - shade)) as u8;
            // True label 0 on the top row.
            let y0 = 1.0 - t as f64;
            let x0 = p as f64;

            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                RGBColor(gray, gray, gray).filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                BLACK.stroke_width(1),
            )))?;

            let text_color = if shade > 0.5 { WHITE } else { BLACK };
            chart.draw_series(std::iter::once(Text::new(
                count.to_string(),
                (x0 + 0.45, y0 + 0.45),
                ("sans-serif", 18).into_font().color(&text_color),
            )))?;
        }
    }

    // Tick labels along the bottom (predicted) and left (true) edges.
    for (value, x) in [("0", 0.45), ("1", 1.45)] {
        chart.draw_series(std::iter::once(Text::new(
            value,
            (x, -0.25),
            ("sans-serif", 15).into_font().color(&BLACK),
        )))?;
    }
    for (value, y) in [("0", 1.45), ("1", 0.45)] {
        chart.draw_series(std::iter::once(Text::new(
            value,
            (-0.25, y),
            ("sans-serif", 15).into_font().color(&BLACK),
        )))?;
    }

    Ok(())
}
