use geo::MultiPolygon;

/// One boundary record from the census cartographic files.
#[derive(Debug, Clone)]
pub struct Region {
    /// Two-digit state/territory FIPS code (e.g. "02" = Alaska).
    pub state_fp: String,
    /// Unique record identifier (GEOID).
    pub geoid: String,
    pub geometry: MultiPolygon<f64>,
}

/// Numeric table loaded from a CSV file, rows in file order.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> anyhow::Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' not found in table", name))
    }

    pub fn column(&self, name: &str) -> anyhow::Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }
}
