use crate::config::AppConfig;
use crate::types::Region;
use crate::{data, projection, transform};
use anyhow::Result;
use tracing::info;

/// County and state collections sharing one projected, adjusted
/// coordinate space.
pub struct UsBasemap {
    pub counties: Vec<Region>,
    pub states: Vec<Region>,
}

/// Loads both boundary collections, reprojects them to the configured
/// equal-area projection, and repositions the non-contiguous territories.
pub fn assemble(config: &AppConfig) -> Result<UsBasemap> {
    let projection = projection::named(&config.map.projection)?;

    let mut counties = data::load_regions(&config.input.counties, &config.input)?;
    let mut states = data::load_regions(&config.input.states, &config.input)?;

    projection::project_regions(&mut counties, &projection);
    projection::project_regions(&mut states, &projection);

    let counties = transform::adjust_layout(counties);
    let states = transform::adjust_layout(states);

    info!(
        counties = counties.len(),
        states = states.len(),
        "basemap assembled"
    );

    Ok(UsBasemap { counties, states })
}
