use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use immo_core::metrics::{run_sensitivity_sweep, SweepConfig, SweepInput, SweepOutput};
use immo_core::parameters::{LeaseType, RawParameters};

use crate::input;

/// Arguments for the IRR/NPV sensitivity sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Path to a JSON or YAML parameters file (stdin if omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Lease type: airbnb, furnished_1yr, unfurnished_3yr
    #[arg(long, default_value = "furnished_1yr")]
    pub lease_type: LeaseType,

    /// Half-width of the property growth axis
    #[arg(long, default_value = "0.01")]
    pub growth_range: Decimal,

    /// Property growth step
    #[arg(long, default_value = "0.005")]
    pub growth_step: Decimal,

    /// Half-width of the financing rate axis
    #[arg(long, default_value = "0.01")]
    pub rate_range: Decimal,

    /// Financing rate step
    #[arg(long, default_value = "0.005")]
    pub rate_step: Decimal,

    /// Evaluate grid cells in parallel
    #[arg(long)]
    pub parallel: bool,
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let parameters: RawParameters = input::read_document(args.input.as_deref(), "sweep")?;
    let output = run_sensitivity_sweep(&SweepInput {
        parameters,
        lease_type: args.lease_type,
        config: SweepConfig {
            growth_range: args.growth_range,
            growth_step: args.growth_step,
            rate_range: args.rate_range,
            rate_step: args.rate_step,
            parallel: args.parallel,
        },
    })?;

    let grid = &output.result;
    let result = json!({
        "base_case_irr": grid.base_case_irr,
        "base_case_npv": grid.base_case_npv,
        "base_case_position": grid.base_case_position,
        "failed_cells": grid.failed_cells,
        "irr_grid": grid_rows(grid, |c| c.irr),
        "npv_grid": grid_rows(grid, |c| c.npv.map(|v| v.round_dp(2))),
        "errors": grid
            .cells
            .iter()
            .flatten()
            .filter_map(|c| c.error.as_ref().map(|e| json!({
                "property_growth": c.property_growth,
                "financing_rate": c.financing_rate,
                "error": e,
            })))
            .collect::<Vec<_>>(),
    });

    let mut envelope = serde_json::to_value(&output)?;
    envelope["result"] = result;
    Ok(envelope)
}

/// One object per growth value, one column per financing rate.
fn grid_rows<F>(grid: &SweepOutput, metric: F) -> Vec<Value>
where
    F: Fn(&immo_core::metrics::SweepCell) -> Option<Decimal>,
{
    grid.cells
        .iter()
        .zip(&grid.property_growth_values)
        .map(|(row, growth)| {
            let mut obj = serde_json::Map::new();
            obj.insert("property_growth".into(), Value::String(growth.to_string()));
            for (cell, rate) in row.iter().zip(&grid.financing_rate_values) {
                let value = metric(cell).map_or(Value::Null, |v| Value::String(v.to_string()));
                obj.insert(format!("rate_{rate}"), value);
            }
            Value::Object(obj)
        })
        .collect()
}
