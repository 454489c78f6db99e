use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::metrics::returns::compute_metrics;
use crate::model::simulate;
use crate::parameters::{LeaseType, RawParameters};
use crate::sweep::SweepAxis;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ImmoResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Half-widths and steps of the growth x financing-rate grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub growth_range: Rate,
    pub growth_step: Rate,
    pub rate_range: Rate,
    pub rate_step: Rate,
    /// Evaluate cells on the rayon pool when the `parallel` feature is on
    pub parallel: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            growth_range: dec!(0.01),
            growth_step: dec!(0.005),
            rate_range: dec!(0.01),
            rate_step: dec!(0.005),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    pub parameters: RawParameters,
    pub lease_type: LeaseType,
    #[serde(default)]
    pub config: SweepConfig,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Result of one full re-simulation. A failed cell keeps its coordinates and
/// error message with every metric left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepCell {
    pub property_growth: Rate,
    pub financing_rate: Rate,
    pub irr: Option<Rate>,
    pub npv: Option<Money>,
    pub equity_multiple: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    /// Row axis
    pub property_growth_values: Vec<Rate>,
    /// Column axis
    pub financing_rate_values: Vec<Rate>,
    /// cells[i][j] at property_growth_values[i], financing_rate_values[j]
    pub cells: Vec<Vec<SweepCell>>,
    /// (row, col) of the unperturbed parameters
    pub base_case_position: (usize, usize),
    pub base_case_irr: Option<Rate>,
    pub base_case_npv: Option<Money>,
    pub failed_cells: usize,
}

impl SweepOutput {
    /// IRR matrix with `None` for failed or undefined cells.
    pub fn irr_matrix(&self) -> Vec<Vec<Option<Rate>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.irr).collect())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// IRR/NPV over a property-growth x financing-rate grid.
///
/// May be slow: every cell is a complete, independent simulation on its own
/// copy of the parameters, so the cost is (rows x columns) full runs. Cell
/// failures are recorded and the rest of the grid still runs.
pub fn run_sensitivity_sweep(input: &SweepInput) -> ImmoResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();
    let base = &input.parameters;
    let config = &input.config;

    let growth_axis = SweepAxis::new(base.property_value_growth_rate, config.growth_range, config.growth_step);
    let rate_axis = SweepAxis::new(base.loan_interest_rate, config.rate_range, config.rate_step);

    let property_growth_values = growth_axis.values("property_growth")?;
    let financing_rate_values = rate_axis.values("financing_rate")?;
    let base_case_position = (
        growth_axis.center_index("property_growth")?,
        rate_axis.center_index("financing_rate")?,
    );

    let coordinates: Vec<(Rate, Rate)> = property_growth_values
        .iter()
        .flat_map(|g| financing_rate_values.iter().map(move |r| (*g, *r)))
        .collect();
    debug!(cells = coordinates.len(), parallel = config.parallel, "starting sensitivity sweep");

    let evaluated = maybe_parallel_map(&coordinates, config.parallel, |(growth, rate)| {
        evaluate_cell(base, input.lease_type, *growth, *rate)
    });

    let mut failed_cells = 0;
    for cell in &evaluated {
        if let Some(err) = &cell.error {
            failed_cells += 1;
            let msg = format!(
                "Sweep cell failed at (growth {}, rate {}): {err}",
                cell.property_growth, cell.financing_rate
            );
            warn!("{msg}");
            warnings.push(msg);
        }
    }

    let n_cols = financing_rate_values.len();
    let cells: Vec<Vec<SweepCell>> = evaluated.chunks(n_cols).map(|row| row.to_vec()).collect();

    let center = &cells[base_case_position.0][base_case_position.1];
    let base_case_irr = center.irr;
    let base_case_npv = center.npv;

    let output = SweepOutput {
        property_growth_values,
        financing_rate_values,
        cells,
        base_case_position,
        base_case_irr,
        base_case_npv,
        failed_cells,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "IRR/NPV sensitivity sweep (property growth x financing rate), full re-simulation per cell",
        &serde_json::json!({
            "lease_type": input.lease_type,
            "growth_range": config.growth_range.to_string(),
            "growth_step": config.growth_step.to_string(),
            "rate_range": config.rate_range.to_string(),
            "rate_step": config.rate_step.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn evaluate_cell(base: &RawParameters, lease: LeaseType, growth: Rate, rate: Rate) -> SweepCell {
    let mut raw = base.clone();
    raw.property_value_growth_rate = growth;
    raw.loan_interest_rate = rate;

    let outcome = simulate(&raw, lease).and_then(|(sim, _)| compute_metrics(&raw, &sim));
    match outcome {
        Ok((metrics, _)) => SweepCell {
            property_growth: growth,
            financing_rate: rate,
            irr: metrics.irr,
            npv: Some(metrics.npv),
            equity_multiple: Some(metrics.equity_multiple),
            error: None,
        },
        Err(e) => SweepCell {
            property_growth: growth,
            financing_rate: rate,
            irr: None,
            npv: None,
            equity_multiple: None,
            error: Some(e.to_string()),
        },
    }
}

/// Map preserving input order, on the rayon pool when requested and available.
fn maybe_parallel_map<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if parallel && items.len() > 1 {
            return items.par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    items.iter().map(f).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::analyze_investment;
    use crate::model::SimulationInput;
    use crate::parameters::RentalAssumption;
    use rust_decimal::Decimal;

    fn sample_input() -> SweepInput {
        let mut parameters = RawParameters {
            property_price: dec!(180000),
            property_size_sqm: dec!(45),
            loan_percentage: dec!(0.8),
            furnishing_costs: dec!(6000),
            property_tax_yearly: dec!(900),
            condo_fees_monthly: dec!(80),
            holding_period_years: 8,
            ..Default::default()
        };
        parameters.rental_assumptions.insert(
            "furnished_1yr".into(),
            RentalAssumption {
                monthly_rent_sqm: dec!(24),
                vacancy_rate: dec!(0.06),
                rent_growth_rate: dec!(0.015),
                ..Default::default()
            },
        );
        SweepInput {
            parameters,
            lease_type: LeaseType::Furnished,
            config: SweepConfig::default(),
        }
    }

    #[test]
    fn test_default_grid_shape() {
        let out = run_sensitivity_sweep(&sample_input()).unwrap().result;
        assert_eq!(out.property_growth_values.len(), 5);
        assert_eq!(out.financing_rate_values.len(), 5);
        assert_eq!(out.cells.len(), 5);
        assert!(out.cells.iter().all(|row| row.len() == 5));
        assert_eq!(out.base_case_position, (2, 2));
        assert_eq!(out.failed_cells, 0);
    }

    #[test]
    fn test_grid_order() {
        let out = run_sensitivity_sweep(&sample_input()).unwrap().result;
        for (i, row) in out.cells.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                assert_eq!(cell.property_growth, out.property_growth_values[i]);
                assert_eq!(cell.financing_rate, out.financing_rate_values[j]);
            }
        }
    }

    #[test]
    fn test_center_matches_single_run() {
        let input = sample_input();
        let out = run_sensitivity_sweep(&input).unwrap().result;
        let single = analyze_investment(&SimulationInput {
            parameters: input.parameters.clone(),
            lease_type: input.lease_type,
        })
        .unwrap();
        assert_eq!(out.base_case_irr, single.result.metrics.irr);
        assert_eq!(out.base_case_npv, Some(single.result.metrics.npv));
    }

    #[test]
    fn test_higher_growth_raises_npv() {
        let out = run_sensitivity_sweep(&sample_input()).unwrap().result;
        let low = out.cells[0][2].npv.unwrap();
        let high = out.cells[4][2].npv.unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_failed_cells_are_recorded() {
        // Rates below zero are rejected by validation
        let mut input = sample_input();
        input.parameters.loan_interest_rate = dec!(0.005);
        input.config.rate_range = dec!(0.01);
        input.config.rate_step = dec!(0.005);
        let out = run_sensitivity_sweep(&input).unwrap();
        let grid = &out.result;
        assert_eq!(grid.failed_cells, 5);
        assert!(grid.cells.iter().all(|row| row[0].error.is_some() && row[0].irr.is_none()));
        assert!(grid.cells.iter().all(|row| row[2].error.is_none()));
        assert_eq!(out.warnings.len(), 5);
    }

    #[test]
    fn test_out_of_range_cells_do_not_abort_the_grid() {
        // Exit value leaves the Decimal range for every growth on the axis
        let mut input = sample_input();
        input.parameters.holding_period_years = 24;
        input.parameters.property_value_growth_rate = dec!(9);
        let out = run_sensitivity_sweep(&input).unwrap();
        let grid = &out.result;
        assert_eq!(grid.failed_cells, 25);
        assert!(grid.cells.iter().flatten().all(|c| c.error.is_some() && c.npv.is_none()));
        assert_eq!(grid.base_case_irr, None);
        assert_eq!(out.warnings.len(), 25);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_preserves_order() {
        let mut input = sample_input();
        let sequential = run_sensitivity_sweep(&input).unwrap().result;
        input.config.parallel = true;
        let parallel = run_sensitivity_sweep(&input).unwrap().result;
        assert_eq!(sequential.cells, parallel.cells);
    }

    #[test]
    fn test_invalid_step_rejected() {
        let mut input = sample_input();
        input.config.growth_step = Decimal::ZERO;
        assert!(run_sensitivity_sweep(&input).is_err());
    }
}
