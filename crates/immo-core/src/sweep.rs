use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ImmoError;
use crate::ImmoResult;

/// Upper bound on points per axis; a typo in `step` should not start a
/// million-simulation sweep.
pub const MAX_AXIS_POINTS: i64 = 201;

/// One axis of a sensitivity grid, centred on its base value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub base: Decimal,
    /// Half-width of the swept interval
    pub range: Decimal,
    pub step: Decimal,
}

impl SweepAxis {
    pub fn new(base: Decimal, range: Decimal, step: Decimal) -> Self {
        SweepAxis { base, range, step }
    }

    /// Values `base + k * step` for k in -n..=n, n = floor(range / step).
    /// The base value is always present and always sits at index n.
    pub fn values(&self, name: &str) -> ImmoResult<Vec<Decimal>> {
        let n = self.half_width(name)?;
        Ok((-n..=n)
            .map(|k| {
                if k == 0 {
                    self.base
                } else {
                    self.base + Decimal::from(k) * self.step
                }
            })
            .collect())
    }

    /// Index of the base value within [`values`](Self::values).
    pub fn center_index(&self, name: &str) -> ImmoResult<usize> {
        Ok(self.half_width(name)? as usize)
    }

    fn half_width(&self, name: &str) -> ImmoResult<i64> {
        if self.step <= Decimal::ZERO {
            return Err(ImmoError::invalid(
                format!("sweep:{name}"),
                "Step must be positive",
            ));
        }
        if self.range < Decimal::ZERO {
            return Err(ImmoError::invalid(
                format!("sweep:{name}"),
                "Range must be non-negative",
            ));
        }
        let n = (self.range / self.step).floor();
        let n = n.to_i64().ok_or_else(|| {
            ImmoError::invalid(format!("sweep:{name}"), "Range/step ratio is too large")
        })?;
        if n > (MAX_AXIS_POINTS - 1) / 2 {
            return Err(ImmoError::invalid(
                format!("sweep:{name}"),
                format!("Axis would exceed {MAX_AXIS_POINTS} points"),
            ));
        }
        Ok(n)
    }
}
