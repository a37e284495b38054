use crate::domain::conversion::TimeDistribution;
use crate::forecast::ForecastError;
use crate::money::{BasisPoints, Opportunities};

const BUCKET_NAMES: [&str; 3] = ["same-quarter", "next-quarter", "two-quarter"];

/// Splits a cohort over its own quarter and the two following ones.
///
/// Each part is rounded independently, so the parts may not add back up to the
/// cohort exactly. The drift is kept rather than redistributed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeDistributionCurve {
    weights: [BasisPoints; 3],
}

impl TimeDistributionCurve {
    pub fn new(distribution: &TimeDistribution) -> Result<Self, ForecastError> {
        let weights = distribution.weights();
        for (bucket, weight) in BUCKET_NAMES.into_iter().zip(weights) {
            if weight.is_negative() {
                return Err(ForecastError::NegativeDistributionWeight { bucket, value: weight.0 });
            }
        }

        if !distribution.is_normalized() {
            tracing::debug!(
                event_name = "forecast.distribution.unnormalized",
                total_bp = distribution.total().0,
                "time distribution does not sum to 100%; applying weights as given"
            );
        }

        Ok(Self { weights })
    }

    pub fn weights(&self) -> [BasisPoints; 3] {
        self.weights
    }

    /// Parts of `cohort` indexed by quarter offset (0, 1, 2).
    pub fn split(&self, cohort: Opportunities) -> Result<[Opportunities; 3], ForecastError> {
        let [same, next, two] = self.weights;
        Ok([cohort.portion(same)?, cohort.portion(next)?, cohort.portion(two)?])
    }
}
