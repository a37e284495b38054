use std::collections::BTreeMap;

use crate::domain::dimension::Dimension;
use crate::domain::historical::HistoricalSqlRecord;
use crate::domain::period::Quarter;
use crate::forecast::ForecastError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuarterVolume {
    pub period: Quarter,
    pub volume: i64,
}

/// Chronological SQL volumes per dimension. Missing quarters stay missing.
pub type HistoricalSeries = BTreeMap<Dimension, Vec<QuarterVolume>>;

pub fn aggregate(records: &[HistoricalSqlRecord]) -> Result<HistoricalSeries, ForecastError> {
    let mut grouped: BTreeMap<Dimension, BTreeMap<Quarter, i64>> = BTreeMap::new();

    for record in records {
        let period = record.period().ok_or_else(|| ForecastError::InvalidQuarter {
            region: record.region.clone(),
            sql_type: record.sql_type.clone(),
            year: record.year,
            quarter: record.quarter,
        })?;

        if !(Quarter::MIN_YEAR..=Quarter::MAX_YEAR).contains(&record.year) {
            return Err(ForecastError::YearOutOfRange {
                region: record.region.clone(),
                sql_type: record.sql_type.clone(),
                year: record.year,
            });
        }

        if record.volume < 0 {
            return Err(ForecastError::NegativeVolume {
                region: record.region.clone(),
                sql_type: record.sql_type.clone(),
                year: record.year,
                quarter: record.quarter,
                volume: record.volume,
            });
        }

        let series = grouped.entry(record.dimension()).or_default();
        if series.insert(period, record.volume).is_some() {
            return Err(ForecastError::DuplicateHistoricalRecord {
                region: record.region.clone(),
                sql_type: record.sql_type.clone(),
                year: record.year,
                quarter: record.quarter,
            });
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(dimension, volumes)| {
            let series = volumes
                .into_iter()
                .map(|(period, volume)| QuarterVolume { period, volume })
                .collect();
            (dimension, series)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{aggregate, QuarterVolume};
    use crate::domain::dimension::Dimension;
    use crate::domain::historical::HistoricalSqlRecord;
    use crate::domain::period::Quarter;
    use crate::forecast::ForecastError;

    fn record(region: &str, sql_type: &str, year: i32, quarter: u8, volume: i64) -> HistoricalSqlRecord {
        HistoricalSqlRecord {
            region: region.to_string(),
            sql_type: sql_type.to_string(),
            year,
            quarter,
            volume,
        }
    }

    #[test]
    fn groups_by_dimension_in_chronological_order() {
        let series = aggregate(&[
            record("NORAM", "INBOUND", 2024, 3, 30),
            record("EMEA", "OUTBOUND", 2024, 1, 5),
            record("NORAM", "INBOUND", 2023, 4, 10),
            record("NORAM", "INBOUND", 2024, 1, 20),
        ])
        .expect("aggregate");

        assert_eq!(series.len(), 2);
        let noram = &series[&Dimension::new("NORAM", "INBOUND")];
        assert_eq!(
            noram,
            &vec![
                QuarterVolume { period: Quarter { year: 2023, quarter: 4 }, volume: 10 },
                QuarterVolume { period: Quarter { year: 2024, quarter: 1 }, volume: 20 },
                QuarterVolume { period: Quarter { year: 2024, quarter: 3 }, volume: 30 },
            ]
        );
    }

    #[test]
    fn gaps_are_not_zero_filled() {
        let series = aggregate(&[
            record("NORAM", "INBOUND", 2024, 1, 20),
            record("NORAM", "INBOUND", 2024, 4, 40),
        ])
        .expect("aggregate");

        assert_eq!(series[&Dimension::new("NORAM", "INBOUND")].len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_series() {
        assert!(aggregate(&[]).expect("aggregate").is_empty());
    }

    #[test]
    fn rejects_negative_volumes() {
        let error = aggregate(&[record("NORAM", "INBOUND", 2024, 1, -1)]).expect_err("must fail");
        assert!(matches!(error, ForecastError::NegativeVolume { volume: -1, .. }));
    }

    #[test]
    fn rejects_quarters_outside_range() {
        let error = aggregate(&[record("NORAM", "INBOUND", 2024, 5, 10)]).expect_err("must fail");
        assert!(matches!(error, ForecastError::InvalidQuarter { quarter: 5, .. }));
    }

    #[test]
    fn rejects_years_without_room_for_the_distribution_tail() {
        let error =
            aggregate(&[record("NORAM", "INBOUND", i32::MAX, 4, 10)]).expect_err("must fail");
        assert!(matches!(error, ForecastError::YearOutOfRange { year: i32::MAX, .. }));
        assert!(aggregate(&[record("NORAM", "INBOUND", 0, 1, 10)]).is_err());
        assert!(aggregate(&[record("NORAM", "INBOUND", 9_999, 4, 10)]).is_ok());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let error = aggregate(&[
            record("NORAM", "INBOUND", 2024, 1, 10),
            record("NORAM", "INBOUND", 2024, 1, 12),
        ])
        .expect_err("must fail");
        assert_eq!(error.code(), "duplicate_historical_record");
    }
}
