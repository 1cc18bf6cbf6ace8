use chrono::{Datelike, NaiveDate};

use crate::model::{Deal, FilterSelection};

/// One step of the quarter waterfall: realized and projected totals plus
/// the running total including every earlier step.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallBucket {
    pub label: String,
    pub signed: f64,
    pub forecasted: f64,
    pub running_total: f64,
}

/// A quarter's bookings built up from carry-over through its three months,
/// measured against the quarter target.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterWaterfall {
    /// Quarter label, e.g. "2026Q1".
    pub label: String,
    /// Deals closed or closing before the quarter started.
    pub carry_over: WaterfallBucket,
    /// The quarter's three months, in calendar order.
    pub months: Vec<WaterfallBucket>,
    pub target: f64,
    /// Final running total: carry-over plus all three months.
    pub total: f64,
    /// Percent of target reached; 0 when the target is 0.
    pub attainment: f64,
}

/// Build the waterfall for one quarter.
///
/// Each filtered deal lands in the month bucket of its close date, or in
/// the carry-over bucket when it closes before the quarter starts; deals
/// closing after the quarter, and deals with a missing or unparseable
/// close date, are excluded from every bucket. Within a bucket a deal
/// counts as signed when its close date is on or before `as_of`,
/// forecasted otherwise.
pub fn quarter_waterfall(
    deals: &[Deal],
    filter: &FilterSelection,
    year: i32,
    quarter: u32,
    as_of: NaiveDate,
    target: f64,
) -> QuarterWaterfall {
    let quarter = quarter.clamp(1, 4);
    let first_month = (quarter - 1) * 3 + 1;
    let start = NaiveDate::from_ymd_opt(year, first_month, 1)
        .expect("first day of a quarter is a valid date");
    let (next_year, next_month) = if first_month == 10 {
        (year + 1, 1)
    } else {
        (year, first_month + 3)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first day of the next quarter is a valid date");

    let mut carry = (0.0f64, 0.0f64);
    let mut months = [(0.0f64, 0.0f64); 3];

    for deal in deals.iter().filter(|d| filter.matches(d)) {
        let Some(day) = deal.close_day() else {
            // No close date means no month to bucket into.
            continue;
        };
        if day >= end {
            continue;
        }
        let slot = if day < start {
            &mut carry
        } else {
            &mut months[(day.month() - first_month) as usize]
        };
        if day <= as_of {
            slot.0 += deal.value;
        } else {
            slot.1 += deal.value;
        }
    }

    let mut running = 0.0;
    let mut build = |label: String, (signed, forecasted): (f64, f64)| {
        running += signed + forecasted;
        WaterfallBucket {
            label,
            signed,
            forecasted,
            running_total: running,
        }
    };

    let carry_over = build("Carry-over".to_string(), carry);
    let month_buckets: Vec<WaterfallBucket> = (0..3)
        .map(|i| {
            let label = NaiveDate::from_ymd_opt(year, first_month + i as u32, 1)
                .expect("month within a quarter is a valid date")
                .format("%b")
                .to_string();
            build(label, months[i])
        })
        .collect();

    let total = month_buckets
        .last()
        .map(|b| b.running_total)
        .unwrap_or(carry_over.running_total);
    let attainment = if target != 0.0 {
        total / target * 100.0
    } else {
        0.0
    };

    QuarterWaterfall {
        label: format!("{year}Q{quarter}"),
        carry_over,
        months: month_buckets,
        target,
        total,
        attainment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(close_date: &str, value: f64) -> Deal {
        Deal {
            close_date: close_date.to_string(),
            value,
            ..Deal::default()
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()
    }

    #[test]
    fn splits_a_month_into_signed_and_forecasted() {
        let deals = vec![deal("2026-02-01", 100.0), deal("2026-02-28", 100.0)];
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 1, as_of(), 500.0);

        assert_eq!(wf.label, "2026Q1");
        let feb = &wf.months[1];
        assert_eq!(feb.label, "Feb");
        assert_eq!(feb.signed, 100.0);
        assert_eq!(feb.forecasted, 100.0);
        assert_eq!(feb.running_total, 200.0);
        assert_eq!(wf.total, 200.0);
        assert_eq!(wf.attainment, 40.0);
    }

    #[test]
    fn undated_deals_are_excluded_everywhere() {
        let deals = vec![deal("", 100.0), deal("someday", 50.0), deal("2026-01-10", 25.0)];
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 1, as_of(), 0.0);

        assert_eq!(wf.carry_over.signed + wf.carry_over.forecasted, 0.0);
        assert_eq!(wf.months[0].signed, 25.0);
        assert_eq!(wf.total, 25.0);
    }

    #[test]
    fn prior_quarter_deals_land_in_carry_over() {
        let deals = vec![deal("2025-11-20", 300.0), deal("2026-01-05", 100.0)];
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 1, as_of(), 0.0);

        assert_eq!(wf.carry_over.signed, 300.0);
        assert_eq!(wf.carry_over.running_total, 300.0);
        assert_eq!(wf.months[0].running_total, 400.0);
        assert_eq!(wf.total, 400.0);
    }

    #[test]
    fn deals_after_the_quarter_are_excluded() {
        let deals = vec![deal("2026-04-01", 999.0), deal("2026-03-31", 10.0)];
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 1, as_of(), 0.0);

        assert_eq!(wf.total, 10.0);
        assert_eq!(wf.months[2].forecasted, 10.0);
    }

    #[test]
    fn empty_months_contribute_zero_not_gaps() {
        let deals = vec![deal("2026-01-10", 100.0)];
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 1, as_of(), 0.0);

        assert_eq!(wf.months.len(), 3);
        assert_eq!(wf.months[1].signed, 0.0);
        assert_eq!(wf.months[1].running_total, 100.0);
        assert_eq!(wf.months[2].running_total, 100.0);
    }

    #[test]
    fn fourth_quarter_rolls_into_the_next_year() {
        let deals = vec![deal("2026-12-15", 100.0), deal("2027-01-02", 999.0)];
        let as_of = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let wf = quarter_waterfall(&deals, &FilterSelection::default(), 2026, 4, as_of, 0.0);

        assert_eq!(wf.months[2].label, "Dec");
        assert_eq!(wf.total, 100.0);
    }

    #[test]
    fn filter_applies_before_bucketing() {
        let mut kept = deal("2026-02-01", 100.0);
        kept.segment = "A".to_string();
        let mut dropped = deal("2026-02-01", 50.0);
        dropped.segment = "B".to_string();

        let mut filter = FilterSelection::default();
        filter.segments.insert("A".to_string());

        let wf = quarter_waterfall(&[kept, dropped], &filter, 2026, 1, as_of(), 0.0);
        assert_eq!(wf.total, 100.0);
    }
}
