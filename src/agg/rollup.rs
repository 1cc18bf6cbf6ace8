use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{Deal, FilterSelection, KpiEntry};

/// Calendar month labels in dashboard order, matching the sheets' own
/// month column.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One group-by partition: summed value, occurrence count, and the
/// partition's share of the filtered grand total (percent, 0 when the
/// grand total is 0).
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub total: f64,
    pub count: usize,
    pub share: f64,
}

/// Running totals per fixed period, split by realization status.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativePoint {
    pub period: String,
    pub signed: f64,
    pub forecasted: f64,
}

/// One KPI row measured against its target.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiAttainment {
    pub label: String,
    pub value: f64,
    pub target: f64,
    /// Percent of target reached; 0 when the target is 0.
    pub attainment: f64,
    pub on_track: bool,
}

/// Partition the filtered deals by a derived key and sum their values.
///
/// Runs in one grouping pass; bucket order is first-seen input order, and
/// no order beyond that is guaranteed until a consumer sorts (see
/// [`top_n`]).
pub fn totals_by<K>(deals: &[Deal], filter: &FilterSelection, key_fn: K) -> Vec<Bucket>
where
    K: Fn(&Deal) -> String,
{
    accumulate(deals, filter, key_fn, |d| d.value)
}

pub fn monthly_totals(deals: &[Deal], filter: &FilterSelection) -> Vec<Bucket> {
    totals_by(deals, filter, |d| d.month.clone())
}

pub fn segment_totals(deals: &[Deal], filter: &FilterSelection) -> Vec<Bucket> {
    totals_by(deals, filter, |d| d.segment.clone())
}

pub fn owner_totals(deals: &[Deal], filter: &FilterSelection) -> Vec<Bucket> {
    totals_by(deals, filter, |d| d.owner.clone())
}

pub fn client_totals(deals: &[Deal], filter: &FilterSelection) -> Vec<Bucket> {
    totals_by(deals, filter, |d| d.client.clone())
}

/// Monthly totals weighted by each deal's win confidence, for the
/// expected-value overlay.
pub fn weighted_monthly_forecast(deals: &[Deal], filter: &FilterSelection) -> Vec<Bucket> {
    accumulate(
        deals,
        filter,
        |d| d.month.clone(),
        |d| d.value * d.confidence / 100.0,
    )
}

/// Sort partitions descending by total and keep the first `n`. The sort is
/// stable, so partitions with equal totals keep their first-seen order.
pub fn top_n(mut buckets: Vec<Bucket>, n: usize) -> Vec<Bucket> {
    buckets.sort_by(|a, b| b.total.total_cmp(&a.total));
    buckets.truncate(n);
    buckets
}

/// Running signed/forecasted totals over a fixed ordered period list.
///
/// A deal is signed once its close date is on or before `as_of`; undated
/// deals count as forecasted. Periods with no matching deals carry the
/// running totals forward rather than leaving a gap; deals whose month is
/// not in `periods` are ignored.
pub fn cumulative_by_period(
    deals: &[Deal],
    filter: &FilterSelection,
    periods: &[&str],
    as_of: NaiveDate,
) -> Vec<CumulativePoint> {
    let index: HashMap<&str, usize> = periods.iter().enumerate().map(|(i, p)| (*p, i)).collect();
    let mut signed = vec![0.0; periods.len()];
    let mut forecasted = vec![0.0; periods.len()];

    for deal in deals.iter().filter(|d| filter.matches(d)) {
        let Some(&slot) = index.get(deal.month.as_str()) else {
            continue;
        };
        match deal.close_day() {
            Some(day) if day <= as_of => signed[slot] += deal.value,
            _ => forecasted[slot] += deal.value,
        }
    }

    let mut signed_running = 0.0;
    let mut forecasted_running = 0.0;
    periods
        .iter()
        .enumerate()
        .map(|(i, period)| {
            signed_running += signed[i];
            forecasted_running += forecasted[i];
            CumulativePoint {
                period: period.to_string(),
                signed: signed_running,
                forecasted: forecasted_running,
            }
        })
        .collect()
}

/// Measure each KPI against its target, honoring the metric's direction.
pub fn kpi_attainment(kpis: &[KpiEntry]) -> Vec<KpiAttainment> {
    kpis.iter()
        .map(|kpi| {
            let attainment = if kpi.target != 0.0 {
                kpi.value / kpi.target * 100.0
            } else {
                0.0
            };
            let on_track = if kpi.higher_is_better {
                kpi.value >= kpi.target
            } else {
                kpi.value <= kpi.target
            };
            KpiAttainment {
                label: kpi.label.clone(),
                value: kpi.value,
                target: kpi.target,
                attainment,
                on_track,
            }
        })
        .collect()
}

fn accumulate<K, V>(deals: &[Deal], filter: &FilterSelection, key_fn: K, value_fn: V) -> Vec<Bucket>
where
    K: Fn(&Deal) -> String,
    V: Fn(&Deal) -> f64,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut grand_total = 0.0;

    for deal in deals.iter().filter(|d| filter.matches(d)) {
        let key = key_fn(deal);
        let value = value_fn(deal);
        let slot = match index.get(&key) {
            Some(&i) => i,
            None => {
                buckets.push(Bucket {
                    key: key.clone(),
                    total: 0.0,
                    count: 0,
                    share: 0.0,
                });
                index.insert(key, buckets.len() - 1);
                buckets.len() - 1
            }
        };
        buckets[slot].total += value;
        buckets[slot].count += 1;
        grand_total += value;
    }

    if grand_total != 0.0 {
        for bucket in &mut buckets {
            bucket.share = bucket.total / grand_total * 100.0;
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(segment: &str, value: f64) -> Deal {
        Deal {
            segment: segment.to_string(),
            value,
            ..Deal::default()
        }
    }

    fn month_deal(month: &str, close_date: &str, value: f64) -> Deal {
        Deal {
            month: month.to_string(),
            close_date: close_date.to_string(),
            value,
            ..Deal::default()
        }
    }

    #[test]
    fn groups_by_segment_with_shares() {
        let deals = vec![
            deal("A", 10.0),
            deal("A", 20.0),
            deal("A", 30.0),
            deal("B", 5.0),
            deal("B", 5.0),
        ];
        let buckets = segment_totals(&deals, &FilterSelection::default());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "A");
        assert_eq!(buckets[0].total, 60.0);
        assert_eq!(buckets[0].count, 3);
        assert!((buckets[0].share - 600.0 / 7.0).abs() < 1e-9);
        assert_eq!(buckets[1].key, "B");
        assert_eq!(buckets[1].total, 10.0);
    }

    #[test]
    fn filtered_out_segments_are_absent_not_zero() {
        let deals = vec![deal("A", 60.0), deal("B", 10.0)];
        let mut filter = FilterSelection::default();
        filter.segments.insert("A".to_string());

        let buckets = segment_totals(&deals, &filter);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, "A");
        assert_eq!(buckets[0].total, 60.0);
        assert_eq!(buckets[0].share, 100.0);
    }

    #[test]
    fn bucket_order_is_first_seen() {
        let deals = vec![deal("B", 1.0), deal("A", 2.0), deal("B", 3.0)];
        let buckets = segment_totals(&deals, &FilterSelection::default());
        assert_eq!(buckets[0].key, "B");
        assert_eq!(buckets[1].key, "A");
    }

    #[test]
    fn bucket_totals_conserve_the_input_sum() {
        let deals = vec![deal("A", 10.0), deal("B", 20.0), deal("A", 30.0)];
        let buckets = segment_totals(&deals, &FilterSelection::default());
        let bucket_sum: f64 = buckets.iter().map(|b| b.total).sum();
        let input_sum: f64 = deals.iter().map(|d| d.value).sum();
        assert_eq!(bucket_sum, input_sum);
    }

    #[test]
    fn top_n_breaks_ties_by_input_order() {
        let deals = vec![
            deal("first", 10.0),
            deal("second", 10.0),
            deal("third", 10.0),
            deal("small", 1.0),
        ];
        let top = top_n(segment_totals(&deals, &FilterSelection::default()), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "first");
        assert_eq!(top[1].key, "second");
    }

    #[test]
    fn top_n_sorts_descending() {
        let deals = vec![deal("small", 1.0), deal("big", 100.0), deal("mid", 10.0)];
        let top = top_n(segment_totals(&deals, &FilterSelection::default()), 3);
        assert_eq!(top[0].key, "big");
        assert_eq!(top[2].key, "small");
    }

    #[test]
    fn weighted_forecast_scales_by_confidence() {
        let mut sure = month_deal("Jan", "", 1000.0);
        sure.confidence = 100.0;
        let mut maybe = month_deal("Jan", "", 1000.0);
        maybe.confidence = 25.0;

        let buckets = weighted_monthly_forecast(&[sure, maybe], &FilterSelection::default());
        assert_eq!(buckets[0].total, 1250.0);
    }

    #[test]
    fn cumulative_fills_empty_periods_with_running_totals() {
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        let deals = vec![
            month_deal("Jan", "2026-01-20", 100.0),
            month_deal("Mar", "2026-03-10", 50.0),
        ];
        let points =
            cumulative_by_period(&deals, &FilterSelection::default(), &["Jan", "Feb", "Mar"], as_of);

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].signed, 100.0);
        assert_eq!(points[0].forecasted, 0.0);
        // February has no deals but carries January forward.
        assert_eq!(points[1].signed, 100.0);
        assert_eq!(points[1].forecasted, 0.0);
        assert_eq!(points[2].signed, 100.0);
        assert_eq!(points[2].forecasted, 50.0);
    }

    #[test]
    fn cumulative_counts_undated_deals_as_forecasted() {
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        let deals = vec![month_deal("Jan", "", 40.0)];
        let points = cumulative_by_period(&deals, &FilterSelection::default(), &["Jan"], as_of);
        assert_eq!(points[0].signed, 0.0);
        assert_eq!(points[0].forecasted, 40.0);
    }

    #[test]
    fn cumulative_over_the_full_year_has_a_point_per_month() {
        let as_of = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let deals = vec![month_deal("Apr", "2026-04-02", 75.0)];
        let points = cumulative_by_period(&deals, &FilterSelection::default(), &MONTHS, as_of);
        assert_eq!(points.len(), 12);
        assert_eq!(points[11].signed, 75.0);
    }

    #[test]
    fn cumulative_ignores_months_outside_the_period_list() {
        let as_of = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        let deals = vec![
            month_deal("Jan", "2026-01-20", 100.0),
            month_deal("Dec", "2026-12-01", 999.0),
        ];
        let points = cumulative_by_period(&deals, &FilterSelection::default(), &["Jan"], as_of);
        assert_eq!(points[0].signed, 100.0);
        assert_eq!(points[0].forecasted, 0.0);
    }

    #[test]
    fn kpi_attainment_honors_direction() {
        let kpis = vec![
            KpiEntry {
                label: "ARR".to_string(),
                value: 120.0,
                target: 100.0,
                higher_is_better: true,
            },
            KpiEntry {
                label: "Churn".to_string(),
                value: 6.0,
                target: 5.0,
                higher_is_better: false,
            },
            KpiEntry {
                label: "New".to_string(),
                value: 10.0,
                target: 0.0,
                higher_is_better: true,
            },
        ];
        let measured = kpi_attainment(&kpis);
        assert!(measured[0].on_track);
        assert_eq!(measured[0].attainment, 120.0);
        assert!(!measured[1].on_track);
        assert_eq!(measured[2].attainment, 0.0);
    }
}
