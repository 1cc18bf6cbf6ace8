pub mod rollup;
pub mod waterfall;

pub use rollup::{
    client_totals, cumulative_by_period, kpi_attainment, monthly_totals, owner_totals,
    segment_totals, top_n, totals_by, weighted_monthly_forecast, Bucket, CumulativePoint,
    KpiAttainment, MONTHS,
};
pub use waterfall::{quarter_waterfall, QuarterWaterfall, WaterfallBucket};
