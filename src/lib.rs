//! Data layer for the volume-explorer and sales-KPI dashboards: fetches a
//! set of hand-maintained tables (published-sheet CSV tabs, a small REST
//! API, or static JSON exports), normalizes them into typed records, and
//! exposes pure aggregation functions parameterized by the active filters.

pub mod agg;
pub mod fetch;
pub mod model;
pub mod parse;
