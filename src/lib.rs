//! Profitability and risk estimation for heavy-equipment rental tenders.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
