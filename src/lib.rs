//! smehealth: financial health classification and scoring for SME ledgers
//!
//! Cleans raw transaction ledgers, derives financial ratios, trains a tree
//! ensemble that labels each record `Healthy`, `Moderate` or `Risky`, and
//! scores records with a deterministic 0-100 rule-based health score.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
