//! Statistical utilities for slate off-policy evaluation.
//!
//! This crate provides the small set of statistical tools the estimators
//! rely on:
//!
//! - **Descriptive statistics**: mean, median, variance, standard deviation
//! - **Percentiles**: linearly interpolated percentile lookup
//! - **Bootstrap**: reproducible nonparametric bootstrap confidence intervals
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and storage
//! - [`bootstrap`]: Resampling with per-iteration seeding
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use slate_ope_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing percentiles
//!
//! ```
//! use slate_ope_stats::percentiles::Percentiles;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let percentiles = Percentiles::new(&values, &[25.0, 50.0, 75.0]);
//! assert_eq!(percentiles.get(50.0), Some(3.0));
//! ```
//!
//! ## Bootstrapping a confidence interval
//!
//! ```
//! use slate_ope_stats::bootstrap::{BootstrapConfig, estimate_confidence_interval_by_bootstrap};
//!
//! let config = BootstrapConfig { random_state: Some(1), ..BootstrapConfig::default() };
//! let interval = estimate_confidence_interval_by_bootstrap(&[1.0, 1.0, 1.0], &config).unwrap();
//! assert_eq!(interval.mean, 1.0);
//! ```

pub mod bootstrap;
pub mod descriptive;
pub mod percentiles;
