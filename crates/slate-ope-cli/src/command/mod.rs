use std::io;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{
    compare::CompareArg, estimate::EstimateArg, interval::IntervalArg, summarize::SummarizeArg,
};

mod common;
mod compare;
mod estimate;
mod interval;
mod summarize;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What to compute from the logged feedback
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Estimate the policy value with every estimator
    Estimate(#[clap(flatten)] EstimateArg),
    /// Estimate bootstrap confidence intervals of the policy value
    Interval(#[clap(flatten)] IntervalArg),
    /// Summarize estimates relative to the behavior policy, with intervals
    Summarize(#[clap(flatten)] SummarizeArg),
    /// Compare estimators against a ground-truth policy value
    Compare(#[clap(flatten)] CompareArg),
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "slate_ope=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = CommandArgs::parse();
    match args.mode {
        Mode::Estimate(arg) => estimate::run(&arg)?,
        Mode::Interval(arg) => interval::run(&arg)?,
        Mode::Summarize(arg) => summarize::run(&arg)?,
        Mode::Compare(arg) => compare::run(&arg)?,
    }
    Ok(())
}
