use super::common::{BootstrapArg, InputArg, write_report};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct IntervalArg {
    #[clap(flatten)]
    pub input: InputArg,
    #[clap(flatten)]
    pub bootstrap: BootstrapArg,
}

pub(crate) fn run(arg: &IntervalArg) -> anyhow::Result<()> {
    let IntervalArg { input, bootstrap } = arg;
    let config = input.load_config(bootstrap, None)?;
    let (feedback, policy) = input.load_data()?;
    let evaluation = input.build_evaluation(&feedback, &config)?;

    eprintln!(
        "Estimating confidence intervals ({} bootstrap samples)...",
        config.bootstrap.n_bootstrap_samples
    );
    let intervals = evaluation.estimate_intervals(&policy, &config.bootstrap)?;
    eprintln!("Estimated {} intervals", intervals.intervals.len());

    write_report(input, &feedback, &evaluation, config, intervals)
}
