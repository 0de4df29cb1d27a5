use super::common::{BootstrapArg, InputArg, write_report};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EstimateArg {
    #[clap(flatten)]
    pub input: InputArg,
}

pub(crate) fn run(arg: &EstimateArg) -> anyhow::Result<()> {
    let EstimateArg { input } = arg;
    let config = input.load_config(&BootstrapArg::default(), None)?;
    let (feedback, policy) = input.load_data()?;
    let evaluation = input.build_evaluation(&feedback, &config)?;

    eprintln!("Estimating policy values...");
    let values = evaluation.estimate_policy_values(&policy)?;
    eprintln!("Estimated {} policy values", values.len());

    write_report(input, &feedback, &evaluation, config, values)
}
