use slate_ope::Metric;

use super::common::{BootstrapArg, InputArg, write_report};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CompareArg {
    #[clap(flatten)]
    pub input: InputArg,
    /// Ground-truth value of the evaluation policy
    #[arg(long, allow_negative_numbers = true)]
    pub ground_truth: f64,
    /// Accuracy metric: relative-ee or se
    #[arg(long)]
    pub metric: Option<Metric>,
}

pub(crate) fn run(arg: &CompareArg) -> anyhow::Result<()> {
    let CompareArg {
        input,
        ground_truth,
        metric,
    } = arg;
    let config = input.load_config(&BootstrapArg::default(), *metric)?;
    let (feedback, policy) = input.load_data()?;
    let evaluation = input.build_evaluation(&feedback, &config)?;

    eprintln!(
        "Comparing estimators against ground truth {ground_truth} ({})...",
        config.metric
    );
    let comparison =
        evaluation.summarize_estimators_comparison(*ground_truth, &policy, config.metric)?;

    write_report(input, &feedback, &evaluation, config, comparison)
}
