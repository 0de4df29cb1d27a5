use serde::Serialize;
use slate_ope::{PolicyValueIntervals, PolicyValueSummary};

use super::common::{BootstrapArg, InputArg, write_report};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummarizeArg {
    #[clap(flatten)]
    pub input: InputArg,
    #[clap(flatten)]
    pub bootstrap: BootstrapArg,
}

#[derive(Debug, Serialize)]
struct OffPolicySummary {
    policy_values: PolicyValueSummary,
    intervals: PolicyValueIntervals,
}

pub(crate) fn run(arg: &SummarizeArg) -> anyhow::Result<()> {
    let SummarizeArg { input, bootstrap } = arg;
    let config = input.load_config(bootstrap, None)?;
    let (feedback, policy) = input.load_data()?;
    let evaluation = input.build_evaluation(&feedback, &config)?;

    eprintln!("Summarizing off-policy estimates...");
    let (policy_values, intervals) =
        evaluation.summarize_off_policy_estimates(&policy, &config.bootstrap)?;

    write_report(
        input,
        &feedback,
        &evaluation,
        config,
        OffPolicySummary {
            policy_values,
            intervals,
        },
    )
}
