use anyhow::Context;
use sim86::{config::Config, simulator::Simulator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::load();

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log filter `{}`", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut simulator = Simulator::new(config.options);
    let report = simulator.run_file(&config.script)?;

    // mismatches are reported, never fatal
    if report.is_clean() {
        info!("{} instructions executed, trace matches", report.executed);
    } else {
        warn!(
            "{} instructions executed, {} failed, {} mismatches, final state {}",
            report.executed,
            report.failed_lines().count(),
            report.mismatches().count(),
            if report.final_matches() { "ok" } else { "differs" },
        );
    }
    Ok(())
}
