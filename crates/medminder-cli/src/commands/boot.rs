use clap::Args;
use medminder_core::{BootRecovery, RecoveryAction};

use crate::context::{CliResult, Context};

#[derive(Args)]
pub struct BootArgs {
    #[arg(long)]
    pub json: bool,
}

/// Re-derive all alarms from the backend, as after a device restart.
///
/// The registry starts empty, so alarms of entities removed elsewhere do not
/// survive.
pub async fn run(args: BootArgs) -> CliResult {
    let ctx = Context::open()?;

    let recovery = BootRecovery::new(
        ctx.backend.clone(),
        ctx.local.manager(),
        ctx.prefs(),
        ctx.local.clock.clone(),
    );
    let report = ctx.local.alarms.reboot(&recovery).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if let Some(reason) = report.skipped_run {
        println!("nothing to restore ({reason:?})");
        return Ok(());
    }
    println!(
        "restored {} medicines, {} appointments ({} skipped, {} failed)",
        report.medicines_rescheduled,
        report.appointments_rescheduled,
        report.skipped_count,
        report.failed_count
    );
    for (collection, error) in &report.fetch_errors {
        eprintln!("could not fetch {collection}: {error}");
    }
    for action in &report.actions {
        if let RecoveryAction::Failed { entity_id, error } = action {
            eprintln!("{entity_id}: {error}");
        }
    }
    Ok(())
}
