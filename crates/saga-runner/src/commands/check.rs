use super::CheckArgs;
use crate::error::Result;
use crate::plan::Plan;

pub(super) fn run(args: CheckArgs) -> Result<()> {
    let plan = Plan::load(&args.plan)?;
    println!(
        "Plan '{}' is valid: {} step(s)",
        args.plan.display(),
        plan.steps.len()
    );
    Ok(())
}
