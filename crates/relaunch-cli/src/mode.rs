use relaunch_core::orchestrator::Action;
use std::path::Path;

/// Action implied by the name the binary was invoked under.
pub fn action_from_invocation(argv0: &Path) -> Option<Action> {
    match argv0.file_name()?.to_str()? {
        "start-server" => Some(Action::Start),
        "restart-server" => Some(Action::Restart),
        _ => None,
    }
}

/// Combine the invocation name with an explicit action argument.
///
/// The two must agree when both are present; at least one is required.
pub fn resolve_action(argv0: Option<&Path>, explicit: Option<Action>) -> anyhow::Result<Action> {
    let implied = argv0.and_then(action_from_invocation);
    match (implied, explicit) {
        (Some(implied), Some(explicit)) if implied != explicit => anyhow::bail!(
            "invoked as {implied}-server but asked to {explicit}; drop the action argument"
        ),
        (Some(action), _) | (None, Some(action)) => Ok(action),
        (None, None) => anyhow::bail!(
            "no action given: run as start-server / restart-server, or pass 'start' or 'restart'"
        ),
    }
}
