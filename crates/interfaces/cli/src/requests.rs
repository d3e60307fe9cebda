use anyhow::{bail, Result};
use serde_json::json;

use falcon_exec::ToolExecutor;
use falcon_workspace::{PersistenceManager, VariableStore};

/// `run --request <name> [--env <env>]`: loads a saved request (and,
/// optionally, an environment's variables) and executes it directly
/// through the `http_request` tool, bypassing the Agent Loop entirely.
/// Returns whether the request succeeded.
pub async fn run_saved_request(
    executor: &ToolExecutor,
    persistence: &PersistenceManager,
    variables: &VariableStore,
    name: &str,
    env: Option<&str>,
) -> Result<bool> {
    if let Some(env_name) = env {
        let environment = match persistence.load_environment(env_name) {
            Ok(environment) => environment,
            Err(err) => bail!("failed to load environment '{env_name}': {err}"),
        };
        for (key, value) in environment.variables {
            variables.set(&key, &value);
        }
    }

    let request = match persistence.load_request(name) {
        Ok(request) => request,
        Err(err) => bail!("failed to load request '{name}': {err}"),
    };

    let args = json!({
        "method": request.method,
        "url": request.url,
        "headers": request.headers,
        "body": request.body,
    });

    let output = executor.execute("http_request", &args).await?;
    println!("{}", output.output);
    Ok(output.success)
}
