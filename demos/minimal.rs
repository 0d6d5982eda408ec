use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// A dispatcher with two commands: `ping` succeeds, everything else is an
/// unknown-command failure.
struct DemoDispatcher;

#[async_trait::async_trait]
impl foreman::Dispatcher for DemoDispatcher {
    async fn dispatch(
        &self,
        payload: &foreman::JobPayload,
    ) -> Result<serde_json::Value, foreman::DispatchError> {
        match payload.cmd.as_str() {
            "ping" => Ok(serde_json::Value::Bool(true)),
            other => Err(format!("unknown command: {other}").into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), foreman::ForemanError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = foreman::Config::from_env()?;
    foreman::cli::run(config, Arc::new(DemoDispatcher)).await
}
