//! Dry Run Dispatcher
//!
//! Prints what each step would do and reports success without touching
//! any service or file.

use async_trait::async_trait;
use log::info;
use serde_json::{json, Value};

use super::ActionDispatcher;
use crate::error::DispatchError;
use crate::workflow::{ActionKind, Params};

/// Dispatcher that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDispatcher;

impl DryRunDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionDispatcher for DryRunDispatcher {
    async fn dispatch(&self, action: ActionKind, params: &Params) -> Result<Value, DispatchError> {
        info!("[DRY RUN] Action: {}", action);
        info!("  Params: {}", Value::Object(params.clone()));

        let missing: Vec<&str> = action
            .required_params()
            .iter()
            .copied()
            .filter(|name| !params.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            info!("  Missing required params: {:?}", missing);
        }

        Ok(json!({
            "status": "success",
            "dry_run": true,
            "action": action.as_str(),
            "params": params,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_echoes_call() {
        let mut params = Params::new();
        params.insert("environment".to_string(), json!("prod"));

        let outcome = DryRunDispatcher::new()
            .dispatch(ActionKind::Deploy, &params)
            .await
            .unwrap();

        assert_eq!(outcome["status"], "success");
        assert_eq!(outcome["dry_run"], true);
        assert_eq!(outcome["action"], "deploy");
        assert_eq!(outcome["params"]["environment"], "prod");
    }
}
