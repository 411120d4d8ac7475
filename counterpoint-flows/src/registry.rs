//! # Flow Registry
//!
//! Flows are constructed explicitly and registered by name at startup.
//! Callers look flows up by name and run them on JSON input.

use crate::backend::LlmBackend;
use crate::config::FlowConfig;
use crate::debate::{self, DebateClaimFlow};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Name, purpose and JSON shapes of a flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// A named, schema-typed operation runnable on JSON
#[async_trait]
pub trait Flow: Send + Sync {
    fn descriptor(&self) -> FlowDescriptor;

    async fn run(&self, input: Value, cancel: &CancellationToken) -> Result<Value>;
}

/// Descriptors of every built-in flow, without building a backend
pub fn builtin_descriptors() -> Vec<FlowDescriptor> {
    vec![debate::descriptor()]
}

#[derive(Default, Clone)]
pub struct FlowRegistry {
    flows: BTreeMap<&'static str, Arc<dyn Flow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in flow, wired to the configured provider
    pub fn from_config(config: &FlowConfig) -> Result<Self> {
        config.validate()?;

        let backend = LlmBackend::from_config(config)?;
        let debate = DebateClaimFlow::new(backend).with_policy(config.retry);

        let mut registry = Self::new();
        registry.register(debate)?;
        Ok(registry)
    }

    /// Add a flow. Names must be unique.
    pub fn register<F: Flow + 'static>(&mut self, flow: F) -> Result<()> {
        let name = flow.descriptor().name;
        if self.flows.contains_key(name) {
            return Err(Error::config_invalid(format!("flow '{}' is already registered", name))
                .with_operation("registry::register")
                .with_context("flow", name));
        }
        debug!(flow = name, "registered flow");
        self.flows.insert(name, Arc::new(flow));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Flow>> {
        self.flows.get(name).cloned()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.flows.keys().copied().collect()
    }

    pub fn descriptors(&self) -> Vec<FlowDescriptor> {
        self.flows.values().map(|f| f.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub async fn invoke(&self, name: &str, input: Value, cancel: &CancellationToken) -> Result<Value> {
        let flow = self.get(name).ok_or_else(|| {
            Error::flow_not_found(name).with_operation("registry::invoke")
        })?;
        flow.run(input, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::ErrorKind;
    use crate::test_support::ScriptedBackend;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Flow for Echo {
        fn descriptor(&self) -> FlowDescriptor {
            FlowDescriptor {
                name: "echo",
                description: "returns its input",
                input_schema: json!({}),
                output_schema: json!({}),
            }
        }

        async fn run(&self, input: Value, _cancel: &CancellationToken) -> Result<Value> {
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let mut registry = FlowRegistry::new();
        registry.register(Echo).unwrap();
        registry
            .register(DebateClaimFlow::new(ScriptedBackend::new(vec![Ok(json!({
                "advocateText": "a",
                "skepticText": "b",
            }))])))
            .unwrap();

        assert_eq!(registry.names(), vec!["debateClaim", "echo"]);
        assert_eq!(registry.len(), 2);

        let cancel = CancellationToken::new();
        let out = registry.invoke("echo", json!({ "x": 1 }), &cancel).await.unwrap();
        assert_eq!(out, json!({ "x": 1 }));

        let out = registry
            .invoke("debateClaim", json!({ "claim": "c", "categories": ["Fitness"] }), &cancel)
            .await
            .unwrap();
        assert_eq!(out["skepticText"], "b");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = FlowRegistry::new();
        registry.register(Echo).unwrap();
        let err = registry.register(Echo).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("flow"), Some("echo"));
    }

    #[tokio::test]
    async fn test_unknown_flow() {
        let registry = FlowRegistry::new();
        let err = registry
            .invoke("detectSelfDeception", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FlowNotFound);
    }

    #[test]
    fn test_from_config_registers_debate_claim() {
        let registry = FlowRegistry::from_config(&FlowConfig::new(ProviderConfig::openai("sk-test"))).unwrap();
        assert_eq!(registry.names(), vec!["debateClaim"]);
        assert!(registry.get("debateClaim").is_some());
    }

    #[test]
    fn test_builtin_descriptors_match_registered_flows() {
        let registry = FlowRegistry::from_config(&FlowConfig::new(ProviderConfig::openai("sk-test"))).unwrap();
        assert_eq!(builtin_descriptors(), registry.descriptors());
    }

    #[test]
    fn test_from_config_rejects_bad_config() {
        let err = FlowRegistry::from_config(&FlowConfig::new(ProviderConfig::openai(""))).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
