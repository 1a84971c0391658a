use crate::capability::traits::{Capability, CapabilityDescriptor, CapabilityResult, FnCapability};
use crate::constants::defaults;
use crate::error::EnsembleError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Named capabilities in registration order.
///
/// Constructed explicitly and shared by reference (usually behind an `Arc`)
/// with every agent of a run. Names are unique: a second registration under
/// the same name is rejected.
pub struct CapabilityRegistry {
    entries: Vec<Arc<dyn Capability>>,
    index: HashMap<String, usize>,
    call_timeout: Duration,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            call_timeout: Duration::from_secs(defaults::CALL_TIMEOUT_SECS),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn register(&mut self, capability: Box<dyn Capability>) -> Result<(), EnsembleError> {
        let name = capability.name().to_string();
        if self.index.contains_key(&name) {
            return Err(EnsembleError::DuplicateCapability(name));
        }
        self.index.insert(name, self.entries.len());
        self.entries.push(Arc::from(capability));
        Ok(())
    }

    /// Register a plain function under the given descriptor.
    pub fn register_fn<F>(&mut self, descriptor: CapabilityDescriptor, func: F) -> Result<(), EnsembleError>
    where
        F: Fn(&Value) -> CapabilityResult + Send + Sync + 'static,
    {
        self.register(Box::new(FnCapability::new(descriptor, func)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        self.entries.iter().map(|c| c.descriptor()).collect()
    }

    /// Descriptors for the given names, in registry order. Unknown names are skipped.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<CapabilityDescriptor> {
        self.entries
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name()))
            .map(|c| c.descriptor())
            .collect()
    }

    /// Run a capability. Failures of the implementation, including panics and
    /// calls that exceed the call timeout, come back as `CapabilityExecution`.
    pub async fn invoke(&self, name: &str, args: Value) -> CapabilityResult {
        let capability = self
            .get(name)
            .cloned()
            .ok_or_else(|| EnsembleError::UnknownCapability(name.to_string()))?;

        tracing::debug!(capability = name, "invoking capability");

        let mut handle = tokio::spawn(async move { capability.invoke(args).await });

        let joined = match tokio::time::timeout(self.call_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                tracing::warn!(capability = name, "capability call timed out");
                return Err(EnsembleError::execution(
                    name,
                    format!("Timed out after {}s", self.call_timeout.as_secs_f32()),
                ));
            }
        };

        match joined {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err @ EnsembleError::CapabilityExecution { .. })) => Err(err),
            Ok(Err(err)) => Err(EnsembleError::execution(name, err.to_string())),
            Err(join_err) if join_err.is_panic() => {
                tracing::warn!(capability = name, "capability panicked");
                Err(EnsembleError::execution(name, "Capability panicked"))
            }
            Err(join_err) => Err(EnsembleError::execution(name, join_err.to_string())),
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
