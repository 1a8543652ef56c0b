//! Named collection of services.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::CallError;
use crate::service::CallService;

/// Services keyed by name, in registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Box<dyn CallService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `service` under `name`. A name can only be registered once.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        service: Box<dyn CallService>,
    ) -> Result<(), CallError> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(CallError::configuration(vec![format!(
                "service '{name}' is already registered"
            )]));
        }
        debug!(service = %name, "registered service");
        self.services.insert(name, service);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn CallService, CallError> {
        self.services
            .get(name)
            .map(|s| s.as_ref())
            .ok_or_else(|| CallError::not_in_collection(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut (dyn CallService + 'static), CallError> {
        self.services
            .get_mut(name)
            .map(|s| s.as_mut())
            .ok_or_else(|| CallError::not_in_collection(name))
    }

    /// Remove and return the service, releasing its retained responses.
    pub fn remove(&mut self, name: &str) -> Result<Box<dyn CallService>, CallError> {
        let mut service = self
            .services
            .shift_remove(name)
            .ok_or_else(|| CallError::not_in_collection(name))?;
        service.free();
        Ok(service)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
