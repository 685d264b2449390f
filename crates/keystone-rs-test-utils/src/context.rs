use keystone_rs_config::{ConfigError, Registration, RegistrationContext};

/// Collects replayed registrations in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingContext {
    registrations: Vec<Registration>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Name of each registration: filter, connection, role, action or view.
    pub fn names(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|registration| match registration {
                Registration::Cache(policy) => policy.action.clone(),
                Registration::Database(database) => database.name.clone(),
                Registration::Factory(factory) => factory.role.clone(),
                Registration::Filter(filter) => filter.name.clone(),
                Registration::View(view) => view.view.clone(),
            })
            .collect()
    }
}

impl RegistrationContext for RecordingContext {
    fn register(&mut self, registration: &Registration) -> Result<(), ConfigError> {
        self.registrations.push(registration.clone());
        Ok(())
    }
}
