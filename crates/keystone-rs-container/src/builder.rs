//! Mutable service graph populated from config or code.

use crate::definition::{BuildStep, ServiceDefinition};
use crate::error::DumpError;
use crate::value::{SERVICE_CONTAINER_ID, Value};
use indexmap::IndexMap;
use log::debug;

/// Service definitions, aliases and parameters in registration order.
///
/// Ids and parameter names are case-insensitive and stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    definitions: IndexMap<String, ServiceDefinition>,
    aliases: IndexMap<String, String>,
    parameters: IndexMap<String, Value>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new definition, replacing any previous one with the same id.
    pub fn register(&mut self, id: &str, class: &str) -> &mut ServiceDefinition {
        self.set_definition(id, ServiceDefinition::new(class))
    }

    /// Store a definition; a replaced definition keeps its position.
    pub fn set_definition(&mut self, id: &str, definition: ServiceDefinition) -> &mut ServiceDefinition {
        let id = id.to_lowercase();
        debug!("registering service (id={id}, class={})", definition.class());
        self.aliases.shift_remove(&id);
        let index = match self.definitions.get_index_of(&id) {
            Some(index) => {
                self.definitions[index] = definition;
                index
            }
            None => self.definitions.insert_full(id, definition).0,
        };
        &mut self.definitions[index]
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(&id.to_lowercase())
    }

    pub fn definition(&self, id: &str) -> Option<&ServiceDefinition> {
        self.definitions.get(&id.to_lowercase())
    }

    pub fn definition_mut(&mut self, id: &str) -> Option<&mut ServiceDefinition> {
        self.definitions.get_mut(&id.to_lowercase())
    }

    pub fn remove_definition(&mut self, id: &str) -> Option<ServiceDefinition> {
        self.definitions.shift_remove(&id.to_lowercase())
    }

    pub fn definitions(&self) -> &IndexMap<String, ServiceDefinition> {
        &self.definitions
    }

    /// Point `alias` at `id`, replacing any definition registered under `alias`.
    pub fn set_alias(&mut self, alias: &str, id: &str) {
        let alias = alias.to_lowercase();
        let id = id.to_lowercase();
        debug!("registering alias (alias={alias}, id={id})");
        self.definitions.shift_remove(&alias);
        self.aliases.insert(alias, id);
    }

    pub fn aliases(&self) -> &IndexMap<String, String> {
        &self.aliases
    }

    /// Whether `id` names a definition, an alias or the container itself.
    pub fn has_service(&self, id: &str) -> bool {
        let id = id.to_lowercase();
        id == SERVICE_CONTAINER_ID
            || self.definitions.contains_key(&id)
            || self.aliases.contains_key(&id)
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) {
        self.parameters.insert(name.to_lowercase(), value.into());
    }

    pub fn add_parameters(&mut self, parameters: impl IntoIterator<Item = (String, Value)>) {
        for (name, value) in parameters {
            self.set_parameter(&name, value);
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(&name.to_lowercase())
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(&name.to_lowercase())
    }

    pub fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    /// Ids a service needs before it can be constructed.
    ///
    /// Method calls and configurators run after construction and do not count.
    pub fn construction_dependencies(&self, id: &str) -> Vec<String> {
        let id = id.to_lowercase();
        if let Some(target) = self.aliases.get(&id) {
            return vec![target.clone()];
        }
        let Some(definition) = self.definitions.get(&id) else {
            return Vec::new();
        };
        let mut dependencies: Vec<String> = definition
            .arguments()
            .iter()
            .flat_map(Value::service_references)
            .map(str::to_string)
            .collect();
        if let BuildStep::InstanceFactory { service, .. } = definition.build_step() {
            dependencies.push(service.clone());
        }
        dependencies
    }

    /// Reject cycles through constructor arguments, factory services and aliases.
    pub fn check_circular_references(&self) -> Result<(), DumpError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            builder: &ContainerBuilder,
            id: &str,
            marks: &mut IndexMap<String, Mark>,
            stack: &mut Vec<String>,
        ) -> Result<(), DumpError> {
            match marks.get(id) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|entry| entry == id).unwrap_or(0);
                    let mut path = stack[start..].to_vec();
                    path.push(id.to_string());
                    return Err(DumpError::CircularReference { path });
                }
                None => {}
            }
            marks.insert(id.to_string(), Mark::Visiting);
            stack.push(id.to_string());
            for dependency in builder.construction_dependencies(id) {
                if dependency != SERVICE_CONTAINER_ID {
                    visit(builder, &dependency, marks, stack)?;
                }
            }
            stack.pop();
            marks.insert(id.to_string(), Mark::Done);
            Ok(())
        }

        let mut marks = IndexMap::new();
        let mut stack = Vec::new();
        for id in self.definitions.keys().chain(self.aliases.keys()) {
            visit(self, id, &mut marks, &mut stack)?;
        }
        Ok(())
    }
}
