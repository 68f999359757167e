//! Domain factory: reconstructs aggregates and value objects from persisted
//! data.
//!
//! Constructors are registered per Rust type and looked up by [`TypeId`], so
//! rehydration never has to reflect over a property bag.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::identifier::Identifier;

/// Properties an aggregate is rehydrated from before its history is replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateHydration {
    /// The aggregate identifier.
    pub id: Identifier,
    /// When the newest event in the stream was persisted.
    pub last_persisted_at_utc: Option<DateTime<Utc>>,
}

type AggregateConstructor<A> = Box<dyn Fn(AggregateHydration) -> Result<A, DomainError> + Send + Sync>;
type ValueObjectParser<V> = Box<dyn Fn(&str) -> Result<V, DomainError> + Send + Sync>;

/// Registry of aggregate constructors and value-object parsers.
pub struct DomainFactory {
    aggregates: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    value_objects: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl DomainFactory {
    /// Creates a factory that knows how to rehydrate an [`Identifier`].
    #[must_use]
    pub fn new() -> Self {
        let mut factory = Self {
            aggregates: HashMap::new(),
            value_objects: HashMap::new(),
        };
        factory.register_value_object::<Identifier, _>(|value| {
            let id = Identifier::new(value);
            if id.is_empty() {
                return Err(DomainError::Validation("identifier must not be empty".into()));
            }
            Ok(id)
        });
        factory
    }

    /// Registers the constructor used to rehydrate aggregates of type `A`,
    /// replacing any previous registration.
    pub fn register_aggregate<A, F>(&mut self, constructor: F)
    where
        A: 'static,
        F: Fn(AggregateHydration) -> Result<A, DomainError> + Send + Sync + 'static,
    {
        let constructor: AggregateConstructor<A> = Box::new(constructor);
        self.aggregates
            .insert(TypeId::of::<A>(), Box::new(constructor));
    }

    /// Builder form of [`DomainFactory::register_aggregate`].
    #[must_use]
    pub fn with_aggregate<A, F>(mut self, constructor: F) -> Self
    where
        A: 'static,
        F: Fn(AggregateHydration) -> Result<A, DomainError> + Send + Sync + 'static,
    {
        self.register_aggregate(constructor);
        self
    }

    /// Registers the parser used to rehydrate value objects of type `V` from
    /// their stored string form.
    pub fn register_value_object<V, F>(&mut self, parser: F)
    where
        V: 'static,
        F: Fn(&str) -> Result<V, DomainError> + Send + Sync + 'static,
    {
        let parser: ValueObjectParser<V> = Box::new(parser);
        self.value_objects
            .insert(TypeId::of::<V>(), Box::new(parser));
    }

    /// Rehydrates an aggregate of type `A`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if no constructor is registered
    /// for `A`, or whatever the constructor itself returns.
    pub fn rehydrate_aggregate_root<A: 'static>(
        &self,
        hydration: AggregateHydration,
    ) -> Result<A, DomainError> {
        let constructor = self
            .aggregates
            .get(&TypeId::of::<A>())
            .and_then(|entry| entry.downcast_ref::<AggregateConstructor<A>>())
            .ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "no aggregate factory registered for {}",
                    type_name::<A>()
                ))
            })?;
        constructor(hydration)
    }

    /// Rehydrates a value object of type `V` from its stored string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if no parser is registered for
    /// `V`, or whatever the parser itself returns.
    pub fn rehydrate_value_object<V: 'static>(&self, value: &str) -> Result<V, DomainError> {
        let parser = self
            .value_objects
            .get(&TypeId::of::<V>())
            .and_then(|entry| entry.downcast_ref::<ValueObjectParser<V>>())
            .ok_or_else(|| {
                DomainError::Infrastructure(format!(
                    "no value object factory registered for {}",
                    type_name::<V>()
                ))
            })?;
        parser(value)
    }
}

impl Default for DomainFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DomainFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainFactory")
            .field("aggregates", &self.aggregates.len())
            .field("value_objects", &self.value_objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Car {
        id: Identifier,
        persisted: Option<DateTime<Utc>>,
    }

    #[derive(Debug, PartialEq)]
    struct Plate(String);

    #[test]
    fn test_rehydrate_registered_aggregate() {
        // Arrange
        let factory = DomainFactory::new().with_aggregate(|hydration: AggregateHydration| {
            Ok(Car {
                id: hydration.id,
                persisted: hydration.last_persisted_at_utc,
            })
        });
        let now = Utc::now();

        // Act
        let car: Car = factory
            .rehydrate_aggregate_root(AggregateHydration {
                id: Identifier::new("anid"),
                last_persisted_at_utc: Some(now),
            })
            .unwrap();

        // Assert
        assert_eq!(car.id.as_str(), "anid");
        assert_eq!(car.persisted, Some(now));
    }

    #[test]
    fn test_rehydrate_unregistered_aggregate_fails() {
        let factory = DomainFactory::new();

        let result = factory.rehydrate_aggregate_root::<Car>(AggregateHydration {
            id: Identifier::new("anid"),
            last_persisted_at_utc: None,
        });

        match result {
            Err(DomainError::Infrastructure(message)) => assert!(message.contains("Car")),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }

    #[test]
    fn test_identifier_value_object_is_registered_by_default() {
        let factory = DomainFactory::default();

        let id: Identifier = factory.rehydrate_value_object("anid").unwrap();
        assert_eq!(id, Identifier::new("anid"));

        let empty = factory.rehydrate_value_object::<Identifier>("");
        assert!(matches!(empty, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_rehydrate_custom_value_object() {
        let mut factory = DomainFactory::new();
        factory.register_value_object(|value: &str| Ok(Plate(value.to_uppercase())));

        let plate: Plate = factory.rehydrate_value_object("abc123").unwrap();

        assert_eq!(plate, Plate("ABC123".into()));
    }
}
