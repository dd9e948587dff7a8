//! Migration registry and discovery.
//!
//! Host applications register their migration definitions explicitly; a
//! registered definition is a [`Candidate`]. Discovery turns the candidates
//! of one family into a version-keyed map, rejecting malformed versions and
//! duplicate versions.

use super::types::{
    ConfigurationError, Constructor, Migration, MigrationDescriptor, MigrationType,
};
use crate::utils::short_type_name;
use crate::version::Version;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Family used by [`MigrationRegistry::default`].
pub const DEFAULT_FAMILY: &str = "migration";

/// Whether a definition is part of the host's public migration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Exported,
    Internal,
}

/// One registered definition that may or may not be a migration.
///
/// Only exported, concrete candidates of the requested family that carry a
/// version descriptor become migrations. Abstract bases and untagged helpers
/// can be registered alongside them and are skipped.
pub struct Candidate<C> {
    type_name: String,
    family: String,
    visibility: Visibility,
    constructor: Option<Constructor<C>>,
    descriptor: Option<MigrationDescriptor>,
}

impl<C> Candidate<C>
where
    C: Send + 'static,
{
    /// A concrete, exported definition without a version yet.
    pub fn new(
        type_name: impl Into<String>,
        family: impl Into<String>,
        constructor: Constructor<C>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            family: family.into(),
            visibility: Visibility::Exported,
            constructor: Some(constructor),
            descriptor: None,
        }
    }

    /// A concrete definition built with `M::default()`.
    pub fn of<M>(family: impl Into<String>) -> Self
    where
        M: Migration<C> + Default + 'static,
    {
        Self::new(
            short_type_name(std::any::type_name::<M>()),
            family,
            Arc::new(|| Ok(Box::new(M::default()) as Box<dyn Migration<C>>)),
        )
    }

    /// A definition that cannot be instantiated, such as a shared base.
    pub fn abstract_base(type_name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            family: family.into(),
            visibility: Visibility::Exported,
            constructor: None,
            descriptor: None,
        }
    }

    /// Attach the version literal.
    pub fn with_version(mut self, literal: impl Into<String>) -> Self {
        self.descriptor = Some(MigrationDescriptor::new(literal));
        self
    }

    /// Hide the definition from discovery.
    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn descriptor(&self) -> Option<&MigrationDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn is_concrete(&self) -> bool {
        self.constructor.is_some()
    }
}

/// Build the version → migration map for one family.
///
/// Fails on the first malformed version literal or duplicate version. The
/// result is keyed and therefore ordered by version regardless of the order
/// candidates were registered in.
pub fn find_migrations<V, C>(
    candidates: &[Candidate<C>],
    family: &str,
) -> Result<BTreeMap<V, MigrationType<C>>, ConfigurationError>
where
    V: Version,
    C: Send + 'static,
{
    let mut found: BTreeMap<V, MigrationType<C>> = BTreeMap::new();

    for candidate in candidates {
        if candidate.family != family || candidate.visibility != Visibility::Exported {
            continue;
        }

        let Some(constructor) = &candidate.constructor else {
            continue;
        };

        // Untagged definitions are helpers, not migrations.
        let Some(descriptor) = &candidate.descriptor else {
            debug!(type_name = %candidate.type_name, "Skipping definition without version");
            continue;
        };

        let version: V = descriptor.validate(&candidate.type_name)?;

        match found.entry(version) {
            Entry::Occupied(existing) => {
                return Err(ConfigurationError::DuplicateVersion {
                    version: existing.key().to_string(),
                    existing: existing.get().type_name().to_string(),
                    duplicate: candidate.type_name.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(MigrationType::new(
                    candidate.type_name.clone(),
                    Arc::clone(constructor),
                ));
            }
        }
    }

    debug!(family = %family, count = found.len(), "Discovered migrations");
    Ok(found)
}

/// Registry of migration definitions for one family.
pub struct MigrationRegistry<C> {
    family: String,
    candidates: Vec<Candidate<C>>,
}

impl<C> MigrationRegistry<C>
where
    C: Send + 'static,
{
    /// Create a new empty registry for `family`.
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            candidates: Vec::new(),
        }
    }

    /// Register any candidate, including ones discovery will skip.
    pub fn register(&mut self, candidate: Candidate<C>) -> &mut Self {
        self.candidates.push(candidate);
        self
    }

    /// Register `M` in this registry's family with the given version.
    pub fn register_migration<M>(&mut self, version: impl Into<String>) -> &mut Self
    where
        M: Migration<C> + Default + 'static,
    {
        let candidate = Candidate::of::<M>(self.family.clone()).with_version(version);
        self.register(candidate)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn candidates(&self) -> &[Candidate<C>] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Run discovery over the registered candidates.
    pub fn discover<V: Version>(
        &self,
    ) -> Result<BTreeMap<V, MigrationType<C>>, ConfigurationError> {
        find_migrations(&self.candidates, &self.family)
    }
}

impl<C> Default for MigrationRegistry<C>
where
    C: Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_FAMILY)
    }
}
