//! Entity descriptors
//!
//! An entity descriptor identifies a mapped record type independently of the
//! ORM that ends up loading it. Identity is the Rust type, so registering the
//! same entity twice against a connection is a no-op.

use serde::{Serialize, Serializer};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// A type mapped to a stored record
pub trait Entity: Send + Sync + 'static {
    /// Logical entity name, used in repository tokens
    fn entity_name() -> &'static str;

    /// Table (or collection) the entity is stored in
    fn table_name() -> &'static str;
}

/// Type-erased description of an [`Entity`]
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    name: &'static str,
    table: &'static str,
}

impl EntityDescriptor {
    /// Describe an entity type
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            name: T::entity_name(),
            table: T::table_name(),
        }
    }

    /// Logical entity name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Table or collection name
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Fully qualified Rust type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether this descriptor describes `T`
    pub fn is<T: Entity>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityDescriptor {}

impl Hash for EntityDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl Serialize for EntityDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.type_name)
    }
}

/// Entities configured on a connection
///
/// Either an ordered list or a keyed map; the map form is flattened in key
/// order whenever a plain list is needed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EntitySource {
    List(Vec<EntityDescriptor>),
    Map(BTreeMap<String, EntityDescriptor>),
}

impl EntitySource {
    /// Whether no entities are configured
    pub fn is_empty(&self) -> bool {
        match self {
            EntitySource::List(list) => list.is_empty(),
            EntitySource::Map(map) => map.is_empty(),
        }
    }

    /// Number of configured entities
    pub fn len(&self) -> usize {
        match self {
            EntitySource::List(list) => list.len(),
            EntitySource::Map(map) => map.len(),
        }
    }

    /// Normalize into an ordered list
    pub fn to_vec(&self) -> Vec<EntityDescriptor> {
        match self {
            EntitySource::List(list) => list.clone(),
            EntitySource::Map(map) => map.values().copied().collect(),
        }
    }
}

impl Default for EntitySource {
    fn default() -> Self {
        EntitySource::List(Vec::new())
    }
}

impl From<Vec<EntityDescriptor>> for EntitySource {
    fn from(entities: Vec<EntityDescriptor>) -> Self {
        EntitySource::List(entities)
    }
}

impl From<BTreeMap<String, EntityDescriptor>> for EntitySource {
    fn from(entities: BTreeMap<String, EntityDescriptor>) -> Self {
        EntitySource::Map(entities)
    }
}

/// Append `entities` to `target`, skipping any whose identity is already present
pub fn extend_unique<I>(target: &mut Vec<EntityDescriptor>, entities: I)
where
    I: IntoIterator<Item = EntityDescriptor>,
{
    for entity in entities {
        if !target.contains(&entity) {
            target.push(entity);
        }
    }
}

/// Build a `Vec<EntityDescriptor>` from entity types
///
/// ```ignore
/// let entities = entities![User, Post];
/// ```
#[macro_export]
macro_rules! entities {
    ($($entity:ty),* $(,)?) => {
        vec![$($crate::entity::EntityDescriptor::of::<$entity>()),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User;
    impl Entity for User {
        fn entity_name() -> &'static str {
            "User"
        }
        fn table_name() -> &'static str {
            "users"
        }
    }

    struct Post;
    impl Entity for Post {
        fn entity_name() -> &'static str {
            "Post"
        }
        fn table_name() -> &'static str {
            "posts"
        }
    }

    #[test]
    fn test_descriptor_identity() {
        let user = EntityDescriptor::of::<User>();
        assert_eq!(user, EntityDescriptor::of::<User>());
        assert_ne!(user, EntityDescriptor::of::<Post>());
        assert!(user.is::<User>());
        assert_eq!(user.name(), "User");
        assert_eq!(user.table(), "users");
    }

    #[test]
    fn test_map_source_flattens_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert("b_posts".to_string(), EntityDescriptor::of::<Post>());
        map.insert("a_users".to_string(), EntityDescriptor::of::<User>());

        let source = EntitySource::from(map);
        assert_eq!(source.len(), 2);
        assert_eq!(source.to_vec(), entities![User, Post]);
    }

    #[test]
    fn test_extend_unique_keeps_first_occurrence() {
        let mut list = entities![User];
        extend_unique(&mut list, entities![Post, User, Post]);
        assert_eq!(list, entities![User, Post]);
    }
}
