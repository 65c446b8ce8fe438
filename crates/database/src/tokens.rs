//! Container tokens for connections, options and repositories

use crate::entity::EntityDescriptor;
use crate::options::DEFAULT_CONNECTION_NAME;

/// Token the shared `ConnectionManager` is bound under
pub const CONNECTION_MANAGER_TOKEN: &str = "DatabaseConnectionManager";

/// Token the shared `EntityRegistry` is bound under
pub const ENTITY_REGISTRY_TOKEN: &str = "DatabaseEntityRegistry";

fn is_default(name: &str) -> bool {
    name.is_empty() || name == DEFAULT_CONNECTION_NAME
}

/// Token prefix for a connection's bindings: empty for the default connection
pub fn connection_prefix(name: &str) -> String {
    if is_default(name) {
        String::new()
    } else {
        format!("{}_", name)
    }
}

/// Token the live connection is bound under
pub fn connection_token(name: &str) -> String {
    if is_default(name) {
        "DatabaseConnection".to_string()
    } else {
        format!("{}DatabaseConnection", name)
    }
}

/// Token the resolved connection options are bound under
pub fn options_token(name: &str) -> String {
    if is_default(name) {
        "DatabaseModuleOptions".to_string()
    } else {
        format!("{}DatabaseModuleOptions", name)
    }
}

/// Token an entity's repository handle is bound under
pub fn repository_token(entity: &EntityDescriptor, connection: &str) -> String {
    format!("{}{}Repository", connection_prefix(connection), entity.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    struct User;
    impl Entity for User {
        fn entity_name() -> &'static str {
            "User"
        }
        fn table_name() -> &'static str {
            "users"
        }
    }

    #[test]
    fn test_default_connection_tokens() {
        let user = EntityDescriptor::of::<User>();
        assert_eq!(connection_token("default"), "DatabaseConnection");
        assert_eq!(options_token("default"), "DatabaseModuleOptions");
        assert_eq!(repository_token(&user, "default"), "UserRepository");
        assert_eq!(connection_prefix(""), "");
    }

    #[test]
    fn test_named_connection_tokens() {
        let user = EntityDescriptor::of::<User>();
        assert_eq!(connection_token("audit"), "auditDatabaseConnection");
        assert_eq!(options_token("audit"), "auditDatabaseModuleOptions");
        assert_eq!(repository_token(&user, "audit"), "audit_UserRepository");
    }
}
