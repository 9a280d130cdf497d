use super::{ActingAs, AuthError};
use crate::desk::{DeskStore, User};

/// Turn who a request acts as into the desk user that gets credited with
/// its changes. The user must be an agent or admin.
pub fn resolve_agent(store: &dyn DeskStore, acting_as: &ActingAs) -> Result<User, AuthError> {
    let user = match acting_as {
        ActingAs::Agent(email) => store
            .find_user_by_email(email)?
            .ok_or_else(|| AuthError::UnknownAgent(email.clone()))?,
        ActingAs::FirstAdmin => store.first_admin()?.ok_or(AuthError::NoAdmin)?,
    };

    if !user.is_agent() {
        tracing::warn!(user_id = user.id, "Acting user is not an agent");
        return Err(AuthError::NotAnAgent { user_id: user.id });
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::{SqliteDeskStore, UserRole};
    use crate::testing::fixtures;

    fn agent(email: &str) -> ActingAs {
        ActingAs::Agent(email.to_string())
    }

    #[test]
    fn test_first_admin() {
        let store = SqliteDeskStore::in_memory().unwrap();
        let seed = fixtures::seed_desk(&store).unwrap();

        let user = resolve_agent(&store, &ActingAs::FirstAdmin).unwrap();
        assert_eq!(user.id, seed.admin.id);
        assert_eq!(user.role, UserRole::Admin);
    }

    #[test]
    fn test_configured_agent() {
        let store = SqliteDeskStore::in_memory().unwrap();
        let seed = fixtures::seed_desk(&store).unwrap();

        let user = resolve_agent(&store, &agent("scott.green@test.com")).unwrap();
        assert_eq!(user.id, seed.scott_green.id);
    }

    #[test]
    fn test_requester_cannot_act() {
        let store = SqliteDeskStore::in_memory().unwrap();
        let seed = fixtures::seed_desk(&store).unwrap();

        let err = resolve_agent(&store, &agent("scott.smith@test.com")).unwrap_err();
        assert!(matches!(err, AuthError::NotAnAgent { user_id } if user_id == seed.scott_smith.id));
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_unknown_email() {
        let store = SqliteDeskStore::in_memory().unwrap();
        fixtures::seed_desk(&store).unwrap();

        let err = resolve_agent(&store, &agent("nobody@test.com")).unwrap_err();
        assert!(matches!(err, AuthError::UnknownAgent(ref email) if email == "nobody@test.com"));
    }

    #[test]
    fn test_empty_desk_has_no_admin() {
        let store = SqliteDeskStore::in_memory().unwrap();
        let err = resolve_agent(&store, &ActingAs::FirstAdmin).unwrap_err();
        assert!(matches!(err, AuthError::NoAdmin));
        assert_eq!(err.reason(), "no_admin");
    }
}
