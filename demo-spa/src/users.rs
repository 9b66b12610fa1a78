use async_trait::async_trait;
use serde::Serialize;
use subtle::ConstantTimeEq;

use session_guard_axum::{GuardError, UserLoader};

#[derive(Clone, Debug, Serialize)]
pub(crate) struct DemoUser {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: String,
    #[serde(skip)]
    password: String,
}

/// Fixed set of demo accounts.
#[derive(Clone, Debug)]
pub(crate) struct UserTable {
    users: Vec<DemoUser>,
}

impl UserTable {
    pub(crate) fn demo() -> Self {
        let user = |id: &str, email: &str, name: &str, password: &str| DemoUser {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        };
        Self {
            users: vec![
                user("1", "john@foalts.org", "John", "password"),
                user("2", "mary@foalts.org", "Mary", "secret"),
            ],
        }
    }

    pub(crate) fn find_by_id(&self, id: &str) -> Option<&DemoUser> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Returns the user only when both email and password match.
    pub(crate) fn authenticate(&self, email: &str, password: &str) -> Option<&DemoUser> {
        let user = self.users.iter().find(|u| u.email == email)?;
        let matches: bool = user.password.as_bytes().ct_eq(password.as_bytes()).into();
        matches.then_some(user)
    }
}

#[async_trait]
impl UserLoader<DemoUser> for UserTable {
    async fn load(&self, user_id: &str) -> Result<Option<DemoUser>, GuardError> {
        Ok(self.find_by_id(user_id).cloned())
    }
}
