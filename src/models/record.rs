use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use super::user::RawUser;

/// What the user slot holds: signed out, or a signed-in user enriched
/// with a fresh ID token and a snapshot of the provider's record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UserRecord {
    #[default]
    SignedOut,
    SignedIn(Box<SignedInUser>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedInUser {
    pub user: RawUser,
    pub id_token: String,
    /// `user.to_json()` taken at enrichment time.
    pub data: Value,
    /// The `stsTokenManager` object extracted from `data`.
    pub tokens: Value,
}

impl UserRecord {
    /// Enrich a raw user with the token fetched for it.
    pub fn signed_in(user: RawUser, id_token: String) -> Self {
        let data = user.to_json();
        let tokens = data.get("stsTokenManager").cloned().unwrap_or(Value::Null);
        UserRecord::SignedIn(Box::new(SignedInUser {
            user,
            id_token,
            data,
            tokens,
        }))
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, UserRecord::SignedIn(_))
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            UserRecord::SignedIn(u) => Some(&u.user.uid),
            UserRecord::SignedOut => None,
        }
    }

    pub fn id_token(&self) -> Option<&str> {
        match self {
            UserRecord::SignedIn(u) => Some(&u.id_token),
            UserRecord::SignedOut => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Signed out serializes to exactly `{"isLoggedIn": false}`; signed in
/// flattens the raw user next to `isLoggedIn`, `idToken`, `data` and `tokens`.
impl Serialize for UserRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Enriched<'a> {
            #[serde(flatten)]
            user: &'a RawUser,
            is_logged_in: bool,
            id_token: &'a str,
            data: &'a Value,
            tokens: &'a Value,
        }

        match self {
            UserRecord::SignedOut => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("isLoggedIn", &false)?;
                map.end()
            }
            UserRecord::SignedIn(u) => Enriched {
                user: &u.user,
                is_logged_in: true,
                id_token: &u.id_token,
                data: &u.data,
                tokens: &u.tokens,
            }
            .serialize(serializer),
        }
    }
}
