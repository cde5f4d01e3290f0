use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::token::jwt;

/// Application user derived from an access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

/// Turns an access token into the user it was issued for.
pub trait UserDecoder: Send + Sync {
    fn decode_user(&self, access_token: &str) -> Option<UserIdentity>;
}

/// Reads the user from standard JWT claims (`sub`, `email`, `name`) plus
/// either a `roles` array or a single `role`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtUserDecoder;

#[derive(Deserialize)]
struct UserClaims {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    role: Option<String>,
}

impl UserDecoder for JwtUserDecoder {
    fn decode_user(&self, access_token: &str) -> Option<UserIdentity> {
        let claims: UserClaims = match jwt::decode_claims(access_token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "access token is not a decodable JWT");
                return None;
            }
        };
        let id = claims.sub.filter(|s| !s.is_empty())?;
        let mut roles = claims.roles;
        if let Some(role) = claims.role
            && !roles.contains(&role)
        {
            roles.push(role);
        }
        Some(UserIdentity {
            id,
            email: claims.email,
            name: claims.name,
            roles,
        })
    }
}
