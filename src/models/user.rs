//! User model, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User roles, ordered from least to most privileged. `Member` is the
/// self-scoped tier: it may only see its own lending records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }

    /// The least-privileged tier only sees records it owns.
    pub fn is_self_scoped(&self) -> bool {
        matches!(self, Role::Member)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "librarian" => Ok(Role::Librarian),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// User profile from database. Authentication material lives with the
/// external identity provider; this server only stores the profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 64))]
    pub login: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// JWT claims supplied by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Validate a JWT token and extract the claims
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let data = decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// The single ownership predicate: every read entry point over lending
    /// records must go through this, so no endpoint can leak a foreign
    /// borrower's records via parameter manipulation.
    pub fn can_access_borrower(&self, borrower_id: i32) -> bool {
        !self.role.is_self_scoped() || self.user_id == borrower_id
    }

    pub fn require_borrower_access(&self, borrower_id: i32) -> Result<(), AppError> {
        if self.can_access_borrower(borrower_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Insufficient rights to access another borrower's records".to_string(),
            ))
        }
    }

    /// Circulation and inventory writes are staff actions.
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role >= Role::Librarian {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Staff privileges required".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator privileges required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, role: Role) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: format!("user-{}", user_id),
            user_id,
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn member_is_scoped_to_own_records() {
        let member = claims(7, Role::Member);
        assert!(member.can_access_borrower(7));
        assert!(!member.can_access_borrower(8));
        assert!(member.require_borrower_access(8).is_err());
    }

    #[test]
    fn staff_roles_see_all_borrowers() {
        for role in [Role::Librarian, Role::Admin] {
            let staff = claims(1, role);
            assert!(staff.can_access_borrower(999));
            assert!(staff.require_staff().is_ok());
        }
    }

    #[test]
    fn member_cannot_perform_staff_actions() {
        assert!(claims(1, Role::Member).require_staff().is_err());
    }

    #[test]
    fn role_ordering_matches_privilege_tiers() {
        assert!(Role::Member < Role::Librarian);
        assert!(Role::Librarian < Role::Admin);
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let original = claims(42, Role::Librarian);
        let token = original.create_token("test-secret").unwrap();
        let decoded = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.role, Role::Librarian);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = claims(1, Role::Admin).create_token("secret-a").unwrap();
        assert!(UserClaims::from_token(&token, "secret-b").is_err());
    }
}
