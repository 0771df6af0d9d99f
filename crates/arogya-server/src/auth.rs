//! Credential issuing and the authentication gate.
//!
//! Every protected route runs through [`AuthGate::resolve_principal`]:
//! extract the bearer token, verify signature and expiry, load the
//! referenced account, and apply the role-specific checks. The three
//! principal kinds (end user, store owner, admin) share one token shape
//! distinguished by a role discriminator, so the parsing logic exists
//! exactly once.
//!
//! Tokens are issued at login/registration with a fixed lifetime and
//! cannot be revoked before expiry; deleting an account invalidates its
//! tokens indirectly because the principal lookup fails.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arogya_store::{Database, StoreError, StoreOwner};

use crate::error::ApiError;

/// Role discriminator embedded in every token.
const ROLE_USER: &str = "user";
const ROLE_OWNER: &str = "owner";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id (UUID).
    pub sub: String,
    /// `"user"` or `"owner"`.
    pub role: String,
    /// Explicit admin grant; owner/user tokens never carry it.
    #[serde(default)]
    pub admin: bool,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// The role a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    EndUser,
    StoreOwner,
    Admin,
}

/// The authenticated identity resolved for a request.
#[derive(Debug, Clone)]
pub enum Principal {
    EndUser { id: Uuid },
    StoreOwner(Box<StoreOwner>),
    Admin { id: Uuid },
}

impl Principal {
    /// The owner record, when the principal is a store owner.
    pub fn as_owner(&self) -> Option<&StoreOwner> {
        match self {
            Principal::StoreOwner(owner) => Some(owner),
            _ => None,
        }
    }
}

/// Signs and verifies access tokens and resolves them to principals.
#[derive(Clone)]
pub struct AuthGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthGate {
    pub fn new(secret: &str, token_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::days(token_ttl_days),
        }
    }

    // ------------------------------------------------------------------
    // Issuing
    // ------------------------------------------------------------------

    /// Issue a token for an end user.
    pub fn issue_user_token(&self, id: Uuid) -> Result<String, ApiError> {
        self.sign(id, ROLE_USER, false, self.token_ttl)
    }

    /// Issue a token for a store owner.
    pub fn issue_owner_token(&self, id: Uuid) -> Result<String, ApiError> {
        self.sign(id, ROLE_OWNER, false, self.token_ttl)
    }

    /// Issue a token carrying the admin grant. Admin tokens are minted
    /// out of band (there is no admin registration endpoint).
    #[allow(dead_code)]
    pub fn issue_admin_token(&self, id: Uuid) -> Result<String, ApiError> {
        self.sign(id, ROLE_OWNER, true, self.token_ttl)
    }

    fn sign(
        &self,
        id: Uuid,
        role: &str,
        admin: bool,
        ttl: Duration,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: id.to_string(),
            role: role.to_string(),
            admin,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Resolve the `Authorization` header to a principal, enforcing the
    /// role the route requires.
    ///
    /// Read-only: authentication itself never mutates state.
    pub fn resolve_principal(
        &self,
        header: Option<&str>,
        required: RequiredRole,
        db: &Database,
    ) -> Result<Principal, ApiError> {
        let token = extract_bearer(header)
            .ok_or_else(|| ApiError::Unauthenticated("Access token is required".to_string()))?;

        let claims = self.verify(token)?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthenticated("Invalid token".to_string()))?;

        match required {
            RequiredRole::Admin => {
                if !claims.admin {
                    return Err(ApiError::Forbidden("Admin access required".to_string()));
                }
                Ok(Principal::Admin { id })
            }
            RequiredRole::StoreOwner => {
                if claims.role != ROLE_OWNER {
                    return Err(ApiError::Unauthenticated("Invalid token".to_string()));
                }
                let owner = match db.get_owner(id) {
                    Ok(owner) => owner,
                    Err(StoreError::NotFound) => {
                        return Err(ApiError::Unauthenticated(
                            "Store owner not found".to_string(),
                        ))
                    }
                    Err(e) => return Err(e.into()),
                };
                if owner.account_status.is_locked_out() {
                    return Err(ApiError::Forbidden(format!(
                        "Account is {}. Please contact support.",
                        owner.account_status
                    )));
                }
                Ok(Principal::StoreOwner(Box::new(owner)))
            }
            RequiredRole::EndUser => {
                if claims.role != ROLE_USER {
                    return Err(ApiError::Unauthenticated("Invalid token".to_string()));
                }
                match db.get_user(id) {
                    Ok(user) => Ok(Principal::EndUser { id: user.id }),
                    Err(StoreError::NotFound) => {
                        Err(ApiError::Unauthenticated("User not found".to_string()))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Optional variant: identical resolution, but every failure is
    /// swallowed and the request proceeds anonymously.
    pub fn optional_principal(
        &self,
        header: Option<&str>,
        required: RequiredRole,
        db: &Database,
    ) -> Option<Principal> {
        self.resolve_principal(header, required, db).ok()
    }

    fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthenticated("Token has expired".to_string())
                }
                _ => ApiError::Unauthenticated("Invalid token".to_string()),
            })
    }
}

/// Pull the token out of a `Bearer <token>` header value.
fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header?.split_whitespace().nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arogya_shared::AccountStatus;
    use arogya_store::{ShopAddress, ShopDetails};
    use chrono::Utc;

    fn gate() -> AuthGate {
        AuthGate::new("test-secret", 7)
    }

    fn db_with_owner(status: AccountStatus) -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let owner = StoreOwner {
            id: Uuid::new_v4(),
            owner_name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            phone: "9000000001".to_string(),
            alternate_phone: None,
            shop_details: ShopDetails {
                shop_name: "Sri Sai Medicals".to_string(),
                address: ShopAddress {
                    street: "12 MG Road".to_string(),
                    city: "Bengaluru".to_string(),
                    state: "Karnataka".to_string(),
                    pincode: "560001".to_string(),
                    landmark: None,
                },
                latitude: 12.97,
                longitude: 77.59,
                license_number: "KA-1".to_string(),
                gst_number: "29GST1".to_string(),
                open_time: "09:00".to_string(),
                close_time: "21:00".to_string(),
                working_days: Vec::new(),
                is_active: true,
                is_verified: false,
                verification_date: None,
                delivery_available: false,
                delivery_radius_km: 0.0,
            },
            account_status: status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.create_owner(&owner).unwrap();
        (db, owner.id)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[test]
    fn missing_header_is_unauthenticated() {
        let (db, _) = db_with_owner(AccountStatus::Active);
        let err = gate()
            .resolve_principal(None, RequiredRole::StoreOwner, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(m) if m.contains("required")));
    }

    #[test]
    fn garbage_token_is_unauthenticated() {
        let (db, _) = db_with_owner(AccountStatus::Active);
        let err = gate()
            .resolve_principal(
                Some("Bearer not.a.token"),
                RequiredRole::StoreOwner,
                &db,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(m) if m == "Invalid token"));
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let (db, owner_id) = db_with_owner(AccountStatus::Active);
        let g = gate();
        let token = g
            .sign(owner_id, ROLE_OWNER, false, Duration::seconds(-3600))
            .unwrap();
        let err = g
            .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(m) if m == "Token has expired"));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let (db, owner_id) = db_with_owner(AccountStatus::Active);
        let token = AuthGate::new("other-secret", 7)
            .issue_owner_token(owner_id)
            .unwrap();
        let err = gate()
            .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(m) if m == "Invalid token"));
    }

    #[test]
    fn deleted_account_invalidates_a_valid_token() {
        let db = Database::open_in_memory().unwrap();
        let g = gate();
        let token = g.issue_owner_token(Uuid::new_v4()).unwrap();
        let err = g
            .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(m) if m.contains("not found")));
    }

    #[test]
    fn suspended_and_blocked_owners_are_forbidden() {
        for status in [AccountStatus::Suspended, AccountStatus::Blocked] {
            let (db, owner_id) = db_with_owner(status);
            let g = gate();
            let token = g.issue_owner_token(owner_id).unwrap();
            let err = g
                .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
                .unwrap_err();
            match err {
                ApiError::Forbidden(message) => {
                    assert!(message.contains(status.as_str()), "got: {message}")
                }
                other => panic!("expected Forbidden, got {other:?}"),
            }
        }
    }

    #[test]
    fn pending_owner_passes_the_gate() {
        // Pending accounts authenticate; individual operations decide
        // whether they additionally require an active account.
        let (db, owner_id) = db_with_owner(AccountStatus::Pending);
        let g = gate();
        let token = g.issue_owner_token(owner_id).unwrap();
        let principal = g
            .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .unwrap();
        assert!(principal.as_owner().is_some());
    }

    #[test]
    fn owner_token_without_admin_claim_is_forbidden_for_admin_routes() {
        let (db, owner_id) = db_with_owner(AccountStatus::Active);
        let g = gate();
        let token = g.issue_owner_token(owner_id).unwrap();
        let err = g
            .resolve_principal(Some(&bearer(&token)), RequiredRole::Admin, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let admin_token = g.issue_admin_token(owner_id).unwrap();
        let principal = g
            .resolve_principal(Some(&bearer(&admin_token)), RequiredRole::Admin, &db)
            .unwrap();
        assert!(matches!(principal, Principal::Admin { .. }));
    }

    #[test]
    fn user_token_does_not_open_owner_routes() {
        let (db, owner_id) = db_with_owner(AccountStatus::Active);
        let g = gate();
        let token = g.issue_user_token(owner_id).unwrap();
        let err = g
            .resolve_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn optional_variant_swallows_failures() {
        let (db, owner_id) = db_with_owner(AccountStatus::Active);
        let g = gate();

        assert!(g
            .optional_principal(None, RequiredRole::StoreOwner, &db)
            .is_none());
        assert!(g
            .optional_principal(Some("Bearer junk"), RequiredRole::StoreOwner, &db)
            .is_none());

        let token = g.issue_owner_token(owner_id).unwrap();
        assert!(g
            .optional_principal(Some(&bearer(&token)), RequiredRole::StoreOwner, &db)
            .is_some());
    }
}
