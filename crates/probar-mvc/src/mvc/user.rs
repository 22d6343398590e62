//! Claims-based users.

use serde::{Deserialize, Serialize};

/// Well-known claim types
pub mod claim_types {
    /// User identifier
    pub const NAME_IDENTIFIER: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
    /// User name
    pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
    /// Role
    pub const ROLE: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";
    /// E-mail address
    pub const EMAIL: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
}

/// Identifier given to authenticated test users by default
pub const DEFAULT_IDENTIFIER: &str = "TestId";

/// User name given to authenticated test users by default
pub const DEFAULT_USERNAME: &str = "TestUser";

/// Authentication type given to authenticated test users by default
pub const DEFAULT_AUTHENTICATION_TYPE: &str = "Passport";

/// A single claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type
    pub claim_type: String,
    /// Claim value
    pub value: String,
}

impl Claim {
    /// Create a claim
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// A set of claims issued by one authentication
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    /// Authentication type; `None` means unauthenticated
    pub authentication_type: Option<String>,
    /// Claims
    pub claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// Whether the identity is authenticated
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authentication_type.is_some()
    }
}

/// The user of a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPrincipal {
    identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    /// Unauthenticated user
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            identities: vec![ClaimsIdentity::default()],
        }
    }

    /// User with the given identities
    #[must_use]
    pub fn from_identities(identities: Vec<ClaimsIdentity>) -> Self {
        Self { identities }
    }

    /// Builder for an authenticated user
    #[must_use]
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    /// Identities
    #[must_use]
    pub fn identities(&self) -> &[ClaimsIdentity] {
        &self.identities
    }

    /// Whether any identity is authenticated
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identities.iter().any(ClaimsIdentity::is_authenticated)
    }

    /// All claims across identities
    pub fn claims(&self) -> impl Iterator<Item = &Claim> {
        self.identities.iter().flat_map(|identity| identity.claims.iter())
    }

    /// First claim value of a type
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims()
            .find(|claim| claim.claim_type == claim_type)
            .map(|claim| claim.value.as_str())
    }

    /// Whether a claim with the type and value exists
    #[must_use]
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims()
            .any(|claim| claim.claim_type == claim_type && claim.value == value)
    }

    /// Whether the user is in a role
    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.has_claim(claim_types::ROLE, role)
    }

    /// User name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.find_first(claim_types::NAME)
    }

    /// User identifier
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.find_first(claim_types::NAME_IDENTIFIER)
    }
}

/// Builder for authenticated test users
#[derive(Debug, Clone)]
pub struct UserBuilder {
    identifier: String,
    username: String,
    authentication_type: String,
    roles: Vec<String>,
    claims: Vec<Claim>,
}

impl Default for UserBuilder {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_IDENTIFIER.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            authentication_type: DEFAULT_AUTHENTICATION_TYPE.to_string(),
            roles: Vec::new(),
            claims: Vec::new(),
        }
    }
}

impl UserBuilder {
    /// Set the identifier claim
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Set the name claim
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the authentication type
    #[must_use]
    pub fn with_authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = authentication_type.into();
        self
    }

    /// Add a role
    #[must_use]
    pub fn in_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add roles
    #[must_use]
    pub fn in_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add a claim
    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Build the user
    #[must_use]
    pub fn build(self) -> ClaimsPrincipal {
        let mut claims = vec![
            Claim::new(claim_types::NAME_IDENTIFIER, self.identifier),
            Claim::new(claim_types::NAME, self.username),
        ];
        claims.extend(self.roles.into_iter().map(|role| Claim::new(claim_types::ROLE, role)));
        claims.extend(self.claims);
        ClaimsPrincipal::from_identities(vec![ClaimsIdentity {
            authentication_type: Some(self.authentication_type),
            claims,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous() {
        let user = ClaimsPrincipal::anonymous();
        assert!(!user.is_authenticated());
        assert_eq!(user.name(), None);
    }

    #[test]
    fn test_default_authenticated_user() {
        let user = ClaimsPrincipal::builder().build();
        assert!(user.is_authenticated());
        assert_eq!(user.identifier(), Some("TestId"));
        assert_eq!(user.name(), Some("TestUser"));
    }

    #[test]
    fn test_roles_and_claims() {
        let user = ClaimsPrincipal::builder()
            .with_username("Ivo")
            .in_roles(["Admin", "Editor"])
            .with_claim(Claim::new(claim_types::EMAIL, "ivo@example.com"))
            .build();
        assert!(user.is_in_role("Admin"));
        assert!(!user.is_in_role("Guest"));
        assert_eq!(user.find_first(claim_types::EMAIL), Some("ivo@example.com"));
    }
}
