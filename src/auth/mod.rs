pub mod bearer;
pub mod provider;
pub mod token;

// Re-export necessary items
pub use bearer::BearerToken;
pub use provider::{initialize, AuthSetupError, Provider, ProviderMetadata};
pub use token::{Claims, DecodeOptions, SigningKey, TokenValidator};

/// Delegated-permission scope carried by tokens obtained on behalf of a
/// signed-in user through the authorization-code flow.
pub const USER_SCOPE: &str = "access_as_user";

/// Role carried by client-credentials tokens issued directly to trusted
/// applications (no signed-in user involved).
pub const APPLICATION_ROLE: &str = "access_as_application";

/// Application roles assigned to users administratively by the identity
/// provider, as opposed to scopes a user consents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    /// May read contact-form submissions.
    ContactReportViewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::ContactReportViewer => "contact_report_viewer",
        }
    }
}

/// Builds the provider-registered form of a scope exposed by this API,
/// e.g. `api://<audience>/access_as_user`.
pub fn local_scope(audience: &str, scope: &str) -> String {
    format!("api://{}/{}", audience, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_scope_format() {
        assert_eq!(
            local_scope("11111111-2222-3333-4444-555555555555", USER_SCOPE),
            "api://11111111-2222-3333-4444-555555555555/access_as_user"
        );
        assert_eq!(local_scope("my-api", ".default"), "api://my-api/.default");
    }

    #[test]
    fn test_role_names() {
        assert_eq!(
            UserRole::ContactReportViewer.as_str(),
            "contact_report_viewer"
        );
    }
}
