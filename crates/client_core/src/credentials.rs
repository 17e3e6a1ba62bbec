use async_trait::async_trait;

/// Source of the bearer token every entry store call needs.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

pub struct StaticCredentials(String);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Option<String> {
        let token = self.0.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

pub struct MissingCredentials;

#[async_trait]
impl CredentialProvider for MissingCredentials {
    async fn bearer_token(&self) -> Option<String> {
        None
    }
}
