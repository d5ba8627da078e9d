use super::{ApiClient, ApiResult, read_envelope};
use crate::types::AuthResponse;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let response = self
            .http
            .post(self.backend_url("/api/auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await?;
        let data: AuthResponse = read_envelope(response).await?;
        self.keep_token(&data);
        Ok(data)
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let response = self
            .http
            .post(self.backend_url("/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let data: AuthResponse = read_envelope(response).await?;
        self.keep_token(&data);
        Ok(data)
    }

    /// Drop the stored token; there is no server-side session to end.
    pub fn logout(&self) {
        self.remove_token();
    }

    fn keep_token(&self, data: &AuthResponse) {
        if data.success
            && let Some(token) = data.token.as_deref()
        {
            info!("signed in");
            self.set_token(token);
        }
    }
}
