use crate::api;
use crate::api::handlers::auth::{AuthConfig, AuthState, TokenCodec};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            secret,
            frontend_url,
            access_ttl_minutes,
            refresh_ttl_days,
            rotate_refresh,
        } => {
            let config = AuthConfig::new(frontend_url)
                .with_access_ttl_seconds(access_ttl_minutes * 60)
                .with_refresh_ttl_seconds(refresh_ttl_days * 24 * 60 * 60)
                .with_rotate_refresh(rotate_refresh);

            // A weak signing secret is a configuration error, not a per-request one.
            let codec = TokenCodec::new(secret).context("invalid signing secret")?;
            let auth_state =
                Arc::new(AuthState::new(config, codec).context("failed to build auth state")?);

            api::new(port, dsn, auth_state).await?;
        }
    }

    Ok(())
}
