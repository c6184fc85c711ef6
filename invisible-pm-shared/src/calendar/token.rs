/// Stored Microsoft tokens
///
/// Access tokens are refreshed lazily: when one is within
/// [`REFRESH_BUFFER_SECONDS`] of expiry the stored refresh token is exchanged
/// and the new pair persisted before the caller uses it.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::provider::CalendarProvider;
use super::CalendarResult;
use crate::models::account::{ExternalAccount, MICROSOFT_PROVIDER};

/// Refresh this many seconds before the recorded expiry
pub const REFRESH_BUFFER_SECONDS: i64 = 300;

/// True when a token expiring at `expires_at` should be refreshed at `now`.
/// A missing expiry is treated as still valid.
pub fn needs_refresh(expires_at: Option<i64>, now: i64) -> bool {
    match expires_at {
        Some(exp) => exp - REFRESH_BUFFER_SECONDS <= now,
        None => false,
    }
}

/// Usable Microsoft access token for `user_id`
///
/// Returns `Ok(None)` when the user has no linked account, no stored access
/// token, or the refresh failed. Database errors propagate.
pub async fn access_token_for<P>(
    pool: &PgPool,
    provider: &P,
    user_id: Uuid,
) -> CalendarResult<Option<String>>
where
    P: CalendarProvider + ?Sized,
{
    let Some(account) = ExternalAccount::find_for_user(pool, user_id, MICROSOFT_PROVIDER).await?
    else {
        return Ok(None);
    };

    let Some(access_token) = account.access_token.clone() else {
        return Ok(None);
    };

    if !needs_refresh(account.expires_at, Utc::now().timestamp()) {
        return Ok(Some(access_token));
    }

    let Some(refresh_token) = account.refresh_token.as_deref() else {
        warn!(user_id = %user_id, "Microsoft token expired and no refresh token is stored");
        return Ok(None);
    };

    match provider.refresh_token(refresh_token).await {
        Ok(refreshed) => {
            ExternalAccount::update_tokens(
                pool,
                account.id,
                &refreshed.access_token,
                refreshed.refresh_token.as_deref(),
                refreshed.expires_at,
            )
            .await?;

            info!(user_id = %user_id, "Refreshed Microsoft access token");
            Ok(Some(refreshed.access_token))
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Microsoft token refresh failed");
            Ok(None)
        }
    }
}
