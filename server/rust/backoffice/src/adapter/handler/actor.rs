use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AppError;
use crate::domain::entity::notification::ViewerRole;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Actor はリクエストの実行者を表す。認証は前段のゲートウェイで済んでいる前提で、
/// X-Actor-Id / X-Actor-Role ヘッダから取り出す。
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Option<ViewerRole>,
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::unauthorized("SYS_BO_ACTOR_REQUIRED", "X-Actor-Id header is required")
            })?
            .to_string();

        let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
            None => None,
            Some(v) => {
                let raw = v.to_str().unwrap_or_default();
                Some(ViewerRole::parse(raw).ok_or_else(|| {
                    AppError::bad_request(
                        "SYS_BO_VALIDATION_FAILED",
                        &format!("unknown actor role: {}", raw),
                    )
                })?)
            }
        };

        Ok(Self { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(req: Request<()>) -> Result<Actor, AppError> {
        let (mut parts, _) = req.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_actor_from_headers() {
        let req = Request::builder()
            .header("X-Actor-Id", "reviewer@example.com")
            .header("X-Actor-Role", "Reviewer")
            .body(())
            .unwrap();
        let actor = extract(req).await.unwrap();
        assert_eq!(actor.id, "reviewer@example.com");
        assert_eq!(actor.role, Some(ViewerRole::Reviewer));
    }

    #[tokio::test]
    async fn test_missing_actor_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_role_is_bad_request() {
        let req = Request::builder()
            .header("X-Actor-Id", "someone")
            .header("X-Actor-Role", "admin")
            .body(())
            .unwrap();
        let err = extract(req).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
