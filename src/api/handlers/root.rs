use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::auth::{AuthInset, Outcome, Page};

/// Render the JSON page with whatever the auth resolver contributes.
pub async fn root(mut inset: AuthInset) -> Response {
    let mut page = Page::default();
    let mut headers = HeaderMap::new();

    match inset.contribute(&mut page, &mut headers).await {
        Ok(Outcome::Rendered) => (headers, Json(page)).into_response(),
        Ok(Outcome::Redirect(redirect)) => redirect.into_response(),
        Err(err) => {
            error!("Failed to resolve visitor on {}: {}", inset.request().path(), err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
