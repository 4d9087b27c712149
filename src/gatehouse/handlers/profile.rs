use crate::{
    gatehouse::{
        guard::Authenticated,
        handlers::{self, Reply},
        AppState,
    },
    provider::profiles::{self, ProfileRecord},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub bio: String,
}

impl ProfileForm {
    /// Build the upsert row. Same form in, same row out, only the
    /// timestamp differs between submissions.
    fn into_record(self, id: uuid::Uuid) -> ProfileRecord {
        ProfileRecord {
            id,
            full_name: self.full_name,
            username: self.username,
            website: self.website,
            bio: self.bio,
            updated_at: Some(Utc::now()),
        }
    }
}

/// axum handler for reading the profile row; a principal that never saved
/// one gets an empty record, not an error
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile row", body = ProfileRecord, content_type = "application/json"),
        (status = 303, description = "No session, redirect to sign-in"),
    ),
    tag = "protected"
)]
#[instrument(skip(state, auth))]
pub async fn get_profile(
    Extension(state): Extension<AppState>,
    auth: Authenticated,
) -> Response {
    let id = auth.principal().id;

    match profiles::fetch(&state.globals, &auth.0.access_token, id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => Json(ProfileRecord::empty(id)).into_response(),
        Err(e) => handlers::provider_reply(&e).into_response(),
    }
}

/// axum handler for saving the profile row with upsert semantics
#[utoipa::path(
    post,
    path = "/profile",
    request_body = ProfileForm,
    responses(
        (status = 200, description = "Profile saved", body = Reply, content_type = "application/json"),
        (status = 303, description = "No session, redirect to sign-in"),
    ),
    tag = "protected"
)]
#[instrument(skip(state, auth, payload))]
pub async fn update_profile(
    Extension(state): Extension<AppState>,
    auth: Authenticated,
    payload: Option<Json<ProfileForm>>,
) -> (StatusCode, Json<Reply>) {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(Reply::message("Missing payload")));
    };

    let record = payload.into_record(auth.principal().id);

    match profiles::upsert(&state.globals, &auth.0.access_token, &record).await {
        Ok(()) => {
            info!(id = %record.id, "profile saved");

            (
                StatusCode::OK,
                Json(Reply::message("Profile updated successfully!")),
            )
        }
        Err(e) => handlers::provider_reply(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_form_becomes_row_keyed_by_principal() {
        let form: ProfileForm = serde_json::from_str(
            r#"{ "full_name": "Ada Lovelace", "username": "ada", "website": "", "bio": "" }"#,
        )
        .unwrap();

        let id = Uuid::new_v4();
        let record = form.into_record(id);

        assert_eq!(record.id, id);
        assert_eq!(record.username, "ada");
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_form_fields_default_to_empty() {
        let form: ProfileForm = serde_json::from_str(r#"{ "username": "ada" }"#).unwrap();
        assert!(form.full_name.is_empty());
        assert!(form.bio.is_empty());
    }
}
