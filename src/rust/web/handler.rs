use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use log::{error, warn};

use crate::record::{MenuForm, ValidationError};
use crate::service::SubmitError;
use crate::web::view::{render_page, Outcome};
use crate::web::AppState;

pub async fn index(State(state): State<AppState>) -> (StatusCode, Html<String>) {
    let status = match state.service.artifacts() {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Html(render_page(&state.service, &MenuForm::default(), &Outcome::Idle)))
}

pub async fn predict(
    State(state): State<AppState>,
    form: Result<Form<MenuForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            warn!("Unreadable form submission: {}", rejection.body_text());
            let outcome = Outcome::Failed(SubmitError::Validation(ValidationError::MalformedForm(
                rejection.body_text(),
            )));
            return (
                rejection.status(),
                Html(render_page(&state.service, &MenuForm::default(), &outcome)),
            );
        }
    };

    let result = state.service.submit_async(&form).await;

    let (status, outcome) = match result {
        Ok(prediction) => (StatusCode::OK, Outcome::Predicted(prediction)),
        Err(e) => {
            let status = match &e {
                SubmitError::ArtifactMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
                SubmitError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SubmitError::Inference(_) => {
                    error!("{}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Outcome::Failed(e))
        }
    };

    (status, Html(render_page(&state.service, &form, &outcome)))
}
