use actix_web::{delete, get, post, web, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::{
        domain::CourseSession,
        dto::{request::CreateSessionRequest, response::MessageResponse},
    },
};

#[post("/api/sessions")]
pub async fn create_session(
    state: web::Data<AppState>,
    request: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let course = state.course_service.get_course(&request.course_id).await?;
    let session = state
        .sessions
        .create(CourseSession {
            session_id: request.session_id,
            course_id: course.id,
            owner: course.owner,
            title: course.title,
            created_at: Utc::now(),
        })
        .await?;
    Ok(HttpResponse::Created().json(session))
}

#[get("/api/sessions/{id}")]
pub async fn get_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let session = state
        .sessions
        .lookup(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session '{}' not found", id)))?;
    Ok(HttpResponse::Ok().json(session))
}

#[delete("/api/sessions/{id}")]
pub async fn delete_session(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    if !state.sessions.delete(&id).await? {
        return Err(AppError::NotFound(format!("Session '{}' not found", id)));
    }
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Session '{}' deleted", id),
    }))
}
