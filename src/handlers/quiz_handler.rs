use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::{not_generated_response, AppError, GenerationOutcome},
    models::dto::{
        request::{FinalQuizRequest, ModuleQuizRequest, RecordAttemptRequest},
        response::{FinalQuizDto, ModuleQuizDto},
    },
};

#[post("/api/attempts")]
pub async fn record_attempt(
    state: web::Data<AppState>,
    request: web::Json<RecordAttemptRequest>,
) -> Result<HttpResponse, AppError> {
    let attempt = state
        .quiz_attempt_service
        .record_attempt(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(attempt))
}

#[get("/api/attempts/{id}")]
pub async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let attempt = state.quiz_attempt_service.get_attempt(&id).await?;
    Ok(HttpResponse::Ok().json(attempt))
}

#[post("/api/quizzes/module")]
pub async fn generate_module_quiz(
    state: web::Data<AppState>,
    request: web::Json<ModuleQuizRequest>,
) -> Result<HttpResponse, AppError> {
    match state
        .quiz_service
        .generate_module_quiz(request.into_inner())
        .await?
    {
        GenerationOutcome::Generated(attempt) => {
            Ok(HttpResponse::Created().json(ModuleQuizDto::from(attempt)))
        }
        GenerationOutcome::NotGenerated(reason) => Ok(not_generated_response(reason)),
    }
}

#[post("/api/quizzes/final")]
pub async fn generate_final_quiz(
    state: web::Data<AppState>,
    request: web::Json<FinalQuizRequest>,
) -> Result<HttpResponse, AppError> {
    match state
        .quiz_service
        .generate_final_quiz(request.into_inner())
        .await?
    {
        GenerationOutcome::Generated(quiz) => {
            Ok(HttpResponse::Created().json(FinalQuizDto::from(quiz)))
        }
        GenerationOutcome::NotGenerated(reason) => Ok(not_generated_response(reason)),
    }
}

#[get("/api/quizzes/final")]
pub async fn get_final_quiz(
    state: web::Data<AppState>,
    query: web::Query<FinalQuizRequest>,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .get_final_quiz(&query.course_id, &query.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(quiz))
}
