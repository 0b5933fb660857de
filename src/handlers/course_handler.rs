use actix_web::{delete, get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::{DeleteCourseRequest, GenerateCourseRequest},
        response::GenerationJobDto,
    },
};

#[post("/api/courses/generate")]
pub async fn generate_course(
    state: web::Data<AppState>,
    request: web::Json<GenerateCourseRequest>,
) -> Result<HttpResponse, AppError> {
    let job = state
        .course_service
        .start_generation(request.into_inner())
        .await?;
    Ok(HttpResponse::Accepted().json(GenerationJobDto::from(job)))
}

#[get("/api/courses/{id}")]
pub async fn get_course(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let course = state.course_service.get_course(&id).await?;
    Ok(HttpResponse::Ok().json(course))
}

#[delete("/api/courses")]
pub async fn delete_course(
    state: web::Data<AppState>,
    request: web::Json<DeleteCourseRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .course_service
        .delete_course(request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}
