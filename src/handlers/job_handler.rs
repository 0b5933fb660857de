use actix_web::{delete, get, post, web, web::Bytes, HttpResponse};
use futures::{future, stream, StreamExt};
use tokio::sync::broadcast::{error::RecvError, Receiver};

use crate::{
    app_state::AppState,
    errors::AppError,
    models::{
        domain::JobStatus,
        dto::{request::JobListQuery, response::GenerationJobDto},
    },
    services::job_events::JobEvent,
};

#[get("/api/jobs")]
pub async fn list_jobs(
    state: web::Data<AppState>,
    query: web::Query<JobListQuery>,
) -> Result<HttpResponse, AppError> {
    let jobs: Vec<GenerationJobDto> = state
        .course_service
        .list_jobs(query.into_inner().status)
        .await?
        .into_iter()
        .map(GenerationJobDto::from)
        .collect();
    Ok(HttpResponse::Ok().json(jobs))
}

#[get("/api/jobs/{id}")]
pub async fn get_job(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job = state.course_service.get_job(&id).await?;
    Ok(HttpResponse::Ok().json(GenerationJobDto::from(job)))
}

#[post("/api/jobs/{id}/resume")]
pub async fn resume_job(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job = state.job_runner.resume(&id).await?;
    Ok(HttpResponse::Accepted().json(GenerationJobDto::from(job)))
}

#[delete("/api/jobs/{id}")]
pub async fn cancel_job(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job = state.job_runner.cancel(&id).await?;
    Ok(HttpResponse::Ok().json(GenerationJobDto::from(job)))
}

/// Next event for `job_id`; `None` once the channel closes.
async fn next_event(rx: &mut Receiver<JobEvent>, job_id: &str) -> Option<JobEvent> {
    loop {
        match rx.recv().await {
            Ok(event) if event.job_id == job_id => return Some(event),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("Event stream for job {} skipped {} events", job_id, skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Server-Sent Events: a status frame, then live progress until the run ends.
#[get("/api/jobs/{id}/events")]
pub async fn stream_job_events(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let job_id = id.into_inner();
    // Subscribe before reading the job so no event falls between the two.
    let rx = state.events.subscribe();
    let job = state.course_service.get_job(&job_id).await?;

    let finished = !matches!(job.status, JobStatus::Pending | JobStatus::Running);
    let status_frame = format!(
        "event: status\ndata: {}\n\n",
        serde_json::to_string(&GenerationJobDto::from(job))?
    );

    let live = stream::unfold((rx, finished), move |(mut rx, done)| {
        let job_id = job_id.clone();
        async move {
            if done {
                return None;
            }
            let event = next_event(&mut rx, &job_id).await?;
            let terminal = event.is_terminal();
            Some((Ok::<_, actix_web::Error>(Bytes::from(event.to_sse())), (rx, terminal)))
        }
    });
    let body = stream::once(future::ready(Ok::<_, actix_web::Error>(Bytes::from(status_frame))))
        .chain(live);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}
