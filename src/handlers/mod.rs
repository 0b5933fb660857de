pub mod course_handler;
pub mod health_handler;
pub mod job_handler;
pub mod quiz_handler;
pub mod session_handler;

use actix_web::web;

pub use course_handler::{delete_course, generate_course, get_course};
pub use health_handler::{health_check, health_check_live, health_check_ready};
pub use job_handler::{cancel_job, get_job, list_jobs, resume_job, stream_job_events};
pub use quiz_handler::{
    generate_final_quiz, generate_module_quiz, get_attempt, get_final_quiz, record_attempt,
};
pub use session_handler::{create_session, delete_session, get_session};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(health_check_live)
        .service(health_check_ready)
        .service(generate_course)
        .service(get_course)
        .service(delete_course)
        .service(list_jobs)
        .service(get_job)
        .service(resume_job)
        .service(cancel_job)
        .service(stream_job_events)
        .service(record_attempt)
        .service(get_attempt)
        .service(generate_module_quiz)
        .service(generate_final_quiz)
        .service(get_final_quiz)
        .service(create_session)
        .service(get_session)
        .service(delete_session);
}
