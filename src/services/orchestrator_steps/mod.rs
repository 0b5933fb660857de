pub mod course_steps;

pub use course_steps::create_course_generation_steps;
