pub mod diagnosis;
pub mod rubric;
