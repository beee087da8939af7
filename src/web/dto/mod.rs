pub mod certificates;
pub mod enrollments;
pub mod progress;
pub mod scholarships;
