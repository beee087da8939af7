mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod program;
pub use program::{Program, ProgramCreate};

mod course;
pub use course::{Course, CourseCreate};

mod module;
pub use module::{Module, ModuleCreate};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonLocator};

mod enrollment;
pub use enrollment::{CourseProgressEntry, Enrollment, EnrollmentCreate, EnrollmentStatus};

mod progress;
pub use progress::{
    LessonState, LessonStatus, ModuleMap, ModuleProgress, ProgressDoc, ProgressScope,
};

mod scholarship;
pub use scholarship::{DiscountType, Scholarship, ScholarshipCreate, ScholarshipStatus};

mod submission;
pub use submission::{Submission, SubmissionCreate, SubmissionStats};

mod certificate;
pub use certificate::{
    Certificate, CertificateCreate, CertificateStatus, CertificateVerificationRow,
};

mod notification;
pub use notification::{Notification, NotificationCreate};
