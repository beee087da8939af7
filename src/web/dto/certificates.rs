use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CertificateIssueBody {
    pub student_id: Uuid,
    pub course_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
}
