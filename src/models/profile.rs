use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Read-only view of a student account, owned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StudentProfile {
    pub id: String,
    pub full_name: String,
    pub department: String,
    pub division: Option<String>,
    pub prn: Option<String>,
    pub college_year: Option<i32>,
    pub semester: Option<i32>,
}

impl StudentProfile {
    pub fn snapshot(&self) -> super::quiz_result::AcademicSnapshot {
        super::quiz_result::AcademicSnapshot {
            prn: self.prn.clone(),
            division: self.division.clone(),
            department: self.department.clone(),
            college_year: self.college_year,
            semester: self.semester,
        }
    }
}
