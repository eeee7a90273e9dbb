pub mod activation_service;
pub mod grading_service;
pub mod quiz_service;
pub mod result_service;
pub mod session_service;
pub mod violation_service;
