pub mod activation_dto;
pub mod quiz_dto;
pub mod result_dto;
pub mod session_dto;
pub mod violation_dto;
