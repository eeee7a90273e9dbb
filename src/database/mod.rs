pub mod activation_repo;
pub mod pool;
pub mod profile_repo;
pub mod quiz_repo;
pub mod result_repo;
pub mod violation_repo;
