pub mod activation;
pub mod profile;
pub mod quiz;
pub mod quiz_result;
pub mod violation;
