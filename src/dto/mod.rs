pub mod engagement_dto;
pub mod matching_dto;
pub mod workflow_dto;
