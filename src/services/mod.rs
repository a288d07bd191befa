pub mod engagement_service;
pub mod feature_extractor;
pub mod match_scorer;
pub mod matching_service;
pub mod milestone_detector;
pub mod outreach_service;
pub mod reengagement_service;
pub mod workflow_service;
