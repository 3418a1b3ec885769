pub mod badge_service;
pub mod error;
pub mod matching_service;
pub mod notification_service;
pub mod queue;
pub mod reliability_service;
pub mod reminder_service;
