//! Service layer: validation, authorization, and reconciliation glue
//! between the HTTP handlers and the repositories.

pub mod channel_service;
pub mod property_service;
pub mod tag_service;

pub use channel_service::ChannelService;
pub use property_service::PropertyService;
pub use tag_service::TagService;
