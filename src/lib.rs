//! MailHub — email content pipeline: spam scoring, AI-assisted refinement,
//! delivery orchestration.

pub mod ai;
pub mod config;
pub mod delivery;
pub mod error;
pub mod model;
pub mod refine;
pub mod spam;
pub mod store;
pub mod transport;
