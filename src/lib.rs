pub mod chain;
pub mod config;
pub mod directory;
pub mod error;
pub mod form;
pub mod listing;
pub mod notify;
pub mod role;
pub mod scope;
pub mod service;
pub mod stats;
pub mod template;
pub mod utils;

pub use chain::{ApprovalChain, ApproverEntry, FormStatus};
pub use error::ApprovalError;
pub use service::FormService;
