#![forbid(unsafe_code)]

pub mod error;
pub mod practice;
pub mod store;
pub mod view;

pub use tutor_core::Clock;

pub use error::{ProgressStoreError, StoreInitError};
pub use practice::{PracticeFlow, SubmitOutcome};
pub use store::ProgressStore;
pub use view::{NO_ERRORS_SENTINEL, ProgressOverview, past_errors_summary};
