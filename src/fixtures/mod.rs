pub mod confirmation;
pub mod error;
pub mod selection;
pub mod validation;

pub use confirmation::ConfirmationMachine;
pub use error::{FixtureError, Reference};
pub use selection::SelectionManager;
pub use validation::{ConflictReason, FixtureCandidate, FixtureValidator, CHECK_ORDER};
