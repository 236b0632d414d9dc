pub mod detector;
pub mod urls;
pub mod walker;

use crate::results::Strategy;

pub use detector::detect;
pub use walker::Walker;

/// How a site advances between pages. Chosen once per run, before the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationPlan<E> {
    /// A control on the page loads more content in place when clicked
    ButtonDriven {
        control: E,
        /// The hint token that located the control
        hint: String,
    },
    /// Each page has its own URL, derived from the base URL
    UrlPattern { uses_placeholder: bool },
}

impl<E> PaginationPlan<E> {
    pub fn strategy(&self) -> Strategy {
        match self {
            PaginationPlan::ButtonDriven { hint, .. } => Strategy::Button { hint: hint.clone() },
            PaginationPlan::UrlPattern { uses_placeholder } => Strategy::UrlPattern {
                uses_placeholder: *uses_placeholder,
            },
        }
    }
}
