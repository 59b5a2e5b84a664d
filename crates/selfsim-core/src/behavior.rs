//! Prioritized attempt chains.
//!
//! Organism behaviors are often "try this, else that, else something
//! else". Each step is an [`Attempt`] that either does its thing and
//! reports [`Outcome::Done`] or finds it does not apply and reports
//! [`Outcome::Declined`]; [`first_success`] runs them in priority order.
//! Errors are reserved for real failures and abort the chain.

use crate::entity::{Context, EntityError};

/// What an attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The attempt applied and acted.
    Done,
    /// The attempt did not apply; try the next one.
    Declined,
}

/// One step in a prioritized chain.
pub type Attempt<E> = fn(&mut E, &mut Context<'_>) -> Result<Outcome, EntityError>;

/// Run `attempts` in order until one reports [`Outcome::Done`].
///
/// Returns [`Outcome::Declined`] if every attempt declined.
///
/// # Errors
///
/// Returns the first error an attempt raises; later attempts do not run.
pub fn first_success<E>(
    entity: &mut E,
    ctx: &mut Context<'_>,
    attempts: &[Attempt<E>],
) -> Result<Outcome, EntityError> {
    for attempt in attempts {
        if attempt(entity, ctx)? == Outcome::Done {
            return Ok(Outcome::Done);
        }
    }
    Ok(Outcome::Declined)
}
