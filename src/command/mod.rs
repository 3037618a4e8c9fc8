// Command routing and the operator session

mod handlers;
mod router;
mod session;

#[cfg(test)]
mod tests;

pub use handlers::{CommandEnvelopeHandler, ScoreLogHandler};
pub use router::{ChatEvent, CommandKind, CommandRouter, RouterError};
pub use session::OperatorSession;
