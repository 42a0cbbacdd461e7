//! Request middleware: outcome logging and panic isolation

mod logger;
mod recorder;
mod recover;

pub use logger::request_logger;
pub use recorder::{RecordedBody, ResponseRecorder};
pub use recover::{recoverer, supervise, RuntimeFault};

use axum::middleware::from_fn;
use axum::Router;

/// Wrap every route of `router` in the logger, with the recoverer outermost
/// so a recovered panic still produces a logged 500.
pub fn wrap(router: Router) -> Router {
    router
        .layer(from_fn(request_logger))
        .layer(from_fn(recoverer))
}
