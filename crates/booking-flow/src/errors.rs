use thiserror::Error;

use railbook_core_types::SurfaceError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("not logged in; log in to the site before starting")]
    NotLoggedIn,
    #[error("a booking run is already active or scheduled")]
    AlreadyActive,
    #[error("cannot change {} while a run is active or scheduled", .0.join(", "))]
    ConfigLocked(Vec<&'static str>),
    #[error("{0} is required")]
    MissingPort(&'static str),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
