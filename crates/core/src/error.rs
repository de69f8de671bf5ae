use thiserror::Error;

use crate::model::CatalogError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    // later:
    // Profile(#[from] ProfileError),
}
