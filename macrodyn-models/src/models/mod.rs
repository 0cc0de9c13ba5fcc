pub mod goodwin;
pub mod goodwin_keen;

use macrodyn_core::catalog::ModelCatalog;

/// A catalog holding every model shipped with this crate.
pub fn catalog() -> ModelCatalog {
    let mut catalog = ModelCatalog::new();
    catalog.register(goodwin::NAME, goodwin::definition);
    catalog.register(goodwin_keen::NAME, goodwin_keen::definition);
    catalog
}
