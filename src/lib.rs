//! Convenience facade over the macrodyn workspace.
//!
//! Re-exports the core engine ([`macrodyn_core`]) and the shipped model
//! library ([`macrodyn_models`]).
//!
//! ```
//! use macrodyn::hub::Hub;
//! use macrodyn::integrator::{Scheme, Verbosity};
//! use macrodyn::results::FieldFilter;
//!
//! let catalog = macrodyn::models::catalog();
//! let mut hub = Hub::from_catalog(&catalog, "goodwin", Some("default"), None).unwrap();
//! hub.run(Scheme::Rk4, 0.01, 100, Verbosity::Silent).unwrap();
//! let employment = hub.get_results(&FieldFilter::Names(vec!["lambda".to_string()])).unwrap();
//! assert_eq!(employment.times().len(), 101);
//! ```

pub use macrodyn_core::{
    catalog, errors, evaluator, field, hub, integrator, registry, resolver, results, state,
};

pub mod models {
    pub use macrodyn_models::catalog;
    pub use macrodyn_models::models::{goodwin, goodwin_keen};
}
