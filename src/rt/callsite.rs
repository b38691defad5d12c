//! Per-type table of call-site bindings

use std::collections::HashMap;

use log::{debug, warn};
use once_cell::sync::OnceCell;

use super::accessor::Accessor;
use crate::error::ResolveError;

/// Identity of a call site: the method and the instruction within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId {
    pub method: usize,
    pub instruction: usize,
}

type Binding = Result<Accessor, ResolveError>;

/// One binding cell per `invokedynamic` of a type.
///
/// A cell starts unbound and is set exactly once by the first execution of its
/// site. Concurrent first callers block in `get_or_init` until the binding is
/// visible; afterwards reads take no lock. Failures are bound like successes.
pub struct CallSiteTable {
    sites: HashMap<SiteId, OnceCell<Binding>>,
}

impl CallSiteTable {
    pub(crate) fn new(sites: impl IntoIterator<Item = SiteId>) -> Self {
        Self { sites: sites.into_iter().map(|id| (id, OnceCell::new())).collect() }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contains(&self, id: SiteId) -> bool {
        self.sites.contains_key(&id)
    }

    /// The binding for `id`, running `resolve` if the site is still unbound.
    /// Returns `None` for an unknown site.
    pub fn bind_with(&self, id: SiteId, resolve: impl FnOnce() -> Binding) -> Option<&Binding> {
        let cell = self.sites.get(&id)?;
        Some(cell.get_or_init(|| {
            let binding = resolve();
            match &binding {
                Ok(accessor) => debug!("bound site {:?} to {:?}", id, accessor),
                Err(e) => warn!("site {:?} failed to link: {}", id, e),
            }
            binding
        }))
    }

    /// Binding of a site if it has been resolved
    pub fn binding(&self, id: SiteId) -> Option<&Binding> {
        self.sites.get(&id).and_then(OnceCell::get)
    }

    pub fn is_bound(&self, id: SiteId) -> bool {
        self.binding(id).is_some()
    }

    pub fn bound_count(&self) -> usize {
        self.sites.values().filter(|cell| cell.get().is_some()).count()
    }
}

impl std::fmt::Debug for CallSiteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSiteTable")
            .field("sites", &self.sites.len())
            .field("bound", &self.bound_count())
            .finish()
    }
}
