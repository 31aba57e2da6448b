//! Endpoint metadata
//!
//! The flat key/value bag a plugin declares per endpoint type: where the
//! endpoint sits in the sitemap, which module it belongs to and which
//! requests it is eligible for. Declared with a builder:
//!
//! ```rust
//! use webcore_core::metadata::EndpointMetadata;
//!
//! struct Admin;
//! struct Dashboard;
//!
//! let metadata = EndpointMetadata::new()
//!     .segment("settings", "title.settings")
//!     .parent::<Dashboard>()
//!     .module::<Admin>()
//!     .scope("admin")
//!     .include_sub_paths(true)
//!     .cache();
//!
//! assert_eq!(metadata.segment.to_string(), "/settings");
//! assert!(metadata.cache);
//! ```

use crate::ids::{EndpointId, ModuleId, normalize_id, type_id_string};
use crate::sitemap::SearchContext;
use crate::uri::UriResource;
use std::fmt;
use std::sync::Arc;

/// The endpoint families known to the hub.
///
/// Used both as the family tag of a manager and as the marker list of a
/// descriptor. A descriptor belongs to a family when it carries the family's
/// marker and none of the markers that are more specific than it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointKind {
    Resource,
    Page,
    RestApi,
    StatusPage,
}

impl EndpointKind {
    pub const ALL: [EndpointKind; 4] = [
        EndpointKind::Resource,
        EndpointKind::Page,
        EndpointKind::RestApi,
        EndpointKind::StatusPage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Resource => "resource",
            EndpointKind::Page => "page",
            EndpointKind::RestApi => "rest_api",
            EndpointKind::StatusPage => "status_page",
        }
    }

    /// Markers that take a type out of this family's scan.
    pub fn more_specific(&self) -> &'static [EndpointKind] {
        match self {
            EndpointKind::Resource | EndpointKind::Page => &[EndpointKind::StatusPage],
            EndpointKind::RestApi | EndpointKind::StatusPage => &[],
        }
    }

    /// Whether a descriptor with these markers belongs to this family.
    pub fn accepts(&self, markers: &[EndpointKind]) -> bool {
        markers.contains(self) && !self.more_specific().iter().any(|m| markers.contains(m))
    }

    /// Position used to order entries deterministically in the sitemap.
    pub fn order(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate evaluated per request to gate endpoint eligibility.
pub trait Condition: Send + Sync {
    fn fulfillment(&self, context: &SearchContext) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&SearchContext) -> bool + Send + Sync,
{
    fn fulfillment(&self, context: &SearchContext) -> bool {
        self(context)
    }
}

/// Declared metadata of one endpoint type.
#[derive(Clone, Default)]
pub struct EndpointMetadata {
    /// Path segment below the parent or module (may span several segments)
    pub segment: UriResource,
    /// i18n key of the segment's title, used for breadcrumbs
    pub segment_title: Option<String>,
    pub title: Option<String>,
    pub parent: Option<EndpointId>,
    pub module: Option<ModuleId>,
    /// Extra path inserted between the parent/module path and the segment
    pub context_path: Option<UriResource>,
    pub include_sub_paths: bool,
    /// Normalized scope names
    pub scopes: Vec<String>,
    pub conditions: Vec<Arc<dyn Condition>>,
    pub cache: bool,
    pub optional: bool,
    /// Status code handled by a status page
    pub status_code: Option<u16>,
}

impl EndpointMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment(mut self, path: &str, title_key: impl Into<String>) -> Self {
        self.segment = UriResource::from_path(path);
        let title_key = title_key.into();
        self.segment_title = (!title_key.is_empty()).then_some(title_key);
        self
    }

    pub fn title(mut self, key: impl Into<String>) -> Self {
        self.title = Some(key.into());
        self
    }

    pub fn parent<T: ?Sized>(mut self) -> Self {
        self.parent = Some(EndpointId::of::<T>());
        self
    }

    pub fn parent_id(mut self, id: impl Into<EndpointId>) -> Self {
        self.parent = Some(id.into());
        self
    }

    pub fn module<M: ?Sized>(mut self) -> Self {
        self.module = Some(ModuleId::of::<M>());
        self
    }

    pub fn module_id(mut self, id: impl Into<ModuleId>) -> Self {
        self.module = Some(id.into());
        self
    }

    pub fn context_path(mut self, path: &str) -> Self {
        self.context_path = Some(UriResource::from_path(path));
        self
    }

    pub fn include_sub_paths(mut self, include: bool) -> Self {
        self.include_sub_paths = include;
        self
    }

    pub fn scope(mut self, scope: &str) -> Self {
        let scope = normalize_id(scope);
        if !scope.is_empty() && !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Scope named after a marker type
    pub fn scope_of<S: ?Sized>(self) -> Self {
        let name = type_id_string::<S>();
        self.scope(&name)
    }

    pub fn condition(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn cache(mut self) -> Self {
        self.cache = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// The declared module, unless missing or empty.
    pub fn module_ref(&self) -> Option<&ModuleId> {
        self.module.as_ref().filter(|id| !id.is_empty())
    }
}

impl fmt::Debug for EndpointMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointMetadata")
            .field("segment", &self.segment.to_string())
            .field("segment_title", &self.segment_title)
            .field("title", &self.title)
            .field("parent", &self.parent)
            .field("module", &self.module)
            .field("context_path", &self.context_path.as_ref().map(|p| p.to_string()))
            .field("include_sub_paths", &self.include_sub_paths)
            .field("scopes", &self.scopes)
            .field("conditions", &self.conditions.len())
            .field("cache", &self.cache)
            .field("optional", &self.optional)
            .field("status_code", &self.status_code)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ModuleMarker;
    struct Parent;
    struct AdminScope;

    #[test]
    fn test_family_acceptance() {
        use EndpointKind::*;

        assert!(Resource.accepts(&[Resource]));
        assert!(Page.accepts(&[Page]));
        assert!(!Page.accepts(&[Page, StatusPage]));
        assert!(!Resource.accepts(&[Resource, StatusPage]));
        assert!(StatusPage.accepts(&[Page, StatusPage]));
        assert!(RestApi.accepts(&[RestApi]));
        assert!(!RestApi.accepts(&[Resource]));
    }

    #[test]
    fn test_each_marker_set_has_one_family() {
        use EndpointKind::*;

        for markers in [vec![Resource], vec![Page], vec![RestApi], vec![Page, StatusPage]] {
            let families = EndpointKind::ALL
                .iter()
                .filter(|kind| kind.accepts(&markers))
                .count();
            assert_eq!(families, 1, "{:?}", markers);
        }
    }

    #[test]
    fn test_builder() {
        let metadata = EndpointMetadata::new()
            .segment("/a1y/", "title.a1y")
            .title("A1Y")
            .parent::<Parent>()
            .module::<ModuleMarker>()
            .context_path("extra")
            .scope("Admin")
            .scope("admin")
            .scope_of::<AdminScope>()
            .optional();

        assert_eq!(metadata.segment.segments(), ["a1y"]);
        assert_eq!(metadata.segment_title.as_deref(), Some("title.a1y"));
        assert_eq!(metadata.parent, Some(EndpointId::of::<Parent>()));
        assert_eq!(metadata.module_ref(), Some(&ModuleId::of::<ModuleMarker>()));
        assert_eq!(metadata.scopes.len(), 2);
        assert!(metadata.scopes.contains(&"admin".to_string()));
        assert!(metadata.optional);
        assert!(!metadata.cache);
    }

    #[test]
    fn test_empty_module_is_missing() {
        let metadata = EndpointMetadata::new().module_id("");
        assert!(metadata.module_ref().is_none());
        assert!(EndpointMetadata::new().module_ref().is_none());
    }
}
