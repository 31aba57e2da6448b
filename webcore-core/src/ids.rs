// Component identifiers
//
// Every component is identified by a lowercased, dot-separated name. Ids
// derived from a Rust type use its full type path with `::` replaced by `.`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Normalize a raw identifier: trimmed, lowercased, `::` replaced by `.`.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().replace("::", ".").to_lowercase()
}

/// Identifier derived from a type's full path.
pub fn type_id_string<T: ?Sized>() -> String {
    normalize_id(std::any::type_name::<T>())
}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an id from a raw string (normalized).
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(Arc::from(normalize_id(raw.as_ref())))
            }

            /// Create the id of a marker type.
            pub fn of<T: ?Sized>() -> Self {
                Self(Arc::from(type_id_string::<T>()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), &*self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a loaded plugin.
    PluginId
);
define_id!(
    /// Identifier of an application.
    ApplicationId
);
define_id!(
    /// Identifier of a module. Module references are matched case-insensitively,
    /// which normalization guarantees.
    ModuleId
);
define_id!(
    /// Identifier of an endpoint type, unique per type.
    EndpointId
);

#[cfg(test)]
mod tests {
    use super::*;

    mod sample {
        pub struct TestResourceA1X;
    }

    #[test]
    fn test_ids_are_lowercased_type_paths() {
        let id = EndpointId::of::<sample::TestResourceA1X>();
        assert!(id.as_str().ends_with("ids.tests.sample.testresourcea1x"));
        assert!(!id.as_str().contains("::"));
        assert_eq!(id.as_str(), id.as_str().to_lowercase());
    }

    #[test]
    fn test_new_normalizes() {
        assert_eq!(ModuleId::new("  WebCore::Test::Module "), ModuleId::new("webcore.test.module"));
        assert!(PluginId::new("").is_empty());
    }

    #[test]
    fn test_display_and_debug() {
        let id = ApplicationId::new("webcore.app");
        assert_eq!(id.to_string(), "webcore.app");
        assert_eq!(format!("{:?}", id), "ApplicationId(\"webcore.app\")");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = PluginId::new("webcore.demo");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"webcore.demo\"");

        let parsed: ModuleId = serde_json::from_str("\"webcore.test.module\"").unwrap();
        assert_eq!(parsed, ModuleId::new("webcore.test.module"));
    }
}
