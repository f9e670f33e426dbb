//! Library references and platform filtering.
//!
//! A package lists the libraries it links against either as bare names,
//! valid everywhere, or as references tagged with the platforms they apply
//! to:
//!
//! ```toml
//! libs = ["m", { name = "ws2_32", platforms = "win32" },
//!        { name = "dl", platforms = ["linux", "darwin"] }]
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builder::errors::BuildError;

/// The platforms a tagged library applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformSet {
    /// A single platform identifier
    One(String),
    /// Any of several platform identifiers
    Many(BTreeSet<String>),
}

impl PlatformSet {
    /// Check if `platform` is a member of this set.
    pub fn contains(&self, platform: &str) -> bool {
        match self {
            PlatformSet::One(p) => p == platform,
            PlatformSet::Many(set) => set.contains(platform),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            PlatformSet::One(p) => p.is_empty(),
            PlatformSet::Many(set) => set.is_empty(),
        }
    }
}

/// A library to link against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryRef {
    /// Valid on every platform
    Bare(String),
    /// Valid only on the listed platforms
    Tagged { name: String, platforms: PlatformSet },
}

impl LibraryRef {
    /// Create a bare library reference.
    pub fn bare(name: impl Into<String>) -> Self {
        LibraryRef::Bare(name.into())
    }

    /// Create a reference valid on a single platform.
    pub fn on(name: impl Into<String>, platform: impl Into<String>) -> Self {
        LibraryRef::Tagged {
            name: name.into(),
            platforms: PlatformSet::One(platform.into()),
        }
    }

    /// Create a reference valid on any of several platforms.
    pub fn on_any<I, S>(name: impl Into<String>, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LibraryRef::Tagged {
            name: name.into(),
            platforms: PlatformSet::Many(platforms.into_iter().map(Into::into).collect()),
        }
    }

    /// Get the link-line name.
    pub fn name(&self) -> &str {
        match self {
            LibraryRef::Bare(name) => name,
            LibraryRef::Tagged { name, .. } => name,
        }
    }

    /// Check if this library applies to `platform`.
    pub fn is_valid_for(&self, platform: &str) -> bool {
        match self {
            LibraryRef::Bare(_) => true,
            LibraryRef::Tagged { platforms, .. } => platforms.contains(platform),
        }
    }

    /// Reject references that cannot produce a link-line token.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.name().trim().is_empty() {
            return Err(BuildError::config("library entry has an empty name"));
        }
        if let LibraryRef::Tagged { name, platforms } = self {
            if platforms.is_empty() {
                return Err(BuildError::config(format!(
                    "library `{}` is tagged with an empty platform list",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryRef::Bare(name) => write!(f, "{}", name),
            LibraryRef::Tagged {
                name,
                platforms: PlatformSet::One(p),
            } => write!(f, "{} ({})", name, p),
            LibraryRef::Tagged {
                name,
                platforms: PlatformSet::Many(set),
            } => {
                let list: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{} ({})", name, list.join(", "))
            }
        }
    }
}

/// Select the libraries that apply to `platform`.
///
/// Input order is preserved; link order is significant for some linkers.
pub fn filter_libraries(libs: &[LibraryRef], platform: &str) -> Vec<String> {
    libs.iter()
        .filter(|lib| lib.is_valid_for(platform))
        .map(|lib| lib.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<LibraryRef> {
        vec![
            LibraryRef::bare("core"),
            LibraryRef::on("ws2_32", "win32"),
            LibraryRef::bare("z"),
            LibraryRef::on_any("dl", ["linux", "darwin"]),
            LibraryRef::bare("m"),
        ]
    }

    #[test]
    fn test_bare_names_always_pass() {
        let libs = vec![LibraryRef::bare("m"), LibraryRef::bare("pthread")];
        assert_eq!(filter_libraries(&libs, "win32"), vec!["m", "pthread"]);
        assert_eq!(filter_libraries(&libs, "haiku"), vec!["m", "pthread"]);
    }

    #[test]
    fn test_single_platform_tag() {
        let libs = vec![LibraryRef::on("ws2_32", "win32")];
        assert_eq!(filter_libraries(&libs, "win32"), vec!["ws2_32"]);
        for other in ["linux", "darwin", "win64", "Win32", ""] {
            assert!(filter_libraries(&libs, other).is_empty(), "platform {:?}", other);
        }
    }

    #[test]
    fn test_platform_set_tag() {
        let libs = vec![LibraryRef::on_any("ws2_32", ["win32"])];
        assert_eq!(filter_libraries(&libs, "win32"), vec!["ws2_32"]);
        assert!(filter_libraries(&libs, "linux").is_empty());
    }

    #[test]
    fn test_order_preserved_across_removals() {
        assert_eq!(filter_libraries(&sample(), "linux"), vec!["core", "z", "dl", "m"]);
        assert_eq!(
            filter_libraries(&sample(), "win32"),
            vec!["core", "ws2_32", "z", "m"]
        );
        assert_eq!(filter_libraries(&sample(), "sunos"), vec!["core", "z", "m"]);
    }

    #[test]
    fn test_deserialize_mixed_list() {
        #[derive(Deserialize)]
        struct Wrapper {
            libs: Vec<LibraryRef>,
        }

        let w: Wrapper = toml::from_str(
            r#"libs = ["m", { name = "ws2_32", platforms = "win32" }, { name = "dl", platforms = ["linux", "darwin"] }]"#,
        )
        .unwrap();

        assert_eq!(w.libs[0], LibraryRef::bare("m"));
        assert_eq!(w.libs[1], LibraryRef::on("ws2_32", "win32"));
        assert_eq!(w.libs[2], LibraryRef::on_any("dl", ["darwin", "linux"]));
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(LibraryRef::bare("").validate().is_err());
        assert!(LibraryRef::bare("  ").validate().is_err());
        assert!(LibraryRef::on("", "win32").validate().is_err());
        assert!(LibraryRef::on_any("dl", Vec::<String>::new()).validate().is_err());
        assert!(LibraryRef::on("x", "").validate().is_err());
        assert!(LibraryRef::bare("m").validate().is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(LibraryRef::bare("m").to_string(), "m");
        assert_eq!(LibraryRef::on("ws2_32", "win32").to_string(), "ws2_32 (win32)");
        assert_eq!(
            LibraryRef::on_any("dl", ["linux", "darwin"]).to_string(),
            "dl (darwin, linux)"
        );
    }
}
