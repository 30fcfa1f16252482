use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Fully-qualified trait path (e.g., `core::default::Default`).
///
/// Capability names key the index; the generator encodes them in the script
/// location, so `from_script_path` is the usual constructor.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(pub String);

/// Distribution unit that contributed implementors (e.g., `wasmer_runtime_core`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

/// Fully-qualified path of an implementing type, as listed in a record's `types`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypePath(pub String);

/// Item class carried by a cross-link's `class` attribute.
///
/// Known variants keep serialization consistent; `Other` preserves anything a
/// newer generator emits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ItemKind {
    Struct,
    Enum,
    Trait,
    Union,
    Type,
    Primitive,
    Function,
    Macro,
    Constant,
    Module,
    Other(String),
}

const TRAIT_FILE_PREFIX: &str = "trait.";
const SCRIPT_EXTENSION: &str = "js";

impl CapabilityName {
    /// Derive the trait path from a script located under `root`.
    ///
    /// `<root>/serde/de/trait.Deserialize.js` becomes `serde::de::Deserialize`.
    pub fn from_script_path(root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(root).with_context(|| {
            format!("{} is not under {}", path.display(), root.display())
        })?;
        if relative.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
            bail!("{} is not an implementor script", path.display());
        }

        let mut segments = Vec::new();
        let components: Vec<_> = relative.components().collect();
        let Some((file, dirs)) = components.split_last() else {
            bail!("empty script path under {}", root.display());
        };
        for dir in dirs {
            let segment = dir
                .as_os_str()
                .to_str()
                .with_context(|| format!("non UTF-8 path segment in {}", path.display()))?;
            segments.push(segment.to_string());
        }

        let file_name = file
            .as_os_str()
            .to_str()
            .with_context(|| format!("non UTF-8 file name in {}", path.display()))?;
        let stem = file_name.strip_suffix(".js").unwrap_or(file_name);
        let Some(trait_name) = stem.strip_prefix(TRAIT_FILE_PREFIX) else {
            bail!("{} is not named trait.<Name>.js", path.display());
        };
        if trait_name.is_empty() {
            bail!("{} has an empty trait name", path.display());
        }
        segments.push(trait_name.to_string());
        Ok(Self(segments.join("::")))
    }

    /// Last path segment, used as the display name.
    pub fn short_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Module segments leading up to the trait name.
    pub fn module_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.0.split("::").collect();
        segments.pop();
        segments
    }
}

impl TypePath {
    /// Leading path segment; for generated listings this is the defining crate.
    pub fn package(&self) -> &str {
        self.0.split("::").next().unwrap_or(&self.0)
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for PackageName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for TypePath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for ItemKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_class(&value))
    }
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Struct => "struct",
            ItemKind::Enum => "enum",
            ItemKind::Trait => "trait",
            ItemKind::Union => "union",
            ItemKind::Type => "type",
            ItemKind::Primitive => "primitive",
            ItemKind::Function => "fn",
            ItemKind::Macro => "macro",
            ItemKind::Constant => "constant",
            ItemKind::Module => "mod",
            ItemKind::Other(value) => value.as_str(),
        }
    }

    pub fn from_class(value: &str) -> Self {
        match value {
            "struct" => ItemKind::Struct,
            "enum" => ItemKind::Enum,
            "trait" => ItemKind::Trait,
            "union" => ItemKind::Union,
            "type" => ItemKind::Type,
            "primitive" => ItemKind::Primitive,
            "fn" => ItemKind::Function,
            "macro" => ItemKind::Macro,
            "constant" => ItemKind::Constant,
            "mod" => ItemKind::Module,
            other => ItemKind::Other(other.to_string()),
        }
    }
}
