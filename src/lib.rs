//! Shared library for the implementor index helpers.
//!
//! The crate reads the per-trait implementor scripts a documentation build
//! writes under `implementors/`, keeps them in a capability-keyed index that
//! preserves the generator's package and row order, and hands each
//! capability's listing to a renderer exactly once through a rendezvous.
//! Binaries under `src/bin` wrap the listing and script-writing paths.

use std::fmt::Write as _;

pub mod config;
pub mod index;
pub mod loader;
pub mod logging;
pub mod markup;
pub mod rendezvous;
pub mod schema;
pub mod script;

pub use index::{
    Capability, CapabilityListing, CapabilityName, ImplementorIndex, ImplementorRecord,
    IndexSnapshot, ItemKind, PackageGroups, PackageName, SNAPSHOT_SCHEMA_VERSION, TypePath,
};
pub use loader::{collect_scripts, load_directory, load_doc_root, write_scripts};
pub use markup::{CrossLink, plain_text};
pub use rendezvous::{Consumer, Merge, Phase, Rendezvous, RendezvousError};
pub use schema::{load_snapshot, snapshot_schema_path, write_snapshot};
pub use script::{parse_script, render_script};

/// How a listing renders each row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowStyle {
    /// Decoded text (`impl<'de> Deserialize<'de> for Backend`).
    Plain,
    /// The generator's HTML fragment, untouched.
    Markup,
    /// Fully-qualified type paths only.
    Types,
}

/// Render one capability's implementors grouped by package, in stored order.
///
/// Synthetic rows are marked with a trailing `(auto)` in plain and type styles.
pub fn format_listing(capability: &Capability, groups: &PackageGroups, style: RowStyle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", capability.name);
    if let Some(link) = &capability.doc_link {
        let _ = writeln!(out, "  docs: {link}");
    }
    if groups.is_empty() {
        out.push_str("  (no implementors)\n");
        return out;
    }
    for (package, records) in groups.iter() {
        let _ = writeln!(out, "  {package} ({})", records.len());
        for record in records {
            let row = match style {
                RowStyle::Plain => record.plain_text(),
                RowStyle::Markup => record.text.clone(),
                RowStyle::Types => record
                    .types
                    .iter()
                    .map(|ty| ty.0.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            let marker = if record.synthetic && style != RowStyle::Markup {
                " (auto)"
            } else {
                ""
            };
            let _ = writeln!(out, "    {row}{marker}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_listing_groups_rows_by_package() {
        let groups = parse_script(
            "implementors[\"wasmer_wasi\"] = [{text:\"impl <a class=\\\"trait\\\" href=\\\"https://doc.rust-lang.org/nightly/core/default/trait.Default.html\\\">Default</a> for WasiStateBuilder\",synthetic:false,types:[\"wasmer_wasi::state::builder::WasiStateBuilder\"]},{text:\"impl Default for __wasi_filestat_t\",synthetic:true,types:[\"wasmer_wasi::syscalls::types::__wasi_filestat_t\"]}];",
        )
        .unwrap();
        let mut capability = Capability::new("core::default::Default".into());
        capability.observe(&groups);

        let plain = format_listing(&capability, &groups, RowStyle::Plain);
        assert_eq!(
            plain,
            "core::default::Default\n  docs: https://doc.rust-lang.org/nightly/core/default/trait.Default.html\n  wasmer_wasi (2)\n    impl Default for WasiStateBuilder\n    impl Default for __wasi_filestat_t (auto)\n"
        );

        let types = format_listing(&capability, &groups, RowStyle::Types);
        assert!(types.contains("    wasmer_wasi::syscalls::types::__wasi_filestat_t (auto)\n"));
    }

    #[test]
    fn format_listing_reports_empty_capability() {
        let capability = Capability::new("serde::ser::Serialize".into());
        let out = format_listing(&capability, &PackageGroups::new(), RowStyle::Markup);
        assert_eq!(out, "serde::ser::Serialize\n  (no implementors)\n");
    }
}
