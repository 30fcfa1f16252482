#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const DEFAULT_SCRIPT: &str = r#"(function() {var implementors = {};
implementors["wasmer_runtime"] = [{text:"impl <a class=\"trait\" href=\"https://doc.rust-lang.org/nightly/core/default/trait.Default.html\" title=\"trait core::default::Default\">Default</a> for <a class=\"enum\" href=\"wasmer_runtime/enum.Backend.html\" title=\"enum wasmer_runtime::Backend\">Backend</a>",synthetic:false,types:["wasmer_runtime::Backend"]},];
implementors["wasmer_runtime_core"] = [{text:"impl <a class=\"trait\" href=\"https://doc.rust-lang.org/nightly/core/default/trait.Default.html\" title=\"trait core::default::Default\">Default</a> for <a class=\"struct\" href=\"wasmer_runtime_core/fault/struct.BoundaryRegisterPreservation.html\" title=\"struct wasmer_runtime_core::fault::BoundaryRegisterPreservation\">BoundaryRegisterPreservation</a>",synthetic:false,types:["wasmer_runtime_core::fault::BoundaryRegisterPreservation"]},{text:"impl <a class=\"trait\" href=\"https://doc.rust-lang.org/nightly/core/default/trait.Default.html\" title=\"trait core::default::Default\">Default</a> for <a class=\"struct\" href=\"wasmer_runtime_core/state/struct.MachineStateDiff.html\" title=\"struct wasmer_runtime_core::state::MachineStateDiff\">MachineStateDiff</a>",synthetic:false,types:["wasmer_runtime_core::state::MachineStateDiff"]},];
implementors["wasmer_wasi"] = [{text:"impl <a class=\"trait\" href=\"https://doc.rust-lang.org/nightly/core/default/trait.Default.html\" title=\"trait core::default::Default\">Default</a> for <a class=\"struct\" href=\"wasmer_wasi/state/struct.WasiStateBuilder.html\" title=\"struct wasmer_wasi::state::WasiStateBuilder\">WasiStateBuilder</a>",synthetic:false,types:["wasmer_wasi::state::builder::WasiStateBuilder"]},];

            if (window.register_implementors) {
                window.register_implementors(implementors);
            } else {
                window.pending_implementors = implementors;
            }
        
})()
"#;

pub const DESERIALIZE_SCRIPT: &str = r#"(function() {var implementors = {};
implementors["wasmer_runtime"] = [{text:"impl&lt;'de&gt; <a class=\"trait\" href=\"https://docs.rs/serde/1.0.104/serde/de/trait.Deserialize.html\" title=\"trait serde::de::Deserialize\">Deserialize</a>&lt;'de&gt; for <a class=\"enum\" href=\"wasmer_runtime/enum.Backend.html\" title=\"enum wasmer_runtime::Backend\">Backend</a>",synthetic:false,types:["wasmer_runtime::Backend"]},];
implementors["wasmer_runtime_core"] = [{text:"impl&lt;'de&gt; <a class=\"trait\" href=\"https://docs.rs/serde/1.0.104/serde/de/trait.Deserialize.html\" title=\"trait serde::de::Deserialize\">Deserialize</a>&lt;'de&gt; for <a class=\"struct\" href=\"wasmer_runtime_core/cache/struct.WasmHash.html\" title=\"struct wasmer_runtime_core::cache::WasmHash\">WasmHash</a>",synthetic:false,types:["wasmer_runtime_core::cache::WasmHash"]},{text:"impl&lt;'de&gt; <a class=\"trait\" href=\"https://docs.rs/serde/1.0.104/serde/de/trait.Deserialize.html\" title=\"trait serde::de::Deserialize\">Deserialize</a>&lt;'de&gt; for <a class=\"enum\" href=\"wasmer_runtime_core/memory/enum.MemoryType.html\" title=\"enum wasmer_runtime_core::memory::MemoryType\">MemoryType</a>",synthetic:false,types:["wasmer_runtime_core::memory::MemoryType"]},];

            if (window.register_implementors) {
                window.register_implementors(implementors);
            } else {
                window.pending_implementors = implementors;
            }
        
})()
"#;

/// Documentation root holding the two fixture scripts under `implementors/`.
pub fn fixture_doc_root() -> Result<TempDir> {
    let dir = TempDir::new().context("allocating fixture doc root")?;
    let root = dir.path().join("implementors");
    write_file(&root.join("core/default/trait.Default.js"), DEFAULT_SCRIPT)?;
    write_file(&root.join("serde/de/trait.Deserialize.js"), DESERIALIZE_SCRIPT)?;
    write_file(&root.join("search-index.js"), "var searchIndex = {};")?;
    Ok(dir)
}

pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

pub fn helper_binary(name: &str) -> PathBuf {
    match name {
        "implementors" => PathBuf::from(env!("CARGO_BIN_EXE_implementors")),
        "render-implementors" => PathBuf::from(env!("CARGO_BIN_EXE_render-implementors")),
        other => panic!("unknown helper {other}"),
    }
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {:?}", cmd))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}
