//! Query a generated implementor index from the command line.
//!
//! Loads either a documentation root (`implementors/` scripts) or a snapshot
//! file, then lists capabilities, prints one capability's implementors
//! grouped by package, answers "what does this type implement", or dumps the
//! index as a snapshot.

use anyhow::{Context, Result, bail};
use implementor_index::{
    Capability, CapabilityName, ImplementorIndex, IndexSnapshot, Merge, PackageGroups,
    PackageName, RowStyle, TypePath, config, format_listing, load_doc_root, load_snapshot,
    logging, snapshot_schema_path, write_snapshot,
};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::mpsc;

fn main() {
    logging::set_up_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let index = args.source.load()?;
    let packages = if args.packages.is_empty() {
        config::package_filter_from_env()
    } else {
        args.packages.clone()
    };

    match &args.action {
        Action::List => {
            for capability in index.capabilities() {
                let groups = filtered(&index, &capability.name, &packages);
                if !packages.is_empty() && groups.is_empty() {
                    continue;
                }
                println!(
                    "{}\t{}\t{}",
                    capability.name,
                    groups.len(),
                    groups.record_count()
                );
            }
        }
        Action::Capability { name, style } => {
            let name = resolve_capability(&index, name)?;
            let (capability, groups) = receive_listing(&index, &name, &packages)?;
            print!("{}", format_listing(&capability, &groups, *style));
        }
        Action::Type(path) => {
            let mut found = false;
            for (capability, package, record) in index.implementations_of_type(path) {
                if !packages.is_empty() && !packages.contains(package) {
                    continue;
                }
                found = true;
                println!("{capability}\t{package}\t{}", record.plain_text());
            }
            if !found {
                bail!("no capabilities list implementing type {path}");
            }
        }
        Action::Json { out } => {
            let snapshot = filtered_snapshot(&index, &packages);
            match out {
                Some(path) => write_snapshot(path, &snapshot)?,
                None => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            }
        }
    }
    Ok(())
}

/// Attach a renderer to the capability and collect what the rendezvous hands it.
fn receive_listing(
    index: &ImplementorIndex,
    name: &CapabilityName,
    packages: &[PackageName],
) -> Result<(Capability, PackageGroups)> {
    let capability = index
        .capability(name)
        .cloned()
        .with_context(|| format!("unknown capability {name}"))?;
    let mut page = ImplementorIndex::new();
    let (tx, rx) = mpsc::channel();
    page.consumer_ready(
        name.clone(),
        Box::new(move |groups| {
            let _ = tx.send(groups);
        }),
    )?;
    page.register(name.clone(), filtered(index, name, packages));

    let mut groups = PackageGroups::new();
    while let Ok(delivered) = rx.try_recv() {
        groups.merge(delivered);
    }
    Ok((capability, groups))
}

fn filtered(
    index: &ImplementorIndex,
    name: &CapabilityName,
    packages: &[PackageName],
) -> PackageGroups {
    let mut groups = index.implementors(name).cloned().unwrap_or_default();
    if !packages.is_empty() {
        groups.retain_packages(packages);
    }
    groups
}

fn filtered_snapshot(index: &ImplementorIndex, packages: &[PackageName]) -> IndexSnapshot {
    let mut snapshot = index.snapshot();
    if !packages.is_empty() {
        for listing in snapshot.capabilities.values_mut() {
            listing.implementors.retain_packages(packages);
        }
    }
    snapshot
}

/// Accept a full path, or a bare trait name when it is unambiguous.
fn resolve_capability(index: &ImplementorIndex, raw: &str) -> Result<CapabilityName> {
    let exact = CapabilityName(raw.to_string());
    if index.capability(&exact).is_some() {
        return Ok(exact);
    }
    if raw.contains("::") {
        bail!("unknown capability {raw}");
    }
    let matches: Vec<_> = index
        .capabilities()
        .filter(|cap| cap.name.short_name() == raw)
        .map(|cap| cap.name.clone())
        .collect();
    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => bail!("unknown capability {raw}"),
        many => bail!(
            "capability name {raw} is ambiguous: {}",
            many.iter()
                .map(|name| name.0.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

enum Source {
    DocRoot(Option<PathBuf>),
    Snapshot(PathBuf),
}

impl Source {
    fn load(&self) -> Result<ImplementorIndex> {
        match self {
            Source::DocRoot(explicit) => {
                let root = match explicit {
                    Some(path) => path.clone(),
                    None => config::find_doc_root()?,
                };
                load_doc_root(&root)
            }
            Source::Snapshot(path) => {
                let snapshot = load_snapshot(path, &snapshot_schema_path())?;
                ImplementorIndex::from_snapshot(snapshot)
                    .with_context(|| format!("rebuilding index from {}", path.display()))
            }
        }
    }
}

enum Action {
    List,
    Capability { name: String, style: RowStyle },
    Type(TypePath),
    Json { out: Option<PathBuf> },
}

struct CliArgs {
    source: Source,
    packages: Vec<PackageName>,
    action: Action,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut source: Option<Source> = None;
        let mut packages = Vec::new();
        let mut action: Option<Action> = None;
        let mut style: Option<RowStyle> = None;
        let mut out: Option<PathBuf> = None;

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--doc-root" => {
                    let path = next_value(&mut args, "--doc-root")?;
                    let root = Source::DocRoot(Some(PathBuf::from(path)));
                    set_once(&mut source, root, "--doc-root/--snapshot")?;
                }
                "--snapshot" => {
                    let path = next_value(&mut args, "--snapshot")?;
                    let snapshot = Source::Snapshot(PathBuf::from(path));
                    set_once(&mut source, snapshot, "--doc-root/--snapshot")?;
                }
                "--packages" => {
                    let raw = next_value(&mut args, "--packages")?;
                    packages.extend(config::parse_package_list(&raw));
                }
                "--list" => set_once(&mut action, Action::List, "action")?,
                "--capability" => {
                    let name = next_value(&mut args, "--capability")?;
                    set_once(
                        &mut action,
                        Action::Capability {
                            name,
                            style: RowStyle::Plain,
                        },
                        "action",
                    )?;
                }
                "--type" => {
                    let path = next_value(&mut args, "--type")?;
                    set_once(&mut action, Action::Type(TypePath(path)), "action")?;
                }
                "--json" => set_once(&mut action, Action::Json { out: None }, "action")?,
                "--out" => out = Some(PathBuf::from(next_value(&mut args, "--out")?)),
                "--style" => {
                    let raw = next_value(&mut args, "--style")?;
                    style = Some(match raw.as_str() {
                        "plain" => RowStyle::Plain,
                        "markup" | "html" => RowStyle::Markup,
                        "types" => RowStyle::Types,
                        other => bail!("unknown style '{other}' (expected plain|markup|types)"),
                    });
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => bail!("unknown flag: {other}"),
            }
        }

        let mut action = action.unwrap_or(Action::List);
        match &mut action {
            Action::Capability { style: slot, .. } => {
                if let Some(style) = style {
                    *slot = style;
                }
            }
            Action::Json { out: slot } => *slot = out.take(),
            _ => {
                if style.is_some() {
                    bail!("--style only applies to --capability");
                }
            }
        }
        if out.is_some() {
            bail!("--out only applies to --json");
        }

        Ok(CliArgs {
            source: source.unwrap_or(Source::DocRoot(None)),
            packages,
            action,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, label: &str) -> Result<()> {
    if slot.is_some() {
        bail!("{label} may only be provided once");
    }
    *slot = Some(value);
    Ok(())
}

fn next_value(args: &mut impl Iterator<Item = OsString>, flag: &str) -> Result<String> {
    args.next()
        .map(|os| {
            os.into_string()
                .map_err(|_| anyhow::anyhow!("value for {flag} is not valid UTF-8"))
        })
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn usage() -> &'static str {
    "Usage: implementors [--doc-root DIR | --snapshot FILE] [--packages LIST] [--list | --capability NAME [--style plain|markup|types] | --type PATH | --json [--out FILE]]\n\
Loads the implementor index (default: IMPLEMENTORS_DOC_ROOT or the nearest implementors/ tree) and prints the requested view.\n"
}

fn print_usage() {
    print!("{}", usage());
}
