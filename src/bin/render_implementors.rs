//! Write implementor scripts from a snapshot.
//!
//! The inverse of loading a documentation root: each capability in the
//! snapshot becomes `<out>/<module path>/trait.<Name>.js` in the generator's
//! format, ending with the page registration hook.

use anyhow::{Context, Result, bail};
use implementor_index::{
    ImplementorIndex, config, load_snapshot, logging, snapshot_schema_path, write_scripts,
};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

fn main() {
    logging::set_up_logging();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse()?;
    let mut snapshot = load_snapshot(&args.snapshot, &snapshot_schema_path())?;
    let keep = if args.packages.is_empty() {
        config::package_filter_from_env()
    } else {
        config::parse_package_list(&args.packages.join(","))
    };
    if !keep.is_empty() {
        for listing in snapshot.capabilities.values_mut() {
            listing.implementors.retain_packages(&keep);
        }
    }
    let index = ImplementorIndex::from_snapshot(snapshot)
        .with_context(|| format!("rebuilding index from {}", args.snapshot.display()))?;
    let written = write_scripts(&index, &args.out)?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

struct CliArgs {
    snapshot: PathBuf,
    out: PathBuf,
    packages: Vec<String>,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let mut args = env::args_os().skip(1);
        let mut snapshot: Option<PathBuf> = None;
        let mut out: Option<PathBuf> = None;
        let mut packages = Vec::new();

        while let Some(arg_os) = args.next() {
            let arg = arg_os
                .into_string()
                .map_err(|_| anyhow::anyhow!("argument is not valid UTF-8"))?;
            match arg.as_str() {
                "--snapshot" => snapshot = Some(PathBuf::from(next_value(&mut args, "--snapshot")?)),
                "--out" => out = Some(PathBuf::from(next_value(&mut args, "--out")?)),
                "--packages" => packages.push(next_value(&mut args, "--packages")?),
                "--help" | "-h" => {
                    print!("{}", usage());
                    std::process::exit(0);
                }
                other => bail!("unknown flag: {other}"),
            }
        }

        let Some(snapshot) = snapshot else {
            bail!("--snapshot is required\n{}", usage());
        };
        let Some(out) = out else {
            bail!("--out is required\n{}", usage());
        };
        Ok(Self {
            snapshot,
            out,
            packages,
        })
    }
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
    "Usage: render-implementors --snapshot FILE --out DIR [--packages LIST]\n\
Writes one trait.<Name>.js script per capability under DIR.\n"
}
