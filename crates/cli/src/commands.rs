//! Subcommands: each opens/creates a ring, performs one library call, and
//! prints plain text or (with `-o`) the canonical JSON snapshot.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Subcommand;
use ringcore::{Algorithm, Backend, CreateOptions, Pnode, Ring, VnodeId};

fn resolve_backend(location: &Option<PathBuf>, backend: &str) -> anyhow::Result<Backend> {
    match backend {
        "memory" => Ok(Backend::Memory),
        "redb" => {
            let path = location
                .clone()
                .context("-l/--location is required when -b redb is selected")?;
            Ok(Backend::Redb(path))
        }
        other => bail!("unknown backend \"{other}\" (expected \"memory\" or \"redb\")"),
    }
}

fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    Algorithm::parse(name).map_err(Into::into)
}

fn print_if_requested(ring: &Ring, print: bool) -> anyhow::Result<()> {
    if print {
        let snapshot = ring.serialize();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

/// Subcommands mirroring the ring library's external surface one-to-one.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new ring from a pnode list.
    Create {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'a', long, default_value = "sha256")]
        algorithm: String,
        #[arg(short = 'v', long)]
        vnodes: u32,
        #[arg(short = 'p', long = "pnode", required = true)]
        pnodes: Vec<String>,
        #[arg(short = 'o', long)]
        print: bool,
    },
    /// Reconstruct a ring from a canonical JSON snapshot file.
    DeserializeRing {
        #[arg(short = 'f', long)]
        file: PathBuf,
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'o', long)]
        print: bool,
    },
    /// Attach (or, with no `-d`, clear) a vnode's data value.
    AddData {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'v', long)]
        vnode: VnodeId,
        #[arg(short = 'd', long)]
        data: Option<String>,
        #[arg(short = 'o', long)]
        print: bool,
    },
    /// Move a set of vnodes onto a (possibly new) pnode.
    RemapVnode {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'p', long)]
        pnode: String,
        #[arg(short = 'v', long = "vnode", required = true)]
        vnodes: Vec<VnodeId>,
        #[arg(short = 'o', long)]
        print: bool,
    },
    /// Remove a pnode that currently owns zero vnodes.
    RemovePnode {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'p', long)]
        pnode: String,
        #[arg(short = 'o', long)]
        print: bool,
    },
    /// List every pnode in the ring.
    GetPnodes {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
    },
    /// List the vnodes owned by a pnode.
    GetVnodes {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'p', long)]
        pnode: String,
    },
    /// Print the owning pnode and current data of a single vnode.
    GetVnodePnodeAndData {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        #[arg(short = 'v', long)]
        vnode: VnodeId,
    },
    /// List the vnodes carrying operator-supplied (non-sentinel) data.
    GetDataVnodes {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
    },
    /// Resolve a key to its owning pnode, vnode, and data.
    GetNode {
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,
        #[arg(short = 'b', long, default_value = "memory")]
        backend: String,
        key: String,
    },
    /// Print the vnode a key hashes to, without opening a ring.
    PrintHash {
        #[arg(short = 'a', long, default_value = "sha256")]
        algorithm: String,
        #[arg(short = 'v', long)]
        vnodes: u32,
        key: String,
    },
    /// Print the per-pnode vnode delta between two rings.
    Diff {
        #[arg(short = 'l', long)]
        location_a: PathBuf,
        #[arg(long)]
        location_b: PathBuf,
        #[arg(short = 'b', long, default_value = "redb")]
        backend: String,
    },
}

impl Command {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Create { location, backend, algorithm, vnodes, pnodes, print } => {
                let backend = resolve_backend(&location, &backend)?;
                let algorithm = parse_algorithm(&algorithm)?;
                let pnodes = pnodes
                    .into_iter()
                    .map(Pnode::new)
                    .collect::<Result<Vec<_>, _>>()?;
                let ring = Ring::create(CreateOptions { algorithm, pnodes, vnodes, backend })?;
                print_if_requested(&ring, print)
            }
            Command::DeserializeRing { file, location, backend, print } => {
                let backend = resolve_backend(&location, &backend)?;
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("reading snapshot file {}", file.display()))?;
                let snapshot = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing snapshot file {}", file.display()))?;
                let ring = Ring::deserialize(&snapshot, backend)?;
                print_if_requested(&ring, print)
            }
            Command::AddData { location, backend, vnode, data, print } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let value = match data.as_deref() {
                    None | Some("null") => None,
                    Some(v) => Some(v.to_string()),
                };
                ring.add_data(vnode, value)?;
                print_if_requested(&ring, print)
            }
            Command::RemapVnode { location, backend, pnode, vnodes, print } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let target = Pnode::new(pnode)?;
                let change = ring.remap(&target, &vnodes)?;
                for (pnode, delta) in &change {
                    println!("{pnode}: +{:?} -{:?}", delta.added, delta.removed);
                }
                print_if_requested(&ring, print)
            }
            Command::RemovePnode { location, backend, pnode, print } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                ring.remove_pnode(&Pnode::new(pnode)?)?;
                print_if_requested(&ring, print)
            }
            Command::GetPnodes { location, backend } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                for pnode in ring.get_pnodes() {
                    println!("{pnode}");
                }
                Ok(())
            }
            Command::GetVnodes { location, backend, pnode } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let vnodes = ring.get_vnodes(&Pnode::new(pnode)?);
                println!("{}", vnodes.iter().map(u32::to_string).collect::<Vec<_>>().join(","));
                Ok(())
            }
            Command::GetVnodePnodeAndData { location, backend, vnode } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let lookup = ring.get_vnode_pnode_and_data(vnode)?;
                println!("pnode={} data={}", lookup.pnode, describe_data(&lookup.data));
                Ok(())
            }
            Command::GetDataVnodes { location, backend } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let vnodes = ring.get_data_vnodes();
                println!("{}", vnodes.iter().map(u32::to_string).collect::<Vec<_>>().join(","));
                Ok(())
            }
            Command::GetNode { location, backend, key } => {
                let backend = resolve_backend(&location, &backend)?;
                let ring = Ring::open(backend)?;
                let lookup = ring.get_node(key.as_bytes());
                println!(
                    "pnode={} vnode={} data={}",
                    lookup.pnode,
                    lookup.vnode,
                    describe_data(&lookup.data)
                );
                Ok(())
            }
            Command::PrintHash { algorithm, vnodes, key } => {
                let algorithm = parse_algorithm(&algorithm)?;
                let engine = ringcore::HashEngine::new(algorithm, vnodes)?;
                println!("{}", engine.vnode_of(key.as_bytes()));
                Ok(())
            }
            Command::Diff { location_a, location_b, backend } => {
                let a = Ring::open(resolve_backend(&Some(location_a), &backend)?)?;
                let b = Ring::open(resolve_backend(&Some(location_b), &backend)?)?;
                let changes = ringcore::diff(&a, &b);
                for (pnode, delta) in &changes {
                    println!("{pnode}: +{:?} -{:?}", delta.added, delta.removed);
                }
                Ok(())
            }
        }
    }
}

fn describe_data(data: &ringcore::VnodeData) -> String {
    match data.as_value() {
        Some(v) => format!("\"{v}\""),
        None => "1".to_string(),
    }
}
