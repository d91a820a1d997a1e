use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use meshview_assets::{ModelAsset, load_model, load_obj};
use meshview_common::{EngineConfig, TextureSlot};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshview-cli", about = "CLI tool for meshview assets")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Summarize an OBJ model and its materials
    Inspect {
        obj: PathBuf,
        /// Material library to use instead of the one the OBJ names
        #[arg(long)]
        mtl: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse OBJ files and report any that fail
    Validate {
        #[arg(required = true)]
        objs: Vec<PathBuf>,
    },
    /// Print the effective engine configuration as JSON
    Config {
        /// Configuration file; defaults are printed when omitted
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

struct MapStatus {
    slot: TextureSlot,
    path: PathBuf,
    exists: bool,
}

struct MaterialReport {
    name: String,
    maps: Vec<MapStatus>,
}

/// Material maps of a model with whether each file exists on disk.
fn material_report(model: &ModelAsset) -> Vec<MaterialReport> {
    model
        .materials
        .values()
        .map(|material| MaterialReport {
            name: material.name.clone(),
            maps: TextureSlot::ALL
                .into_iter()
                .filter_map(|slot| {
                    let path = model.texture_path(material, slot)?;
                    Some(MapStatus {
                        slot,
                        exists: path.is_file(),
                        path,
                    })
                })
                .collect(),
        })
        .collect()
}

fn inspect(obj: &Path, mtl: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let name = obj
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".into());
    let model = load_model(name, obj, mtl)?;
    let materials = material_report(&model);

    if json {
        let value = serde_json::json!({
            "name": model.name,
            "vertices": model.mesh.vertex_count(),
            "indices": model.mesh.index_count(),
            "triangles": model.mesh.triangle_count(),
            "material_source": model.material_source,
            "materials": materials.iter().map(|m| serde_json::json!({
                "name": m.name,
                "maps": m.maps.iter().map(|s| serde_json::json!({
                    "slot": s.slot.label(),
                    "path": s.path,
                    "exists": s.exists,
                })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Model: {} ({})", model.name, obj.display());
    println!("  vertices:  {}", model.mesh.vertex_count());
    println!("  indices:   {}", model.mesh.index_count());
    println!("  triangles: {}", model.mesh.triangle_count());
    match &model.material_source {
        Some(path) => println!("  materials: {} from {}", materials.len(), path.display()),
        None => println!("  materials: none (placeholder textures)"),
    }
    for material in &materials {
        println!("  [{}]", material.name);
        if material.maps.is_empty() {
            println!("    no maps");
        }
        for map in &material.maps {
            let status = if map.exists { "ok" } else { "MISSING" };
            println!("    {:<9} {} ({status})", map.slot.label(), map.path.display());
        }
    }
    Ok(())
}

/// Parse every file; returns the number that failed.
fn validate(objs: &[PathBuf]) -> usize {
    let mut failures = 0;
    for path in objs {
        tracing::debug!(path = %path.display(), "validating");
        match load_obj(path) {
            Ok(obj) if obj.mesh.is_well_formed() => {
                println!(
                    "ok      {} ({} vertices, {} triangles)",
                    path.display(),
                    obj.mesh.vertex_count(),
                    obj.mesh.triangle_count()
                );
            }
            Ok(_) => {
                failures += 1;
                println!("FAILED  {}: mesh is malformed", path.display());
            }
            Err(e) => {
                failures += 1;
                println!("FAILED  {e}");
            }
        }
    }
    failures
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("meshview-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", meshview_common::crate_info());
            println!("assets: {}", meshview_assets::crate_info());
            println!("input: {}", meshview_input::crate_info());
            println!("render: {}", meshview_render::crate_info());
            println!("render-wgpu: {}", meshview_render_wgpu::crate_info());
        }
        Commands::Inspect { obj, mtl, json } => {
            inspect(&obj, mtl.as_deref(), json)
                .with_context(|| format!("inspect {}", obj.display()))?;
        }
        Commands::Validate { objs } => {
            let failures = validate(&objs);
            if failures > 0 {
                bail!("{failures} of {} files failed validation", objs.len());
            }
        }
        Commands::Config { path } => {
            let config = match path {
                Some(path) => EngineConfig::load(&path)?,
                None => EngineConfig::default(),
            };
            println!("{}", config.to_json_pretty()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn validate_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.obj");
        let bad = dir.path().join("bad.obj");
        fs::write(&good, QUAD).unwrap();
        fs::write(&bad, "v 0 0 0\nf 1/1/1 2/1/1 3/1/1\n").unwrap();

        assert_eq!(validate(&[good.clone()]), 0);
        assert_eq!(validate(&[good, bad, dir.path().join("absent.obj")]), 2);
    }

    #[test]
    fn report_flags_missing_maps() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("quad.obj");
        fs::write(&obj, QUAD).unwrap();
        fs::write(
            dir.path().join("quad.mtl"),
            "newmtl Body\nmap_Kd body.png\nmap_Ks spec.png\n",
        )
        .unwrap();
        fs::write(dir.path().join("body.png"), b"not really a png").unwrap();

        let model = load_model("quad", &obj, None).unwrap();
        let report = material_report(&model);
        assert_eq!(report.len(), 1);
        let maps: Vec<_> = report[0].maps.iter().map(|m| (m.slot, m.exists)).collect();
        assert_eq!(
            maps,
            [(TextureSlot::Diffuse, true), (TextureSlot::Specular, false)]
        );
    }

    #[test]
    fn inspect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("nope.obj"), None, false).is_err());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["meshview-cli", "validate", "a.obj", "b.obj"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { objs } if objs.len() == 2));
        assert!(Cli::try_parse_from(["meshview-cli", "validate"]).is_err());
    }
}
