use argh::FromArgs;
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;

use surfalign::icp::{self, RigidIcpParams, SimilarityIcpParams};
use surfalign::k3d;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Rigid,
    Similarity,
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rigid" => Ok(Mode::Rigid),
            "similarity" => Ok(Mode::Similarity),
            other => Err(format!("unknown mode {other}, expected rigid or similarity")),
        }
    }
}

#[derive(FromArgs)]
/// Register mesh B onto mesh A
struct Args {
    /// path to the reference mesh
    #[argh(option)]
    mesh_a: PathBuf,

    /// path to the mesh to align
    #[argh(option)]
    mesh_b: PathBuf,

    /// registration mode: rigid or similarity
    #[argh(option, default = "Mode::Similarity")]
    mode: Mode,

    /// optional JSON file with the registration parameters
    #[argh(option)]
    config: Option<PathBuf>,

    /// number of samples per mesh for the chamfer distance
    #[argh(option, default = "20000")]
    chamfer_samples: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mesh_a = k3d::io::read_triangle_mesh(&args.mesh_a)?;
    println!(
        "Mesh A: #{} vertices, #{} faces",
        mesh_a.num_vertices(),
        mesh_a.num_faces()
    );

    let mesh_b = k3d::io::read_triangle_mesh(&args.mesh_b)?;
    println!(
        "Mesh B: #{} vertices, #{} faces",
        mesh_b.num_vertices(),
        mesh_b.num_faces()
    );

    let config = match &args.config {
        Some(path) => std::fs::read_to_string(path)?,
        None => "{}".to_string(),
    };

    let transform = match args.mode {
        Mode::Rigid => {
            let params: RigidIcpParams = serde_json::from_str(&config)?;
            log::info!("Rigid registration with {params:?}");
            let result = icp::rigid_icp_meshes(&mesh_a, &mesh_b, &params)?;
            println!("Rotation: {:?}", result.rotation);
            println!("Translation: {:?}", result.translation);
            result.transform()
        }
        Mode::Similarity => {
            let params: SimilarityIcpParams = serde_json::from_str(&config)?;
            log::info!("Similarity registration with {params:?}");
            let result = icp::similarity_icp_meshes(&mesh_a, &mesh_b, &params)?;
            println!("Rotation: {:?}", result.rotation);
            println!("Translation: {:?}", result.translation);
            println!("Scale: {}", result.scale);
            result.transform
        }
    };
    println!("Transform: {:?}", transform);

    let mut rng = StdRng::seed_from_u64(0);
    let before = icp::metrics::chamfer_distance(&mesh_a, &mesh_b, args.chamfer_samples, &mut rng)?;
    let aligned = mesh_b.transformed(&transform);
    let after = icp::metrics::chamfer_distance(&mesh_a, &aligned, args.chamfer_samples, &mut rng)?;
    println!("Chamfer distance: {before:.6} -> {after:.6}");

    Ok(())
}
