use anchorspace_dom::Markup;
use anchorspace_overlay::{DomOverlay, OverlayConfig, OverlayProps, calculate_position, translate3d};
use anchorspace_render::{Camera, Viewport};
use anchorspace_scene::SceneNode;
use anchorspace_stage::Stage;
use clap::{Args, Parser, Subcommand};
use glam::{Mat4, Vec3};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "anchorspace-cli", about = "CLI tool for anchorspace overlays")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct SurfaceArgs {
    /// Surface width in pixels
    #[arg(long, default_value = "800")]
    width: u32,
    /// Surface height in pixels
    #[arg(long, default_value = "600")]
    height: u32,
    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    dpr: f32,
}

impl SurfaceArgs {
    fn viewport(&self) -> Viewport {
        Viewport::from_size(self.width, self.height, self.dpr)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Project a world-space point to screen coordinates
    Project {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: f32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        y: f32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        z: f32,
        #[command(flatten)]
        surface: SurfaceArgs,
        /// Camera position as x,y,z; omit for an identity camera
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        eye: Option<Vec3>,
        /// Camera look target as x,y,z
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
        target: Vec3,
        /// Vertical field of view in degrees
        #[arg(long, default_value = "50")]
        fov: f32,
    },
    /// Mount an overlay, orbit the camera, and report DOM writes
    Simulate {
        /// Frames to run
        #[arg(short, long, default_value = "120")]
        frames: u32,
        /// Orbit radius
        #[arg(long, default_value = "5")]
        radius: f32,
        /// Orbit angle advanced per frame, in radians
        #[arg(long, default_value = "0.01")]
        step: f32,
        /// Anchor position as x,y,z
        #[arg(long, value_parser = parse_vec3, default_value = "1,0.5,0", allow_hyphen_values = true)]
        anchor: Vec3,
        /// Overlay config file (.json, .yaml, .yml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Center the label on the anchor
        #[arg(long)]
        center: bool,
        /// Insert the overlay before the surface
        #[arg(long)]
        prepend: bool,
        /// Label text
        #[arg(long, default_value = "anchor")]
        label: String,
        #[command(flatten)]
        surface: SurfaceArgs,
    },
    /// Validate a config file and print it as JSON
    Config {
        /// Config file (.json, .yaml, .yml)
        #[arg(long)]
        path: PathBuf,
    },
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z, got {s:?}"));
    }
    let mut v = [0.0f32; 3];
    for (slot, part) in v.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("bad component {part:?}: {e}"))?;
    }
    Ok(Vec3::from_array(v))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("anchorspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", anchorspace_render::crate_info());
            println!("dom: {}", anchorspace_dom::crate_info());
            println!("stage: {}", anchorspace_stage::crate_info());
            println!("overlay: {}", anchorspace_overlay::crate_info());
        }
        Commands::Project {
            x,
            y,
            z,
            surface,
            eye,
            target,
            fov,
        } => {
            let viewport = surface.viewport();
            let camera = match eye {
                Some(eye) => Camera::perspective(fov, viewport.aspect(), 0.1, 1000.0).looking_at(eye, target),
                None => Camera::identity(),
            };
            let point = Vec3::new(x, y, z);
            let ndc = camera.project(point);
            let pos = calculate_position(Mat4::from_translation(point), &camera, &viewport);
            println!("ndc: ({:.4}, {:.4}, {:.4})", ndc.x, ndc.y, ndc.z);
            println!("screen: ({:.3}, {:.3})", pos.x, pos.y);
            println!("transform: {}", translate3d(pos));
        }
        Commands::Simulate {
            frames,
            radius,
            step,
            anchor,
            config,
            center,
            prepend,
            label,
            surface,
        } => {
            let mut config = match config {
                Some(path) => OverlayConfig::load(&path)?,
                None => OverlayConfig::default(),
            };
            config.center |= center;
            config.prepend |= prepend;

            let mut stage = Stage::headless(surface.viewport());
            stage.root.camera.orbit(Vec3::ZERO, radius, radius * 0.3, 0.0);

            let props = OverlayProps::new(Markup::element("span").child(Markup::text(label)))
                .with_config(config)
                .with_node(SceneNode::group(anchor).named("label-anchor"));
            let overlay = DomOverlay::mount(&mut stage, props);
            let element = overlay.element();
            let writes_at_mount = stage.root.document.style_writes(element);
            tracing::info!(
                x = overlay.position().x,
                y = overlay.position().y,
                "overlay mounted"
            );

            for i in 1..=frames {
                stage
                    .root
                    .camera
                    .orbit(Vec3::ZERO, radius, radius * 0.3, i as f32 * step);
                stage.frame(1.0 / 60.0);
            }

            let writes = stage.root.document.style_writes(element) - writes_at_mount;
            let pos = overlay.position();
            println!("frames: {frames}");
            println!("renders: {}", stage.root.renderer.frames());
            println!("position writes: {writes}");
            println!("final screen: ({:.3}, {:.3})", pos.x, pos.y);
            if let Some(container) = stage.root.surface_parent() {
                println!("html: {}", stage.root.document.to_html(container));
            }

            overlay.unmount(&mut stage);
            tracing::info!(
                nodes = stage.root.document.node_count(),
                "overlay unmounted"
            );
        }
        Commands::Config { path } => {
            let config = OverlayConfig::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
