use anyhow::{Context, Result};
use tessel_core::buffer::{Element, Mirror, RecordType, ScalarType, StructuredBuffer};
use tessel_core::context::{Canvas, EvalContext};
use tessel_core::glm::{Camera, CameraMode};
use tessel_core::logging::{LoggingConfig, init_logging};
use tessel_core::render::{Attribute, FramePass, GeometryKind, RenderState, Visual};
use tessel_core::transform::{Transforms, Unit};

const POINTS: usize = 8;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    // ── data ──────────────────────────────────────────────────────────────
    let vertex = RecordType::packed([
        ("position", Element::new(ScalarType::F32, vec![3])),
        ("size", Element::new(ScalarType::F32, vec![])),
    ]);
    let vertices = StructuredBuffer::new(POINTS, vertex)?;
    let remote = Mirror::new();
    vertices.root().set_sink(remote.clone());

    let positions = vertices.field("position").context("missing position field")?;
    let sizes = vertices.field("size").context("missing size field")?;
    for i in 0..POINTS {
        let t = i as f64 / POINTS as f64 * std::f64::consts::TAU;
        positions.write(i, [t.cos() * 0.8, t.sin() * 0.8, t.sin() * 0.5])?;
    }
    sizes.write(.., 4.0)?;
    sizes.write(3usize, 12.0)?;

    log::info!(
        "mirror holds {} bytes after {} updates",
        remote.bytes().len(),
        remote.updates().len()
    );

    // ── transforms ────────────────────────────────────────────────────────
    let mut transforms = Transforms::new();
    let point = transforms.measure(Unit::Point);
    let size_of = transforms.accessor("size");
    let size_of = transforms.apply_data(size_of, vertices.root())?;
    let point_sizes = transforms.apply(point, size_of)?;

    let cmap = transforms.colormap("viridis");
    let depth = transforms.depth(Some(GeometryKind::Positions.as_str()));
    let fill = transforms.apply(cmap, depth)?;

    let mut visual = Visual::new(GeometryKind::Positions, positions);
    visual.set(&transforms, "sizes", point_sizes)?;
    visual.set(&transforms, "fill_colors", fill)?;

    // ── frame ─────────────────────────────────────────────────────────────
    let canvas = Canvas::default();
    let camera = Camera::new(25.0, 45.0, 1.0, CameraMode::Perspective);
    let state = RenderState::with_camera(canvas.viewport(), &camera);
    let mut ctx = EvalContext::new();
    let frame = FramePass::new(&transforms, state).run(&visual, &mut ctx)?;

    println!();
    println!("  {} {} in draw order", frame.len(), frame.kind);
    for (row, &item) in frame.order.iter().enumerate() {
        let x = frame.positions.get(&[row, 0]).unwrap_or_default();
        let y = frame.positions.get(&[row, 1]).unwrap_or_default();
        let d = frame.depth.get(&[row]).unwrap_or_default();
        println!("  #{item:<2} ({x:+.3}, {y:+.3})  depth {d:+.3}");
    }
    for (name, attribute) in &frame.attributes {
        let kind = match attribute {
            Attribute::Uniform(_) => "uniform",
            Attribute::PerItem(_) => "per item",
        };
        println!("  {name:<12} {kind:<9} {:?}", attribute.array().shape());
    }
    println!();

    // A later edit only ships the touched bytes.
    let before = remote.updates().len();
    sizes.write(0usize, 6.0)?;
    let (offset, len) = remote
        .updates()
        .get(before)
        .copied()
        .context("size edit was not pushed")?;
    log::info!("size edit pushed {len} bytes at offset {offset}");
    Ok(())
}
