//! Runs the roughing and flat passes on a small demo scene, writes the
//! programs and replays them on the milling simulator.
//!
//! ```text
//! cargo run --example pipeline                          # default settings, ./paths
//! cargo run --example pipeline -- project.toml out      # custom settings and output
//! ```

use std::error::Error;
use std::path::PathBuf;

use surfmill::geometry::{BezierSurface, Torus};
use surfmill::math::{Point3, Vector3};
use surfmill::milling::{parse_program, write_program, Cutter, Milling, PathAnimator};
use surfmill::operations::stages::{StageOne, StageTwo, Toolpath};
use surfmill::scene::{Geometry, Scene};
use surfmill::ProjectConfig;
use tracing::{info, warn};

fn demo_scene() -> Result<Scene, Box<dyn Error>> {
    let mut scene = Scene::new();
    let body = BezierSurface::cylinder(Point3::new(-20.0, 0.0, 10.0), 15.0, 20.0, 4, 1)?;
    scene.add_named("body", Geometry::Bezier(body))?;
    let ring = Torus::new(Point3::new(30.0, 10.0, 18.0), 14.0, 4.0, Vector3::z(), Vector3::x())?;
    scene.add_named("ring", Geometry::Torus(ring))?;
    Ok(scene)
}

fn simulate(config: &ProjectConfig, path: &Toolpath, extension: &str) -> Result<(), Box<dyn Error>> {
    let Some(&start) = path.first() else {
        return Ok(());
    };
    let commands = parse_program(&write_program(path), start)?;
    let cutter = Cutter::from_extension(extension)?;
    let mut milling = Milling::new(config.stock.clone(), cutter, config.milling.clone());
    let mut animator = PathAnimator::new(commands, start);
    match animator.complete(&mut milling) {
        Ok(()) => {
            let stats = milling.field().stats();
            info!(
                extension,
                removed = stats.removed_volume,
                lowest = stats.min_height,
                "program milled"
            );
        }
        Err(failure) => warn!(extension, %failure.message, "program rejected"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("pipeline=info".parse().unwrap_or_default())
        .add_directive("surfmill=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ProjectConfig::load(path)?,
        None => ProjectConfig::default(),
    };
    let out = PathBuf::from(args.next().unwrap_or_else(|| "paths".to_owned()));
    std::fs::create_dir_all(&out)?;

    let scene = demo_scene()?;
    let roughing = StageOne::new(config.stage_one.clone()).execute(&scene, &config.stock)?;
    let flat = StageTwo::new(config.stage_two.clone()).execute(&scene, &config.stock)?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let passes = [
        (roughing, format!("k{}", (config.stage_one.cutter_radius * 2.0).round() as u32)),
        (flat, format!("f{}", (config.stage_two.cutter_radius * 2.0).round() as u32)),
    ];
    for (k, (path, extension)) in passes.iter().enumerate() {
        let file = out.join(format!("{}.{extension}", k + 1));
        std::fs::write(&file, write_program(path))?;
        info!(file = %file.display(), moves = path.len(), "program written");
        simulate(&config, path, extension)?;
    }
    Ok(())
}
