#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use image::{GrayImage, Luma};
use surfmill::math::Point3;
use surfmill::milling::{read_program, write_program, CutterKind, Stock};
use surfmill::operations::stages::{StageFour, StageFourParams};
use surfmill::ProjectConfig;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("surfmill-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn config_survives_save_and_load() {
    let dir = scratch_dir("config");
    let file = dir.join("project.toml");
    let mut config = ProjectConfig::default();
    config.stock.size_x = 120.0;
    config.milling.resolution = (200, 150);
    config.stage_one.layers = vec![30.0, 18.0];
    config.save(&file).unwrap();

    let loaded = ProjectConfig::load(&file).unwrap();
    assert_eq!(loaded.stock, config.stock);
    assert_eq!(loaded.milling.resolution, (200, 150));
    assert_eq!(loaded.stage_one.layers, vec![30.0, 18.0]);
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn invalid_config_is_not_written() {
    let dir = scratch_dir("invalid");
    let file = dir.join("project.toml");
    let mut config = ProjectConfig::default();
    config.stock.base_height = config.stock.height + 1.0;
    assert!(config.save(&file).is_err());
    assert!(!file.exists());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn silhouette_png_is_traced() {
    let dir = scratch_dir("silhouette");
    let file = dir.join("shape.png");
    GrayImage::from_fn(40, 30, |x, y| {
        if (10..30).contains(&x) && (8..22).contains(&y) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
    .save(&file)
    .unwrap();

    let stock = Stock::default();
    let params = StageFourParams {
        pixel_size: 0.5,
        ..StageFourParams::default()
    };
    let path = StageFour::new(params).execute_file(&file, &stock).unwrap();
    let cutting: Vec<&Point3> = path.iter().filter(|p| p.z < stock.safe_height()).collect();
    assert!(!cutting.is_empty());
    for p in cutting {
        assert!(p.x.abs() <= 5.0 && p.y.abs() <= 4.0);
    }
    assert!(StageFour::default()
        .execute_file(dir.join("missing.png"), &stock)
        .is_err());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn program_file_names_its_cutter() {
    let dir = scratch_dir("program");
    let file = dir.join("2.f10");
    let points = [
        Point3::new(0.0, 0.0, 66.0),
        Point3::new(-12.5, 3.25, 15.0),
        Point3::new(40.0, 3.25, 15.0),
    ];
    std::fs::write(&file, write_program(&points)).unwrap();

    let (cutter, commands) = read_program(&file, points[0]).unwrap();
    assert_eq!(cutter.kind, CutterKind::Cylindrical);
    assert!((cutter.radius - 5.0).abs() < 1e-12);
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[2].command_number, 3);
    assert_eq!(commands[1].coordinates, Point3::new(-12.5, 3.25, 15.0));

    assert!(read_program(dir.join("2.txt"), points[0]).is_err());
    std::fs::remove_dir_all(dir).unwrap();
}
