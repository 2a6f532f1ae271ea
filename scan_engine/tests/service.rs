//! End-to-end checks of the two boundary operations against a service
//! running on the synthetic baseline tier (no artifact on disk).

use std::{env, fs, path::PathBuf, process};

use image::{Rgb, RgbImage};
use ndarray::Array4;
use rand::{SeedableRng, rngs::StdRng};
use scan_engine::{ModelRepository, ScanConfig, ScanService};

fn scratch(name: &str) -> PathBuf {
    env::temp_dir().join(format!("scan_engine_it_{}_{name}", process::id()))
}

fn write_scan(name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 200])
    });
    let path = scratch(&format!("{name}.png"));
    img.save(&path).unwrap();
    path
}

fn degraded_service(seed: u64) -> ScanService<StdRng> {
    let config = ScanConfig {
        model_path: PathBuf::from("/definitely/not/here/tumor_model.json"),
        input_size: 32,
        ..ScanConfig::default()
    };

    let mut acquire_rng = StdRng::seed_from_u64(seed);
    let repository = ModelRepository::acquire(&config.model_path, &mut acquire_rng);
    assert!(repository.is_degraded());
    ScanService::new(&config, &repository, StdRng::seed_from_u64(seed))
}

#[test]
fn test_classify_always_returns_a_structurally_valid_report() {
    let scan = write_scan("classify", 40, 40);
    let service = degraded_service(1);

    let report = service.classify(&scan);
    assert!(report.label == "No Tumor" || report.label == "Tumor Present");
    assert!((0.0..=100.0).contains(&report.confidence_percent));

    let _ = fs::remove_file(scan);
}

#[test]
fn test_explain_writes_an_overlay_with_source_dimensions() {
    let scan = write_scan("explain", 40, 30);
    let out = scratch("explain_out.png");
    let service = degraded_service(2);

    assert!(service.explain(&scan, &out));
    let overlay = image::open(&out).unwrap().to_rgb8();
    assert_eq!(overlay.dimensions(), (40, 30));

    let _ = fs::remove_file(scan);
    let _ = fs::remove_file(out);
}

#[test]
fn test_corrupt_sources_still_produce_an_overlay() {
    let scan = scratch("corrupt.png");
    fs::write(&scan, b"this is not a png").unwrap();
    let out = scratch("corrupt_out.png");
    let service = degraded_service(3);

    assert!(service.explain(&scan, &out));
    // The placeholder raster dictates the output dimensions.
    let overlay = image::open(&out).unwrap().to_rgb8();
    assert_eq!(overlay.dimensions(), (224, 224));

    let _ = fs::remove_file(scan);
    let _ = fs::remove_file(out);
}

#[test]
fn test_same_seed_reproduces_the_same_overlay() {
    let scan = write_scan("seeded", 24, 24);
    let out_a = scratch("seeded_a.png");
    let out_b = scratch("seeded_b.png");

    assert!(degraded_service(9).explain(&scan, &out_a));
    assert!(degraded_service(9).explain(&scan, &out_b));

    let a = image::open(&out_a).unwrap().to_rgb8();
    let b = image::open(&out_b).unwrap().to_rgb8();
    assert_eq!(a.dimensions(), b.dimensions());
    assert_eq!(a.as_raw(), b.as_raw());

    let _ = fs::remove_file(scan);
    let _ = fs::remove_file(out_a);
    let _ = fs::remove_file(out_b);
}

#[test]
fn test_synthetic_baseline_predicts_a_unit_interval_sigmoid() {
    let mut rng = StdRng::seed_from_u64(4);
    let repo = ModelRepository::acquire(
        &PathBuf::from("/definitely/not/here/tumor_model.json"),
        &mut rng,
    );

    let input = Array4::from_elem((1, 32, 32, 3), 0.5);
    let y = repo.model().predict(&input).unwrap();
    assert_eq!(y.len(), 1);
    assert!((0.0..=1.0).contains(&y[0]));
}
