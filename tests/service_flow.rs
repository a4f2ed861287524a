//! End-to-end flows through the public API on the filesystem backend.
//!
//! Each test gets its own temp storage roots, ingests a synthetic original
//! and drives the engine the way the CLI does.

use image::{ImageFormat, RgbImage};
use pixstore::config::{ServiceConfig, load_config};
use pixstore::engine::TransformationEngine;
use pixstore::storage::DeleteOutcome;
use pixstore::storage::shard::variation_path;
use pixstore::{Error, identifier};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

const ACCOUNT: &str = "christer";

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn config_for(root: &Path, extra: &str) -> ServiceConfig {
    let path = root.join("pixstore.toml");
    let text = format!(
        "[storage]\noriginals_dir = {:?}\nvariations_dir = {:?}\n{extra}",
        root.join("originals").display().to_string(),
        root.join("variations").display().to_string(),
    );
    std::fs::write(&path, text).unwrap();
    load_config(&path).unwrap()
}

fn engine(root: &Path) -> TransformationEngine {
    TransformationEngine::from_config(&config_for(root, "")).unwrap()
}

#[test]
fn upload_transform_and_cache_on_disk() {
    let tmp = TempDir::new().unwrap();
    let engine = engine(tmp.path());
    let original = png(120, 80);
    let info = engine.add_image(ACCOUNT, &original, BTreeMap::new()).unwrap();
    assert_eq!(info.identifier, identifier::image_identifier(&original));

    let request = json!(["resize:width=60", "border:color=fff,width=2,height=2", "convert:type=jpg"]);
    let first = engine.get_image(ACCOUNT, &info.identifier, &request).unwrap();
    assert_eq!((first.width, first.height), (64, 44));
    assert_eq!(first.mime, "image/jpeg");

    // Stored under the sharded path, keyed by final width
    let cached = variation_path(&tmp.path().join("variations"), ACCOUNT, &info.identifier, 64);
    assert!(cached.is_file(), "missing {}", cached.display());

    let second = engine.get_image(ACCOUNT, &info.identifier, &request).unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.stats().to_string(), "1 cached, 1 rendered (2 total)");
}

#[test]
fn cache_survives_engine_restart() {
    let tmp = TempDir::new().unwrap();
    let request = json!(["thumbnail:width=30,height=30", "desaturate"]);
    let (identifier, first) = {
        let engine = engine(tmp.path());
        let info = engine.add_image(ACCOUNT, &png(90, 60), BTreeMap::new()).unwrap();
        let out = engine.get_image(ACCOUNT, &info.identifier, &request).unwrap();
        (info.identifier, out)
    };

    let engine = engine(tmp.path());
    let again = engine.get_image(ACCOUNT, &identifier, &request).unwrap();
    assert_eq!(first, again);
    assert_eq!((engine.stats().hits, engine.stats().misses), (1, 0));
}

#[test]
fn different_pipelines_with_same_width_do_not_collide() {
    let tmp = TempDir::new().unwrap();
    let engine = engine(tmp.path());
    let info = engine.add_image(ACCOUNT, &png(100, 100), BTreeMap::new()).unwrap();

    let plain = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["resize:width=50"]))
        .unwrap();
    let flipped = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["resize:width=50", "flipHorizontally"]))
        .unwrap();
    assert_ne!(plain.blob, flipped.blob);

    // The slot now holds the flipped render; asking for plain re-renders it
    let plain_again = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["resize:width=50"]))
        .unwrap();
    assert_eq!(plain, plain_again);
    assert_eq!(engine.stats().misses, 3);
}

#[test]
fn delete_removes_everything_on_disk() {
    let tmp = TempDir::new().unwrap();
    let engine = engine(tmp.path());
    let info = engine.add_image(ACCOUNT, &png(64, 64), BTreeMap::new()).unwrap();
    engine.warm(ACCOUNT, &info.identifier, &[16, 32]).unwrap();

    let sample = variation_path(&tmp.path().join("variations"), ACCOUNT, &info.identifier, 16);
    let container = sample.parent().unwrap().to_path_buf();
    assert!(container.is_dir());

    assert_eq!(engine.delete_image(ACCOUNT, &info.identifier).unwrap(), 2);
    assert!(!container.exists());
    assert!(matches!(
        engine.image_info(ACCOUNT, &info.identifier),
        Err(Error::ImageNotFound { .. })
    ));
    assert_eq!(
        engine.purge_variations(ACCOUNT, &info.identifier, None).unwrap(),
        DeleteOutcome::NothingToDelete
    );
}

#[test]
fn configured_hooks_guard_get_image() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(
        tmp.path(),
        "\n[[hooks]]\nname = \"request_log\"\n\n[[hooks]]\nname = \"pipeline_limit\"\nparams = { max = 2 }\n",
    );
    let engine = TransformationEngine::from_config(&config).unwrap();
    assert_eq!(engine.hooks().len(), 3);
    let info = engine.add_image(ACCOUNT, &png(10, 10), BTreeMap::new()).unwrap();

    let err = engine
        .get_image(
            ACCOUNT,
            &info.identifier,
            &json!(["flipVertically", "flipHorizontally", "desaturate"]),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Hook 'pipeline_limit' failed during preExec: 3 transformations requested, at most 2 allowed"
    );
    assert_eq!(err.status_code(), 500);
}

#[test]
fn custom_numeric_params_change_typing() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(
        tmp.path(),
        "\n[transformations]\nnumeric_params = [\"height\"]\n",
    );
    let engine = TransformationEngine::from_config(&config).unwrap();
    let parsed = engine.parser().parse(&["crop:width=abc,height=4"]).unwrap();
    assert_eq!(parsed[0].params.get("width").unwrap().to_string(), "abc");

    let err = engine.parser().parse(&["crop:height=abc"]).unwrap_err();
    assert!(err.is_client_error());
}

#[test]
fn configured_size_limit_rejects_large_outputs() {
    let tmp = TempDir::new().unwrap();
    let config = config_for(tmp.path(), "\n[transformations]\nmax_dimension = 100\n");
    let engine = TransformationEngine::from_config(&config).unwrap();
    let info = engine.add_image(ACCOUNT, &png(40, 40), BTreeMap::new()).unwrap();

    let err = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["resize:width=200"]))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    let err = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["border:width=3000000000"]))
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let ok = engine
        .get_image(ACCOUNT, &info.identifier, &json!(["resize:width=100"]))
        .unwrap();
    assert_eq!(ok.width, 100);
    assert_eq!(engine.stats().misses, 1);
}

#[test]
fn metadata_roundtrips_through_disk() {
    let tmp = TempDir::new().unwrap();
    let engine = engine(tmp.path());
    let meta = BTreeMap::from([("title".to_string(), "dawn".to_string())]);
    let info = engine.add_image(ACCOUNT, &png(8, 8), meta).unwrap();

    let changes = BTreeMap::from([("place".to_string(), "fjord".to_string())]);
    engine.update_metadata(ACCOUNT, &info.identifier, changes).unwrap();

    let reloaded = self::engine(tmp.path())
        .image_info(ACCOUNT, &info.identifier)
        .unwrap();
    assert_eq!(reloaded.metadata.len(), 2);
    assert_eq!(reloaded.metadata["title"], "dawn");
    assert_eq!(reloaded.metadata["place"], "fjord");
}
