// End-to-end tests: datasets on disk -> subsets -> collated batches ->
// transform pipelines

use std::path::Path;

use sluice::prelude::*;

// Fixture: one file per sample, holding a single number

fn fixture(n: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..n {
        std::fs::write(dir.path().join(format!("case_{i:02}")), i.to_string()).unwrap();
    }
    dir
}

/// `{id, data: [1, 2, 2] = [v, v + 1, v + 2, v + 3]}`
fn load_ramp(path: &Path, _: &LoadOptions) -> Result<Loaded> {
    let text = std::fs::read_to_string(path)?;
    let v: f64 = text
        .trim()
        .parse()
        .map_err(|_| Error::load(path, "not a number"))?;
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Loaded::One(
        Sample::new()
            .with("id", id)
            .with("data", Tensor::from_vec(vec![v, v + 1.0, v + 2.0, v + 3.0], [1, 2, 2])?),
    ))
}

fn assert_close(a: &[f64], b: &[f64], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < tol, "{x} != {y}");
    }
}

#[test]
fn test_cached_split_collate_pipeline() {
    let dir = fixture(10);
    let dataset = CacheDataset::new(dir.path(), load_ramp, CacheConfig::default()).unwrap();
    let splits = train_test_split(&dataset, &[0.8, 0.2], 0).unwrap();
    assert_eq!(splits[0].len() + splits[1].len(), 10);

    let train: Vec<Sample> = splits[0].iter().collect::<Result<_>>().unwrap();
    let batch = collate(&train, &["data"]).unwrap();
    assert_eq!(batch["data"].dims(), &[train.len(), 1, 2, 2]);

    let pipeline = Compose::new((NormMinMax::new(), Mirror::new(&[1])));
    let out = pipeline.call(batch, &mut Context::seeded(0)).unwrap();

    let expected: Vec<f64> = (0..train.len())
        .flat_map(|_| [1.0 / 3.0, 0.0, 1.0, 2.0 / 3.0])
        .collect();
    assert_close(out["data"].data(), &expected, 1e-6);
    assert_eq!(pipeline.transform_order(), vec![0, 1]);
}

#[test]
fn test_lazy_matches_cached() {
    let dir = fixture(4);
    let cached = CacheDataset::new(dir.path(), load_ramp, CacheConfig::default()).unwrap();
    let lazy = LazyDataset::new(dir.path(), load_ramp, LoadOptions::default()).unwrap();
    assert_eq!(cached.len(), lazy.len());
    for i in 0..cached.len() {
        assert_eq!(cached.get(i).unwrap(), lazy.get(i).unwrap());
    }
}

#[test]
fn test_id_lookup_feeds_pipeline() {
    let dir = fixture(5);
    let dataset =
        CacheDatasetId::new(dir.path(), load_ramp, "id", true, CacheConfig::default()).unwrap();
    let sample = dataset.get_sample_by_id("case_03").unwrap();
    assert_eq!(dataset.get_index_by_id("case_03").unwrap(), 3);

    let batch = collate(&[sample], &["data"]).unwrap();
    let pipeline = DropoutCompose::new(Clamp::new(0.0, 4.0), 1.0).unwrap();
    let out = pipeline.call(batch, &mut Context::seeded(1)).unwrap();
    assert_eq!(out["data"].data(), &[3.0, 4.0, 4.0, 4.0]);

    let err = dataset.get_index_by_id("case_99").unwrap_err();
    assert!(matches!(err, Error::IdNotFound { .. }));
}
