use anyhow::Result;
use lakestats_analytics::loader::{
    DatasetLoader, JsonLinesLoader, parse_json_line, table_name_from_path,
};
use lakestats_analytics::{
    AnalysisError, Element, JoinInput, RecordValue, ValueSelector, correlate, histogram_of,
};
use std::io::Write;
use std::path::Path;

use test_helpers::make_session;

#[test]
fn test_parse_json_line() -> Result<()> {
    let (key, blob) = parse_json_line(r#"{"key": "TRAAAAW128F429D538", "value": [1.5, 2]}"#)?;
    assert_eq!(key, "TRAAAAW128F429D538");
    assert_eq!(
        RecordValue::decode(&blob)?,
        RecordValue::Sequence(vec![Element::Float(1.5), Element::Integer(2)])
    );

    let (key, _) = parse_json_line(r#"{"key": 42, "value": {"year": [1999]}}"#)?;
    assert_eq!(key, "42");

    assert!(parse_json_line(r#"{"key": null, "value": 1}"#).is_err());
    assert!(parse_json_line(r#"{"key": "a"}"#).is_err());
    assert!(parse_json_line("not json").is_err());
    Ok(())
}

#[test]
fn test_table_name_from_path() {
    assert_eq!(table_name_from_path(Path::new("/data/msd-tempo.jsonl")), "msd_tempo");
    assert_eq!(table_name_from_path(Path::new("Loudness.json")), "loudness");
    assert_eq!(table_name_from_path(Path::new("2024.jsonl")), "dataset_2024");
}

#[tokio::test]
async fn test_load_and_histogram() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("songs.jsonl");
    let mut file = std::fs::File::create(&path)?;
    writeln!(file, r#"{{"key": "a", "value": {{"tempo": [100.0]}}}}"#)?;
    writeln!(file, r#"{{"key": "b", "value": {{"tempo": [120.0]}}}}"#)?;
    writeln!(file)?;
    writeln!(file, r#"{{"key": "c", "value": {{"tempo": ["unknown"]}}}}"#)?;
    writeln!(file, r#"{{"key": "d", "value": {{"tempo": [140.0]}}}}"#)?;
    drop(file);

    let session = make_session(2);
    let loader = JsonLinesLoader::new(Some(3));
    let dataset = loader.load(&session, &path.to_string_lossy()).await?;
    assert_eq!(dataset.name(), "songs");
    assert_eq!(dataset.nb_partitions(), 3);
    assert_eq!(dataset.count().await?, 4);

    let histo = histogram_of(&dataset, &ValueSelector::field("tempo"), 2).await?;
    assert_eq!(histo.bin_counts, vec![1, 2]);
    assert_eq!(histo.bin_boundaries, vec![100.0, 120.0, 140.0]);
    assert_eq!(histo.non_numeric_count, 1);
    session.close()?;
    Ok(())
}

#[tokio::test]
async fn test_load_failures() -> Result<()> {
    let session = make_session(2);
    let loader = JsonLinesLoader::default();

    let missing = loader.load(&session, "/nonexistent/songs.jsonl").await;
    assert!(matches!(
        missing,
        Err(AnalysisError::DatasetUnavailable { ref identifier, .. }) if identifier == "/nonexistent/songs.jsonl"
    ));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.jsonl");
    std::fs::write(&path, "{\"key\": \"a\", \"value\": 1}\n{\"key\": \"b\"\n")?;
    let broken = loader.load(&session, &path.to_string_lossy()).await;
    assert!(matches!(
        broken,
        Err(AnalysisError::DatasetUnavailable { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_correlate_two_fields_of_one_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("songs.jsonl");
    let mut file = std::fs::File::create(&path)?;
    for i in 0..20 {
        writeln!(
            file,
            r#"{{"key": "TR{i:02}", "value": {{"tempo": [{}], "song_hotttnesss": [{}]}}}}"#,
            100 + i,
            i as f64 / 20.0
        )?;
    }
    drop(file);

    let session = make_session(2);
    let loader = JsonLinesLoader::default();
    let identifier = path.to_string_lossy();
    let tempo = loader.load(&session, &identifier).await?;
    let hotness = loader.load(&session, &identifier).await?;
    assert_eq!(tempo.name(), "songs");
    assert_eq!(hotness.name(), "songs_2");

    let inputs = vec![
        JoinInput::field(tempo, "tempo"),
        JoinInput::field(hotness, "song_hotttnesss"),
    ];
    let sample = correlate(&session, &inputs, 100).await?;
    assert_eq!(sample.population, 20);
    assert_eq!(sample.len(), 20);
    for point in &sample.points {
        let i: usize = point.key[2..].parse()?;
        assert_eq!(point.values, vec![(100 + i) as f64, i as f64 / 20.0]);
    }
    session.close()?;
    Ok(())
}
