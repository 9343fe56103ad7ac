use anyhow::Result;
use lakestats_analytics::config::AnalysisConfig;
use lakestats_analytics::{
    AnalysisError, AnalysisSession, Element, FieldValidity, JoinInput, Record, correlate,
    fit_line,
};
use std::collections::HashSet;

use test_helpers::{make_session, song};

fn key(i: usize) -> String {
    format!("TR{i:04}")
}

/// Keys 0..300, value i.
fn loudness(session: &AnalysisSession) -> Result<JoinInput> {
    let records = (0..300).map(|i| Record::scalar(key(i), i as f64));
    Ok(JoinInput::whole(
        session.dataset_from_records("loudness", records)?,
    ))
}

/// Keys 100..400, tempo 2i + 1, unknown for multiples of 10.
fn tempo(session: &AnalysisSession) -> Result<JoinInput> {
    let records = (100..400).map(|i| {
        let tempo = if i % 10 == 0 {
            Element::Text("nan".into())
        } else {
            Element::Float(2.0 * i as f64 + 1.0)
        };
        song(&key(i), &[("tempo", tempo)])
    });
    Ok(JoinInput::field(
        session.dataset_from_records("tempo", records)?,
        "tempo",
    ))
}

#[tokio::test]
async fn test_correlate_keeps_joined_valid_records() -> Result<()> {
    let session = make_session(4);
    let inputs = vec![loudness(&session)?, tempo(&session)?];
    let sample = correlate(&session, &inputs, 1000).await?;
    // keys 100..300 except the 20 multiples of 10
    assert_eq!(sample.population, 180);
    assert_eq!(sample.fraction, 1.0);
    assert_eq!(sample.len(), 180);
    assert_eq!(sample.dimensions, 2);
    let keys: HashSet<&str> = sample.points.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys.len(), 180);
    for point in &sample.points {
        let i: usize = point.key[2..].parse()?;
        assert!((100..300).contains(&i) && i % 10 != 0, "{}", point.key);
        assert_eq!(point.values, vec![i as f64, 2.0 * i as f64 + 1.0]);
    }

    let line = fit_line(&sample.xy())?;
    assert!((line.slope - 2.0).abs() < 1e-9);
    assert!((line.intercept - 1.0).abs() < 1e-6);
    session.close()?;
    Ok(())
}

#[tokio::test]
async fn test_correlate_three_datasets_with_known_years() -> Result<()> {
    let session = make_session(3);
    let years = (0..400).map(|i| {
        let year = if i % 2 == 1 { 0 } else { 1950 + (i % 60) as i64 };
        song(&key(i), &[("year", Element::Integer(year))])
    });
    let year_input = JoinInput::field(session.dataset_from_records("musicbrainz", years)?, "year")
        .with_validity(FieldValidity::KnownYear);
    let inputs = vec![loudness(&session)?, tempo(&session)?, year_input];
    let sample = correlate(&session, &inputs, 10_000).await?;
    // even keys in 100..300 that are not multiples of 10
    assert_eq!(sample.population, 80);
    assert_eq!(sample.dimensions, 3);
    for point in &sample.points {
        let i: usize = point.key[2..].parse()?;
        assert_eq!(i % 2, 0);
        assert_eq!(point.values[2], (1950 + i % 60) as f64);
    }
    Ok(())
}

#[tokio::test]
async fn test_correlate_sample_size_expectation() -> Result<()> {
    // no fixed seed: every call draws a new sample
    let session = AnalysisSession::new(AnalysisConfig::default().with_target_partitions(4));
    let left = (0..1500).map(|i| Record::scalar(key(i), i as f64));
    let right = (0..1500).map(|i| Record::scalar(key(i), (i % 7) as f64));
    let inputs = vec![
        JoinInput::whole(session.dataset_from_records("left", left)?),
        JoinInput::whole(session.dataset_from_records("right", right)?),
    ];
    let target = 500;
    let nb_runs = 30;
    let mut total = 0;
    for _ in 0..nb_runs {
        let sample = correlate(&session, &inputs, target).await?;
        assert_eq!(sample.population, 1500);
        total += sample.len();
    }
    let mean = total as f64 / nb_runs as f64;
    // standard deviation of the mean is about 3.3
    assert!((mean - target as f64).abs() < 40.0, "mean sample size {mean}");
    Ok(())
}

#[tokio::test]
async fn test_correlate_is_reproducible_with_a_seed() -> Result<()> {
    let session = make_session(2);
    let inputs = vec![loudness(&session)?, tempo(&session)?];
    let first = correlate(&session, &inputs, 50).await?;
    let second = correlate(&session, &inputs, 50).await?;
    let keys = |sample: &lakestats_analytics::JoinedSample| {
        let mut keys: Vec<String> = sample.points.iter().map(|p| p.key.clone()).collect();
        keys.sort();
        keys
    };
    assert_eq!(first.seed, second.seed);
    assert_eq!(keys(&first), keys(&second));
    assert!(first.len() < first.population);
    Ok(())
}

#[tokio::test]
async fn test_correlate_without_overlap() -> Result<()> {
    let session = make_session(2);
    let left = (0..10).map(|i| Record::scalar(key(i), 1.0));
    let right = (10..20).map(|i| Record::scalar(key(i), 2.0));
    let inputs = vec![
        JoinInput::whole(session.dataset_from_records("left", left)?),
        JoinInput::whole(session.dataset_from_records("right", right)?),
    ];
    let result = correlate(&session, &inputs, 5).await;
    assert!(matches!(result, Err(AnalysisError::DegenerateInput(_))));
    Ok(())
}

#[tokio::test]
async fn test_correlate_configuration_errors() -> Result<()> {
    let session = make_session(2);
    let one = vec![loudness(&session)?];
    assert!(matches!(
        correlate(&session, &one, 10).await,
        Err(AnalysisError::Configuration(_))
    ));
    let four = vec![one[0].clone(), one[0].clone(), one[0].clone(), one[0].clone()];
    assert!(matches!(
        correlate(&session, &four, 10).await,
        Err(AnalysisError::Configuration(_))
    ));
    let two = vec![one[0].clone(), tempo(&session)?];
    assert!(matches!(
        correlate(&session, &two, 0).await,
        Err(AnalysisError::Configuration(_))
    ));
    Ok(())
}
