//! End-to-end scoring runs over small synthetic annotation sets.

use std::collections::BTreeMap;

use actev_models::{
    ActivityInstance, AlignmentKind, BoundingBox, FileIndex, ModelError, ObjectInstance,
    ObjectLocalizationFrame,
};
use actev_scorer::{
    AggregateMethod, ProtocolId, Scorer, ScorerConfig, ScorerError, ScoringParameters,
};
use actev_signal::Signal;
use proptest::prelude::*;

const FILE: &str = "VIRAT_S_000001.mp4";

/// Two minutes at 30 fps.
fn file_index() -> FileIndex {
    FileIndex::new().with_file(FILE, 30.0, 0, 3600).unwrap()
}

fn instance(activity: &str, id: &str, conf: Option<f64>, start: f64, end: f64) -> ActivityInstance {
    let localization = BTreeMap::from([(FILE.to_string(), Signal::segment(start, end, 1.0).unwrap())]);
    ActivityInstance::new(activity, id, conf, localization).unwrap()
}

fn person(id: &str, bbox: BoundingBox, start: i64, end: i64) -> ObjectInstance {
    let frames = BTreeMap::from([(
        FILE.to_string(),
        vec![
            ObjectLocalizationFrame::present(start, bbox),
            ObjectLocalizationFrame::absent(end),
        ],
    )]);
    ObjectInstance::from_frames("Person", id, None, frames).unwrap()
}

fn scorer(protocol: ProtocolId) -> Scorer {
    let config = ScorerConfig::default()
        .with_protocol(protocol)
        .with_worker_threads(2);
    Scorer::new(config, ScoringParameters::default()).unwrap()
}

fn annotations() -> Vec<ActivityInstance> {
    vec![
        instance("Talking", "t1", None, 0.0, 600.0),
        instance("Talking", "t2", None, 900.0, 1500.0),
        instance("Riding", "r1", None, 300.0, 1200.0),
        instance("Riding", "r2", None, 2000.0, 3000.0),
    ]
}

#[test]
fn test_perfect_system_scores_zero_error() {
    let references = annotations();
    let systems: Vec<ActivityInstance> = references
        .iter()
        .map(|r| {
            let mut s = r.clone();
            s.activity_id = format!("sys-{}", r.activity_id);
            s.presence_conf = Some(1.0);
            s
        })
        .collect();

    let report = scorer(ProtocolId::ActivityDetection)
        .score(references, systems, file_index())
        .unwrap();

    assert!(report
        .alignments
        .iter()
        .all(|r| r.kind == AlignmentKind::CorrectDetection));
    assert_eq!(report.alignments.len(), 4);

    for activity in ["Riding", "Talking"] {
        let metrics = report.activity(activity);
        assert_eq!(metrics["p_miss@0.15rfa"], Some(0.0));
        assert_eq!(metrics["p_miss@1rfa"], Some(0.0));
        assert_eq!(metrics["nAUDC@0.2rfa"], Some(0.0));
        assert_eq!(metrics["n-mide"], Some(0.0));
    }
    for point in &report.det_points {
        assert_eq!(point.p_miss, Some(0.0));
        assert_eq!(point.rfa, Some(0.0));
    }

    let micro = report.aggregate(AggregateMethod::Micro, "p_miss@0.15rfa").unwrap();
    assert_eq!(micro.value, Some(0.0));
}

#[test]
fn test_system_without_output_misses_everything() {
    let report = scorer(ProtocolId::ActivityDetection)
        .score(annotations(), Vec::new(), file_index())
        .unwrap();

    assert!(report.det_points.is_empty());
    for activity in ["Riding", "Talking"] {
        let metrics = report.activity(activity);
        assert_eq!(metrics["p_miss@0.15rfa"], Some(1.0));
        assert_eq!(metrics["nAUDC@0.2rfa"], Some(1.0));
        assert_eq!(metrics["n-mide"], None);
    }
}

#[test]
fn test_false_alarms_raise_rate() {
    let references = vec![instance("Talking", "t1", None, 0.0, 600.0)];
    let systems = vec![
        instance("Talking", "s1", Some(0.9), 0.0, 600.0),
        instance("Talking", "s2", Some(0.5), 1800.0, 2400.0),
        instance("Talking", "s3", Some(0.2), 2700.0, 3300.0),
    ];

    let report = scorer(ProtocolId::ActivityDetection)
        .score(references, systems, file_index())
        .unwrap();

    let rates: Vec<Option<f64>> = report.det_points.iter().map(|p| p.rfa).collect();
    // two scored minutes
    assert_eq!(rates, vec![Some(0.0), Some(0.5), Some(1.0)]);
    assert_eq!(report.activity("Talking")["p_miss@0.15rfa"], Some(0.0));
}

#[test]
fn test_object_detection_gates_on_objects() {
    let bbox = BoundingBox::new(10.0, 10.0, 20.0, 40.0);
    let elsewhere = BoundingBox::new(200.0, 200.0, 20.0, 40.0);

    let reference = instance("Riding", "r1", None, 0.0, 60.0)
        .with_objects(vec![person("p1", bbox, 0, 60)]);
    let matching = instance("Riding", "s1", Some(0.8), 0.0, 60.0)
        .with_objects(vec![person("sp1", bbox, 0, 60)]);
    let displaced = instance("Riding", "s2", Some(0.9), 0.0, 60.0)
        .with_objects(vec![person("sp2", elsewhere, 0, 60)]);

    let report = scorer(ProtocolId::ActivityObjectDetection)
        .score(vec![reference], vec![matching, displaced], file_index())
        .unwrap();

    let correct: Vec<_> = report
        .alignments
        .iter()
        .filter(|r| r.kind == AlignmentKind::CorrectDetection)
        .collect();
    assert_eq!(correct.len(), 1);
    assert_eq!(correct[0].sys_id.as_deref(), Some("s1"));
    assert_eq!(correct[0].components.get("object_congruence"), Some(&1.0));

    let metrics = report.activity("Riding");
    assert_eq!(metrics["minMODE"], Some(0.0));
    assert!(!metrics.contains_key("minMOTE"));
}

#[test]
fn test_object_tracking_reports_mote() {
    let bbox = BoundingBox::new(10.0, 10.0, 20.0, 40.0);
    let reference = instance("Riding", "r1", None, 0.0, 60.0)
        .with_objects(vec![person("p1", bbox, 0, 60)]);
    let system = instance("Riding", "s1", Some(0.8), 0.0, 60.0)
        .with_objects(vec![person("sp1", bbox, 0, 30), person("sp2", bbox, 30, 60)]);

    let report = scorer(ProtocolId::ActivityObjectTracking)
        .score(vec![reference], vec![system], file_index())
        .unwrap();

    let row = &report.alignments[0];
    assert_eq!(row.kind, AlignmentKind::CorrectDetection);
    assert_eq!(row.components.get("object_id_switches"), Some(&1.0));

    let metrics = report.activity("Riding");
    assert_eq!(metrics["minMODE"], Some(0.0));
    let mote = metrics["minMOTE"].unwrap();
    assert!((mote - 1.0 / 60.0).abs() < 1e-12);
}

#[test]
fn test_per_file_protocol_aligns_files_separately() {
    let index = file_index().with_file("VIRAT_S_000002.mp4", 30.0, 0, 3600).unwrap();
    let localization = BTreeMap::from([
        (FILE.to_string(), Signal::segment(0.0, 600.0, 1.0).unwrap()),
        ("VIRAT_S_000002.mp4".to_string(), Signal::segment(0.0, 600.0, 1.0).unwrap()),
    ]);
    let reference = ActivityInstance::new("Talking", "t1", None, localization.clone()).unwrap();
    let system = ActivityInstance::new("Talking", "s1", Some(0.7), localization).unwrap();

    let whole = scorer(ProtocolId::ActivityDetection)
        .score(vec![reference.clone()], vec![system.clone()], index.clone())
        .unwrap();
    let per_file = scorer(ProtocolId::ActivityDetectionPerFile)
        .score(vec![reference], vec![system], index)
        .unwrap();

    assert_eq!(whole.alignments.len(), 1);
    assert_eq!(per_file.alignments.len(), 2);
    assert!(per_file
        .alignments
        .iter()
        .all(|r| r.kind == AlignmentKind::CorrectDetection));
}

#[test]
fn test_invalid_input_fails_run() {
    let err = scorer(ProtocolId::ActivityDetection)
        .score(
            annotations(),
            vec![instance("Talking", "s1", None, 0.0, 600.0)],
            file_index(),
        )
        .unwrap_err();
    assert!(matches!(err, ScorerError::Model(_)));

    let stray = ActivityInstance::new(
        "Talking",
        "t9",
        None,
        BTreeMap::from([("missing.mp4".to_string(), Signal::segment(0.0, 10.0, 1.0).unwrap())]),
    )
    .unwrap();
    assert!(scorer(ProtocolId::ActivityDetection)
        .score(vec![stray], Vec::new(), file_index())
        .is_err());
}

#[test]
fn test_non_finite_localization_fails_run() {
    let mut reference = instance("Talking", "t1", None, 0.0, 600.0);
    let nan = Signal::segment(0.0, 600.0, 1.0).unwrap().scale(f64::NAN);
    reference.localization.insert(FILE.to_string(), nan.clone());
    let mut system = instance("Talking", "s1", Some(0.9), 0.0, 600.0);
    system.localization.insert(FILE.to_string(), nan);

    let err = scorer(ProtocolId::ActivityDetection)
        .score(vec![reference], vec![system], file_index())
        .unwrap_err();
    assert!(matches!(
        err,
        ScorerError::Model(ModelError::NonFiniteLocalization { .. })
    ));
}

#[test]
fn test_report_serializes() {
    let report = scorer(ProtocolId::ActivityDetection)
        .score(annotations(), Vec::new(), file_index())
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["protocol"], "activity_detection");
    assert_eq!(json["run_id"], report.run_id.as_str());
    assert_eq!(json["alignments"].as_array().map(Vec::len), Some(4));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_det_counts_are_consistent(
        refs in prop::collection::vec((0u32..3000, 30u32..400), 1..6),
        syss in prop::collection::vec((0u32..3000, 30u32..400, 1u32..100), 0..6),
    ) {
        let references: Vec<ActivityInstance> = refs
            .iter()
            .enumerate()
            .map(|(i, (start, len))| {
                let start = *start as f64;
                instance("Talking", &format!("r{}", i), None, start, start + *len as f64)
            })
            .collect();
        let systems: Vec<ActivityInstance> = syss
            .iter()
            .enumerate()
            .map(|(i, (start, len, conf))| {
                let start = *start as f64;
                let conf = *conf as f64 / 100.0;
                instance("Talking", &format!("s{}", i), Some(conf), start, start + *len as f64)
            })
            .collect();

        let report = scorer(ProtocolId::ActivityDetection)
            .score(references, systems, file_index())
            .unwrap();

        for point in &report.det_points {
            prop_assert_eq!(point.num_correct + point.num_miss, refs.len());
            let p_miss = point.p_miss.unwrap();
            prop_assert!((0.0..=1.0).contains(&p_miss));
        }
        let value = report.activity("Talking")["p_miss@0.15rfa"].unwrap();
        prop_assert!((0.0..=1.0).contains(&value));
    }
}
