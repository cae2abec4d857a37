use dotwalk_core::{
    ConfigError, ConfigPatch, EdgePolicy, LegScaling, Point, SafeRegion, TickOutcome, Walker,
    WalkerConfig,
};
use serde_json::{Value, json};

#[test]
fn default_config_serializes_every_field() {
    let value = serde_json::to_value(WalkerConfig::default()).unwrap();
    assert_eq!(
        value,
        json!({
            "step_size": 3.0,
            "pause_ms": 350,
            "min_leg_distance": 100.0,
            "max_leg_distance": 600.0,
            "boundary_margin": 15.0,
            "redirect_step_distance": 150.0,
            "dot_size": 24.0,
            "edge_policy": "redirect",
            "leg_scaling": "fixed"
        })
    );
}

#[test]
fn empty_document_yields_defaults() {
    assert_eq!(WalkerConfig::from_json("{}").unwrap(), WalkerConfig::default());
}

#[test]
fn config_json_round_trips_through_from_json() {
    let cfg = WalkerConfig {
        step_size: 4.5,
        pause_ms: 0,
        edge_policy: EdgePolicy::Halt,
        leg_scaling: LegScaling::Viewport,
        ..WalkerConfig::default()
    };
    let raw = serde_json::to_string(&cfg).unwrap();
    assert_eq!(WalkerConfig::from_json(&raw).unwrap(), cfg);
}

#[test]
fn out_of_range_documents_name_the_field() {
    let cases = [
        (r#"{"step_size": 0}"#, "step_size"),
        (r#"{"pause_ms": 60001}"#, "pause_ms"),
        (r#"{"boundary_margin": -2}"#, "boundary_margin"),
        (r#"{"redirect_step_distance": -1}"#, "redirect_step_distance"),
        (r#"{"dot_size": 0}"#, "dot_size"),
    ];
    for (raw, field) in cases {
        let err = WalkerConfig::from_json(raw).unwrap_err();
        assert!(err.to_string().contains(field), "{raw}: {err}");
    }
    let err = WalkerConfig::from_json(r#"{"edge_policy": "bounce"}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn patch_deserializes_from_partial_json() {
    let patch: ConfigPatch =
        serde_json::from_str(r#"{"pause_ms": -5, "edge_policy": "halt"}"#).unwrap();
    assert_eq!(patch.pause_ms, Some(-5));
    assert_eq!(patch.edge_policy, Some(EdgePolicy::Halt));
    assert!(patch.step_size.is_none());

    let report = patch.apply_to(&WalkerConfig::default());
    assert_eq!(report.applied.as_slice(), &["edge_policy"]);
    assert_eq!(report.rejected.len(), 1);
}

#[test]
fn tick_outcomes_are_tagged_by_kind() {
    assert_eq!(
        serde_json::to_value(TickOutcome::Advanced { step: 3.0 }).unwrap(),
        json!({"kind": "advanced", "step": 3.0})
    );
    assert_eq!(
        serde_json::to_value(TickOutcome::LegPicked).unwrap(),
        json!({"kind": "leg_picked"})
    );
    let parsed: TickOutcome =
        serde_json::from_value(json!({"kind": "redirected", "step": 1.5})).unwrap();
    assert_eq!(parsed, TickOutcome::Redirected { step: 1.5 });
}

#[test]
fn snapshot_shape_for_hosts() {
    let mut walker = Walker::new(
        WalkerConfig::default(),
        SafeRegion::new(200.0, 100.0).unwrap(),
        12,
    )
    .unwrap();
    walker.set_position(Point::new(-50.0, 25.0));
    let value = serde_json::to_value(walker.snapshot()).unwrap();
    assert_eq!(value["position"], json!({"x": -50.0, "y": 25.0}));
    assert_eq!(value["heading_degrees"], Value::Null);
    assert_eq!(value["running"], json!(false));
    assert_eq!(value["dot_size"], json!(24.0));

    walker.start(0);
    let value = serde_json::to_value(walker.snapshot()).unwrap();
    assert!(value["heading_degrees"].is_f64());
    assert_eq!(value["paused_until_ms"], json!(350));
}
