//! End-to-end reconciliation against the in-memory cluster

use serde_json::json;
use tidemark_core::{Document, Gvk, ObjectReference, RenderedManifest};
use tidemark_engine::Predicate;
use tidemark_kube::{
    FixupRegistry, KubeError, LiveObject, MockCluster, Outcome, Reconciler,
};

fn manifests(items: &[(&str, &str)]) -> Vec<Result<RenderedManifest, KubeError>> {
    items
        .iter()
        .map(|(source, content)| Ok(RenderedManifest::new(*source, *content)))
        .collect()
}

fn service_gvk() -> Gvk {
    Gvk::new("", "v1", "Service")
}

const SERVICE: &str = "apiVersion: v1\nkind: Service\nmetadata:\n  name: x\nspec:\n  clusterIP: none\n";

fn live_service(cluster_ip: &str) -> Document {
    Document::from(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {"name": "x", "namespace": "default"},
        "spec": {"clusterIP": cluster_ip}
    }))
}

#[tokio::test]
async fn test_live_cluster_ip_is_preserved() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.insert(live_service("10.0.0.5")).unwrap();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let mut outcomes = Vec::new();
    let summary = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(manifests(&[("service.yaml", SERVICE)]), |o| outcomes.push(o.clone()))
        .await
        .unwrap();

    let sent = &cluster.applied()[0];
    assert_eq!(sent.get_str(&["spec", "clusterIP"]), Some("10.0.0.5"));
    assert_eq!(sent.get_str(&["metadata", "resourceVersion"]), Some("1"));

    assert_eq!(summary.processed.len(), 1);
    assert!(matches!(&outcomes[0], Outcome::Applied { created: false, .. }));

    let stored = cluster.object(&service_gvk(), None, "x").unwrap();
    assert_eq!(stored.get_str(&["spec", "clusterIP"]), Some("10.0.0.5"));
}

#[tokio::test]
async fn test_headless_live_service_is_not_copied() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.insert(live_service("None")).unwrap();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    Reconciler::new(&cluster, &fixups, &predicate)
        .apply(manifests(&[("service.yaml", SERVICE)]), |_| {})
        .await
        .unwrap();

    let sent = &cluster.applied()[0];
    assert_eq!(sent.get_str(&["spec", "clusterIP"]), Some("none"));
}

#[tokio::test]
async fn test_missing_live_object_is_created_unchanged() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let mut outcomes = Vec::new();
    Reconciler::new(&cluster, &fixups, &predicate)
        .apply(manifests(&[("service.yaml", SERVICE)]), |o| outcomes.push(o.clone()))
        .await
        .unwrap();

    let sent = &cluster.applied()[0];
    let rendered = Document::from_yaml(SERVICE).unwrap();
    assert_eq!(sent, &rendered);
    assert!(matches!(&outcomes[0], Outcome::Applied { created: true, .. }));
    assert_eq!(cluster.object_count(), 1);
}

#[tokio::test]
async fn test_predicate_skips_and_order_is_kept() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::parse("{{.metadata.name}}=^foo").unwrap();

    let stream = manifests(&[
        (
            "a.yaml",
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: foobar\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: barfoo\n",
        ),
        ("b.yaml", "apiVersion: v1\nkind: Secret\nmetadata:\n  name: foo-secret\n"),
    ]);

    let mut seen = Vec::new();
    let summary = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(stream, |o| seen.push(o.to_string()))
        .await
        .unwrap();

    assert_eq!(
        seen,
        vec![
            "default/ConfigMap/foobar created",
            "ConfigMap/barfoo skipped",
            "default/Secret/foo-secret created",
        ]
    );
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(cluster.operation_counts().applies, 2);
}

#[tokio::test]
async fn test_type_conflict_aborts_run() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.insert(live_service("10.0.0.5")).unwrap();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let stream = manifests(&[
        ("bad.yaml", "apiVersion: v1\nkind: Service\nmetadata:\n  name: x\nspec: 666\n"),
        ("later.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: never\n"),
    ]);

    let err = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(stream, |_| {})
        .await
        .unwrap_err();

    match &err {
        KubeError::Object { source_name, gvk, .. } => {
            assert_eq!(source_name, "bad.yaml");
            assert_eq!(gvk.as_ref(), Some(&service_gvk()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root(),
        KubeError::FixupTypeConflict { path, found: "number", .. } if path == "spec"
    ));
    assert_eq!(cluster.operation_counts().applies, 0);
    assert!(cluster
        .object(&Gvk::new("", "v1", "ConfigMap"), None, "never")
        .is_none());
}

#[tokio::test]
async fn test_predicate_failure_aborts_run() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::parse("{{ fail('x') }}=.").unwrap();

    let mut outcomes = 0;
    let err = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(
            manifests(&[("cm.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n")]),
            |_| outcomes += 1,
        )
        .await
        .unwrap_err();

    match &err {
        KubeError::Object { source_name, gvk, .. } => {
            assert_eq!(source_name, "cm.yaml");
            assert_eq!(gvk.as_ref(), Some(&Gvk::new("", "v1", "ConfigMap")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root(),
        KubeError::PredicateEvaluation { template, .. } if template == "{{ fail('x') }}"
    ));
    assert_eq!(outcomes, 0);
    assert_eq!(cluster.operation_counts().applies, 0);
    assert_eq!(cluster.object_count(), 0);
}

#[tokio::test]
async fn test_apply_failure_keeps_earlier_objects() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.reject_apply(
        ObjectReference {
            gvk: Gvk::new("", "v1", "ConfigMap"),
            namespace: Some("default".to_string()),
            name: "second".to_string(),
        },
        "denied",
    );
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let stream = manifests(&[(
        "all.yaml",
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: first\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: second\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: third\n",
    )]);

    let mut applied = 0;
    let err = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(stream, |_| applied += 1)
        .await
        .unwrap_err();

    assert_eq!(applied, 1);
    assert!(matches!(err.root(), KubeError::Apply { message, .. } if message == "denied"));
    assert_eq!(cluster.object_count(), 1);
    assert_eq!(cluster.operation_counts().applies, 2);
}

#[tokio::test]
async fn test_unknown_kind_is_resolution_error() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let err = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(
            manifests(&[("w.yaml", "apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: w\n")]),
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("w.yaml (example.com/v1, Kind=Widget): "));
    assert!(matches!(err.root(), KubeError::ResourceResolution { kind, .. } if kind == "Widget"));
}

#[tokio::test]
async fn test_parse_error_stops_before_later_objects() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    let stream = manifests(&[
        ("ok.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: ok\n"),
        ("broken.yaml", "kind: ConfigMap\nmetadata:\n  name: broken\n"),
        ("late.yaml", "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: late\n"),
    ]);

    let err = Reconciler::new(&cluster, &fixups, &predicate)
        .apply(stream, |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, KubeError::Parse { ref source_name, .. } if source_name == "broken.yaml"));
    assert_eq!(cluster.object_count(), 1);
}

#[tokio::test]
async fn test_dry_run_persists_nothing() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.insert(live_service("10.0.0.5")).unwrap();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();

    Reconciler::new(&cluster, &fixups, &predicate)
        .dry_run(true)
        .apply(manifests(&[("service.yaml", SERVICE)]), |_| {})
        .await
        .unwrap();

    let stored = cluster.object(&service_gvk(), None, "x").unwrap();
    assert_eq!(stored.get_str(&["metadata", "resourceVersion"]), Some("1"));
    assert_eq!(cluster.applied().len(), 1);
}

#[tokio::test]
async fn test_second_apply_updates_in_place() {
    let cluster = MockCluster::with_builtin_kinds();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::default();
    let reconciler = Reconciler::new(&cluster, &fixups, &predicate);
    let config = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  a: \"1\"\n";

    let first = reconciler
        .apply(manifests(&[("cfg.yaml", config)]), |_| {})
        .await
        .unwrap();
    let second = reconciler
        .apply(manifests(&[("cfg.yaml", config)]), |_| {})
        .await
        .unwrap();

    assert_eq!(first.created, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.processed, vec!["default/ConfigMap/cfg configured"]);
}

#[tokio::test]
async fn test_get_reports_found_and_missing() {
    let cluster = MockCluster::with_builtin_kinds();
    cluster.insert(live_service("10.0.0.5")).unwrap();
    let fixups = FixupRegistry::with_defaults();
    let predicate = Predicate::parse("!{{ kind }}=Secret").unwrap();

    let mut live = Vec::new();
    let summary = Reconciler::new(&cluster, &fixups, &predicate)
        .get(
            manifests(&[(
                "all.yaml",
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: x\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: absent\n---\napiVersion: v1\nkind: Secret\nmetadata:\n  name: hidden\n",
            )]),
            |l| live.push(l.clone()),
        )
        .await
        .unwrap();

    assert_eq!(live.len(), 2);
    match &live[0] {
        LiveObject::Found { object, .. } => {
            assert_eq!(object.get_str(&["spec", "clusterIP"]), Some("10.0.0.5"));
        }
        other => panic!("unexpected live object: {other:?}"),
    }
    assert!(matches!(&live[1], LiveObject::Missing { reference, .. } if reference.name == "absent"));
    assert_eq!(summary.missing.len(), 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(cluster.operation_counts().applies, 0);
}
