#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition, DeploymentStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use quay_cmpstatus::{CheckContext, CheckError, Checker, DeploymentChecker};
use quay_core::prelude::*;
use quay_kubehub::InMemoryAccessor;

const NS: &str = "quay";

fn registry(component: Component) -> QuayRegistry {
    QuayRegistry::new("registry", NS, "uid").with_component(component)
}

fn owner(uid: &str) -> OwnerReference {
    OwnerReference {
        kind: "QuayRegistry".into(),
        name: "registry".into(),
        api_version: "quay.redhat.com/v1".into(),
        uid: uid.into(),
        ..Default::default()
    }
}

fn deployment(owners: Vec<OwnerReference>, available: Option<(&str, &str)>, replicas: i32) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some("registry-quay-mirror".into()),
            owner_references: if owners.is_empty() { None } else { Some(owners) },
            ..Default::default()
        },
        status: Some(DeploymentStatus {
            available_replicas: Some(replicas),
            conditions: available.map(|(status, message)| {
                vec![DeploymentCondition {
                    type_: "Available".into(),
                    status: status.into(),
                    message: Some(message.into()),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn expected(status: ConditionStatus, reason: ConditionReason, message: &str) -> Condition {
    Condition::new(ConditionType::ComponentMirrorReady, status, reason, message)
}

async fn run(reg: &QuayRegistry, acc: InMemoryAccessor) -> (Condition, Arc<InMemoryAccessor>) {
    let acc = Arc::new(acc);
    let mirror = DeploymentChecker::mirror(acc.clone());
    let ctx = CheckContext::with_timeout(Duration::from_secs(2));
    let cond = mirror.check(&ctx, reg).await.expect("unexpected error");
    assert!(cond.last_update_time.timestamp() > 0, "unexpected zeroed last update time for condition");
    (cond, acc)
}

#[tokio::test]
async fn mirror_check_table() {
    struct Case {
        name: &'static str,
        quay: QuayRegistry,
        objs: Vec<Deployment>,
        cond: Condition,
    }

    let cases = vec![
        Case {
            name: "not managed",
            quay: registry(Component::unmanaged(ComponentKind::Mirror)),
            objs: vec![],
            cond: expected(ConditionStatus::True, ConditionReason::ComponentUnmanaged, "Mirror not managed by the operator"),
        },
        Case {
            name: "deployment not found",
            quay: registry(Component::managed(ComponentKind::Mirror)),
            objs: vec![],
            cond: expected(ConditionStatus::False, ConditionReason::ComponentNotReady, "Mirror deployment not found"),
        },
        Case {
            name: "deployment not owned",
            quay: registry(Component::managed(ComponentKind::Mirror)),
            objs: vec![deployment(vec![], None, 0)],
            cond: expected(ConditionStatus::False, ConditionReason::ComponentNotReady, "Mirror deployment not owned by QuayRegistry"),
        },
        Case {
            name: "deployment not available",
            quay: registry(Component::managed(ComponentKind::Mirror)),
            objs: vec![deployment(vec![owner("uid")], Some(("False", "something went wrong")), 1)],
            cond: expected(
                ConditionStatus::False,
                ConditionReason::ComponentNotReady,
                "Deployment registry-quay-mirror: something went wrong",
            ),
        },
        Case {
            name: "deployment scaled down",
            quay: registry(Component::managed(ComponentKind::Mirror).with_replicas(0)),
            objs: vec![deployment(vec![owner("uid")], Some(("False", "something went wrong")), 0)],
            cond: expected(ConditionStatus::True, ConditionReason::ComponentReady, "Mirror manually scaled down"),
        },
        Case {
            name: "deployment available",
            quay: registry(Component::managed(ComponentKind::Mirror)),
            objs: vec![deployment(vec![owner("uid")], Some(("True", "minimum replicas available")), 1)],
            cond: expected(ConditionStatus::True, ConditionReason::ComponentReady, "Mirror components healthy"),
        },
    ];

    for case in cases {
        let acc = case.objs.into_iter().fold(InMemoryAccessor::new(), |acc, d| acc.with(NS, d));
        let (cond, _) = run(&case.quay, acc).await;
        assert!(case.cond.eq_ignoring_time(&cond), "{}: expecting {:?}, received {:?}", case.name, case.cond, cond);
    }
}

#[tokio::test]
async fn unmanaged_performs_no_lookup() {
    let acc = InMemoryAccessor::new()
        .with(NS, deployment(vec![owner("uid")], Some(("False", "broken")), 0))
        .failing("should not be called");
    let (cond, acc) = run(&registry(Component::unmanaged(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.reason, ConditionReason::ComponentUnmanaged);
    assert_eq!(acc.lookups(), 0);
}

#[tokio::test]
async fn undeclared_component_counts_as_unmanaged() {
    let reg = QuayRegistry::new("registry", NS, "uid").with_component(Component::managed(ComponentKind::Quay));
    let (cond, acc) = run(&reg, InMemoryAccessor::new()).await;
    assert_eq!(cond.status, ConditionStatus::True);
    assert_eq!(cond.reason, ConditionReason::ComponentUnmanaged);
    assert_eq!(acc.lookups(), 0);
}

#[tokio::test]
async fn foreign_uid_is_not_owned_even_when_available() {
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![owner("someone-else")], Some(("True", "ok")), 3));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.status, ConditionStatus::False);
    assert!(cond.message.ends_with("not owned by QuayRegistry"), "{}", cond.message);
}

#[tokio::test]
async fn one_matching_owner_among_several_is_enough() {
    let mut other = owner("uid");
    other.kind = "Deployment".into();
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![other, owner("uid")], Some(("True", "ok")), 1));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.reason, ConditionReason::ComponentReady);
}

#[tokio::test]
async fn scale_down_does_not_bypass_ownership() {
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![], Some(("False", "x")), 0));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror).with_replicas(0)), acc).await;
    assert_eq!(cond.message, "Mirror deployment not owned by QuayRegistry");
}

#[tokio::test]
async fn nonzero_replica_override_still_checks_availability() {
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![owner("uid")], Some(("False", "quota exceeded")), 0));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror).with_replicas(2)), acc).await;
    assert_eq!(cond.status, ConditionStatus::False);
    assert_eq!(cond.message, "Deployment registry-quay-mirror: quota exceeded");
}

#[tokio::test]
async fn missing_available_condition_is_not_ready() {
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![owner("uid")], None, 0));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.status, ConditionStatus::False);
    assert_eq!(cond.reason, ConditionReason::ComponentNotReady);
    assert_eq!(cond.message, "Deployment registry-quay-mirror: Available condition not reported");
}

#[tokio::test]
async fn unknown_available_status_is_not_ready() {
    let acc = InMemoryAccessor::new().with(NS, deployment(vec![owner("uid")], Some(("Unknown", "progress deadline")), 1));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.status, ConditionStatus::False);
    assert_eq!(cond.message, "Deployment registry-quay-mirror: progress deadline");
}

#[tokio::test]
async fn repeated_evaluation_is_stable() {
    let reg = registry(Component::managed(ComponentKind::Mirror));
    let acc = Arc::new(InMemoryAccessor::new().with(NS, deployment(vec![owner("uid")], Some(("False", "crashloop")), 0)));
    let mirror = DeploymentChecker::mirror(acc);
    let ctx = CheckContext::new();
    let first = mirror.check(&ctx, &reg).await.expect("first");
    let second = mirror.check(&ctx, &reg).await.expect("second");
    assert!(first.eq_ignoring_time(&second));
    assert!(second.last_update_time >= first.last_update_time);
}

#[tokio::test]
async fn repeated_evaluation_differs_only_in_update_time() {
    let reg = registry(Component::managed(ComponentKind::Mirror));
    let acc = Arc::new(InMemoryAccessor::new().with(NS, deployment(vec![], None, 0)));
    let mirror = DeploymentChecker::mirror(acc);
    let ctx = CheckContext::new();
    let first = mirror.check(&ctx, &reg).await.expect("first");
    tokio::time::sleep(Duration::from_millis(5)).await;
    let mut second = mirror.check(&ctx, &reg).await.expect("second");

    assert_eq!(first.last_transition_time, None);
    second.last_update_time = first.last_update_time;
    assert_eq!(first, second);
}

#[tokio::test]
async fn lookup_in_other_namespace_is_not_found() {
    let acc = InMemoryAccessor::new().with("elsewhere", deployment(vec![owner("uid")], Some(("True", "ok")), 1));
    let (cond, _) = run(&registry(Component::managed(ComponentKind::Mirror)), acc).await;
    assert_eq!(cond.message, "Mirror deployment not found");
}

#[tokio::test]
async fn infrastructure_failure_is_an_error() {
    let acc = Arc::new(InMemoryAccessor::new().failing("connection refused"));
    let mirror = DeploymentChecker::mirror(acc);
    let err = mirror.check(&CheckContext::new(), &registry(Component::managed(ComponentKind::Mirror))).await.unwrap_err();
    assert!(matches!(err, CheckError::Access(_)), "{:?}", err);
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn deadline_during_lookup_is_an_error() {
    let acc = Arc::new(InMemoryAccessor::new().with_latency(Duration::from_secs(5)));
    let mirror = DeploymentChecker::mirror(acc);
    let ctx = CheckContext::with_timeout(Duration::from_millis(20));
    let err = mirror.check(&ctx, &registry(Component::managed(ComponentKind::Mirror))).await.unwrap_err();
    assert!(matches!(err, CheckError::DeadlineExceeded), "{:?}", err);
}

#[tokio::test]
async fn cancellation_during_lookup_is_an_error() {
    let acc = Arc::new(InMemoryAccessor::new().with_latency(Duration::from_secs(5)));
    let mirror = DeploymentChecker::mirror(acc);
    let ctx = CheckContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });
    let err = mirror.check(&ctx, &registry(Component::managed(ComponentKind::Mirror))).await.unwrap_err();
    assert!(matches!(err, CheckError::Canceled), "{:?}", err);
}

#[tokio::test]
async fn sibling_checkers_share_the_shape() {
    let reg = QuayRegistry::new("registry", NS, "uid").with_component(Component::managed(ComponentKind::Redis));
    let acc = Arc::new(InMemoryAccessor::new());
    let redis = DeploymentChecker::redis(acc);
    let cond = redis.check(&CheckContext::new(), &reg).await.expect("ok");
    assert_eq!(cond.type_, ConditionType::ComponentRedisReady);
    assert_eq!(cond.message, "Redis deployment not found");
}
