//! Deep-link resolution and navigation planning

use std::time::Duration;

use parentline_links::{
    rewrite_for_single_student, CanonicalPath, DeepLinkResolver, LinkConfig, LinkOrigin, NavStep,
    NavigationContext, NavigationOrchestrator, StudentCount, TargetDepth,
};

fn resolver_with_scheme(scheme: &str) -> DeepLinkResolver {
    DeepLinkResolver::new(LinkConfig {
        app_scheme: scheme.to_string(),
        ..Default::default()
    })
}

const MESSAGE: CanonicalPath = CanonicalPath::Message {
    student_id: 7,
    message_id: 99,
};

#[test]
fn test_all_families_normalize_identically() {
    let resolver = resolver_with_scheme("scheme");

    for uri in [
        "exp://10.0.0.5:8081/--/?studentId=7&messageId=99",
        "scheme://student/7/message/99",
        "/student/7/message/99",
        "https://parentline.app/app/student/7/message/99",
        "exp://10.0.0.5:8081/--/student/7/message/99",
    ] {
        let path = resolver.resolve(uri);
        assert_eq!(path, MESSAGE, "{}", uri);
        assert_eq!(path.to_string(), "/student/7/message/99");
    }
}

#[test]
fn test_dev_tunnel_query_encodings_match_path_suffix() {
    let resolver = DeepLinkResolver::new(LinkConfig::default());
    let student = CanonicalPath::Student { student_id: 7 };

    assert_eq!(
        resolver.resolve("exp://10.0.0.5:8081/--/student/7"),
        student
    );
    for uri in [
        "exp://10.0.0.5:8081/--/?studentId=7",
        "exp://10.0.0.5:8081/--/?studentPage=7",
        "exp://10.0.0.5:8081/--/?type=student&id=7",
        "exp://10.0.0.5:8081/--/?page=student/7",
        "exp://10.0.0.5:8081/--/?page=%2Fstudent%2F7",
        "https://u-anon-8081.exp.direct/--/?studentPage=7",
    ] {
        assert_eq!(resolver.resolve(uri), student, "{}", uri);
    }

    assert_eq!(
        resolver.resolve("exp://10.0.0.5:8081/--/?page=student/7/message/99"),
        MESSAGE
    );
    assert_eq!(
        resolver.resolve("exp://10.0.0.5:8081/--/?page=settings"),
        CanonicalPath::Settings
    );
}

#[test]
fn test_root_and_settings() {
    let resolver = DeepLinkResolver::new(LinkConfig::default());
    assert_eq!(resolver.resolve("/"), CanonicalPath::Root);
    assert_eq!(resolver.resolve("parentline://"), CanonicalPath::Root);
    assert_eq!(resolver.resolve("https://parentline.app/app"), CanonicalPath::Root);
    assert_eq!(resolver.resolve("exp://10.0.0.5:8081"), CanonicalPath::Root);
    assert_eq!(resolver.resolve("parentline://settings"), CanonicalPath::Settings);
    assert_eq!(
        resolver.resolve("https://www.parentline.app/app/settings/"),
        CanonicalPath::Settings
    );
}

#[test]
fn test_malformed_links_resolve_to_error() {
    let resolver = DeepLinkResolver::new(LinkConfig::default());
    for uri in [
        "",
        "::::",
        "parentline://student/seven",
        "parentline://student/7/message",
        "exp://10.0.0.5:8081/--/?messageId=99",
        "exp://10.0.0.5:8081/--/?studentId=x&messageId=99",
        "exp://10.0.0.5:8081/--/?type=staff&id=1",
        "https://example.com/app/student/7",
        "mailto:office@school.example",
    ] {
        assert_eq!(resolver.resolve(uri), CanonicalPath::Error, "{:?}", uri);
    }
}

#[test]
fn test_single_student_rewrite() {
    let resolver = DeepLinkResolver::new(LinkConfig::default());

    let rewritten = rewrite_for_single_student(resolver.resolve("/"), &[1001]);
    assert_eq!(rewritten.to_string(), "/student/1001");

    // Several students keep the picker as home
    assert_eq!(
        rewrite_for_single_student(CanonicalPath::Root, &[1001, 1002]),
        CanonicalPath::Root
    );
    // Deeper paths are untouched
    assert_eq!(rewrite_for_single_student(MESSAGE, &[1001]), MESSAGE);
}

fn ctx(cold_start: bool, origin: LinkOrigin, students: StudentCount) -> NavigationContext {
    NavigationContext {
        cold_start,
        origin,
        students,
    }
}

#[test]
fn test_message_link_always_leaves_way_back() {
    let orchestrator = NavigationOrchestrator::new(Duration::from_millis(100));

    for cold_start in [true, false] {
        for origin in [LinkOrigin::Universal, LinkOrigin::Scheme, LinkOrigin::InApp] {
            let plan = orchestrator.plan(MESSAGE, &ctx(cold_start, origin, StudentCount::Many));
            let base = if !cold_start && origin == LinkOrigin::InApp {
                vec![CanonicalPath::Root]
            } else {
                vec![]
            };
            let stack = plan.apply(&base);
            assert_eq!(
                stack,
                vec![
                    CanonicalPath::Root,
                    CanonicalPath::Student { student_id: 7 },
                    MESSAGE
                ],
                "cold_start={} origin={:?}",
                cold_start,
                origin
            );
            assert_eq!(plan.destination(), Some(MESSAGE));
        }
    }
}

#[test]
fn test_cold_start_waits_between_pushes() {
    let orchestrator = NavigationOrchestrator::new(Duration::from_millis(100));
    let plan = orchestrator.plan(MESSAGE, &ctx(true, LinkOrigin::Scheme, StudentCount::Many));

    assert_eq!(
        plan.steps(),
        &[
            NavStep::Replace(CanonicalPath::Root),
            NavStep::Wait(Duration::from_millis(100)),
            NavStep::Push(CanonicalPath::Student { student_id: 7 }),
            NavStep::Wait(Duration::from_millis(100)),
            NavStep::Push(MESSAGE),
        ]
    );

    // Warm scheme links rebuild the stack without waiting
    let warm = orchestrator.plan(MESSAGE, &ctx(false, LinkOrigin::Scheme, StudentCount::Many));
    assert!(!warm.steps().iter().any(|s| matches!(s, NavStep::Wait(_))));
}

#[test]
fn test_single_student_home_is_student_screen() {
    let orchestrator = NavigationOrchestrator::default();
    let students = StudentCount::from_ids(&[7]);

    let plan = orchestrator.plan(MESSAGE, &ctx(true, LinkOrigin::Universal, students));
    assert_eq!(
        plan.apply(&[]),
        vec![CanonicalPath::Student { student_id: 7 }, MESSAGE]
    );

    let home = orchestrator.plan(
        CanonicalPath::Student { student_id: 7 },
        &ctx(false, LinkOrigin::InApp, students),
    );
    assert_eq!(
        home.steps(),
        &[NavStep::Replace(CanonicalPath::Student { student_id: 7 })]
    );
}

#[test]
fn test_error_path_has_empty_plan() {
    let orchestrator = NavigationOrchestrator::default();
    let plan = orchestrator.plan(
        CanonicalPath::Error,
        &ctx(true, LinkOrigin::Scheme, StudentCount::Many),
    );
    assert!(plan.is_empty());
    assert_eq!(plan.destination(), None);
    assert_eq!(TargetDepth::of(&CanonicalPath::Error), None);
    assert_eq!(TargetDepth::of(&MESSAGE), Some(TargetDepth::Message));
}

#[test]
fn test_canonical_path_serializes() {
    let json = serde_json::to_string(&MESSAGE).unwrap();
    let back: CanonicalPath = serde_json::from_str(&json).unwrap();
    assert_eq!(back, MESSAGE);
}
