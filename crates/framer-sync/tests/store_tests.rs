use framer_core::{
    FrameStatus, FrameType, FrameUpdate, SectionKey, StructuredSection, TransitionPolicy,
    UserPerspective,
};
use framer_sync::{FrameStore, SyncConfig, SyncError};
use framer_test_utils::{feedback, local_store, ALICE, BOB};
use framer_wire::GenerateAnswer;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn two_step_journey() -> UserPerspective {
    UserPerspective {
        persona: "Support agent".into(),
        context: "Handles refunds".into(),
        journey_steps: vec!["Open ticket".into(), "Issue refund".into()],
        pain_points: vec!["Refund button hidden".into()],
    }
}

#[tokio::test]
async fn test_create_bug_starts_unsaved_draft() {
    let store = local_store();
    let frame = store.create_frame(FrameType::Bug).await.unwrap();

    assert_eq!(frame.status, FrameStatus::Draft);
    assert_eq!(frame.content.problem_statement.neutral, "");
    assert!(frame.id.as_str().starts_with("f-"));
    assert!(store.unsaved_ids().contains(&frame.id));
    assert!(!store.is_frame_saved(frame.id.as_str()));
}

#[tokio::test]
async fn test_submit_with_short_journey_flags_it() {
    let store = local_store();
    let id = store.create_frame(FrameType::Feature).await.unwrap().id;
    let id = id.as_str();

    store
        .update_frame(
            id,
            FrameUpdate::new()
                .with_problem_statement("X")
                .with_user_perspective(two_step_journey()),
        )
        .await
        .unwrap();
    let frame = store.submit_for_review(id, None).await.unwrap();

    assert_eq!(frame.status, FrameStatus::InReview);
    assert!(store.is_frame_saved(id));
    let ai = frame.ai.expect("evaluation merged on submit");
    assert!(ai
        .issues
        .iter()
        .any(|i| i.message.contains("fewer than 3 journey steps")));
}

#[tokio::test]
async fn test_discarded_draft_is_gone_everywhere() {
    let store = local_store();
    let id = store.create_frame(FrameType::Feature).await.unwrap().id;

    assert!(store.discard_unsaved_frame(id.as_str()).await.unwrap());

    assert!(store.get_frame(id.as_str()).is_none());
    assert!(store.frames().is_empty());
    assert!(store.working_frames().is_empty());
    assert!(store.frames_by_status(FrameStatus::Draft).is_empty());
    assert!(store.frames_by_owner(ALICE).is_empty());
    assert!(store.unsaved_ids().is_empty());
    assert!(store.selected_frame().is_none());
}

#[tokio::test]
async fn test_discard_saved_frame_is_noop() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    assert!(store.save_frame(id.as_str()));
    let before = store.frames();

    assert!(!store.discard_unsaved_frame(id.as_str()).await.unwrap());

    assert_eq!(store.frames(), before);
    assert!(store.is_frame_saved(id.as_str()));
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    assert!(store.save_frame(id.as_str()));
    assert!(!store.save_frame(id.as_str()));
    assert!(store.is_frame_saved(id.as_str()));
}

#[tokio::test]
async fn test_update_does_not_save() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    store
        .update_frame(id.as_str(), FrameUpdate::new().with_problem_statement("Crash"))
        .await
        .unwrap();
    assert!(!store.is_frame_saved(id.as_str()));
}

#[tokio::test]
async fn test_update_rejected_without_mutation() {
    let store = local_store();
    let id = store.create_frame(FrameType::Feature).await.unwrap().id;
    let before = store.get_frame(id.as_str()).unwrap();

    let err = store
        .update_frame(id.as_str(), FrameUpdate::new().with_root_cause("Not for features"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(store.get_frame(id.as_str()).unwrap(), before);
}

#[tokio::test]
async fn test_unknown_frame_is_not_found() {
    let store = local_store();
    let err = store.mark_as_ready("f-missing").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
    let err = store.delete_frame("f-missing").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn test_actions_out_of_order_fail_cleanly() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    let id = id.as_str();
    let before = store.get_frame(id).unwrap();

    assert!(store.start_feedback(id).await.is_err());
    assert!(store.submit_feedback(id, feedback()).await.is_err());

    assert_eq!(store.get_frame(id).unwrap(), before);
    assert!(!store.is_frame_saved(id));
    assert!(store.status().error.is_none());
}

#[tokio::test]
async fn test_reviewer_gate_blocks_submit() {
    let config = SyncConfig::local(ALICE).with_policy(TransitionPolicy {
        require_reviewer: true,
        ..TransitionPolicy::default()
    });
    let store = FrameStore::local(config);
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    let id = id.as_str();

    assert!(store.submit_for_review(id, None).await.is_err());
    assert_eq!(store.get_frame(id).unwrap().status, FrameStatus::Draft);

    let frame = store.submit_for_review(id, Some(BOB.into())).await.unwrap();
    assert_eq!(frame.reviewer_id.as_deref(), Some(BOB));
}

#[tokio::test]
async fn test_evaluate_keeps_status_and_merges_whole_result() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    let id = id.as_str();

    let first = store.evaluate_frame(id).await.unwrap();
    store
        .update_frame(id, FrameUpdate::new().with_problem_statement("Checkout double-charges cards"))
        .await
        .unwrap();
    let second = store.evaluate_frame(id).await.unwrap();

    assert_eq!(second.status, FrameStatus::Draft);
    let (a, b) = (first.ai.unwrap(), second.ai.unwrap());
    let missing = |i: &framer_core::AiIssue| i.message == "Problem statement is missing";
    assert!(a.issues.iter().any(missing));
    assert!(!b.issues.iter().any(missing));
    let breakdown = b.breakdown.expect("local evaluation has a breakdown");
    assert_eq!(b.score, breakdown.total());
}

#[tokio::test]
async fn test_force_status_skips_guards() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    let id = id.as_str();

    let frame = store.force_status(id, FrameStatus::Ready, None).await.unwrap();
    assert_eq!(frame.status, FrameStatus::Ready);
    assert!(store.is_frame_saved(id));

    let err = store.force_status(id, FrameStatus::Archived, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    let archived = store
        .force_status(id, FrameStatus::Archived, Some(feedback()))
        .await
        .unwrap();
    assert!(archived.feedback.is_some());

    let reopened = store.force_status(id, FrameStatus::InReview, None).await.unwrap();
    assert!(reopened.feedback.is_none());
}

#[tokio::test]
async fn test_comments_get_sequential_local_ids() {
    let store = local_store();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    let id = id.as_str();

    let first = store.add_comment(id, "problem_statement", "Which browsers?").await.unwrap();
    let second = store.add_comment(id, "root_cause", "Confirmed").await.unwrap();

    assert_eq!(first.id, "c-001");
    assert_eq!(second.id, "c-002");
    assert_eq!(first.author_id, ALICE);
    assert_eq!(store.load_comments(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_local_generate_composes_answers() {
    let store = local_store();
    let id = store.create_frame(FrameType::Feature).await.unwrap().id;
    let text = store
        .generate_content(
            id.as_str(),
            SectionKey::ProblemStatement,
            vec![GenerateAnswer::new("What breaks?", "Exports")],
        )
        .await
        .unwrap();
    assert!(text.starts_with("## "));
    assert!(text.contains("- **What breaks?** Exports"));
    assert!(store.get_frame(id.as_str()).unwrap().content.problem_statement.neutral.is_empty());
}

#[tokio::test]
async fn test_local_users_is_current_user() {
    let users = local_store().list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, ALICE);
}

#[tokio::test]
async fn test_clones_share_state() {
    let store = local_store();
    let other = store.clone();
    let id = store.create_frame(FrameType::Bug).await.unwrap().id;
    assert!(other.get_frame(id.as_str()).is_some());
    other.select_frame(None);
    assert!(store.selected_frame().is_none());
}

#[tokio::test]
async fn test_unsaved_invariant_through_lifecycle() {
    let store = local_store();
    let a = store.create_frame(FrameType::Bug).await.unwrap().id;
    let b = store.create_frame(FrameType::Feature).await.unwrap().id;
    store
        .update_frame(
            b.as_str(),
            FrameUpdate::new().with_user_perspective(UserPerspective::from_text("note")),
        )
        .await
        .unwrap();
    store.submit_for_review(b.as_str(), None).await.unwrap();

    assert_eq!(store.unsaved_ids(), vec![a.clone()]);
    for id in store.unsaved_ids() {
        assert!(store.get_frame(id.as_str()).is_some());
    }
    assert!(store.discard_unsaved_frame(a.as_str()).await.unwrap());
    assert!(store.unsaved_ids().is_empty());
    assert_eq!(store.working_frames().len(), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Create(FrameType),
    Save(usize),
    Discard(usize),
    Submit(usize),
    Ready(usize),
    Feedback(usize),
    Archive(usize),
    Evaluate(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let frame_type = prop_oneof![
        Just(FrameType::Bug),
        Just(FrameType::Feature),
        Just(FrameType::Exploration),
    ];
    prop_oneof![
        2 => frame_type.prop_map(Op::Create),
        1 => (0..4usize).prop_map(Op::Save),
        1 => (0..4usize).prop_map(Op::Discard),
        1 => (0..4usize).prop_map(Op::Submit),
        1 => (0..4usize).prop_map(Op::Ready),
        1 => (0..4usize).prop_map(Op::Feedback),
        1 => (0..4usize).prop_map(Op::Archive),
        1 => (0..4usize).prop_map(Op::Evaluate),
    ]
}

async fn run(store: &FrameStore, op: Op) {
    let pick = |n: usize| {
        let frames = store.frames();
        (!frames.is_empty()).then(|| frames[n % frames.len()].id.clone())
    };
    let target = match &op {
        Op::Create(_) => None,
        Op::Save(n)
        | Op::Discard(n)
        | Op::Submit(n)
        | Op::Ready(n)
        | Op::Feedback(n)
        | Op::Archive(n)
        | Op::Evaluate(n) => pick(*n),
    };
    let id = target.as_ref().map(|id| id.as_str()).unwrap_or("f-none");
    let _ = match op {
        Op::Create(t) => store.create_frame(t).await.map(|_| ()),
        Op::Save(_) => {
            store.save_frame(id);
            Ok(())
        }
        Op::Discard(_) => store.discard_unsaved_frame(id).await.map(|_| ()),
        Op::Submit(_) => store.submit_for_review(id, None).await.map(|_| ()),
        Op::Ready(_) => store.mark_as_ready(id).await.map(|_| ()),
        Op::Feedback(_) => store.start_feedback(id).await.map(|_| ()),
        Op::Archive(_) => store.submit_feedback(id, feedback()).await.map(|_| ()),
        Op::Evaluate(_) => store.evaluate_frame(id).await.map(|_| ()),
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_store_keeps_invariants(ops in proptest::collection::vec(op(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let store = local_store();
        let mut seen = std::collections::HashMap::new();
        for op in ops {
            rt.block_on(run(&store, op));
            for id in store.unsaved_ids() {
                let frame = store.get_frame(id.as_str());
                prop_assert!(frame.is_some());
                prop_assert_eq!(frame.unwrap().status, FrameStatus::Draft);
            }
            for frame in store.frames() {
                let previous = seen.insert(frame.id.clone(), frame.status);
                prop_assert!(previous.map_or(true, |p| p <= frame.status));
                prop_assert_eq!(frame.feedback.is_some(), frame.status == FrameStatus::Archived);
            }
        }
    }
}

#[tokio::test]
async fn test_local_store_has_no_templates() {
    let store = local_store();
    assert!(store.template_for(FrameType::Bug).await.unwrap().is_none());
}

#[tokio::test]
async fn test_local_retry_create_returns_frame() {
    let store = local_store();
    let frame = store.create_frame(FrameType::Exploration).await.unwrap();
    assert_eq!(store.retry_create(frame.id.as_str()).await.unwrap(), frame);
    assert!(store.unconfirmed_ids().is_empty());
}
