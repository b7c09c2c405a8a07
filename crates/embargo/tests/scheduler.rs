//! Scheduling approvals on the worker pool.

use std::sync::Arc;

use embargo::approval::ApproveTask;
use embargo::{ApprovalScheduler, ApprovalStatus, Collection, SchedulerError};
use embargo_testkit::{ApprovalFixture, COLLECTION_ID};

#[tokio::test]
async fn test_submitted_run_resolves_to_outcome() {
    let fixture = ApprovalFixture::new();
    let scheduler = ApprovalScheduler::new(2);

    let handle = scheduler.submit(fixture.task()).unwrap();
    assert!(handle.await.unwrap());

    let stored = fixture.stored().await.unwrap();
    assert_eq!(stored.approval_status, ApprovalStatus::Complete);
    assert!(!scheduler.is_running(COLLECTION_ID));
    assert_eq!(scheduler.available_workers(), 2);
}

#[tokio::test]
async fn test_duplicate_submission_rejected() {
    let fixture = ApprovalFixture::new();
    let scheduler = ApprovalScheduler::new(1);

    // The current-thread runtime does not start the first run until we await.
    let first = scheduler.submit(fixture.task()).unwrap();
    assert!(scheduler.is_running(COLLECTION_ID));

    match scheduler.submit(fixture.task()) {
        Err(SchedulerError::AlreadyRunning(id)) => assert_eq!(id, COLLECTION_ID),
        other => panic!("expected AlreadyRunning, got {:?}", other.map(|_| ())),
    }

    assert!(first.await.unwrap());
    assert_eq!(scheduler.in_flight(), 0);
}

#[tokio::test]
async fn test_resubmission_allowed_after_failure() {
    let mut fixture = ApprovalFixture::new();
    let scheduler = ApprovalScheduler::new(1);

    fixture.fakes.pdf.outcome.fail();
    assert!(!scheduler.submit(fixture.task()).unwrap().await.unwrap());

    fixture.description = fixture.stored().await.unwrap();
    fixture.fakes.pdf.outcome.succeed();
    assert!(scheduler.submit(fixture.task()).unwrap().await.unwrap());
}

#[tokio::test]
async fn test_only_beginnable_collections_are_accepted() {
    let fixture = ApprovalFixture::new();
    let scheduler = ApprovalScheduler::new(1);

    for status in [ApprovalStatus::InProgress, ApprovalStatus::Complete] {
        let mut description = fixture.description.clone();
        description.approval_status = status;
        let task = ApproveTask::new(
            Some(Collection::new(description)),
            Some(fixture.session.clone()),
            fixture.content(),
            Arc::new(fixture.index.clone()),
            Arc::new(fixture.fakes.services()),
        );

        match scheduler.submit(task) {
            Err(SchedulerError::NotApprovable { status: got, .. }) => assert_eq!(got, status),
            other => panic!("expected NotApprovable, got {:?}", other.map(|_| ())),
        }
    }
    assert_eq!(scheduler.in_flight(), 0);
}

#[tokio::test]
async fn test_task_without_collection_is_rejected() {
    let fixture = ApprovalFixture::new();
    let scheduler = ApprovalScheduler::new(1);
    let task = ApproveTask::new(
        None,
        Some(fixture.session.clone()),
        fixture.content(),
        Arc::new(fixture.index.clone()),
        Arc::new(fixture.fakes.services()),
    );

    assert!(matches!(
        scheduler.submit(task),
        Err(SchedulerError::MissingCollectionId)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_collections_run_independently() {
    let scheduler = ApprovalScheduler::new(2);
    let fixtures: Vec<ApprovalFixture> = (0..4)
        .map(|i| {
            let mut fixture = ApprovalFixture::new();
            fixture.description.id = format!("collection-{i}");
            fixture
        })
        .collect();

    let handles: Vec<_> = fixtures
        .iter()
        .map(|f| scheduler.submit(f.task()).unwrap())
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    for (i, fixture) in fixtures.iter().enumerate() {
        use embargo::store::CollectionStore;
        let stored = fixture
            .fakes
            .collections
            .load(&format!("collection-{i}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.approval_status, ApprovalStatus::Complete);
        assert_eq!(fixture.fakes.notifier.count(), 1);
    }
    assert_eq!(scheduler.available_workers(), 2);
}
