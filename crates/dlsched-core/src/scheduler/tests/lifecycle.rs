use super::*;

#[test]
fn add_before_create_is_not_initialized() {
    let factory = StubFactory::new();
    let scheduler = Scheduler::new(
        &SchedulerConfig::default(),
        Arc::clone(&factory) as Arc<dyn TaskFactory>,
        Arc::new(NetworkState::new()),
    );
    assert!(matches!(
        scheduler.add_task(download("a", 1)),
        Err(SchedulerError::NotInitialized)
    ));
}

#[test]
fn create_rejects_zero_threads_and_second_start() {
    let factory = StubFactory::new();
    let scheduler = Scheduler::new(
        &SchedulerConfig::default(),
        Arc::clone(&factory) as Arc<dyn TaskFactory>,
        Arc::new(NetworkState::new()),
    );
    assert!(!scheduler.create(0));
    assert!(!scheduler.is_initialized());
    assert!(scheduler.create(1));
    assert!(!scheduler.create(1));
    scheduler.destroy();
}

#[test]
fn added_task_is_only_in_pending() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 1, IDLE_POLL);

    let first = scheduler.add_task(download("a", 5)).unwrap();
    let second = scheduler.add_task(download("b", 5)).unwrap();

    assert!(second > first);
    assert_eq!(
        scheduler.queue_snapshot(),
        QueueSnapshot {
            pending: vec![first, second],
            paused: vec![],
        }
    );
    assert_eq!(factory.task(first).retry_budget.load(Ordering::SeqCst), 3);
    assert_eq!(
        scheduler.query(first).unwrap().status,
        TaskStatus::Unqueued
    );
    scheduler.destroy();
}

#[test]
fn colliding_id_is_rejected() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 1, IDLE_POLL);
    let id = scheduler.add_task(download("a", 5)).unwrap();

    scheduler.inner.lock_state().next_id = id;
    assert!(matches!(
        scheduler.add_task(download("b", 5)),
        Err(SchedulerError::DuplicateTaskId(dup)) if dup == id
    ));
    assert_eq!(scheduler.query_all().len(), 1);
    // the allocator moved past the collision
    assert!(scheduler.add_task(download("c", 5)).is_ok());
    scheduler.destroy();
}

#[test]
fn workers_drain_pending_queue() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 2, Duration::from_millis(1));

    for i in 0..10 {
        scheduler.add_task(download(&format!("file-{}", i), 9)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        scheduler
            .query_all()
            .iter()
            .all(|info| info.status == TaskStatus::Success)
    }));
    let all = scheduler.query_all();
    assert_eq!(all.len(), 10);
    assert_eq!(scheduler.queue_snapshot(), QueueSnapshot::default());
    for info in &all {
        assert_eq!(factory.task(info.task_id).runs.load(Ordering::SeqCst), 1);
    }
    assert_queue_invariants(&scheduler);
    scheduler.destroy();
}

#[test]
fn panicking_task_fails_and_worker_survives() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 1, Duration::from_millis(1));

    let bad = scheduler.add_task(download("panic", 1)).unwrap();
    let failing = scheduler.add_task(download("fail", 1)).unwrap();
    let good = scheduler.add_task(download("ok", 1)).unwrap();

    assert!(wait_until(Duration::from_secs(10), || {
        scheduler.query(good).unwrap().status == TaskStatus::Success
    }));
    let bad = scheduler.query(bad).unwrap();
    assert_eq!(bad.status, TaskStatus::Failed);
    assert_eq!(bad.error_code, ErrorCode::Internal);
    assert_eq!(
        scheduler.query(failing).unwrap().error_code,
        ErrorCode::UnhandledHttpCode
    );
    assert_queue_invariants(&scheduler);
    scheduler.destroy();
}

#[test]
fn destroy_is_idempotent_and_stops_admission() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 3, IDLE_POLL);
    let id = scheduler.add_task(download("a", 1)).unwrap();

    scheduler.destroy();
    scheduler.destroy();

    assert!(!scheduler.is_initialized());
    assert!(matches!(
        scheduler.add_task(download("b", 1)),
        Err(SchedulerError::NotInitialized)
    ));
    assert!(scheduler.query(id).is_some());

    // can be started again
    assert!(scheduler.create(1));
    scheduler.destroy();
}

#[test]
fn poll_interval_round_trips() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 1, IDLE_POLL);
    assert_eq!(scheduler.poll_interval(), IDLE_POLL);
    scheduler.set_poll_interval(Duration::from_millis(250));
    assert_eq!(scheduler.poll_interval(), Duration::from_millis(250));
    scheduler.destroy();
}

#[test]
fn install_callback_requires_known_task() {
    let factory = StubFactory::new();
    let scheduler = started(&factory, 1, IDLE_POLL);
    let id = scheduler.add_task(download("a", 1)).unwrap();

    let cb: TaskCallback = Arc::new(|_: TaskId, _: TaskEvent| {});
    assert!(!scheduler.install_callback(id + 100, Arc::clone(&cb)));
    assert!(scheduler.install_callback(id, cb));
    assert!(factory.task(id).callback.lock().unwrap().is_some());
    scheduler.destroy();
}
