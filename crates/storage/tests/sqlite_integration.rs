use chrono::Duration;
use pathway_core::Calendar;
use pathway_core::model::{
    CourseId, LearnerId, LearnerProgress, LessonId, LessonKind, LessonSummary, UserDecision, XpAward,
};
use pathway_core::time::fixed_now;
use storage::repository::{
    DecisionRepository, LessonRepository, ProgressRepository, Storage, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn learner() -> LearnerId {
    "0b7e4b1a-93b5-4c55-8d0e-5a2f7c3e9d10".parse().unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_progress_and_completions() {
    let repo = connect("memdb_progress_roundtrip").await;
    let cal = Calendar::utc();

    let mut progress = LearnerProgress::new(learner());
    progress.apply_completion("L1".parse().unwrap(), XpAward::new(20), fixed_now(), &cal);
    progress.apply_completion(
        "L2".parse().unwrap(),
        XpAward::new(90),
        fixed_now() + Duration::days(1),
        &cal,
    );
    repo.put_progress(&progress).await.unwrap();

    let fetched = repo
        .get_progress(learner())
        .await
        .unwrap()
        .expect("progress stored");
    assert_eq!(fetched, progress);
    assert_eq!(fetched.experience(), 110);
    assert_eq!(fetched.level(), 2);
    assert_eq!(fetched.streak(), 2);
}

#[tokio::test]
async fn sqlite_padded_lesson_id_reads_back_canonical() {
    let repo = connect("memdb_progress_padded").await;
    let cal = Calendar::utc();

    let mut progress = LearnerProgress::new(learner());
    progress.apply_completion(LessonId::new("  L1 ").unwrap(), XpAward::new(20), fixed_now(), &cal);
    repo.put_progress(&progress).await.unwrap();

    let mut fetched = repo.get_progress(learner()).await.unwrap().unwrap();
    assert_eq!(fetched, progress);
    assert!(fetched.is_lesson_completed(&"L1".parse().unwrap()));

    let outcome = fetched.apply_completion(
        "L1".parse().unwrap(),
        XpAward::new(20),
        fixed_now() + Duration::days(1),
        &cal,
    );
    assert!(!outcome.is_applied());
    assert_eq!(fetched.experience(), 20);
}

#[tokio::test]
async fn sqlite_missing_learner_is_none() {
    let repo = connect("memdb_progress_missing").await;
    assert_eq!(repo.get_progress(LearnerId::random()).await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_put_is_an_upsert() {
    let repo = connect("memdb_progress_upsert").await;
    let cal = Calendar::utc();

    let mut progress = LearnerProgress::new(learner());
    progress.apply_completion("L1".parse().unwrap(), XpAward::new(20), fixed_now(), &cal);
    repo.put_progress(&progress).await.unwrap();

    progress.apply_completion(
        "L2".parse().unwrap(),
        XpAward::new(30),
        fixed_now() + Duration::hours(1),
        &cal,
    );
    repo.put_progress(&progress).await.unwrap();

    let fetched = repo.get_progress(learner()).await.unwrap().unwrap();
    assert_eq!(fetched.experience(), 50);
    assert_eq!(fetched.completed_lessons().len(), 2);
}

#[tokio::test]
async fn sqlite_rejects_corrupted_rows() {
    let repo = connect("memdb_progress_corrupt").await;
    sqlx::query(
        r"
        INSERT INTO learner_progress (learner_id, experience, level, streak, last_activity_at, updated_at)
        VALUES (?1, 250, 1, 0, NULL, '2024-01-01T00:00:00Z')
        ",
    )
    .bind(learner().to_string())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo.get_progress(learner()).await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn sqlite_lessons_are_sorted_and_positions_unique() {
    let repo = connect("memdb_lessons").await;
    let course: CourseId = "faith-101".parse().unwrap();
    for (id, order) in [("c", 2), ("a", 0), ("b", 1)] {
        let lesson = LessonSummary::new(id.parse().unwrap(), course.clone(), id.to_uppercase(), order)
            .with_xp_reward(10);
        repo.upsert_lesson(&lesson).await.unwrap();
    }
    let challenge = LessonSummary::new("c".parse().unwrap(), course.clone(), "C!", 2)
        .with_kind(LessonKind::Challenge);
    repo.upsert_lesson(&challenge).await.unwrap();

    let lessons = repo.lessons_for_course(&course).await.unwrap();
    let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(lessons[2].kind, LessonKind::Challenge);
    assert_eq!(lessons[0].xp_reward, 10);

    let clash = LessonSummary::new("d".parse().unwrap(), course.clone(), "D", 0);
    let err = repo.upsert_lesson(&clash).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_decisions_keep_latest_choice() {
    let repo = connect("memdb_decisions").await;
    let first = UserDecision {
        learner_id: learner(),
        lesson_id: "L1".parse().unwrap(),
        decision_id: "d1".parse().unwrap(),
        option_id: "o1".parse().unwrap(),
        decided_at: fixed_now(),
    };
    let other = UserDecision {
        decision_id: "d2".parse().unwrap(),
        lesson_id: "L2".parse().unwrap(),
        decided_at: fixed_now() + Duration::minutes(5),
        ..first.clone()
    };
    let changed = UserDecision {
        option_id: "o3".parse().unwrap(),
        decided_at: fixed_now() + Duration::minutes(10),
        ..first.clone()
    };

    repo.record_decision(&first).await.unwrap();
    repo.record_decision(&other).await.unwrap();
    repo.record_decision(&changed).await.unwrap();

    let stored = repo.decisions_for_learner(learner()).await.unwrap();
    assert_eq!(stored, vec![other, changed]);
}

#[tokio::test]
async fn storage_sqlite_wires_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage_wiring?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage
        .lessons
        .upsert_lesson(&LessonSummary::new("a".parse().unwrap(), "c".parse().unwrap(), "A", 0))
        .await
        .unwrap();
    assert_eq!(
        storage.lessons.lessons_for_course(&"c".parse().unwrap()).await.unwrap().len(),
        1
    );
    assert_eq!(storage.progress.get_progress(learner()).await.unwrap(), None);
    assert!(
        storage
            .decisions
            .decisions_for_learner(learner())
            .await
            .unwrap()
            .is_empty()
    );
}
