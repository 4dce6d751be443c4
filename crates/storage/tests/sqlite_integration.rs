use exam_core::model::{AttemptId, Candidate, QuestionId, SectionKey};
use exam_core::time::fixed_now;
use storage::repository::{
    AnswerCacheRepository, CacheScope, CandidateRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_answer_cache_round_trips_and_merges() {
    let repo = connect("memdb_answer_cache").await;
    let scope = CacheScope::new(AttemptId::random(), SectionKey::new("datainsights"));

    repo.save_answer(&scope, QuestionId::new(5), 0, 2).await.unwrap();
    repo.save_answer(&scope, QuestionId::new(5), 1, 1).await.unwrap();
    repo.save_answer(&scope, QuestionId::new(2), 0, 4).await.unwrap();

    let loaded = repo.load_answers(&scope).await.expect("load");
    assert_eq!(loaded.len(), 3);
    // Ordered by question then prompt.
    assert_eq!(loaded[0].question_id, QuestionId::new(2));
    assert_eq!(loaded[1].question_id, QuestionId::new(5));
    assert_eq!((loaded[1].prompt, loaded[1].option), (0, 2));
    assert_eq!((loaded[2].prompt, loaded[2].option), (1, 1));

    // Re-selecting a prompt replaces the stored choice instead of adding a row.
    repo.save_answer(&scope, QuestionId::new(5), 0, 3).await.unwrap();
    let loaded = repo.load_answers(&scope).await.expect("reload");
    assert_eq!(loaded.len(), 3);
    assert_eq!((loaded[1].prompt, loaded[1].option), (0, 3));
}

#[tokio::test]
async fn sqlite_answer_cache_isolates_attempts_and_sections() {
    let repo = connect("memdb_cache_scopes").await;
    let attempt = AttemptId::random();
    let quant = CacheScope::new(attempt, SectionKey::new("quant"));
    let insights = CacheScope::new(attempt, SectionKey::new("datainsights"));
    let other_attempt = CacheScope::new(AttemptId::random(), SectionKey::new("datainsights"));

    repo.save_answer(&insights, QuestionId::new(1), 0, 0).await.unwrap();
    repo.save_answer(&other_attempt, QuestionId::new(1), 0, 4).await.unwrap();

    assert!(repo.load_answers(&quant).await.unwrap().is_empty());
    assert_eq!(repo.load_answers(&insights).await.unwrap()[0].option, 0);
    assert_eq!(repo.load_answers(&other_attempt).await.unwrap()[0].option, 4);

    repo.clear_answers(&insights).await.unwrap();
    assert!(repo.load_answers(&insights).await.unwrap().is_empty());
    assert_eq!(repo.load_answers(&other_attempt).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_candidate_is_single_row() {
    let repo = connect("memdb_candidate").await;

    let err = repo.get_candidate().await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let first = Candidate::new("first@example.com").unwrap();
    repo.upsert_candidate(&first, fixed_now()).await.unwrap();
    assert_eq!(repo.get_candidate().await.unwrap(), first);

    // A new sign-in replaces the stored record.
    let second = Candidate::new("second@example.com").unwrap();
    repo.upsert_candidate(&second, fixed_now()).await.unwrap();
    assert_eq!(repo.get_candidate().await.unwrap(), second);

    repo.clear_candidate().await.unwrap();
    assert!(repo.get_candidate().await.is_err());
}
