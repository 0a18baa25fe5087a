// tests/learner_views_tests.rs

use std::sync::Arc;

use assessment_engine::{
    config::{Config, EngineConfig},
    engine::Ledger,
    models::{
        assessment::{AssessmentKind, NewAssessment},
        goal::{GoalType, NewGoal},
        ranking::XpRow,
    },
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::{ROLE_STUDENT, sign_jwt},
};
use chrono::{Duration, Utc};

const SECRET: &str = "test_secret_for_learner_views";

async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        engine: EngineConfig::default(),
    };

    let ledger = Ledger::new(store.clone(), config.engine.clone());
    let app = routes::create_router(AppState { ledger, config });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

fn student(user_id: i64) -> String {
    format!("Bearer {}", sign_jwt(user_id, ROLE_STUDENT, SECRET, 600).unwrap())
}

fn mock_exam(classroom_id: i64, question_ids: Vec<i64>) -> NewAssessment {
    NewAssessment {
        kind: AssessmentKind::MockExam,
        title: "Practice".to_string(),
        classroom_ids: vec![classroom_id],
        opening_date: Utc::now() - Duration::days(1),
        closing_date: Utc::now() + Duration::days(1),
        question_ids,
        min_words: None,
        allowed_attempts: Some(3),
    }
}

#[tokio::test]
async fn test_stats_and_progress() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    for (id, answer) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
        store.add_question(id, answer).await;
    }
    let first = store.add_assessment(mock_exam(10, vec![1, 2, 3, 4])).await;
    let second = store.add_assessment(mock_exam(10, vec![1, 2])).await;
    let untouched = store.add_assessment(mock_exam(10, vec![3])).await;
    let token = student(7);

    // Empty ledger: zero score, no duration
    let stats: serde_json::Value = client
        .get(format!("{}/api/me/stats", address))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["completion_count"], 0);
    assert_eq!(stats["average_score"], 0.0);
    assert!(stats["average_duration_seconds"].is_null());

    // 3/4 with a duration, 2/2 without, then 1/4 on a retry of the first
    let submissions = [
        (first.id, serde_json::json!({ "answers": { "1": "A", "2": "B", "3": "C" }, "duration_seconds": 300 })),
        (second.id, serde_json::json!({ "answers": { "1": "A", "2": "B" } })),
        (first.id, serde_json::json!({ "answers": { "4": "D" }, "duration_seconds": 100 })),
    ];
    for (assessment_id, body) in submissions {
        let response = client
            .post(format!("{}/api/assessments/{}/attempts", address, assessment_id))
            .header("Authorization", &token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    let stats: serde_json::Value = client
        .get(format!("{}/api/me/stats", address))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["completion_count"], 2);
    assert_eq!(stats["attempt_count"], 3);
    // (75 + 100 + 25) / 3
    let average = stats["average_score"].as_f64().unwrap();
    assert!((average - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats["average_duration_seconds"], 200.0);

    let progress: serde_json::Value = client
        .post(format!("{}/api/me/progress", address))
        .header("Authorization", &token)
        .json(&serde_json::json!({ "assessment_ids": [first.id, second.id, untouched.id] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["total_assessments"], 3);
    assert_eq!(progress["completed"], 2);
    assert_eq!(progress["percentage"], 67);
}

#[tokio::test]
async fn test_ranking_with_own_position() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let t0 = Utc::now() - Duration::days(10);

    for learner_id in 1..=5 {
        store.add_member(10, learner_id).await;
    }
    store.add_member(20, 99).await;
    // Learners 2 and 3 tie on XP; learner 3 got there first.
    for (learner_id, xp, offset) in [(1, 500, 0), (2, 300, 5), (3, 300, 1), (4, 100, 2)] {
        store
            .set_xp(XpRow {
                learner_id,
                classroom_id: 10,
                xp,
                first_event_at: Some(t0 + Duration::hours(offset)),
            })
            .await;
    }

    let page: serde_json::Value = client
        .get(format!("{}/api/ranking?classroom_id=10&page=1&page_size=2", address))
        .header("Authorization", student(4))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total_learners"], 5);
    let entries = page["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["learner_id"], 1);
    assert_eq!(entries[1]["learner_id"], 3);
    assert_eq!(entries[1]["position"], 2);
    assert_eq!(page["own_position"], 4);

    // Learner 5 has no XP and sorts last.
    let page: serde_json::Value = client
        .get(format!("{}/api/ranking?page=3&page_size=2", address))
        .header("Authorization", student(5))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["entries"][0]["learner_id"], 5);
    assert_eq!(page["entries"][0]["xp"], 0);
    assert_eq!(page["own_position"], 5);

    // Not a member of classroom 20
    let response = client
        .get(format!("{}/api/ranking?classroom_id=20", address))
        .header("Authorization", student(4))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .get(format!("{}/api/ranking?page=0", address))
        .header("Authorization", student(4))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_goal_progress() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    store.add_question(1, "A").await;
    let in_class = store.add_assessment(mock_exam(10, vec![1])).await;
    let other_class = store.add_assessment(mock_exam(20, vec![1])).await;
    let goal = store
        .add_goal(NewGoal {
            target: 2,
            goal_type: GoalType::Question,
            classroom_ids: vec![10],
            opening_date: Utc::now() - Duration::days(1),
            final_date: Utc::now() + Duration::days(1),
        })
        .await;
    let token = student(7);

    for assessment_id in [in_class.id, other_class.id, in_class.id] {
        let response = client
            .post(format!("{}/api/assessments/{}/attempts", address, assessment_id))
            .header("Authorization", &token)
            .json(&serde_json::json!({ "answers": { "1": "A" } }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
    }

    let progress: serde_json::Value = client
        .get(format!("{}/api/me/goals/{}", address, goal.id))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress["progress"], 2);
    assert_eq!(progress["target"], 2);
    assert_eq!(progress["complete"], true);
    assert_eq!(progress["state"], "available");

    let response = client
        .get(format!("{}/api/me/goals/9999", address))
        .header("Authorization", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
