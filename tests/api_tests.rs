//! API 통합 테스트
//!
//! 메모리 SQLite 위에 실제 라우터를 올리고 요청 단위로 검증합니다.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::prelude::*;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use comissao::db::{self, Commission, CommissionRepository};
use comissao::{build_app, AppConfig, ServerState};

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON 응답")
    }

    fn commission(&self) -> Commission {
        serde_json::from_slice(&self.body).expect("커미션 응답")
    }

    fn commissions(&self) -> Vec<Commission> {
        serde_json::from_slice(&self.body).expect("커미션 목록 응답")
    }
}

async fn setup_with(config: AppConfig) -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::create_tables(&pool).await.unwrap();

    let state = ServerState::new(CommissionRepository::new(pool), &config);
    build_app(state, &config)
}

async fn setup() -> Router {
    setup_with(AppConfig::default()).await
}

async fn send(app: &Router, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();

    Reply { status, headers, body }
}

/// 로그인 후 Cookie 헤더 값 반환
async fn login(app: &Router) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "admin123"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let set_cookie = reply.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn create(app: &Router, cookie: &str, body: Value) -> Commission {
    let reply = send(app, Method::POST, "/api/commissions", Some(cookie), Some(body)).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", String::from_utf8_lossy(&reply.body));
    reply.commission()
}

async fn list(app: &Router, cookie: &str, uri: &str) -> Vec<Commission> {
    let reply = send(app, Method::GET, uri, Some(cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.commissions()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_login_check_logout() {
    let app = setup().await;

    let reply = send(&app, Method::GET, "/api/auth/check", None, None).await;
    assert_eq!(reply.json(), json!({"authenticated": false}));

    let cookie = login(&app).await;
    let reply = send(&app, Method::GET, "/api/auth/check", Some(&cookie), None).await;
    assert_eq!(reply.json(), json!({"authenticated": true, "user": {"username": "admin"}}));

    let reply = send(&app, Method::POST, "/api/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"success": true}));

    let reply = send(&app, Method::GET, "/api/commissions", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = setup().await;

    let reply = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({"username": "admin", "password": "nope"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"error": "Credenciais inválidas"}));
    assert!(reply.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_expired_session_is_unauthorized() {
    let mut config = AppConfig::default();
    config.session_ttl = chrono::Duration::zero();
    let app = setup_with(config).await;

    let cookie = login(&app).await;
    let reply = send(&app, Method::GET, "/api/commissions", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthenticated_calls_do_not_mutate() {
    let app = setup().await;
    let cookie = login(&app).await;
    let existing = create(&app, &cookie, json!({"value_nf": 100})).await;

    let path = format!("/api/commissions/{}", existing.id);
    let attempts = [
        (Method::GET, "/api/commissions".to_string(), None),
        (Method::POST, "/api/commissions".to_string(), Some(json!({"value_nf": 5}))),
        (Method::PUT, path.clone(), Some(json!({"is_paid": true}))),
        (Method::DELETE, path.clone(), None),
        (Method::GET, "/api/commissions/export".to_string(), None),
    ];

    for (method, uri, body) in attempts {
        let reply = send(&app, method, &uri, Some("comissao_sid=forged"), body).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(reply.json(), json!({"error": "Não autorizado"}));
    }

    let all = list(&app, &cookie, "/api/commissions").await;
    assert_eq!(all, vec![existing]);
}

#[tokio::test]
async fn test_create_computes_commission_value() {
    let app = setup().await;
    let cookie = login(&app).await;

    let cases = [
        (json!(100), Some(json!(0.025)), "2.50"),
        (json!("1234.56"), None, "30.86"),
        (json!("5"), Some(json!("0.025")), "0.13"),
        (json!(999.99), Some(json!(0.1)), "100.00"),
        (json!(0), Some(json!(0.5)), "0.00"),
    ];

    for (value_nf, factor, expected) in cases {
        let mut body = json!({"value_nf": value_nf});
        if let Some(factor) = factor {
            body["factor"] = factor;
        }
        let created = create(&app, &cookie, body).await;
        assert_eq!(created.commission_value.to_string(), expected);
        assert_eq!(
            created.commission_value,
            (created.value_nf * created.factor)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        );
        assert!(!created.is_paid);
    }
}

#[tokio::test]
async fn test_create_ignores_client_commission_value() {
    let app = setup().await;
    let cookie = login(&app).await;

    let created = create(
        &app,
        &cookie,
        json!({"value_nf": 200, "factor": 0.05, "commission_value": 1000000, "is_paid": true}),
    )
    .await;

    assert_eq!(created.commission_value, dec("10.00"));
    assert!(!created.is_paid);
}

#[tokio::test]
async fn test_create_validation() {
    let app = setup().await;
    let cookie = login(&app).await;

    let reply = send(&app, Method::POST, "/api/commissions", Some(&cookie), Some(json!({"factor": 0.1}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({"error": "Valor NF é obrigatório"}));

    let reply = send(&app, Method::POST, "/api/commissions", Some(&cookie), Some(json!({"value_nf": "abc"}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    // 잘못된 JSON 본문
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/commissions")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(list(&app, &cookie, "/api/commissions").await.is_empty());
}

#[tokio::test]
async fn test_out_of_range_values_are_bad_requests() {
    let app = setup().await;
    let cookie = login(&app).await;

    let rejected = [
        json!({"value_nf": "100000000000000000000", "factor": "100000000000"}),
        json!({"value_nf": 100000000}),
        json!({"value_nf": 100, "factor": 10}),
        json!({"value_nf": 100, "factor": "-10"}),
    ];
    for body in rejected {
        let reply = send(&app, Method::POST, "/api/commissions", Some(&cookie), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", body);
        assert!(reply.json()["error"].is_string());
    }
    assert!(list(&app, &cookie, "/api/commissions").await.is_empty());

    let created = create(&app, &cookie, json!({"value_nf": "99999999.99", "factor": "9.9999"})).await;
    assert_eq!(created.commission_value, dec("999989999.90"));
    let uri = format!("/api/commissions/{}", created.id);

    let rejected = [
        json!({"value_nf": "100000000000000000000"}),
        json!({"value_nf": 100000000, "is_paid": true}),
        json!({"factor": "100000000000"}),
        json!({"factor": -10}),
    ];
    for body in rejected {
        let reply = send(&app, Method::PUT, &uri, Some(&cookie), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", body);
    }

    // 거절된 요청 뒤에도 서버는 살아 있고 기록은 그대로
    assert_eq!(list(&app, &cookie, "/api/commissions").await, vec![created]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_succeed() {
    let path = std::env::temp_dir().join(format!("comissao-api-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = db::init_database(&url, 5).await.unwrap();
    let config = AppConfig::default();
    let app = build_app(ServerState::new(CommissionRepository::new(pool.clone()), &config), &config);

    let cookie = login(&app).await;
    let created = create(&app, &cookie, json!({"value_nf": 1})).await;
    let uri = format!("/api/commissions/{}", created.id);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..30 {
        let (app, cookie, uri) = (app.clone(), cookie.clone(), uri.clone());
        tasks.spawn(async move {
            send(&app, Method::PUT, &uri, Some(&cookie), Some(json!({"value_nf": 100 + i}))).await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let reply = joined.unwrap();
        assert_eq!(reply.status, StatusCode::OK, "{}", String::from_utf8_lossy(&reply.body));
    }

    let stored = list(&app, &cookie, "/api/commissions").await;
    assert_eq!(stored.len(), 1);
    assert!(stored[0].value_nf >= dec("100") && stored[0].value_nf < dec("130"));
    assert_eq!(
        stored[0].commission_value,
        (stored[0].value_nf * stored[0].factor)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    );

    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        std::fs::remove_file(format!("{}{}", path.display(), suffix)).ok();
    }
}

#[tokio::test]
async fn test_toggle_paid_keeps_money_fields() {
    let app = setup().await;
    let cookie = login(&app).await;
    let created = create(&app, &cookie, json!({"value_nf": "350.40", "factor": "0.03"})).await;

    tokio::time::sleep(Duration::from_millis(10)).await;

    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/commissions/{}", created.id),
        Some(&cookie),
        Some(json!({"is_paid": true})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.commission();

    assert!(updated.is_paid);
    assert_eq!(updated.value_nf, created.value_nf);
    assert_eq!(updated.factor, created.factor);
    assert_eq!(updated.commission_value, created.commission_value);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_update_recomputes_and_ignores_fabricated_value() {
    let app = setup().await;
    let cookie = login(&app).await;
    let created = create(&app, &cookie, json!({"value_nf": 100})).await;
    let uri = format!("/api/commissions/{}", created.id);

    let reply = send(
        &app,
        Method::PUT,
        &uri,
        Some(&cookie),
        Some(json!({
            "value_nf": 400,
            "commission_value": 12345,
            "id": 999,
            "created_at": "2000-01-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let updated = reply.commission();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.commission_value, dec("10.00"));

    let reply = send(&app, Method::PUT, &uri, Some(&cookie), Some(json!({"factor": 0.1}))).await;
    assert_eq!(reply.commission().commission_value, dec("40.00"));

    let reply = send(
        &app,
        Method::PUT,
        &uri,
        Some(&cookie),
        Some(json!({"value_nf": 50, "factor": 0.2, "commission_value": 1})),
    )
    .await;
    let updated = reply.commission();
    assert_eq!(updated.commission_value, dec("10.00"));

    // 저장된 값도 동일해야 한다
    let stored = list(&app, &cookie, "/api/commissions").await;
    assert_eq!(stored, vec![updated]);
}

#[tokio::test]
async fn test_update_errors() {
    let app = setup().await;
    let cookie = login(&app).await;
    let created = create(&app, &cookie, json!({"value_nf": 100})).await;
    let uri = format!("/api/commissions/{}", created.id);

    let reply = send(&app, Method::PUT, &uri, Some(&cookie), Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json(), json!({"error": "Nenhum campo para atualizar"}));

    let reply = send(&app, Method::PUT, &uri, Some(&cookie), Some(json!({"commission_value": 1}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/commissions/{}", created.id + 100),
        Some(&cookie),
        Some(json!({"is_paid": true})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({"error": "Comissão não encontrada"}));

    let reply = send(&app, Method::PUT, "/api/commissions/abc", Some(&cookie), Some(json!({"is_paid": true}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    assert_eq!(list(&app, &cookie, "/api/commissions").await, vec![created]);
}

#[tokio::test]
async fn test_list_filters_and_order() {
    let app = setup().await;
    let cookie = login(&app).await;

    let mut ids = Vec::new();
    for value in [10, 20, 30, 40] {
        ids.push(create(&app, &cookie, json!({"value_nf": value})).await.id);
    }
    for id in [ids[1], ids[3]] {
        let reply = send(
            &app,
            Method::PUT,
            &format!("/api/commissions/{}", id),
            Some(&cookie),
            Some(json!({"is_paid": true})),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    let ids_of = |list: Vec<Commission>| list.into_iter().map(|c| c.id).collect::<Vec<_>>();

    let all = list(&app, &cookie, "/api/commissions").await;
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(ids_of(all), vec![ids[3], ids[2], ids[1], ids[0]]);

    let paid = list(&app, &cookie, "/api/commissions?status=paid").await;
    assert!(paid.iter().all(|c| c.is_paid));
    assert_eq!(ids_of(paid), vec![ids[3], ids[1]]);

    let pending = list(&app, &cookie, "/api/commissions?status=pending").await;
    assert!(pending.iter().all(|c| !c.is_paid));
    assert_eq!(ids_of(pending), vec![ids[2], ids[0]]);

    let unknown = list(&app, &cookie, "/api/commissions?status=whatever").await;
    assert_eq!(unknown.len(), 4);
}

#[tokio::test]
async fn test_delete() {
    let app = setup().await;
    let cookie = login(&app).await;
    let keep = create(&app, &cookie, json!({"value_nf": 1})).await;
    let gone = create(&app, &cookie, json!({"value_nf": 2})).await;
    let uri = format!("/api/commissions/{}", gone.id);

    let reply = send(&app, Method::DELETE, "/api/commissions/9999", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let reply = send(&app, Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"success": true, "id": gone.id}));

    assert_eq!(list(&app, &cookie, "/api/commissions").await, vec![keep]);

    let reply = send(&app, Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    // 삭제된 id는 재사용되지 않음
    let next = create(&app, &cookie, json!({"value_nf": 3})).await;
    assert!(next.id > gone.id);
}

#[tokio::test]
async fn test_export_csv() {
    let app = setup().await;
    let cookie = login(&app).await;
    let created = create(
        &app,
        &cookie,
        json!({"value_nf": 100, "factor": 0.025, "nf_number": "NF-1", "order_number_nectar": "N;1"}),
    )
    .await;

    let reply = send(&app, Method::GET, "/api/commissions/export", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.headers.get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        reply.headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=comissoes.csv"
    );
    assert!(reply.body.starts_with(&[0xEF, 0xBB, 0xBF]));

    let text = String::from_utf8(reply.body.clone()).unwrap();
    let lines: Vec<&str> = text.trim_start_matches('\u{FEFF}').split('\n').collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "ID;Nº NF;Pedido Nectar;Pedido Embrascol;Valor NF;Fator;Comissão;Status;Criado em"
    );

    let created_on = created.created_at.format("%d/%m/%Y").to_string();
    let fields: Vec<&str> = lines[1].split(';').collect();
    assert_eq!(fields[1], "NF-1");
    assert_eq!(fields[2], "\"N");
    assert_eq!(fields[3], "1\"");
    assert_eq!(&fields[5..], &["100.00", "0.0250", "2.50", "Pendente", created_on.as_str()]);
}

#[tokio::test]
async fn test_unknown_api_route() {
    let app = setup().await;
    let reply = send(&app, Method::GET, "/api/nothing", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({"error": "Rota não encontrada"}));
}

#[tokio::test]
async fn test_spa_fallback_serves_index() {
    let dir = std::env::temp_dir().join(format!("comissao-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<html>app</html>").unwrap();

    let mut config = AppConfig::default();
    config.static_dir = dir.clone();
    let app = setup_with(config).await;

    let reply = send(&app, Method::GET, "/dashboard/anything", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, b"<html>app</html>");

    std::fs::remove_dir_all(&dir).ok();
}
