// Common test utilities and helpers

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::services::llm::SqlTranslator;
use crate::services::metrics_db::MIGRATOR;
use crate::services::{MetricStore, MetricsDb, MetricsService, QueryExecutor, SanitizedQuery, ScalarValue};
use crate::utils::{AuthError, ExecutionError, TranslationError};

/// Create an in-memory SQLite database with the metrics schema
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");

    pool
}

/// Three videos with snapshots.
///
/// Totals: views 1700, likes 130, comments 12, reports 1.
/// Published: v1 and v2 in May 2025, v3 in June 2025.
pub async fn seed_videos(pool: &SqlitePool) {
    sqlx::query(
        r#"
        INSERT INTO videos
            (id, creator_id, video_created_at, views_count, likes_count, comments_count, reports_count, created_at, updated_at)
        VALUES
            ('v1', 'c1', '2025-05-03T09:00:00+00:00', 1000, 80, 7, 0, '2025-05-03T09:00:00+00:00', '2025-05-04T09:00:00+00:00'),
            ('v2', 'c1', '2025-05-20T12:00:00+00:00',  500, 40, 5, 1, '2025-05-20T12:00:00+00:00', '2025-05-21T12:00:00+00:00'),
            ('v3', 'c2', '2025-06-10T08:00:00+00:00',  200, 10, 0, 0, '2025-06-10T08:00:00+00:00', '2025-06-11T08:00:00+00:00')
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to insert test videos");

    sqlx::query(
        r#"
        INSERT INTO video_snapshots
            (id, video_id, views_count, likes_count, comments_count, reports_count,
             delta_views_count, delta_likes_count, delta_comments_count, delta_reports_count,
             created_at, updated_at)
        VALUES
            ('s1', 'v1', 300, 20, 2, 0, 300, 20, 2, 0, '2025-05-03T10:00:00+00:00', '2025-05-03T10:00:00+00:00'),
            ('s2', 'v1', 700, 50, 5, 0, 400, 30, 3, 0, '2025-05-03T11:00:00+00:00', '2025-05-03T11:00:00+00:00'),
            ('s3', 'v2', 100,  5, 1, 1, 100,  5, 1, 1, '2025-05-20T13:00:00+00:00', '2025-05-20T13:00:00+00:00')
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to insert test snapshots");
}

pub async fn seeded_db() -> MetricsDb {
    let pool = create_test_db().await;
    seed_videos(&pool).await;
    MetricsDb::Sqlite(pool)
}

// ============================================================================
// Fakes
// ============================================================================

/// What the fake model answers with.
#[derive(Clone)]
pub enum Scripted {
    Sql(String),
    AuthFailure,
    MissingContent,
}

pub struct FakeTranslator {
    script: Scripted,
    pub calls: Arc<AtomicUsize>,
}

impl FakeTranslator {
    pub fn new(script: Scripted) -> Self {
        Self { script, calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl SqlTranslator for FakeTranslator {
    async fn translate(&self, _question: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Scripted::Sql(sql) => Ok(sql.clone()),
            Scripted::AuthFailure => Err(AuthError::MissingToken.into()),
            Scripted::MissingContent => Err(TranslationError::MissingContent),
        }
    }
}

/// Store wrapper that records every query reaching the database.
pub struct CountingStore {
    inner: MetricsDb,
    pub calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn new(inner: MetricsDb) -> Self {
        Self { inner, calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl MetricStore for CountingStore {
    async fn fetch_scalar(&self, query: &SanitizedQuery) -> Result<ScalarValue, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_scalar(query).await
    }
}

/// Pipeline over a seeded in-memory store.
pub struct TestPipeline {
    pub service: MetricsService,
    pub db: MetricsDb,
    pub translator_calls: Arc<AtomicUsize>,
    pub store_calls: Arc<AtomicUsize>,
}

pub async fn pipeline(script: Scripted) -> TestPipeline {
    let db = seeded_db().await;
    let translator = FakeTranslator::new(script);
    let store = CountingStore::new(db.clone());

    let translator_calls = Arc::clone(&translator.calls);
    let store_calls = Arc::clone(&store.calls);

    let service =
        MetricsService::new(Arc::new(translator), QueryExecutor::new(Arc::new(store)));

    TestPipeline { service, db, translator_calls, store_calls }
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

// ============================================================================
// HTTP stub
// ============================================================================

/// One request as it arrived on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request line and headers, without the blank line
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Local HTTP/1.1 server answering every request with the same canned response.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubServer {
    pub async fn start(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let captured = Arc::clone(&captured);
                tokio::spawn(async move {
                    if let Some(request) = read_request(&mut socket).await {
                        captured.lock().unwrap().push(request);
                    }
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { url: format!("http://{}", addr), requests }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[body_start..]).into_owned();
    Some(CapturedRequest { head, body })
}
