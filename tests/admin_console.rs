//! End-to-end tests for the admin console: gate, storage, uploads and mail.
//!
//! Each test uses its own in-memory SQLite database and upload directory.

use gazette::admin::{AdminConsole, AdminError, ArticleDraft};
use gazette::auth::{AdminGate, AuthError, LocalIdentity, SessionState};
use gazette::newsletter::{HttpMailer, MailError, NewsletterTemplate};
use gazette::storage::{ArticleFields, Database, Role, SubscribeOutcome};
use gazette::contact::SubscriberEmail;
use gazette::uploads::{LocalBlobStore, UploadError, UploadFile};
use std::path::PathBuf;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN: &str = "editor@mag.example.com";
const PASSWORD: &str = "correct horse";

type Console = AdminConsole<LocalIdentity, LocalBlobStore, Option<HttpMailer>>;

struct Harness {
    db: Database,
    identity: LocalIdentity,
    upload_dir: PathBuf,
    admin_id: i64,
}

async fn harness(name: &str) -> Harness {
    let db = Database::open(":memory:").await.unwrap();
    let identity = LocalIdentity::new(db.clone());
    let admin_id = identity.register(ADMIN, PASSWORD, Role::Admin).await.unwrap();
    identity
        .register("reader@mag.example.com", PASSWORD, Role::User)
        .await
        .unwrap();

    let upload_dir = std::env::temp_dir().join(format!("gazette_admin_test_{name}"));
    let _ = std::fs::remove_dir_all(&upload_dir);

    Harness {
        db,
        identity,
        upload_dir,
        admin_id,
    }
}

fn console(h: &Harness, mailer: Option<HttpMailer>) -> Console {
    AdminConsole::new(
        AdminGate::new(h.identity.clone()),
        h.db.clone(),
        LocalBlobStore::new(&h.upload_dir, "https://cdn.mag.example.com/uploads"),
        mailer,
        "https://mag.example.com",
    )
}

fn fields(title: &str) -> ArticleFields {
    ArticleFields {
        title: title.to_string(),
        excerpt: "How small firms find capital".to_string(),
        body: "Intro paragraph.\n\n[IMAGE:0]\n\nClosing thoughts.".to_string(),
        author: "Efua Mensah".to_string(),
        category: "Investment".to_string(),
        image_url: None,
        media_urls: vec!["https://cdn.example.com/existing.jpg".to_string()],
        read_time: "5 min read".to_string(),
    }
}

#[tokio::test]
async fn test_anonymous_session_cannot_mutate() {
    let h = harness("anonymous").await;
    let mut console = console(&h, None);

    let err = console
        .create_article(fields("Blocked").into())
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Auth(AuthError::NotSignedIn)));
    assert!(h.db.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_non_admin_sign_in_is_rejected() {
    let h = harness("non_admin").await;
    let mut console = console(&h, None);

    let err = console
        .sign_in("reader@mag.example.com", PASSWORD)
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Auth(AuthError::NotAdmin)));
    assert_eq!(console.gate().state(), &SessionState::Anonymous);
}

#[tokio::test]
async fn test_admin_creates_article_with_uploads() {
    let h = harness("create_uploads").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();

    let draft = ArticleDraft {
        fields: fields("Capital Access"),
        cover_image: Some(UploadFile::new("cover.jpg", vec![0xFF, 0xD8])),
        media_files: vec![
            UploadFile::new("chart.png", vec![1, 2, 3]),
            UploadFile::new("interview.mp4", vec![4, 5, 6]),
        ],
    };
    let id = console.create_article(draft).await.unwrap();

    let article = h.db.get_article(id).await.unwrap().unwrap();
    let cover = article.image_url.as_deref().unwrap();
    assert!(cover.starts_with("https://cdn.mag.example.com/uploads/"));
    assert!(cover.ends_with(".jpg"));
    assert_eq!(article.media_urls.len(), 3);
    assert_eq!(article.media_urls[0], "https://cdn.example.com/existing.jpg");
    assert!(article.media_urls[1].ends_with(".png"));
    assert!(article.media_urls[2].ends_with(".mp4"));

    std::fs::remove_dir_all(&h.upload_dir).ok();
}

#[tokio::test]
async fn test_failed_batch_leaves_article_untouched() {
    let h = harness("failed_batch").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();
    let id = console
        .create_article(fields("Original").into())
        .await
        .unwrap();

    let draft = ArticleDraft {
        fields: fields("Edited"),
        cover_image: None,
        media_files: vec![
            UploadFile::new("fine.png", vec![1]),
            UploadFile::new("notes.docx", vec![2]),
        ],
    };
    let err = console.update_article(id, draft).await.unwrap_err();

    assert!(matches!(err, AdminError::Upload(UploadError::UnsupportedType(_))));
    let article = h.db.get_article(id).await.unwrap().unwrap();
    assert_eq!(article.title, "Original");
    assert_eq!(article.media_urls.len(), 1);

    std::fs::remove_dir_all(&h.upload_dir).ok();
}

#[tokio::test]
async fn test_cover_must_be_an_image() {
    let h = harness("cover_image").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();

    let draft = ArticleDraft {
        fields: fields("Video cover"),
        cover_image: Some(UploadFile::new("teaser.webm", vec![1])),
        media_files: Vec::new(),
    };
    let err = console.create_article(draft).await.unwrap_err();

    assert!(matches!(err, AdminError::Upload(UploadError::NotAnImage(_))));
    assert!(h.db.list_articles().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_revoked_role_ends_session_before_write() {
    let h = harness("revoked").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();
    let id = console
        .create_article(fields("Keep me").into())
        .await
        .unwrap();

    h.db.set_role(h.admin_id, Role::User).await.unwrap();

    let err = console.delete_article(id).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth(AuthError::NotAdmin)));
    assert!(!console.gate().is_admin());
    assert!(h.db.get_article(id).await.unwrap().is_some());

    // Restoring the role does not revive the old session
    h.db.set_role(h.admin_id, Role::Admin).await.unwrap();
    let err = console.delete_article(id).await.unwrap_err();
    assert!(matches!(err, AdminError::Auth(AuthError::NotSignedIn)));
}

#[tokio::test]
async fn test_missing_article_reported() {
    let h = harness("missing").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();

    let err = console.delete_article(404).await.unwrap_err();
    assert!(matches!(err, AdminError::NotFound { id: 404, .. }));

    let err = console
        .update_article(404, fields("Ghost").into())
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::NotFound { id: 404, .. }));
}

#[tokio::test]
async fn test_subscriber_management() {
    let h = harness("subscribers").await;
    let outcome = h
        .db
        .subscribe(&SubscriberEmail::parse("fan@example.com").unwrap())
        .await
        .unwrap();
    let SubscribeOutcome::Subscribed(sub_id) = outcome else {
        panic!("expected new subscriber");
    };

    let mut console = console(&h, None);
    assert!(console.list_subscribers().await.is_err());

    console.sign_in(ADMIN, PASSWORD).await.unwrap();
    assert_eq!(console.list_subscribers().await.unwrap().len(), 1);

    console.delete_subscriber(sub_id).await.unwrap();
    assert!(console.list_subscribers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_newsletter_sends_rendered_template() {
    let h = harness("publish").await;
    for addr in ["one@example.com", "two@example.com"] {
        h.db.subscribe(&SubscriberEmail::parse(addr).unwrap())
            .await
            .unwrap();
    }

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;
    let mailer = HttpMailer::new(&mock_server.uri(), None).unwrap();

    let mut console = console(&h, Some(mailer));
    console.sign_in(ADMIN, PASSWORD).await.unwrap();
    console
        .save_template(&NewsletterTemplate {
            subject: "Out now: {{title}}".to_string(),
            body: "{{excerpt}}\n{{url}}".to_string(),
        })
        .await
        .unwrap();
    let id = console
        .create_article(fields("Capital Access").into())
        .await
        .unwrap();

    let report = console.publish_newsletter(id).await.unwrap();
    assert_eq!(report.sent, 2);
    assert!(report.failed.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["subject"], "Out now: Capital Access");
    assert_eq!(
        payload["body"],
        format!("How small firms find capital\nhttps://mag.example.com/article/{id}")
    );
}

#[tokio::test]
async fn test_empty_template_rejected() {
    let h = harness("empty_template").await;
    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();

    let err = console
        .save_template(&NewsletterTemplate {
            subject: "  ".to_string(),
            body: "Body".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Validation(_)));
    assert_eq!(h.db.get_template().await.unwrap(), NewsletterTemplate::default());
}

#[tokio::test]
async fn test_publish_without_mailer_fails_before_sending() {
    let h = harness("publish_unconfigured").await;
    h.db.subscribe(&SubscriberEmail::parse("one@example.com").unwrap())
        .await
        .unwrap();

    let mut console = console(&h, None);
    console.sign_in(ADMIN, PASSWORD).await.unwrap();
    let id = console
        .create_article(fields("Quiet launch").into())
        .await
        .unwrap();

    let err = console.publish_newsletter(id).await.unwrap_err();
    assert!(matches!(err, AdminError::Mail(MailError::NotConfigured)));
}
