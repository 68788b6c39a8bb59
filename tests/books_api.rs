use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookshelf_app::{
    app::run_migrations,
    build_registry,
    modules::books::{models::Book, store::BookStore},
};
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: BookStore,
}

impl TestApp {
    /// Fresh in-memory database with migrations applied and the full router built.
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        let registry = build_registry();
        run_migrations(&registry, &db).await.unwrap();

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        let router = bookshelf_http::build_router(&registry, &ctx);

        Self {
            router,
            store: BookStore::new(db),
        }
    }

    /// Insert the reference book and return its isbn.
    async fn seed_book(&self) -> String {
        let book = self.store.create(&seed()).await.unwrap();
        book.isbn
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn count(&self) -> i64 {
        self.store.count().await.unwrap()
    }
}

fn seed() -> Book {
    Book {
        isbn: "12345678".to_string(),
        amazon_url: "https://amazon.com/hotdog".to_string(),
        author: "Asher".to_string(),
        language: "Cramer".to_string(),
        pages: 100,
        publisher: "Nothing publishers".to_string(),
        title: "my first book".to_string(),
        year: 2008,
    }
}

fn new_book() -> Value {
    json!({
        "isbn": "32794782",
        "amazon_url": "https://taco.com",
        "author": "mctest",
        "language": "english",
        "pages": 1000,
        "publisher": "yeah right",
        "title": "amazing times",
        "year": 2000
    })
}

fn update_body() -> Value {
    json!({
        "amazon_url": "https://taco.com",
        "author": "mctest",
        "language": "english",
        "pages": 1000,
        "publisher": "yeah right",
        "title": "amazing update right?",
        "year": 2000
    })
}

#[tokio::test]
async fn list_returns_every_book() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let (status, body) = app.send(Method::GET, "/books", None).await;

    assert_eq!(status, StatusCode::OK);
    let books = body["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], isbn);
    assert_eq!(books[0]["amazon_url"], "https://amazon.com/hotdog");
}

#[tokio::test]
async fn list_of_empty_table_is_empty() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/books", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "books": [] }));
}

#[tokio::test]
async fn get_returns_book_by_isbn() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let (status, body) = app.send(Method::GET, &format!("/books/{isbn}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"], serde_json::to_value(seed()).unwrap());
}

#[tokio::test]
async fn get_unknown_isbn_is_404() {
    let app = TestApp::new().await;
    app.seed_book().await;

    let (status, body) = app.send(Method::GET, "/books/2222", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["message"].as_str().unwrap().contains("2222"));
}

#[tokio::test]
async fn create_stores_and_returns_book() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::POST, "/books", Some(new_book())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["book"]["isbn"], "32794782");
    assert_eq!(body["book"], new_book());

    let (status, body) = app.send(Method::GET, "/books/32794782", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"], new_book());
}

#[tokio::test]
async fn create_without_required_fields_is_400() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/books", Some(json!({ "year": 2021 })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 7);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("isbn is required"));
    assert_eq!(app.count().await, 0);
}

#[tokio::test]
async fn create_missing_any_single_field_is_400() {
    let app = TestApp::new().await;

    for field in new_book().as_object().unwrap().keys() {
        let mut body = new_book();
        body.as_object_mut().unwrap().remove(field);

        let (status, response) = app.send(Method::POST, "/books", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "missing {field}");
        assert_eq!(response["error"]["details"][0]["field"], field.as_str());
    }

    assert_eq!(app.count().await, 0);
}

#[tokio::test]
async fn create_with_wrong_types_is_400() {
    let app = TestApp::new().await;
    let mut body = new_book();
    body["pages"] = json!("a thousand");

    let (status, response) = app.send(Method::POST, "/books", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"]["details"],
        json!([{ "field": "pages", "error": "must be of type integer" }])
    );
    assert_eq!(app.count().await, 0);
}

#[tokio::test]
async fn create_with_duplicate_isbn_is_409() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;
    let mut body = new_book();
    body["isbn"] = json!(isbn);

    let (status, response) = app.send(Method::POST, "/books", Some(body)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"]["code"], "conflict");
    assert_eq!(app.store.get(&isbn).await.unwrap(), seed());
}

#[tokio::test]
async fn create_with_malformed_json_is_400() {
    let app = TestApp::new().await;
    let request = Request::post("/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"isbn\": "))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.count().await, 0);
}

#[tokio::test]
async fn update_overwrites_book() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let (status, body) = app
        .send(Method::PUT, &format!("/books/{isbn}"), Some(update_body()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["isbn"], isbn);
    assert_eq!(body["book"]["title"], "amazing update right?");
    assert_eq!(app.store.get(&isbn).await.unwrap().author, "mctest");
}

#[tokio::test]
async fn update_with_isbn_or_unknown_field_is_400() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;
    let mut body = update_body();
    body["isbn"] = json!("32794782");
    body["invalidField"] = json!("SHHH, im trying to be added");

    let (status, response) = app
        .send(Method::PUT, &format!("/books/{isbn}"), Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let mut rejected: Vec<&str> = response["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|detail| detail["field"].as_str().unwrap())
        .collect();
    rejected.sort_unstable();
    assert_eq!(rejected, vec!["invalidField", "isbn"]);

    assert_eq!(app.store.get(&isbn).await.unwrap(), seed());
    assert!(app.store.get("32794782").await.is_err());
}

#[tokio::test]
async fn update_with_missing_or_mistyped_field_is_400() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let mut missing_year = update_body();
    missing_year.as_object_mut().unwrap().remove("year");
    let (status, response) = app
        .send(Method::PUT, &format!("/books/{isbn}"), Some(missing_year))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"]["details"],
        json!([{ "field": "year", "error": "is required" }])
    );

    let mut string_year = update_body();
    string_year["year"] = json!("2000");
    let (status, response) = app
        .send(Method::PUT, &format!("/books/{isbn}"), Some(string_year))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"]["details"],
        json!([{ "field": "year", "error": "must be of type integer" }])
    );

    assert_eq!(app.store.get(&isbn).await.unwrap(), seed());
}

#[tokio::test]
async fn unsupported_method_is_json_405() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let (status, body) = app
        .send(Method::PATCH, &format!("/books/{isbn}"), Some(update_body()))
        .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "method_not_allowed");
    assert_eq!(app.store.get(&isbn).await.unwrap(), seed());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/authors", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn update_unknown_isbn_is_404() {
    let app = TestApp::new().await;
    app.seed_book().await;

    let (status, _) = app
        .send(Method::PUT, "/books/2222", Some(update_body()))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count().await, 1);
}

#[tokio::test]
async fn delete_removes_book() {
    let app = TestApp::new().await;
    let isbn = app.seed_book().await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/books/{isbn}"), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Book deleted" }));

    let (status, _) = app.send(Method::GET, &format!("/books/{isbn}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_isbn_is_404() {
    let app = TestApp::new().await;

    let (status, _) = app.send(Method::DELETE, "/books/2222", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_describes_book_routes() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/books"]["post"].is_object());
    assert!(body["paths"]["/books/{isbn}"]["put"].is_object());
    assert_eq!(
        body["components"]["schemas"]["BookChanges"]["required"]
            .as_array()
            .unwrap()
            .len(),
        7
    );
}
