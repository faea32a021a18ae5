use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{
        health::livez,
        subscriptions::{confirm, subscribe, unsubscribe},
        weather::get_weather,
    },
    state::AppState,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/confirm/{token}", get(confirm))
        .route("/unsubscribe/{token}", get(unsubscribe))
        .route("/weather", get(get_weather))
        .route("/livez", get(livez))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use skymail_core::storage::Resolver;
    use skymail_core::subscription::{Cadence, TokenKind};

    use crate::config::Config;
    use crate::services::testing::{MockGeocoder, MockMailer, MockWeatherProvider};
    use crate::state::Collaborators;
    use crate::storage::{CachedStore, InMemoryRepository};

    struct TestApp {
        app: Router,
        store: Arc<dyn Resolver>,
        geocoder: Arc<MockGeocoder>,
        mailer: Arc<MockMailer>,
    }

    fn test_app() -> TestApp {
        let store: Arc<dyn Resolver> = Arc::new(CachedStore::new(
            Arc::new(InMemoryRepository::new()),
            NonZeroUsize::new(64).unwrap(),
        ));
        let geocoder = Arc::new(MockGeocoder::default());
        let mailer = Arc::new(MockMailer::default());
        let collaborators = Collaborators {
            geocoder: geocoder.clone(),
            weather: Arc::new(MockWeatherProvider::default()),
            mailer: mailer.clone(),
        };
        let config = Config::from_lookup(|_| None);
        let state = AppState::build(store.clone(), collaborators, &config).unwrap();

        TestApp {
            app: create_app(state),
            store,
            geocoder,
            mailer,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn get(app: &Router, uri: &str) -> Response {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn subscribe_form(app: &Router, body: &str) -> Response {
        send(
            app,
            Request::builder()
                .method("POST")
                .uri("/subscribe")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn token_for(t: &TestApp, email: &str, kind: TokenKind) -> String {
        let user = t.store.get_user_by_email(email).await.unwrap().unwrap();
        t.store
            .get_token_for_user(user.id, kind)
            .await
            .unwrap()
            .unwrap()
            .value
    }

    #[tokio::test]
    async fn test_livez() {
        let t = test_app();
        let response = get(&t.app, "/livez").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_subscribe_with_form() {
        let t = test_app();

        let response = subscribe_form(
            &t.app,
            "email=alice%40example.com&city=Paris&frequency=daily",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["message"], "Confirmation email sent");
        assert_eq!(t.mailer.sent_to("alice@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_with_json() {
        let t = test_app();

        let response = send(
            &t.app,
            Request::builder()
                .method("POST")
                .uri("/subscribe")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"email":"bob@example.com","city":"New York","cadence":"hourly"}"#,
                ))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let city = t.store.get_city_by_name("new-york").await.unwrap();
        assert!(city.is_some());
    }

    #[tokio::test]
    async fn test_subscribe_twice_is_conflict() {
        let t = test_app();
        let body = "email=alice%40example.com&city=Paris&frequency=daily";

        subscribe_form(&t.app, body).await;
        let response = subscribe_form(&t.app, body).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_bad_input() {
        let t = test_app();

        let missing_email = subscribe_form(&t.app, "city=Paris&frequency=daily").await;
        assert_eq!(missing_email.status(), StatusCode::BAD_REQUEST);

        let bad_cadence =
            subscribe_form(&t.app, "email=a%40example.com&city=Paris&frequency=weekly").await;
        assert_eq!(bad_cadence.status(), StatusCode::BAD_REQUEST);

        let bad_email =
            subscribe_form(&t.app, "email=nobody&city=Paris&frequency=daily").await;
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_subscribe_unknown_city_is_bad_request() {
        let t = test_app();
        t.geocoder.forget("atlantis");

        let response = subscribe_form(
            &t.app,
            "email=alice%40example.com&city=Atlantis&frequency=daily",
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_confirm_then_unsubscribe() {
        let t = test_app();
        subscribe_form(
            &t.app,
            "email=alice%40example.com&city=Paris&frequency=hourly",
        )
        .await;
        let confirm_code = token_for(&t, "alice@example.com", TokenKind::Confirm).await;
        let cancel_code = token_for(&t, "alice@example.com", TokenKind::Cancel).await;

        let response = get(&t.app, &format!("/confirm/{confirm_code}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["cadence"], "hourly");
        assert_eq!(
            t.store.list_subscriptions(Cadence::Hourly).await.unwrap().len(),
            1
        );

        let again = get(&t.app, &format!("/confirm/{confirm_code}")).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        let response = get(&t.app, &format!("/unsubscribe/{cancel_code}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(t
            .store
            .get_user_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_tokens_are_not_found() {
        let t = test_app();

        assert_eq!(
            get(&t.app, "/confirm/123456").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get(&t.app, "/unsubscribe/123456").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_weather_for_city() {
        let t = test_app();

        let response = get(&t.app, "/weather?city=Paris").await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["temperature"], 21.5);
        assert_eq!(json["humidity"], 40);
        assert_eq!(json["description"], "Sunny");
    }

    #[tokio::test]
    async fn test_weather_requires_city() {
        let t = test_app();

        assert_eq!(
            get(&t.app, "/weather").await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get(&t.app, "/weather?city=").await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_weather_unknown_city_is_not_found() {
        let t = test_app();
        t.geocoder.forget("atlantis");

        let response = get(&t.app, "/weather?city=Atlantis").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
