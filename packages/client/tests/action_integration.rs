use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restmap_client::{
    Action, Field, GetOptions, Map, Resource, ResponseKind, SchemaBuilder, Value,
};

use std::sync::Arc;

fn service_schema(action: Action) -> Arc<restmap_client::Schema> {
    SchemaBuilder::new("Service")
        .field(Field::text("name").optional())
        .action(action)
        .build()
        .unwrap()
}

fn lazy_resource(schema: Arc<restmap_client::Schema>, uri: &str) -> Resource {
    Resource::get_with(schema, uri, GetOptions::default()).unwrap()
}

#[tokio::test]
async fn query_string_action_issues_one_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/reorder"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let schema = service_schema(
        Action::new("reorder", "reorder").with_required_params(["order"]),
    );
    let uri = format!("{}/service", server.uri());

    let outcome_is_none = tokio::task::spawn_blocking(move || {
        let service = lazy_resource(schema, &uri);
        let mut params = Map::new();
        params.insert("order".to_string(), Value::from("desc"));
        service.invoke("reorder", params).unwrap().is_none()
    })
    .await
    .unwrap();

    assert!(outcome_is_none);
}

#[tokio::test]
async fn body_action_sends_form_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/submit"))
        .and(header(
            "Content-Type",
            "application/x-www-form-urlencoded",
        ))
        .and(body_string("foo=bar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let schema = service_schema(
        Action::new("submit", "submit")
            .with_optional_params(["foo"])
            .via_body()
            .with_serializer(Arc::new(restmap_codec::FormSerializer)),
    );
    let uri = format!("{}/service", server.uri());

    tokio::task::spawn_blocking(move || {
        let service = lazy_resource(schema, &uri);
        let mut params = Map::new();
        params.insert("foo".to_string(), Value::from("bar"));
        service.invoke("submit", params).unwrap();
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn body_action_defaults_to_owner_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/submit"))
        .and(header("Content-Type", "application/json"))
        .and(body_string(r#"{"foo":"bar"}"#))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let schema = service_schema(
        Action::new("submit", "submit")
            .with_optional_params(["foo"])
            .via_body(),
    );
    let uri = format!("{}/service", server.uri());

    tokio::task::spawn_blocking(move || {
        let service = lazy_resource(schema, &uri);
        let mut params = Map::new();
        params.insert("foo".to_string(), Value::from("bar"));
        service.invoke("submit", params).unwrap();
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn response_aliasing_in_both_modes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"one": 1, "two": 2})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mapping_schema = service_schema(
        Action::new("stats", "stats")
            .with_response(ResponseKind::Mapping)
            .with_response_alias("one", "neo")
            .with_response_alias("two", "tow"),
    );
    let object_schema = service_schema(
        Action::new("stats", "stats")
            .with_response(ResponseKind::Object)
            .with_response_alias("one", "neo")
            .with_response_alias("two", "tow"),
    );
    let uri = format!("{}/service", server.uri());

    let (neo, tow, obj_neo, obj_tow) = tokio::task::spawn_blocking(move || {
        let service = lazy_resource(mapping_schema, &uri);
        let outcome = service.invoke("stats", Map::new()).unwrap();
        let mapping = outcome.as_mapping().unwrap();
        let neo = mapping.get("neo").cloned();
        let tow = mapping.get("tow").cloned();

        let service = lazy_resource(object_schema, &uri);
        let outcome = service.invoke("stats", Map::new()).unwrap();
        let object = outcome.as_object().unwrap();
        let obj_neo = object.attr("neo").unwrap().scalar().cloned();
        let obj_tow = object.attr("tow").unwrap().scalar().cloned();
        (neo, tow, obj_neo, obj_tow)
    })
    .await
    .unwrap();

    assert_eq!(neo, Some(Value::Integer(1)));
    assert_eq!(tow, Some(Value::Integer(2)));
    assert_eq!(obj_neo, Some(Value::Integer(1)));
    assert_eq!(obj_tow, Some(Value::Integer(2)));
}

#[tokio::test]
async fn unexpected_status_carries_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let schema = service_schema(Action::new("flaky", "flaky"));
    let uri = format!("{}/service", server.uri());

    let (status, body) = tokio::task::spawn_blocking(move || {
        let service = lazy_resource(schema, &uri);
        match service.invoke("flaky", Map::new()) {
            Err(restmap_client::Error::Http { status, body, .. }) => (status, body),
            other => panic!("expected Http error, got {:?}", other.map(|_| ())),
        }
    })
    .await
    .unwrap();

    assert_eq!(status, 503);
    assert_eq!(body, "try later");
}
