use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

const SUBSETS: &str = "/api/v1/Dimensions('Region')/Hierarchies('Region')/Subsets";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn static_body(name: &str, elements: &[&str]) -> String {
    let binds: Vec<String> = elements
        .iter()
        .map(|e| format!("Dimensions('Region')/Hierarchies('Region')/Elements('{e}')"))
        .collect();
    serde_json::json!({
        "Name": name,
        "Hierarchy@odata.bind": "Dimensions('Region')/Hierarchies('Region')",
        "Elements@odata.bind": binds,
    })
    .to_string()
}

// --- list ---

#[tokio::test]
async fn list_subsets_empty() {
    let resp = app().oneshot(empty_request("GET", &format!("{SUBSETS}?$select=Name"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["value"], serde_json::json!([]));
}

// --- create ---

#[tokio::test]
async fn create_subset_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", SUBSETS, &static_body("Top", &["North", "South"])))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let subset = body_json(resp).await;
    assert_eq!(subset["Name"], "Top");
    assert_eq!(subset["UniqueName"], "[Region].[Region].[Top]");
    assert_eq!(subset["Elements"][1]["Name"], "South");
}

#[tokio::test]
async fn create_subset_without_name_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", SUBSETS, r#"{"Expression":"{}"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- get ---

#[tokio::test]
async fn get_subset_not_found() {
    let resp = app().oneshot(empty_request("GET", &format!("{SUBSETS}('Nope')"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_path_returns_404() {
    let resp = app().oneshot(empty_request("GET", "/api/v1/Cubes('Sales')")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_subset_not_found() {
    let resp = app().oneshot(empty_request("DELETE", &format!("{SUBSETS}('Nope')"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- mdx ---

#[tokio::test]
async fn execute_set_returns_tuples() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/v1/ExecuteMDXSetExpression?$expand=Tuples($expand=Members($select=Name))",
            r#"{"MDX":"{[Region].[West],[Region].[East]}"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["Tuples"][0]["Members"][0]["Name"], "West");
    assert_eq!(body["Tuples"][1]["Members"][0]["Name"], "East");
}

// --- full lifecycle ---

#[tokio::test]
async fn subset_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();
    let top = format!("{SUBSETS}('Top')");

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", SUBSETS, &static_body("Top", &["North", "South"])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // duplicate create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", SUBSETS, &static_body("Top", &[])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // the same name is free in the private collection
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v1/Dimensions('Region')/Hierarchies('Region')/PrivateSubsets",
            &static_body("Top", &[]),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // patch appends bound elements
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &top, &static_body("Top", &["South", "West"])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // delete one element
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("{top}/Elements('North')")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = body_bytes(resp).await;
    assert!(body.is_empty());

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &top))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let subset = body_json(resp).await;
    assert_eq!(
        subset["Elements"],
        serde_json::json!([{ "Name": "South" }, { "Name": "West" }])
    );

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("{SUBSETS}?$select=Name")))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["value"], serde_json::json!([{ "Name": "Top" }]));

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &top))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // get after delete — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &top))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_as_freezes_dynamic_subset() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            SUBSETS,
            r#"{"Name":"Dyn","Expression":"{[Region].[A],[Region].[B]}"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            &format!("{SUBSETS}('Dyn')/tm1.SaveAs"),
            r#"{"Name":"Dyn","MakePrivate":false,"MakeStatic":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let subset = body_json(resp).await;
    assert_eq!(subset["Expression"], Value::Null);
    assert_eq!(
        subset["Elements"],
        serde_json::json!([{ "Name": "A" }, { "Name": "B" }])
    );
}
