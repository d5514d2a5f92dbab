use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use server::{ServerState, TokenSigner, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = engine::Engine::builder()
        .database(db)
        .bcrypt_cost(4)
        .build()
        .await
        .unwrap();
    let tokens = TokenSigner::new("test-secret", chrono::Duration::hours(1)).unwrap();
    router(ServerState::new(engine, tokens))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router) -> String {
    let credentials = json!({ "username": "operator", "password": "secret1" });
    let (status, _) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(credentials.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(app, Method::POST, "/api/auth/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

fn ramesh() -> Value {
    json!({ "fullName": "Ramesh Kumar", "mobileNumber": "9876543210", "city": "Mumbai" })
}

#[tokio::test]
async fn outstanding_follows_purchases_and_payments() {
    let app = app().await;
    let token = login(&app).await;
    let token = Some(token.as_str());

    let (status, body) = call(&app, Method::POST, "/api/buyers", token, Some(ramesh())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Buyer created successfully");
    let buyer_id = body["data"]["buyer"]["Id"].as_i64().unwrap();

    let purchase = json!({
        "buyerId": buyer_id,
        "milkType": "cow",
        "buyerPrice": 45.5,
        "totalQty": 100,
        "fatPercentage": 3.5,
        "date": "2025-08-25",
    });
    let (status, body) = call(&app, Method::POST, "/api/milk-store", token, Some(purchase)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["data"]["milkPurchase"]["TotalAmount"].as_f64(),
        Some(4550.0)
    );

    let account_uri = format!("/api/buyers/{buyer_id}?includeTransactions=true");
    let (status, body) = call(&app, Method::GET, &account_uri, token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["buyer"]["outstandingAmount"].as_f64(),
        Some(4550.0)
    );
    assert_eq!(body["data"]["buyer"]["FullName"], "Ramesh Kumar");

    let payment = json!({
        "buyerId": buyer_id,
        "paymentAmount": 1000,
        "paymentType": "partial",
        "paymentMethod": "cash",
        "date": "2025-08-25",
    });
    let (status, _) = call(&app, Method::POST, "/api/buyer-payments", token, Some(payment)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(&app, Method::GET, &account_uri, token, None).await;
    assert_eq!(
        body["data"]["buyer"]["outstandingAmount"].as_f64(),
        Some(3550.0)
    );
    assert_eq!(
        body["data"]["buyer"]["payments"]["totalPaid"].as_f64(),
        Some(1000.0)
    );

    // The purchase was posted to the expense book.
    let (_, body) = call(&app, Method::GET, "/api/expense", token, None).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["expenses"][0]["Category"], "milk_purchase");
}

#[tokio::test]
async fn duplicate_mobile_conflicts() {
    let app = app().await;
    let token = login(&app).await;
    let token = Some(token.as_str());

    call(&app, Method::POST, "/api/buyers", token, Some(ramesh())).await;
    let (status, body) = call(&app, Method::POST, "/api/buyers", token, Some(ramesh())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Mobile number already exists");
}

#[tokio::test]
async fn deleted_buyer_is_gone() {
    let app = app().await;
    let token = login(&app).await;
    let token = Some(token.as_str());

    let (_, body) = call(&app, Method::POST, "/api/buyers", token, Some(ramesh())).await;
    let uri = format!("/api/buyers/{}", body["data"]["buyer"]["Id"]);

    let (status, body) = call(&app, Method::DELETE, &uri, token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Buyer deleted successfully");

    let (status, _) = call(&app, Method::GET, &uri, token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(&app, Method::DELETE, &uri, token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Buyer not found");

    let (_, body) = call(&app, Method::GET, "/api/buyers", token, None).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn short_search_is_rejected() {
    let app = app().await;
    let token = login(&app).await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/sellers/search?q=a",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search term must be at least 2 characters");
}

#[tokio::test]
async fn empty_dashboard_has_zero_margin() {
    let app = app().await;
    let token = login(&app).await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/dashboard/summary?startDate=2024-01-01&endDate=2024-01-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let finance = &body["data"]["finance"];
    assert_eq!(finance["totalIncome"].as_f64(), Some(0.0));
    assert_eq!(finance["netProfit"].as_f64(), Some(0.0));
    assert_eq!(finance["profitMargin"], "0");
}

#[tokio::test]
async fn wrong_password_is_uniform() {
    let app = app().await;
    login(&app).await;

    for credentials in [
        json!({ "username": "operator", "password": "not-the-one" }),
        json!({ "username": "stranger", "password": "secret1" }),
    ] {
        let (status, body) =
            call(&app, Method::POST, "/api/auth/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/buyers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, body) = call(&app, Method::GET, "/api/buyers", Some("abc.def.ghi"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");

    let (status, body) = call(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "running");
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/cattle", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn payment_update_rejects_unknown_fields() {
    let app = app().await;
    let token = login(&app).await;
    let token = Some(token.as_str());

    let (_, body) = call(&app, Method::POST, "/api/sellers", token, Some(ramesh())).await;
    let seller_id = body["data"]["seller"]["Id"].as_i64().unwrap();
    let payment = json!({
        "sellerId": seller_id,
        "paymentAmount": 250,
        "paymentType": "advance",
        "paymentMethod": "upi",
        "transactionId": "UPI-1",
        "date": "2025-08-25",
    });
    let (_, body) = call(&app, Method::POST, "/api/seller-payments", token, Some(payment)).await;
    let uri = format!("/api/seller-payments/{}", body["data"]["payment"]["Id"]);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        token,
        Some(json!({ "paymentAmount": 300, "amountDue": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        token,
        Some(json!({ "paymentAmount": 300 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment"]["PaymentAmount"].as_f64(), Some(300.0));

    let by_seller = format!("/api/seller-payments/seller/{seller_id}");
    let (status, body) = call(&app, Method::GET, &by_seller, token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn deleted_users_token_is_refused() {
    let app = app().await;
    let admin = login(&app).await;

    let helper = json!({ "username": "helper", "password": "secret1" });
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(helper.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let helper_id = body["data"]["user"]["Id"].as_i64().unwrap();
    let (_, body) = call(&app, Method::POST, "/api/auth/login", None, Some(helper)).await;
    let helper_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = call(&app, Method::GET, "/api/buyers", Some(&helper_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/auth/users/{helper_id}");
    let (status, body) = call(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, body) = call(&app, Method::GET, "/api/buyers", Some(&helper_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User no longer exists.");
}

#[tokio::test]
async fn distribution_reports() {
    let app = app().await;
    let token = login(&app).await;
    let token = Some(token.as_str());

    let (_, body) = call(&app, Method::POST, "/api/sellers", token, Some(ramesh())).await;
    let seller_id = body["data"]["seller"]["Id"].as_i64().unwrap();
    let (_, body) = call(&app, Method::POST, "/api/buyers", token, Some(ramesh())).await;
    let buyer_id = body["data"]["buyer"]["Id"].as_i64().unwrap();

    for (price, qty) in [(60, 10), (70, 5)] {
        let sale = json!({
            "sellerId": seller_id,
            "milkType": "Buffalo",
            "sellerPrice": price,
            "totalQty": qty,
            "fatPercentage": 6.5,
            "date": "2025-08-25",
        });
        let (status, body) =
            call(&app, Method::POST, "/api/milk-distribution", token, Some(sale)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["milkSale"]["MilkType"], "buffalo");
    }
    let purchase = json!({
        "buyerId": buyer_id,
        "milkType": "cow",
        "buyerPrice": 45.5,
        "totalQty": 100,
        "fatPercentage": 3.5,
        "date": "2025-08-25",
    });
    call(&app, Method::POST, "/api/milk-store", token, Some(purchase)).await;

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/milk-distribution/daily-report/2025-08-25",
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let report = body["data"]["report"].as_array().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0]["milkType"], "buffalo");
    assert_eq!(report[0]["totalTransactions"], 2);
    assert_eq!(report[0]["totalQuantity"].as_f64(), Some(15.0));
    assert_eq!(report[0]["totalAmount"].as_f64(), Some(950.0));
    assert_eq!(report[0]["minPrice"].as_f64(), Some(60.0));
    assert_eq!(report[0]["maxPrice"].as_f64(), Some(70.0));

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/milk-distribution/daily-report/25-08-2025",
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/milk-distribution/profit-analysis?startDate=2025-08-01&endDate=2025-08-31",
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let analysis = body["data"]["analysis"].as_array().unwrap();
    assert_eq!(analysis.len(), 2);
    assert_eq!(analysis[0]["type"], "Sales");
    assert_eq!(analysis[0]["milkType"], "buffalo");
    assert_eq!(analysis[0]["totalAmount"].as_f64(), Some(950.0));
    assert_eq!(analysis[1]["type"], "Purchases");
    assert_eq!(analysis[1]["milkType"], "cow");
    assert_eq!(analysis[1]["totalAmount"].as_f64(), Some(4550.0));

    // Purchases have no profit analysis of their own.
    let (status, _) = call(
        &app,
        Method::GET,
        "/api/milk-store/profit-analysis",
        token,
        None,
    )
    .await;
    assert_ne!(status, StatusCode::OK);
}
