use mockito::Matcher;
use perception::identity::firebase::FirebaseIdentity;
use perception::identity::{AuthError, IdentityProvider};
use serde_json::json;
use url::Url;

fn provider(server: &mockito::Server) -> FirebaseIdentity {
    let base = Url::parse(&server.url()).unwrap();
    FirebaseIdentity::new(base.clone(), base, "test-key")
}

#[tokio::test]
async fn test_sign_in_with_password() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/accounts:signInWithPassword")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(json!({
            "email": "analyst@example.com",
            "password": "hunter22",
            "returnSecureToken": true
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "localId": "uid-1",
                "email": "analyst@example.com",
                "idToken": "id-token-1",
                "refreshToken": "refresh-1",
                "expiresIn": "3600"
            }"#,
        )
        .create_async()
        .await;

    let user = provider(&server)
        .sign_in_with_password("analyst@example.com", "hunter22")
        .await
        .expect("sign in");

    assert_eq!(user.uid, "uid-1");
    assert_eq!(user.email.as_deref(), Some("analyst@example.com"));
    assert_eq!(user.id_token, "id-token-1");
    assert_eq!(user.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(user.expires_in, Some(3600));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_sign_in_error_is_verbatim() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/accounts:signInWithPassword")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":400,"message":"INVALID_LOGIN_CREDENTIALS"}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .sign_in_with_password("analyst@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AuthError::Provider {
            code: 400,
            message: "INVALID_LOGIN_CREDENTIALS".to_string()
        }
    );
    assert_eq!(err.to_string(), "INVALID_LOGIN_CREDENTIALS");
    assert_eq!(err.user_message(), "INVALID_LOGIN_CREDENTIALS");
}

#[tokio::test]
async fn test_error_without_message_falls_back() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/accounts:signUp")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":400}}"#)
        .create_async()
        .await;

    let err = provider(&server)
        .sign_up_with_password("new@example.com", "hunter22")
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Authentication failed");
}

#[tokio::test]
async fn test_sign_up_uses_sign_up_endpoint() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/accounts:signUp")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"localId":"uid-new","email":"new@example.com","idToken":"id-token-new"}"#)
        .create_async()
        .await;

    let user = provider(&server)
        .sign_up_with_password("new@example.com", "hunter22")
        .await
        .expect("sign up");

    assert_eq!(user.uid, "uid-new");
    assert_eq!(user.refresh_token, None);
    assert_eq!(user.expires_in, None);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_resolves_user() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/accounts:lookup")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "idToken": "id-token-1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"users":[{"localId":"uid-1","email":"analyst@example.com"}]}"#)
        .create_async()
        .await;

    let user = provider(&server)
        .lookup("id-token-1")
        .await
        .expect("lookup")
        .expect("user");

    assert_eq!(user.uid, "uid-1");
    assert_eq!(user.id_token, "id-token-1");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_lookup_rejected_token_is_no_session() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/accounts:lookup")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":400,"message":"INVALID_ID_TOKEN"}}"#)
        .create_async()
        .await;

    let result = provider(&server).lookup("stale").await.expect("lookup");
    assert_eq!(result, None);
}

#[tokio::test]
async fn test_lookup_server_error_propagates() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/accounts:lookup")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("unavailable")
        .create_async()
        .await;

    let err = provider(&server).lookup("id-token-1").await.unwrap_err();
    assert!(matches!(err, AuthError::Provider { code: 503, .. }));
}

#[tokio::test]
async fn test_refresh_exchanges_refresh_token() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/token")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "access_token": "id-token-2",
                "expires_in": "3600",
                "token_type": "Bearer",
                "refresh_token": "refresh-2",
                "id_token": "id-token-2",
                "user_id": "uid-1",
                "project_id": "1234"
            }"#,
        )
        .create_async()
        .await;

    let user = provider(&server)
        .refresh("refresh-1")
        .await
        .expect("refresh")
        .expect("user");

    assert_eq!(user.uid, "uid-1");
    assert_eq!(user.id_token, "id-token-2");
    assert_eq!(user.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(user.expires_in, Some(3600));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_rejected_token_is_no_session() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/v1/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":400,"message":"TOKEN_EXPIRED"}}"#)
        .create_async()
        .await;

    let result = provider(&server).refresh("refresh-1").await.expect("refresh");
    assert_eq!(result, None);
}
