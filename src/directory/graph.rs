//! Microsoft Graph binding of [`DirectoryClient`].
//!
//! One HTTP request per operation, no retries. Non-success responses are
//! parsed as OData errors when possible.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use url::Url;

use super::{
    DirectoryAccount, DirectoryClient, DirectoryError, LicenseSku, NewAccount, TokenProvider,
};

/// OData error envelope returned by Graph.
#[derive(Debug, Deserialize)]
struct ODataError {
    error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    code: String,
    message: String,
}

/// Collection response wrapper.
#[derive(Debug, Deserialize)]
struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GroupRef {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserBody<'a> {
    account_enabled: bool,
    #[serde(flatten)]
    account: &'a NewAccount,
    password_profile: PasswordProfile<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordProfile<'a> {
    force_change_password_next_sign_in: bool,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignLicenseBody<'a> {
    add_licenses: Vec<AddLicense<'a>>,
    remove_licenses: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddLicense<'a> {
    sku_id: &'a str,
}

/// Graph REST client.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Create a client for `base_url` (for example `https://graph.microsoft.com/v1.0`).
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        token: Arc<dyn TokenProvider>,
    ) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| DirectoryError::Config(format!("Invalid Graph base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::Config(format!(
                "Graph base URL cannot be a base: {base_url}"
            )));
        }
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Base URL followed by the given path segments, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, DirectoryError> {
        let bearer = self.token.bearer_header().await?;
        Ok(self
            .http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, bearer.as_ref()))
    }

    /// Send and decode a JSON response body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, DirectoryError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| DirectoryError::InvalidResponse(e.to_string()))
    }

    /// Send and ignore any response body.
    async fn send_empty(&self, request: RequestBuilder) -> Result<(), DirectoryError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        Ok(())
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> DirectoryError {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ODataError>(&body) {
        Ok(odata) => DirectoryError::Api {
            status: status.as_u16(),
            code: odata.error.code,
            message: odata.error.message,
        },
        Err(_) => DirectoryError::Api {
            status: status.as_u16(),
            code: status.to_string(),
            message: body,
        },
    }
}

/// Quote a value for use inside an OData string literal.
fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl DirectoryClient for GraphClient {
    async fn create_account(&self, account: &NewAccount) -> Result<DirectoryAccount, DirectoryError> {
        let body = CreateUserBody {
            account_enabled: true,
            account,
            password_profile: PasswordProfile {
                force_change_password_next_sign_in: true,
                password: &account.temporary_password,
            },
        };
        let request = self
            .request(Method::POST, self.endpoint(&["users"]))
            .await?
            .json(&body);
        let created: DirectoryAccount = self.send_json(request).await?;
        tracing::debug!(account_id = %created.id, upn = %account.user_principal_name, "Created account");
        Ok(created)
    }

    async fn get_account(&self, id_or_upn: &str) -> Result<Option<DirectoryAccount>, DirectoryError> {
        let request = self
            .request(Method::GET, self.endpoint(&["users", id_or_upn]))
            .await?
            .query(&[("$select", "id,userPrincipalName")]);
        match self.send_json(request).await {
            Ok(account) => Ok(Some(account)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn disable_account(&self, account_id: &str) -> Result<(), DirectoryError> {
        let request = self
            .request(Method::PATCH, self.endpoint(&["users", account_id]))
            .await?
            .json(&json!({ "accountEnabled": false }));
        self.send_empty(request).await
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<String>, DirectoryError> {
        let filter = format!("displayName eq {}", odata_string(name));
        let request = self
            .request(Method::GET, self.endpoint(&["groups"]))
            .await?
            .query(&[("$filter", filter.as_str()), ("$select", "id,displayName")]);
        let groups: ODataCollection<GroupRef> = self.send_json(request).await?;
        Ok(groups.value.into_iter().next().map(|g| g.id))
    }

    async fn add_group_member(&self, group_id: &str, account_id: &str) -> Result<(), DirectoryError> {
        let member = self.endpoint(&["directoryObjects", account_id]);
        let request = self
            .request(
                Method::POST,
                self.endpoint(&["groups", group_id, "members", "$ref"]),
            )
            .await?
            .json(&json!({ "@odata.id": member.as_str() }));
        self.send_empty(request).await
    }

    async fn remove_group_member(
        &self,
        group_id: &str,
        account_id: &str,
    ) -> Result<(), DirectoryError> {
        let request = self
            .request(
                Method::DELETE,
                self.endpoint(&["groups", group_id, "members", account_id, "$ref"]),
            )
            .await?;
        self.send_empty(request).await
    }

    async fn subscribed_skus(&self) -> Result<Vec<LicenseSku>, DirectoryError> {
        let request = self
            .request(Method::GET, self.endpoint(&["subscribedSkus"]))
            .await?;
        let skus: ODataCollection<LicenseSku> = self.send_json(request).await?;
        Ok(skus.value)
    }

    async fn assign_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let body = AssignLicenseBody {
            add_licenses: vec![AddLicense { sku_id }],
            remove_licenses: vec![],
        };
        let request = self
            .request(
                Method::POST,
                self.endpoint(&["users", account_id, "assignLicense"]),
            )
            .await?
            .json(&body);
        self.send_empty(request).await
    }

    async fn remove_license(&self, account_id: &str, sku_id: &str) -> Result<(), DirectoryError> {
        let body = AssignLicenseBody {
            add_licenses: vec![],
            remove_licenses: vec![sku_id],
        };
        let request = self
            .request(
                Method::POST,
                self.endpoint(&["users", account_id, "assignLicense"]),
            )
            .await?
            .json(&body);
        self.send_empty(request).await
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    use super::*;
    use crate::directory::token::StaticToken;

    async fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Arc::new(StaticToken("test-token")),
        )
        .unwrap()
    }

    fn new_account() -> NewAccount {
        NewAccount {
            user_principal_name: "jane.doe@contoso.com".into(),
            display_name: "Jane Doe".into(),
            mail_nickname: "jane.doe".into(),
            given_name: "Jane".into(),
            surname: "Doe".into(),
            job_title: "Engineer".into(),
            department: "IT".into(),
            usage_location: "US".into(),
            temporary_password: "Aa1!aaaaaaaaaaaa".into(),
        }
    }

    #[tokio::test]
    async fn test_create_account_posts_full_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "accountEnabled": true,
                "userPrincipalName": "jane.doe@contoso.com",
                "displayName": "Jane Doe",
                "mailNickname": "jane.doe",
                "givenName": "Jane",
                "surname": "Doe",
                "jobTitle": "Engineer",
                "department": "IT",
                "usageLocation": "US",
                "passwordProfile": {
                    "forceChangePasswordNextSignIn": true,
                    "password": "Aa1!aaaaaaaaaaaa"
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "user-1",
                "userPrincipalName": "jane.doe@contoso.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let account = client(&server).await.create_account(&new_account()).await.unwrap();
        assert_eq!(account.id, "user-1");
        assert_eq!(account.user_principal_name, "jane.doe@contoso.com");
    }

    #[tokio::test]
    async fn test_odata_error_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": "Request_BadRequest",
                    "message": "Another object with the same value for property userPrincipalName already exists."
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .create_account(&new_account())
            .await
            .unwrap_err();
        match err {
            DirectoryError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "Request_BadRequest");
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_odata_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscribedSkus"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).await.subscribed_skus().await.unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Api { status: 503, ref message, .. } if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_find_group_by_name_escapes_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .and(query_param("$filter", "displayName eq 'O''Brien Fans'"))
            .and(query_param("$select", "id,displayName"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "group-1", "displayName": "O'Brien Fans" }]
            })))
            .mount(&server)
            .await;

        let id = client(&server)
            .await
            .find_group_by_name("O'Brien Fans")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("group-1"));
    }

    #[tokio::test]
    async fn test_find_group_by_name_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .mount(&server)
            .await;

        assert!(
            client(&server)
                .await
                .find_group_by_name("Nobody")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_add_and_remove_group_member() {
        let server = MockServer::start().await;
        let member = format!("{}/directoryObjects/user-1", server.uri());
        Mock::given(method("POST"))
            .and(path("/groups/group-1/members/$ref"))
            .and(body_json(json!({ "@odata.id": member })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/groups/group-1/members/user-1/$ref"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.add_group_member("group-1", "user-1").await.unwrap();
        client.remove_group_member("group-1", "user-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_license_assignment_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/user-1/assignLicense"))
            .and(body_json(json!({
                "addLicenses": [{ "skuId": "sku-1" }],
                "removeLicenses": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/user-1/assignLicense"))
            .and(body_json(json!({
                "addLicenses": [],
                "removeLicenses": ["sku-1"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.assign_license("user-1", "sku-1").await.unwrap();
        client.remove_license("user-1", "sku-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_find_license_sku_contains_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscribedSkus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "skuId": "sku-e1", "skuPartNumber": "STANDARDPACK" },
                    { "skuId": "sku-e3", "skuPartNumber": "ENTERPRISEPACK", "displayName": "Office 365 E3" }
                ]
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let sku = client.find_license_sku("ENTERPRISE").await.unwrap().unwrap();
        assert_eq!(sku.sku_id, "sku-e3");
        assert!(client.find_license_sku("E5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_account_by_upn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/jane.doe@contoso.com"))
            .and(query_param("$select", "id,userPrincipalName"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "userPrincipalName": "jane.doe@contoso.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/ghost@contoso.com"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "Request_ResourceNotFound", "message": "not found" }
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let account = client.get_account("jane.doe@contoso.com").await.unwrap();
        assert_eq!(account.map(|a| a.id).as_deref(), Some("user-1"));
        assert!(client.get_account("ghost@contoso.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disable_account_patches() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/user-1"))
            .and(body_json(json!({ "accountEnabled": false })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.disable_account("user-1").await.unwrap();
    }

    #[test]
    fn test_endpoint_keeps_version_segment() {
        let client = GraphClient::new(
            reqwest::Client::new(),
            "https://graph.microsoft.com/v1.0/",
            Arc::new(StaticToken("t")),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(&["groups", "g 1", "members", "$ref"]).as_str(),
            "https://graph.microsoft.com/v1.0/groups/g%201/members/$ref"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GraphClient::new(reqwest::Client::new(), "nope", Arc::new(StaticToken("t")))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Config(_)));
    }
}
