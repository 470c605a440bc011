//! Azure Resource Manager transport.
//!
//! [`ArmApi`] is the seam between the provisioning protocol and the REST
//! calls it needs. [`HttpArmClient`] implements it with `reqwest` and a
//! service principal token; tests substitute an in-memory double.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::credentials::{AuthFile, CredentialsError, TokenSource};
use super::error::{ArmError, ErrorBody, INVALID_RESPONSE_CODE};
use super::identity::ContainerGroupId;
use super::model::{ContainerGroup, OperationStatus, ResourceGroup, STATE_SUCCEEDED};
use crate::provision::BackendFuture;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const RESOURCE_GROUP_API_VERSION: &str = "2019-05-01";
const CONTAINER_GROUP_API_VERSION: &str = "2018-10-01";
const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
const STATE_IN_PROGRESS: &str = "InProgress";

/// Future returned by [`ArmApi`] calls.
pub type ArmFuture<'a, T> = BackendFuture<'a, T, ArmError>;

/// Reply to a create-or-update or delete that ARM may finish asynchronously.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PendingOperation {
    /// Resource body returned with the reply, when there was one.
    pub resource: Option<ContainerGroup>,
    /// URL to poll for completion (`Azure-AsyncOperation`, else `Location`).
    pub status_url: Option<String>,
    /// Delay ARM asked for before the first poll.
    pub retry_after: Option<Duration>,
}

/// One observation of a long-running operation.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OperationPoll {
    /// Reported status and error details.
    pub status: OperationStatus,
    /// Delay ARM asked for before the next poll.
    pub retry_after: Option<Duration>,
}

/// Resource Manager calls used by the Azure provisioner.
pub trait ArmApi: Send + Sync {
    /// Subscription to use when the host does not name one.
    fn default_subscription(&self) -> Option<&str>;

    /// Reads a resource group.
    fn get_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
    ) -> ArmFuture<'a, ResourceGroup>;

    /// Creates or updates a resource group.
    fn put_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
        group: &'a ResourceGroup,
    ) -> ArmFuture<'a, ResourceGroup>;

    /// Submits a container group create-or-update.
    fn put_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
        group: &'a ContainerGroup,
    ) -> ArmFuture<'a, PendingOperation>;

    /// Reads a container group.
    fn get_container_group<'a>(&'a self, id: &'a ContainerGroupId)
    -> ArmFuture<'a, ContainerGroup>;

    /// Submits a container group deletion.
    fn delete_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
    ) -> ArmFuture<'a, PendingOperation>;

    /// Reads the status of a long-running operation.
    fn poll_operation<'a>(&'a self, status_url: &'a str) -> ArmFuture<'a, OperationPoll>;
}

struct ArmResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

/// Reply to an operation poll: a status document from `Azure-AsyncOperation`
/// or the resource itself from `Location`.
#[derive(Deserialize)]
struct OperationReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    properties: Option<ReplyProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

impl OperationReply {
    fn into_status(self) -> Option<OperationStatus> {
        let state = self
            .status
            .or_else(|| self.properties.and_then(|props| props.provisioning_state))
            .filter(|state| !state.trim().is_empty())?;
        Some(OperationStatus {
            status: state,
            error: self.error,
        })
    }
}

impl ArmResponse {
    fn invalid(&self, message: impl Into<String>) -> ArmError {
        ArmError {
            status: Some(self.status.as_u16()),
            code: INVALID_RESPONSE_CODE.to_owned(),
            message: message.into(),
        }
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, ArmError> {
        serde_json::from_slice(&self.body).map_err(|err| self.invalid(err.to_string()))
    }

    fn has_body(&self) -> bool {
        !self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Reads an operation poll reply.
    ///
    /// `202` means still running. An empty success reply means done. Any
    /// other reply must report a status or a provisioning state.
    fn operation_poll(&self) -> Result<OperationPoll, ArmError> {
        let status = if self.status == StatusCode::ACCEPTED {
            OperationStatus {
                status: String::from(STATE_IN_PROGRESS),
                error: None,
            }
        } else if self.has_body() {
            self.json::<OperationReply>()?
                .into_status()
                .ok_or_else(|| self.invalid("operation reply carries no status"))?
        } else {
            OperationStatus {
                status: STATE_SUCCEEDED.to_owned(),
                error: None,
            }
        };
        Ok(OperationPoll {
            status,
            retry_after: self.retry_after(),
        })
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    fn status_url(&self) -> Option<String> {
        self.header(ASYNC_OPERATION_HEADER)
            .or_else(|| self.header(LOCATION_HEADER))
    }
}

/// [`ArmApi`] over HTTPS, authorised once at construction.
pub struct HttpArmClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl HttpArmClient {
    /// Builds a client and acquires its first access token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Token`] when Azure AD rejects the service
    /// principal.
    pub async fn connect(auth: AuthFile) -> Result<Self, CredentialsError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let endpoint = auth
            .resource_manager_endpoint_url
            .trim_end_matches('/')
            .to_owned();
        let tokens = TokenSource::connect(http.clone(), auth).await?;
        Ok(Self {
            http,
            endpoint,
            tokens,
        })
    }

    fn resource_group_url(&self, subscription_id: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{subscription_id}/resourcegroups/{name}?api-version={RESOURCE_GROUP_API_VERSION}",
            self.endpoint
        )
    }

    fn container_group_url(&self, id: &ContainerGroupId) -> String {
        format!(
            "{}{id}?api-version={CONTAINER_GROUP_API_VERSION}",
            self.endpoint
        )
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<ArmResponse, ArmError> {
        let bearer = self.tokens.bearer().await?;
        let request_id = Uuid::new_v4();
        debug!(%method, url, %request_id, "ARM request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(bearer)
            .header(CLIENT_REQUEST_ID_HEADER, request_id.to_string());
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ArmError::transport(err.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ArmError::transport(err.to_string()))?;
        if !status.is_success() {
            let error = ArmError::from_response(status.as_u16(), &bytes);
            warn!(%request_id, status = status.as_u16(), code = %error.code, "ARM request failed");
            return Err(error);
        }
        Ok(ArmResponse {
            status,
            headers,
            body: bytes.to_vec(),
        })
    }

    fn pending(response: &ArmResponse) -> Result<PendingOperation, ArmError> {
        let resource = if response.has_body() {
            Some(response.json::<ContainerGroup>()?)
        } else {
            None
        };
        Ok(PendingOperation {
            resource,
            status_url: response.status_url(),
            retry_after: response.retry_after(),
        })
    }
}

impl ArmApi for HttpArmClient {
    fn default_subscription(&self) -> Option<&str> {
        Some(self.tokens.auth().subscription_id.as_str()).filter(|id| !id.is_empty())
    }

    fn get_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
    ) -> ArmFuture<'a, ResourceGroup> {
        Box::pin(async move {
            let url = self.resource_group_url(subscription_id, name);
            self.send::<()>(Method::GET, &url, None).await?.json()
        })
    }

    fn put_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
        group: &'a ResourceGroup,
    ) -> ArmFuture<'a, ResourceGroup> {
        Box::pin(async move {
            let url = self.resource_group_url(subscription_id, name);
            self.send(Method::PUT, &url, Some(group)).await?.json()
        })
    }

    fn put_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
        group: &'a ContainerGroup,
    ) -> ArmFuture<'a, PendingOperation> {
        Box::pin(async move {
            let url = self.container_group_url(id);
            let response = self.send(Method::PUT, &url, Some(group)).await?;
            Self::pending(&response)
        })
    }

    fn get_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
    ) -> ArmFuture<'a, ContainerGroup> {
        Box::pin(async move {
            let url = self.container_group_url(id);
            self.send::<()>(Method::GET, &url, None).await?.json()
        })
    }

    fn delete_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
    ) -> ArmFuture<'a, PendingOperation> {
        Box::pin(async move {
            let url = self.container_group_url(id);
            let response = self.send::<()>(Method::DELETE, &url, None).await?;
            Ok(PendingOperation {
                resource: None,
                status_url: response.status_url(),
                retry_after: response.retry_after(),
            })
        })
    }

    fn poll_operation<'a>(&'a self, status_url: &'a str) -> ArmFuture<'a, OperationPoll> {
        Box::pin(async move {
            self.send::<()>(Method::GET, status_url, None)
                .await?
                .operation_poll()
        })
    }
}
