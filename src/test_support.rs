//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::azure::error::ErrorBody;
use crate::azure::model::{
    ContainerGroup, IpAddress, OperationStatus, ResourceGroup, ResourceGroupProperties,
    STATE_SUCCEEDED,
};
use crate::azure::{
    ArmApi, ArmError, ArmFuture, ContainerGroupId, OperationPoll, PendingOperation,
};

/// Address the fake assigns to container groups unless told otherwise.
pub const FAKE_IP: &str = "20.50.100.7";
/// Subscription the fake reports as the credentials default.
pub const FAKE_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
/// Operation URL handed out when asynchronous replies are enabled.
pub const FAKE_OPERATION_URL: &str = "https://management.example/operations/op-1";

/// ARM operations, used to target scripted failures and count calls.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ArmOp {
    /// `GET` resource group.
    GetResourceGroup,
    /// `PUT` resource group.
    PutResourceGroup,
    /// `PUT` container group.
    PutContainerGroup,
    /// `GET` container group.
    GetContainerGroup,
    /// `DELETE` container group.
    DeleteContainerGroup,
    /// `GET` on an operation status URL.
    PollOperation,
}

/// Records a single request made through [`FakeArm`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArmCall {
    /// Resource group lookup.
    GetResourceGroup {
        /// Subscription addressed.
        subscription_id: String,
        /// Resource group name.
        name: String,
    },
    /// Resource group create-or-update with the submitted body.
    PutResourceGroup {
        /// Subscription addressed.
        subscription_id: String,
        /// Resource group name.
        name: String,
        /// Submitted body.
        body: ResourceGroup,
    },
    /// Container group create-or-update with the submitted body.
    PutContainerGroup {
        /// Container group id.
        id: String,
        /// Submitted body.
        body: ContainerGroup,
    },
    /// Container group lookup.
    GetContainerGroup {
        /// Container group id.
        id: String,
    },
    /// Container group deletion.
    DeleteContainerGroup {
        /// Container group id.
        id: String,
    },
    /// Operation status poll.
    PollOperation {
        /// Polled URL.
        url: String,
    },
}

impl ArmCall {
    /// Operation this call performed.
    #[must_use]
    pub const fn op(&self) -> ArmOp {
        match self {
            Self::GetResourceGroup { .. } => ArmOp::GetResourceGroup,
            Self::PutResourceGroup { .. } => ArmOp::PutResourceGroup,
            Self::PutContainerGroup { .. } => ArmOp::PutContainerGroup,
            Self::GetContainerGroup { .. } => ArmOp::GetContainerGroup,
            Self::DeleteContainerGroup { .. } => ArmOp::DeleteContainerGroup,
            Self::PollOperation { .. } => ArmOp::PollOperation,
        }
    }
}

#[derive(Debug)]
struct FakeState {
    resource_groups: BTreeMap<(String, String), ResourceGroup>,
    container_groups: BTreeMap<String, ContainerGroup>,
    calls: Vec<ArmCall>,
    failures: BTreeMap<ArmOp, VecDeque<ArmError>>,
    stalled: Vec<ArmOp>,
    resource_group_state: Option<String>,
    created_state: String,
    created_ip: String,
    async_reply: Option<Option<Duration>>,
    container_states: VecDeque<(String, String)>,
    operations: VecDeque<OperationPoll>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            resource_groups: BTreeMap::new(),
            container_groups: BTreeMap::new(),
            calls: Vec::new(),
            failures: BTreeMap::new(),
            stalled: Vec::new(),
            resource_group_state: Some(STATE_SUCCEEDED.to_owned()),
            created_state: STATE_SUCCEEDED.to_owned(),
            created_ip: FAKE_IP.to_owned(),
            async_reply: None,
            container_states: VecDeque::new(),
            operations: VecDeque::new(),
        }
    }
}

/// In-memory Azure Resource Manager that records every request.
///
/// Clones share state, so a test can keep a handle after moving the fake
/// into a provisioner. By default every write succeeds synchronously and
/// container groups come back `Succeeded` with [`FAKE_IP`].
#[derive(Clone, Debug)]
pub struct FakeArm {
    state: Arc<Mutex<FakeState>>,
    default_subscription: Option<String>,
}

impl Default for FakeArm {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            default_subscription: Some(FAKE_SUBSCRIPTION.to_owned()),
        }
    }
}

fn not_found(code: &str, what: &str) -> ArmError {
    ArmError {
        status: Some(404),
        code: code.to_owned(),
        message: format!("{what} was not found"),
    }
}

impl FakeArm {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call`, then returns a scripted failure for it if one is queued.
    fn enter(&self, call: ArmCall) -> Result<bool, ArmError> {
        let op = call.op();
        let mut state = self.lock();
        state.calls.push(call);
        if let Some(error) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        Ok(state.stalled.contains(&op))
    }

    /// Replaces the subscription reported as the credentials default.
    #[must_use]
    pub fn with_default_subscription(mut self, subscription: Option<&str>) -> Self {
        self.default_subscription = subscription.map(str::to_owned);
        self
    }

    /// Makes the next request of `op` fail with `error`.
    pub fn fail_next(&self, op: ArmOp, error: ArmError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Makes every request of `op` hang until the caller gives up.
    pub fn stall(&self, op: ArmOp) {
        self.lock().stalled.push(op);
    }

    /// Seeds an existing resource group.
    pub fn seed_resource_group(&self, subscription_id: &str, group: ResourceGroup) {
        let name = group.name.clone().unwrap_or_default();
        self.lock()
            .resource_groups
            .insert((subscription_id.to_owned(), name), group);
    }

    /// Seeds an existing container group under its id.
    pub fn seed_container_group(&self, id: &ContainerGroupId, mut group: ContainerGroup) {
        group.id = Some(id.to_string());
        group.name = Some(id.name().to_owned());
        self.lock().container_groups.insert(id.to_string(), group);
    }

    /// State the resource group `PUT` reply reports (`None` omits it).
    pub fn set_resource_group_state(&self, state: Option<&str>) {
        self.lock().resource_group_state = state.map(str::to_owned);
    }

    /// State and address given to container groups when they are created.
    pub fn set_created_state(&self, state: &str, ip: &str) {
        let mut guard = self.lock();
        state.clone_into(&mut guard.created_state);
        ip.clone_into(&mut guard.created_ip);
    }

    /// Makes writes answer with [`FAKE_OPERATION_URL`] and `retry_after`.
    pub fn respond_async(&self, retry_after: Option<Duration>) {
        self.lock().async_reply = Some(retry_after);
    }

    /// Queues a state and address applied on the next container group read.
    pub fn push_container_state(&self, state: &str, ip: &str) {
        self.lock()
            .container_states
            .push_back((state.to_owned(), ip.to_owned()));
    }

    /// Queues an operation status for the next poll.
    pub fn push_operation(
        &self,
        status: &str,
        error: Option<(&str, &str)>,
        retry_after: Option<Duration>,
    ) {
        self.lock().operations.push_back(OperationPoll {
            status: OperationStatus {
                status: status.to_owned(),
                error: error.map(|(code, message)| ErrorBody {
                    code: code.to_owned(),
                    message: message.to_owned(),
                }),
            },
            retry_after,
        });
    }

    /// Snapshot of every request recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ArmCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded requests of `op`.
    #[must_use]
    pub fn count(&self, op: ArmOp) -> usize {
        self.lock().calls.iter().filter(|call| call.op() == op).count()
    }

    /// Number of stored resource groups.
    #[must_use]
    pub fn resource_group_count(&self) -> usize {
        self.lock().resource_groups.len()
    }

    /// Stored container group, if any.
    #[must_use]
    pub fn container_group(&self, id: &ContainerGroupId) -> Option<ContainerGroup> {
        self.lock().container_groups.get(&id.to_string()).cloned()
    }

    fn pending(&self, resource: Option<ContainerGroup>) -> PendingOperation {
        let reply = self.lock().async_reply;
        PendingOperation {
            resource,
            status_url: reply.map(|_| FAKE_OPERATION_URL.to_owned()),
            retry_after: reply.flatten(),
        }
    }
}

async fn maybe_stall(stalled: bool) {
    if stalled {
        std::future::pending::<()>().await;
    }
}

impl ArmApi for FakeArm {
    fn default_subscription(&self) -> Option<&str> {
        self.default_subscription.as_deref()
    }

    fn get_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
    ) -> ArmFuture<'a, ResourceGroup> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::GetResourceGroup {
                subscription_id: subscription_id.to_owned(),
                name: name.to_owned(),
            })?;
            maybe_stall(stalled).await;
            self.lock()
                .resource_groups
                .get(&(subscription_id.to_owned(), name.to_owned()))
                .cloned()
                .ok_or_else(|| not_found("ResourceGroupNotFound", name))
        })
    }

    fn put_resource_group<'a>(
        &'a self,
        subscription_id: &'a str,
        name: &'a str,
        group: &'a ResourceGroup,
    ) -> ArmFuture<'a, ResourceGroup> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::PutResourceGroup {
                subscription_id: subscription_id.to_owned(),
                name: name.to_owned(),
                body: group.clone(),
            })?;
            maybe_stall(stalled).await;
            let mut state = self.lock();
            let mut stored = group.clone();
            stored.id = Some(format!("/subscriptions/{subscription_id}/resourceGroups/{name}"));
            stored.name = Some(name.to_owned());
            stored.properties = Some(ResourceGroupProperties {
                provisioning_state: state.resource_group_state.clone(),
            });
            state
                .resource_groups
                .insert((subscription_id.to_owned(), name.to_owned()), stored.clone());
            Ok(stored)
        })
    }

    fn put_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
        group: &'a ContainerGroup,
    ) -> ArmFuture<'a, PendingOperation> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::PutContainerGroup {
                id: id.to_string(),
                body: group.clone(),
            })?;
            maybe_stall(stalled).await;
            let stored = {
                let mut state = self.lock();
                let mut stored = group.clone();
                stored.id = Some(id.to_string());
                stored.name = Some(id.name().to_owned());
                stored.properties.provisioning_state = Some(state.created_state.clone());
                let address = stored
                    .properties
                    .ip_address
                    .get_or_insert_with(IpAddress::default);
                address.ip = Some(state.created_ip.clone()).filter(|ip| !ip.is_empty());
                state.container_groups.insert(id.to_string(), stored.clone());
                stored
            };
            Ok(self.pending(Some(stored)))
        })
    }

    fn get_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
    ) -> ArmFuture<'a, ContainerGroup> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::GetContainerGroup { id: id.to_string() })?;
            maybe_stall(stalled).await;
            let mut state = self.lock();
            let scripted = state.container_states.pop_front();
            let group = state
                .container_groups
                .get_mut(&id.to_string())
                .ok_or_else(|| not_found("ResourceNotFound", id.name()))?;
            if let Some((provisioning_state, ip)) = scripted {
                group.properties.provisioning_state = Some(provisioning_state);
                group
                    .properties
                    .ip_address
                    .get_or_insert_with(IpAddress::default)
                    .ip = Some(ip).filter(|ip| !ip.is_empty());
            }
            Ok(group.clone())
        })
    }

    fn delete_container_group<'a>(
        &'a self,
        id: &'a ContainerGroupId,
    ) -> ArmFuture<'a, PendingOperation> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::DeleteContainerGroup { id: id.to_string() })?;
            maybe_stall(stalled).await;
            let removed = self.lock().container_groups.remove(&id.to_string());
            if removed.is_none() {
                return Err(not_found("ResourceNotFound", id.name()));
            }
            Ok(self.pending(None))
        })
    }

    fn poll_operation<'a>(&'a self, status_url: &'a str) -> ArmFuture<'a, OperationPoll> {
        Box::pin(async move {
            let stalled = self.enter(ArmCall::PollOperation {
                url: status_url.to_owned(),
            })?;
            maybe_stall(stalled).await;
            Ok(self.lock().operations.pop_front().unwrap_or_else(|| OperationPoll {
                status: OperationStatus {
                    status: STATE_SUCCEEDED.to_owned(),
                    error: None,
                },
                retry_after: None,
            }))
        })
    }
}
