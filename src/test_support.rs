//! Test support utilities shared across unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::error::Stage;
use crate::keys::{CommandOutput, CommandRunner, KeyError, KeySource};
use crate::linode::{
    ApiError, ApiFuture, ComputeApi, ConfigHelpers, ConfigId, CreateInstanceRequest,
    InstanceConfig, InstanceConfigUpdate, InstanceId, Linode, LinodeStatus, StackScriptFilter,
    Stackscript,
};

/// Public key returned by [`StaticKey::default`].
pub const TEST_PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITEST test@linode-machine";

/// Builds an instance payload as the API would return it.
#[must_use]
pub fn linode(id: u64, status: &str, ipv4: &[Ipv4Addr]) -> Linode {
    Linode {
        id: InstanceId::new(id),
        label: format!("linode{id}"),
        region: String::from("us-east"),
        status: LinodeStatus::from(status),
        ipv4: ipv4.to_vec(),
    }
}

/// Builds a boot configuration with every helper disabled.
#[must_use]
pub fn boot_config(id: u64) -> InstanceConfig {
    InstanceConfig {
        id: ConfigId::new(id),
        label: String::from("My Ubuntu Profile"),
        kernel: String::from("linode/grub2"),
        helpers: ConfigHelpers::default(),
    }
}

/// Builds a catalog entry.
#[must_use]
pub fn stackscript(id: u64, owner: &str, label: &str) -> Stackscript {
    Stackscript {
        id,
        username: owner.to_owned(),
        label: label.to_owned(),
    }
}

/// API error carrying HTTP 404.
#[must_use]
pub fn not_found() -> ApiError {
    ApiError::Api {
        status: 404,
        message: String::from("Not found"),
    }
}

/// One call observed by [`ScriptedApi`], in invocation order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// `POST /linode/instances`
    CreateInstance(CreateInstanceRequest),
    /// `GET /linode/instances/{id}`
    GetInstance(InstanceId),
    /// `DELETE /linode/instances/{id}`
    DeleteInstance(InstanceId),
    /// `POST /linode/instances/{id}/boot`
    BootInstance(InstanceId, Option<ConfigId>),
    /// `POST /linode/instances/{id}/shutdown`
    ShutdownInstance(InstanceId),
    /// `POST /linode/instances/{id}/reboot`
    RebootInstance(InstanceId, Option<ConfigId>),
    /// `GET /linode/instances/{id}/configs`
    ListInstanceConfigs(InstanceId),
    /// `PUT /linode/instances/{id}/configs/{config_id}`
    UpdateInstanceConfig(InstanceId, ConfigId, InstanceConfigUpdate),
    /// `GET /linode/stackscripts`
    ListStackScripts(StackScriptFilter),
    /// `GET /linode/stackscripts/{id}`
    GetStackScript(u64),
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<ApiCall>,
    created: Option<Linode>,
    instances: VecDeque<Linode>,
    configs: Vec<InstanceConfig>,
    stackscripts: Vec<Stackscript>,
    failures: HashMap<Stage, ApiError>,
}

/// In-memory [`ComputeApi`] that replays scripted responses and records
/// every call.
///
/// Instance fetches pop from a queue; the last queued instance is sticky so
/// polling loops observe a stable final state. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct ScriptedApi {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedApi {
    /// Creates an API with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the payload returned by instance creation.
    pub fn set_created(&self, instance: Linode) {
        self.lock().created = Some(instance);
    }

    /// Payload returned by instance creation, if scripted.
    #[must_use]
    pub fn created(&self) -> Option<Linode> {
        self.lock().created.clone()
    }

    /// Queues a payload for the next instance fetch.
    pub fn push_instance(&self, instance: Linode) {
        self.lock().instances.push_back(instance);
    }

    /// Replaces the boot configurations of every instance.
    pub fn set_configs(&self, configs: Vec<InstanceConfig>) {
        self.lock().configs = configs;
    }

    /// Adds a catalog entry.
    pub fn add_stackscript(&self, script: Stackscript) {
        self.lock().stackscripts.push(script);
    }

    /// Makes every call belonging to `stage` fail with `error`.
    pub fn fail(&self, stage: Stage, error: ApiError) {
        self.lock().failures.insert(stage, error);
    }

    /// Returns a snapshot of every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Returns the boot configurations as last updated.
    #[must_use]
    pub fn configs(&self) -> Vec<InstanceConfig> {
        self.lock().configs.clone()
    }

    fn record(&self, call: ApiCall, stage: Stage) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        state.failures.get(&stage).cloned().map_or(Ok(()), Err)
    }

    fn next_instance(&self) -> Result<Linode, ApiError> {
        let mut state = self.lock();
        if state.instances.len() > 1 {
            return state.instances.pop_front().ok_or_else(not_found);
        }
        state.instances.front().cloned().ok_or_else(not_found)
    }
}

impl ComputeApi for ScriptedApi {
    fn create_instance<'a>(
        &'a self,
        request: &'a CreateInstanceRequest,
    ) -> ApiFuture<'a, Linode> {
        Box::pin(async move {
            self.record(ApiCall::CreateInstance(request.clone()), Stage::CreateInstance)?;
            self.lock().created.clone().ok_or_else(|| ApiError::Api {
                status: 400,
                message: String::from("no scripted create response"),
            })
        })
    }

    fn get_instance(&self, id: InstanceId) -> ApiFuture<'_, Linode> {
        Box::pin(async move {
            self.record(ApiCall::GetInstance(id), Stage::GetInstance)?;
            self.next_instance()
        })
    }

    fn delete_instance(&self, id: InstanceId) -> ApiFuture<'_, ()> {
        Box::pin(async move { self.record(ApiCall::DeleteInstance(id), Stage::Delete) })
    }

    fn boot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()> {
        Box::pin(async move { self.record(ApiCall::BootInstance(id, config), Stage::Boot) })
    }

    fn shutdown_instance(&self, id: InstanceId) -> ApiFuture<'_, ()> {
        Box::pin(async move { self.record(ApiCall::ShutdownInstance(id), Stage::Shutdown) })
    }

    fn reboot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()> {
        Box::pin(async move { self.record(ApiCall::RebootInstance(id, config), Stage::Reboot) })
    }

    fn list_instance_configs(&self, id: InstanceId) -> ApiFuture<'_, Vec<InstanceConfig>> {
        Box::pin(async move {
            self.record(ApiCall::ListInstanceConfigs(id), Stage::ListConfigs)?;
            Ok(self.configs())
        })
    }

    fn update_instance_config<'a>(
        &'a self,
        id: InstanceId,
        config: ConfigId,
        update: &'a InstanceConfigUpdate,
    ) -> ApiFuture<'a, InstanceConfig> {
        Box::pin(async move {
            self.record(
                ApiCall::UpdateInstanceConfig(id, config, update.clone()),
                Stage::UpdateConfig,
            )?;
            let mut state = self.lock();
            let stored = state
                .configs
                .iter_mut()
                .find(|candidate| candidate.id == config)
                .ok_or_else(not_found)?;
            if let Some(helpers) = &update.helpers {
                stored.helpers = helpers.clone();
            }
            if let Some(kernel) = &update.kernel {
                stored.kernel.clone_from(kernel);
            }
            Ok(stored.clone())
        })
    }

    fn list_stackscripts<'a>(
        &'a self,
        filter: &'a StackScriptFilter,
    ) -> ApiFuture<'a, Vec<Stackscript>> {
        Box::pin(async move {
            self.record(
                ApiCall::ListStackScripts(filter.clone()),
                Stage::ListStackScripts,
            )?;
            // Only the label filter is honoured, as on the real endpoint.
            Ok(self
                .lock()
                .stackscripts
                .iter()
                .filter(|script| script.label == filter.label)
                .cloned()
                .collect())
        })
    }

    fn get_stackscript(&self, id: u64) -> ApiFuture<'_, Stackscript> {
        Box::pin(async move {
            self.record(ApiCall::GetStackScript(id), Stage::GetStackScript)?;
            self.lock()
                .stackscripts
                .iter()
                .find(|script| script.id == id)
                .cloned()
                .ok_or_else(not_found)
        })
    }
}

/// [`KeySource`] returning a fixed outcome.
#[derive(Clone, Debug)]
pub struct StaticKey {
    outcome: Result<String, KeyError>,
}

impl StaticKey {
    /// Always returns `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            outcome: Ok(key.into()),
        }
    }

    /// Always fails with `error`.
    #[must_use]
    pub const fn failing(error: KeyError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

impl Default for StaticKey {
    fn default() -> Self {
        Self::new(TEST_PUBLIC_KEY)
    }
}

impl KeySource for StaticKey {
    fn public_key(&self) -> Result<String, KeyError> {
        self.outcome.clone()
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(CommandOutput {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            });
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, KeyError> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CommandInvocation {
                program: program.to_owned(),
                args: args.to_vec(),
            });
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| KeyError::Generate {
                message: format!("no scripted response available for {program}"),
            })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Applies each `(name, value)` pair while holding a global mutex: `Some`
    /// sets the variable and `None` removes it.
    pub async fn apply(pairs: &[(&str, Option<&str>)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in self.previous.iter().rev() {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
