//! The translation pipeline.
//!
//! One run compiles the root definition and, depth first, every collaborator
//! below it. Each agent goes through tool synthesis, gateway compilation,
//! collaborator compilation, prompt and memory compilation and finally module
//! assembly. Modules are collected in post-order so a collaborator's module
//! always precedes the module importing it. Nothing touches the filesystem
//! until [`TranslationOutput::write`] is called on a finished run.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::collab::{CollaboratorLink, definition_values};
use crate::emit::{OutputFile, render_env_file, write_files};
use crate::error::{Result, TranslateError};
use crate::gateway::{self, credential_env_key};
use crate::memory::{MEMORY_MANAGER_FILE, MEMORY_MANAGER_SOURCE, ManagedMemoryStrategy, MemoryVariant};
use crate::model::{AgentDefinition, EnabledPrimitives, clean_variable_name};
use crate::modelmap::{ModelMap, load_default, resolve_model};
use crate::profile::module::builtin_tools;
use crate::profile::{GatewayBinding, ModulePlan, Profile, ProfileBackend, render_module};
use crate::prompts::{FeatureSet, FixtureTable, PromptCompiler};
use crate::provision::{PLAN_FILE, PlanProvisioner, Provisioner};
use crate::schema::TypeRegistry;
use crate::tools::ToolSynthesizer;

pub const ENV_FILE: &str = ".env";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub profile: Profile,
    pub fixtures: FixtureTable,
    pub providers: ModelMap,
    /// Overrides the root definition's gateway primitive.
    pub gateway: Option<bool>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            fixtures: FixtureTable::built_in(),
            providers: load_default(),
            gateway: None,
        }
    }
}

/// Files of a finished run, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationOutput {
    pub files: Vec<OutputFile>,
    /// Entries of the environment file.
    pub env: Vec<(String, String)>,
}

impl TranslationOutput {
    pub fn file(&self, path: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub async fn write(&self, dir: &Path) -> Result<()> {
        write_files(dir, &self.files).await
    }
}

pub struct Translator {
    options: TranslateOptions,
    /// External provisioner; `None` records a plan instead.
    provisioner: Option<Arc<dyn Provisioner>>,
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self {
            options,
            provisioner: None,
        }
    }

    pub fn with_provisioner(options: TranslateOptions, provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            options,
            provisioner: Some(provisioner),
        }
    }

    pub async fn translate(&self, definition: &AgentDefinition) -> Result<TranslationOutput> {
        let span = info_span!("translate", run_id = %Uuid::new_v4(), agent = %definition.name);
        self.run(definition).instrument(span).await
    }

    async fn run(&self, definition: &AgentDefinition) -> Result<TranslationOutput> {
        let plan = PlanProvisioner::new();
        let provisioner: &dyn Provisioner = match &self.provisioner {
            Some(p) => p.as_ref(),
            None => &plan,
        };
        let mut primitives = definition.primitives;
        if let Some(gateway) = self.options.gateway {
            primitives.gateway = gateway;
        }
        let backend = self.options.profile.backend();
        info!(
            "translating '{}' for {} (gateway: {}, managed memory: {})",
            definition.name, self.options.profile, primitives.gateway, primitives.memory
        );

        let mut run = Run {
            backend,
            options: &self.options,
            provisioner,
            primitives,
            module_names: HashMap::new(),
            files: Vec::new(),
            env: Vec::new(),
            self_contained_memory: false,
        };
        let root_module = run.module_name(format!(
            "{}_{}",
            backend.platform(),
            clean_variable_name(&definition.name)
        ));
        run.compile(definition, root_module, &[]).await?;

        let mut files = std::mem::take(&mut run.files);
        files.push(OutputFile::new(ENV_FILE, render_env_file(&run.env)));
        files.push(OutputFile::new(REQUIREMENTS_FILE, backend.requirements()));
        if run.self_contained_memory {
            files.push(OutputFile::new(MEMORY_MANAGER_FILE, MEMORY_MANAGER_SOURCE));
        }
        if self.provisioner.is_none() {
            files.push(OutputFile::new(PLAN_FILE, plan.plan_json().await?));
        }
        info!("translation produced {} file(s)", files.len());
        Ok(TranslationOutput { files, env: run.env })
    }
}

/// What a parent needs from a compiled collaborator.
struct CompiledAgent {
    binds_coordinator: bool,
}

type CompileFuture<'a> = Pin<Box<dyn Future<Output = Result<CompiledAgent>> + 'a>>;

struct Run<'t> {
    backend: &'static dyn ProfileBackend,
    options: &'t TranslateOptions,
    provisioner: &'t dyn Provisioner,
    primitives: EnabledPrimitives,
    module_names: HashMap<String, usize>,
    files: Vec<OutputFile>,
    env: Vec<(String, String)>,
    self_contained_memory: bool,
}

fn provisioning(what: String) -> impl FnOnce(anyhow::Error) -> TranslateError {
    move |source| TranslateError::Provisioning { what, source }
}

impl<'t> Run<'t> {
    /// `base`, or `base_N` when the name was already taken in this run.
    fn module_name(&mut self, base: String) -> String {
        let seen = self.module_names.entry(base.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            base
        } else {
            let name = format!("{base}_{seen}");
            debug!("module name {base} taken, using {name}");
            name
        }
    }

    fn compile<'a>(
        &'a mut self,
        agent: &'a AgentDefinition,
        module_name: String,
        ancestors: &'a [String],
    ) -> CompileFuture<'a> {
        Box::pin(async move {
            let mut chain = ancestors.to_vec();
            chain.push(agent.identity().to_string());
            if ancestors.iter().any(|a| a == agent.identity()) {
                return Err(TranslateError::CyclicCollaboration { chain });
            }
            let is_root = ancestors.is_empty();
            let backend = self.backend;
            let gateway_on = self.primitives.gateway;

            let mut registry = TypeRegistry::new();
            let groups = ToolSynthesizer::new(&mut registry, gateway_on).synthesize(agent.custom_action_groups());

            let mut gateway_binding = None;
            if gateway_on && let Some(plan) = gateway::compile(agent, &groups) {
                let handle = self
                    .provisioner
                    .provision_gateway(&agent.name, &agent.region)
                    .await
                    .map_err(provisioning(format!("gateway for '{}'", agent.name)))?;
                let function_ref = self
                    .provisioner
                    .provision_dispatch_endpoint(&plan.dispatch)
                    .await
                    .map_err(provisioning(format!("dispatch function {}", plan.dispatch.name)))?;
                for target in &plan.targets {
                    self.provisioner
                        .provision_gateway_target(&handle, target, &function_ref)
                        .await
                        .map_err(provisioning(format!("gateway target {}", target.name)))?;
                }
                let env_prefix = if is_root {
                    String::new()
                } else {
                    format!("{module_name}_")
                };
                for (key, value) in &handle.credentials {
                    self.env.push((credential_env_key(&env_prefix, key), value.clone()));
                }
                self.files
                    .push(OutputFile::new(plan.dispatch.file_name(), plan.dispatch.source.clone()));
                gateway_binding = Some(GatewayBinding {
                    url: handle.url,
                    region: handle.region,
                    env_prefix,
                });
            }

            let mut links: Vec<CollaboratorLink> = Vec::new();
            if agent.collaboration_enabled() {
                for collaborator in &agent.collaborators {
                    let module = self.module_name(format!(
                        "{}_collaborator_{}",
                        backend.platform(),
                        clean_variable_name(&collaborator.name)
                    ));
                    let compiled = self.compile(&collaborator.agent, module.clone(), &chain).await?;
                    links.push(CollaboratorLink::new(collaborator, module, compiled.binds_coordinator));
                }
            }

            let memory = if !agent.memory_enabled() {
                MemoryVariant::Disabled
            } else if self.primitives.memory {
                let memory_id = self
                    .provisioner
                    .provision_managed_memory(
                        &agent.name,
                        &ManagedMemoryStrategy::session_summarizer(),
                        &agent.region,
                    )
                    .await
                    .map_err(provisioning(format!("memory for '{}'", agent.name)))?;
                MemoryVariant::Managed {
                    memory_id,
                    region: agent.region.clone(),
                }
            } else {
                self.self_contained_memory = true;
                MemoryVariant::self_contained(agent, &module_name)
            };

            let mut tool_names: Vec<String> = groups
                .iter()
                .flat_map(|g| g.tools.iter().map(|t| t.name.clone()))
                .collect();
            tool_names.extend(builtin_tools(backend, agent));
            let values = definition_values(agent, &links, &tool_names);
            let prompts =
                PromptCompiler::new(&self.options.fixtures, FeatureSet::of(agent), &values).compile(agent)?;

            let plan = ModulePlan {
                agent,
                module_name: module_name.clone(),
                model: resolve_model(agent, &self.options.providers),
                is_root,
                accepts_relay: !is_root,
                types: registry.types().to_vec(),
                local_groups: groups.into_iter().filter(|g| !g.is_proxied(gateway_on)).collect(),
                gateway: gateway_binding,
                prompts,
                memory,
                collaborators: links,
                primitives: self.primitives,
            };
            let source = render_module(backend, &plan);
            info!(
                "compiled {} ({} types, {} prompts, {} collaborators)",
                module_name,
                plan.types.len(),
                plan.prompts.len(),
                plan.collaborators.len()
            );
            self.files.push(OutputFile::new(format!("{module_name}.py"), source));
            Ok(CompiledAgent {
                binds_coordinator: plan.binds_coordinator(),
            })
        })
    }
}
