//! Discovers feature modules and keeps the registry in step with them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::builtin::CoreModule;
use super::module::{CommandHandler, FeatureModule, ModuleContext, ModuleDescriptor, ModuleSource};
use super::registry::CORE_MODULE;

/// Live modules in attach order.
pub type SharedModules = Arc<RwLock<Vec<LiveModule>>>;

/// A loaded module as seen by the dispatcher.
#[derive(Clone)]
pub struct LiveModule {
    pub id: String,
    /// Source the module was built from; `None` for the core module.
    pub source: Option<&'static str>,
    pub commands: Vec<String>,
    pub module: Arc<dyn FeatureModule>,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl LiveModule {
    fn build(
        module: Arc<dyn FeatureModule>,
        descriptor: &ModuleDescriptor,
        source: Option<&'static str>,
        ctx: &ModuleContext,
    ) -> Self {
        let id = descriptor
            .name
            .clone()
            .or_else(|| source.map(str::to_string))
            .unwrap_or_default();
        let handler = module.clone().handler().resolve(ctx);
        Self {
            id,
            source,
            commands: descriptor.commands.clone(),
            module,
            handler,
        }
    }
}

/// Summary of a [`ModuleLoader::load_all`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct ModuleLoader {
    ctx: ModuleContext,
    sources: Vec<ModuleSource>,
    modules: SharedModules,
    attached: AtomicBool,
}

impl ModuleLoader {
    /// Creates a loader whose live set starts with the core module.
    pub fn new(ctx: ModuleContext, sources: Vec<ModuleSource>) -> Self {
        let core: Arc<dyn FeatureModule> = Arc::new(CoreModule);
        let descriptor = ModuleDescriptor {
            name: Some(CORE_MODULE.to_string()),
            ..core.describe().unwrap_or_default()
        };
        let live = LiveModule::build(core, &descriptor, None, &ctx);

        Self {
            ctx,
            sources,
            modules: Arc::new(RwLock::new(vec![live])),
            attached: AtomicBool::new(false),
        }
    }

    pub fn modules(&self) -> SharedModules {
        self.modules.clone()
    }

    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    /// Loads every source from scratch. A module that fails to build or
    /// describe itself, or declares a malformed batch, is skipped.
    pub async fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();
        let mut registry = self.ctx.registry.write().await;
        let mut modules = self.modules.write().await;

        for stale in modules.iter().filter(|m| m.source.is_some()) {
            registry.unregister_module(&stale.id);
        }
        modules.retain(|m| m.source.is_none());

        for source in &self.sources {
            let (module, descriptor) = match instantiate(source) {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!(source = source.id, error = %e, "Failed to load module");
                    report.failed.push(source.id.to_string());
                    continue;
                }
            };
            let live = LiveModule::build(module, &descriptor, Some(source.id), &self.ctx);

            if modules.iter().any(|m| m.id == live.id) {
                error!(source = source.id, module = %live.id, "Duplicate module id, skipping");
                report.failed.push(source.id.to_string());
                continue;
            }

            if let Some(defs) = descriptor.slash_commands {
                if registry.register_batch(&live.id, defs).is_err() {
                    report.failed.push(source.id.to_string());
                    continue;
                }
            }

            debug!(module = %live.id, commands = ?live.commands, "Loaded module");
            report.loaded.push(live.id.clone());
            modules.push(live);
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            commands = registry.len(),
            "Modules loaded"
        );

        if self.attached.load(Ordering::Acquire) {
            let fresh: Vec<LiveModule> = modules
                .iter()
                .filter(|m| m.source.is_some())
                .cloned()
                .collect();
            drop(modules);
            drop(registry);
            self.attach(&fresh).await;
        }
        report
    }

    /// Rebuilds one module from its source and swaps its commands.
    ///
    /// Returns whether the module exposed a usable command list. Unknown ids
    /// and modules failing to build leave everything untouched.
    pub async fn reload_one(&self, id: &str) -> bool {
        let source = {
            let modules = self.modules.read().await;
            let known = modules
                .iter()
                .find(|m| m.id == id)
                .and_then(|m| m.source);
            self.sources
                .iter()
                .find(|s| Some(s.id) == known || s.id == id)
                .copied()
        };
        let Some(source) = source else {
            warn!(module = id, "No source found for module");
            return false;
        };

        let (module, descriptor) = match instantiate(&source) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(module = id, error = %e, "Failed to reload module");
                return false;
            }
        };
        let live = LiveModule::build(module, &descriptor, Some(source.id), &self.ctx);

        let mut registry = self.ctx.registry.write().await;
        let mut modules = self.modules.write().await;
        let position = modules.iter().position(|m| m.source == Some(source.id));

        if modules
            .iter()
            .any(|m| m.id == live.id && m.source != Some(source.id))
        {
            error!(source = source.id, module = %live.id, "Duplicate module id, not reloading");
            return false;
        }

        // The new build may declare a different name than the running one.
        let previous = position.map(|i| modules[i].id.clone());
        let renamed = previous.as_deref().filter(|p| *p != live.id);
        let stash = renamed.and_then(|p| registry.module(p).cloned());
        if let Some(p) = renamed {
            registry.unregister_module(p);
        }

        let usable = match descriptor.slash_commands {
            Some(defs) => match registry.register_batch(&live.id, defs) {
                Ok(()) => true,
                Err(_) => {
                    if let Some(record) = stash {
                        if let Err(e) = registry.register_batch(&record.id, record.commands) {
                            error!(module = %record.id, error = %e, "Failed to restore commands");
                        }
                    }
                    return false;
                }
            },
            None => {
                registry.unregister_module(&live.id);
                false
            }
        };

        let attach = self.attached.load(Ordering::Acquire).then(|| live.module.clone());
        match position {
            Some(i) => modules[i] = live,
            None => modules.push(live),
        }
        drop(modules);
        drop(registry);

        if let Some(module) = attach {
            if let Err(e) = module.attach(&self.ctx).await {
                error!(module = id, error = %e, "Failed to attach reloaded module");
            }
        }

        info!(module = id, usable, "Module reloaded");
        usable
    }

    /// Attaches every live module to the running bot.
    pub async fn attach_all(&self) {
        let modules: Vec<LiveModule> = self.modules.read().await.clone();
        self.attach(&modules).await;
        self.attached.store(true, Ordering::Release);
    }

    async fn attach(&self, modules: &[LiveModule]) {
        let results =
            futures::future::join_all(modules.iter().map(|m| m.module.attach(&self.ctx))).await;

        for (live, result) in modules.iter().zip(results) {
            if let Err(e) = result {
                error!(module = %live.id, error = %e, "Failed to attach module");
            }
        }
    }
}

fn instantiate(
    source: &ModuleSource,
) -> Result<(Arc<dyn FeatureModule>, ModuleDescriptor), crate::Error> {
    let module = (source.factory)()?;
    let descriptor = module.describe()?;
    Ok((module, descriptor))
}
