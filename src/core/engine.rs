//! Engine wiring: builds one output slot and one producer per activated
//! module, then runs every producer as its own task next to the aggregator.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    io::AsyncWrite,
    task::{Id, JoinSet},
};
use tracing::{debug, info, warn};

use super::{
    aggregator::Aggregator,
    error::{EngineError, EngineResult},
    modules::{catalog::Modules, traits::Module, ModuleHandle, ModuleResult},
    registry::ModuleRegistry,
    signal::{update_channel, UpdateListener, UpdateSignal},
};
use crate::config::status::StatusConfig;

/// Assembles an [`Engine`] module by module, in output order.
pub struct EngineBuilder {
    registry: ModuleRegistry,
    producers: Vec<(ModuleHandle, Box<dyn Module>)>,
    signal: UpdateSignal,
    listener: UpdateListener,
    debounce: Duration,
}

impl EngineBuilder {
    pub fn new(debounce: Duration) -> Self {
        let (signal, listener) = update_channel();
        Self {
            registry: ModuleRegistry::new(),
            producers: Vec::new(),
            signal,
            listener,
            debounce,
        }
    }

    /// Registers a hidden slot named `name` and pairs it with `module`.
    ///
    /// # Errors
    ///
    /// `EngineError::DuplicateModule` if `name` was already added.
    pub fn add(
        &mut self,
        name: &str,
        capacity: usize,
        module: Box<dyn Module>,
    ) -> EngineResult<&mut Self> {
        let slot = self.registry.register(name, capacity)?;
        let handle = ModuleHandle::new(slot, self.signal.clone());
        self.producers.push((handle, module));
        Ok(self)
    }

    /// # Errors
    ///
    /// `EngineError::NoModules` if nothing was added.
    pub fn build(self) -> EngineResult<Engine> {
        if self.producers.is_empty() {
            return Err(EngineError::NoModules(Modules::list().join(", ")));
        }

        Ok(Engine {
            registry: Arc::new(self.registry),
            producers: self.producers,
            signal: self.signal,
            listener: self.listener,
            debounce: self.debounce,
        })
    }
}

/// A fully wired status line: registry, producers and the update channel.
pub struct Engine {
    registry: Arc<ModuleRegistry>,
    producers: Vec<(ModuleHandle, Box<dyn Module>)>,
    // Held for the whole run so the aggregator keeps serving the last frame
    // after every producer has finished.
    signal: UpdateSignal,
    listener: UpdateListener,
    debounce: Duration,
}

impl Engine {
    /// Builds every module listed in `config`, in order, through the global
    /// catalog.
    ///
    /// # Errors
    ///
    /// `EngineError::Module` when a name is unknown or a factory rejects its
    /// options, `EngineError::DuplicateModule` and `EngineError::NoModules`
    /// as for [`EngineBuilder`].
    pub fn from_config(config: &StatusConfig) -> EngineResult<Self> {
        let mut builder = EngineBuilder::new(config.debounce());

        for module_config in &config.modules {
            let module =
                Modules::build(module_config).map_err(|source| EngineError::Module {
                    name: module_config.name.clone(),
                    source,
                })?;
            builder.add(&module_config.name, module_config.capacity(), module)?;
            debug!("Module '{}' built", module_config.name);
        }

        builder.build()
    }

    /// Slot names in output order.
    pub fn module_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Spawns every producer and runs the aggregator on `out`.
    ///
    /// Only returns on failure: the first structural module failure, a
    /// panicked module task, or an output error.
    pub async fn run<W>(self, out: W) -> EngineResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let Engine {
            registry,
            producers,
            signal,
            listener,
            debounce,
        } = self;

        let mut tasks: JoinSet<(String, ModuleResult<()>)> = JoinSet::new();
        let mut names: HashMap<Id, String> = HashMap::with_capacity(producers.len());

        for (handle, mut module) in producers {
            let name = handle.name().to_string();
            let task_name = name.clone();
            let abort = tasks.spawn(async move {
                let result = module.run(handle).await;
                (task_name, result)
            });
            names.insert(abort.id(), name);
        }
        info!("Spawned {} module tasks", tasks.len());

        let aggregator = Aggregator::new(registry, listener, out, debounce).run();
        tokio::pin!(aggregator);

        let result = loop {
            tokio::select! {
                result = &mut aggregator => break result,
                joined = tasks.join_next(), if !tasks.is_empty() => match joined {
                    Some(Ok((name, Ok(())))) => info!("Module '{}' finished", name),
                    Some(Ok((name, Err(source)))) => {
                        break Err(EngineError::Module { name, source });
                    }
                    Some(Err(e)) => {
                        let name = names
                            .get(&e.id())
                            .cloned()
                            .unwrap_or_else(|| "<unknown>".to_string());
                        break Err(EngineError::ModuleAborted {
                            name,
                            reason: e.to_string(),
                        });
                    }
                    None => debug!("All module tasks finished"),
                },
            }
        };

        if !tasks.is_empty() {
            warn!("Stopping {} remaining module tasks", tasks.len());
            tasks.abort_all();
        }
        drop(signal);

        result
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncBufReadExt, BufReader, DuplexStream, Lines};
    use tokio::time::timeout;

    use super::*;
    use crate::{
        config::status::ModuleConfig,
        core::modules::{error::ModuleError, Render},
    };

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl Module for Fixed {
        async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
            handle.render(&Render::shown(self.0));
            Ok(())
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl Module for Broken {
        async fn run(&mut self, handle: ModuleHandle) -> ModuleResult<()> {
            Err(ModuleError::PathNotFound {
                path: format!("/dev/{}", handle.name()),
            })
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl Module for Panicking {
        async fn run(&mut self, _handle: ModuleHandle) -> ModuleResult<()> {
            panic!("producer bug");
        }
    }

    struct Idle;

    #[async_trait::async_trait]
    impl Module for Idle {
        async fn run(&mut self, _handle: ModuleHandle) -> ModuleResult<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn next_line(lines: &mut Lines<BufReader<DuplexStream>>) -> String {
        timeout(Duration::from_millis(500), lines.next_line())
            .await
            .expect("no line within 500ms")
            .unwrap()
            .expect("stream closed")
    }

    fn builder() -> EngineBuilder {
        EngineBuilder::new(Duration::from_millis(20))
    }

    #[test]
    fn empty_engine_is_rejected() {
        assert!(matches!(builder().build(), Err(EngineError::NoModules(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut b = builder();
        b.add("clock", 64, Box::new(Idle)).unwrap();
        let result = b.add("clock", 64, Box::new(Idle));
        assert!(matches!(result, Err(EngineError::DuplicateModule(name)) if name == "clock"));
    }

    #[test]
    fn unknown_module_fails_from_config() {
        let config = StatusConfig {
            modules: vec![ModuleConfig::named("no-such-module")],
            ..StatusConfig::default()
        };
        let result = Engine::from_config(&config);
        assert!(matches!(
            result,
            Err(EngineError::Module {
                source: ModuleError::ModuleNotFound(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn finished_modules_keep_their_output() {
        let mut b = builder();
        b.add("a", 64, Box::new(Fixed("one")))
            .unwrap()
            .add("b", 64, Box::new(Fixed("two")))
            .unwrap();
        let engine = b.build().unwrap();
        assert_eq!(engine.module_names(), ["a", "b"]);

        let (writer, reader) = duplex(4096);
        let run = tokio::spawn(engine.run(writer));

        let mut lines = BufReader::new(reader).lines();
        assert_eq!(next_line(&mut lines).await, r#"{"version":1}"#);
        assert_eq!(next_line(&mut lines).await, "[");

        let mut frame = next_line(&mut lines).await;
        if frame != r#"[{"name":"a","full_text":"one"},{"name":"b","full_text":"two"}],"# {
            frame = next_line(&mut lines).await;
        }
        assert_eq!(
            frame,
            r#"[{"name":"a","full_text":"one"},{"name":"b","full_text":"two"}],"#
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!run.is_finished(), "engine must outlive finished producers");
        run.abort();
    }

    #[tokio::test]
    async fn structural_failure_ends_run() {
        let mut b = builder();
        b.add("idle", 64, Box::new(Idle))
            .unwrap()
            .add("broken", 64, Box::new(Broken))
            .unwrap();
        let engine = b.build().unwrap();

        let (writer, _reader) = duplex(4096);
        let result = timeout(Duration::from_secs(1), engine.run(writer))
            .await
            .expect("engine did not stop");

        assert!(matches!(
            result,
            Err(EngineError::Module { name, source: ModuleError::PathNotFound { .. } })
                if name == "broken"
        ));
    }

    #[tokio::test]
    async fn panicking_module_is_reported_by_name() {
        let mut b = builder();
        b.add("buggy", 64, Box::new(Panicking)).unwrap();
        let engine = b.build().unwrap();

        let (writer, _reader) = duplex(4096);
        let result = timeout(Duration::from_secs(1), engine.run(writer))
            .await
            .expect("engine did not stop");

        assert!(matches!(
            result,
            Err(EngineError::ModuleAborted { name, .. }) if name == "buggy"
        ));
    }

    #[tokio::test]
    async fn closed_output_ends_run() {
        let mut b = builder();
        b.add("idle", 64, Box::new(Idle)).unwrap();
        let engine = b.build().unwrap();

        let (writer, reader) = duplex(64);
        drop(reader);

        let result = timeout(Duration::from_secs(1), engine.run(writer))
            .await
            .expect("engine did not stop");
        assert!(matches!(result, Err(EngineError::Output(_))));
    }
}
