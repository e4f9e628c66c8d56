use super::assertions::Assertion;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, Context, Result};
use defstore_core::{DefStore, IndexKind, Lookup, StoreConfig};
use std::fs;

/// Executes scenarios against a real store on disk
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    store: Option<DefStore>,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a runner over a prepared workspace
    pub fn new(workspace: TestWorkspace) -> Self {
        Self {
            workspace,
            store: None,
            current_step: 0,
        }
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::WriteDefs { defs } => self.workspace.write_defs(defs),
            ScenarioStep::BuildStore { config } => self.handle_build(config),
            ScenarioStep::WriteStoreConfig { toml } => self
                .workspace
                .write_file(&format!("store/{}", defstore_core::CONFIG_FILE), toml.as_bytes()),
            ScenarioStep::BuildStoreWithSavedConfig => {
                let config = StoreConfig::load(&self.workspace.store_path())?;
                self.handle_build(&config)
            }
            ScenarioStep::Reopen => self.handle_reopen(),
            ScenarioStep::CorruptStoreFile { path, content } => {
                self.workspace.write_file(&format!("store/{}", path), content)
            }
            ScenarioStep::FlipStoreByte { path, offset } => self.handle_flip(path, *offset),
            ScenarioStep::DeleteStoreFile { path } => {
                self.workspace.remove_file(&format!("store/{}", path))
            }
            ScenarioStep::Assert(assertion) => self.check(assertion),
        }
    }

    fn handle_build(&mut self, config: &StoreConfig) -> Result<()> {
        // Release the previous handle before rebuilding
        self.store = None;
        self.store = Some(self.workspace.build_store(config)?);
        Ok(())
    }

    fn handle_reopen(&mut self) -> Result<()> {
        self.store = None;
        self.store = Some(self.workspace.open_store()?);
        Ok(())
    }

    fn handle_flip(&mut self, path: &str, offset: usize) -> Result<()> {
        let full = self.workspace.store_path().join(path);
        let mut bytes = fs::read(&full).with_context(|| format!("Failed to read {}", path))?;
        let len = bytes.len();
        let byte = bytes
            .get_mut(offset)
            .ok_or_else(|| anyhow!("offset {} past end of {} ({} bytes)", offset, path, len))?;
        *byte ^= 0xFF;
        fs::write(&full, bytes)?;
        Ok(())
    }

    fn store(&self) -> Result<&DefStore> {
        self.store
            .as_ref()
            .ok_or_else(|| anyhow!("No store: build or reopen first"))
    }

    fn check(&self, assertion: &Assertion) -> Result<()> {
        match assertion {
            Assertion::QueryReturnsPaths { filters, paths } => {
                let defs = self.store()?.defs(filters)?;
                let actual: Vec<&str> = defs.iter().map(|d| d.path.as_str()).collect();
                if actual != *paths {
                    bail!("expected paths {:?}, got {:?}", paths, actual);
                }
                Ok(())
            }
            Assertion::QueryUsesIndex { filters, index } => match self.store()?.lookup(filters)? {
                Lookup::Indexed { index: used, .. } if used == *index => Ok(()),
                other => bail!("expected lookup via {} index, got {:?}", index, other),
            },
            Assertion::QueryScans { filters } => match self.store()?.lookup(filters)? {
                Lookup::FullScan => Ok(()),
                other => bail!("expected full scan, got {:?}", other),
            },
            Assertion::IndexReady(kind) => self.check_ready(*kind, true),
            Assertion::IndexNotReady(kind) => self.check_ready(*kind, false),
            Assertion::DefCount(n) => {
                let count = self.store()?.blob().len();
                if count != *n {
                    bail!("expected {} defs, got {}", n, count);
                }
                Ok(())
            }
            Assertion::StoreFileExists(path) => {
                if !self.workspace.store_path().join(path).exists() {
                    bail!("store file missing: {}", path);
                }
                Ok(())
            }
            Assertion::OpenFails => match self.workspace.open_store() {
                Ok(_) => bail!("expected opening the store to fail"),
                Err(_) => Ok(()),
            },
            Assertion::Custom(check) => check(self.store()?),
        }
    }

    fn check_ready(&self, kind: IndexKind, expected: bool) -> Result<()> {
        let slot = self
            .store()?
            .indexes()
            .slot(kind)
            .ok_or_else(|| anyhow!("no {} index registered", kind))?;
        if slot.ready() != expected {
            bail!("{} index ready = {}, expected {}", kind, slot.ready(), expected);
        }
        Ok(())
    }
}
