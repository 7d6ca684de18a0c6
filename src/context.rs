use crate::{
    classify::Classifier,
    config::Config,
    error::{IngestError, Result},
    extract::FieldExtractor,
    imaging::PageSettings,
    registry::RegionRegistry,
};

/// Everything one invocation needs, built once and handed to each component.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cfg: Config,
    pub registry: RegionRegistry,
    pub classifier: Classifier,
    pub page: PageSettings,
}

impl RunContext {
    pub fn new(cfg: Config) -> Result<Self> {
        Self::with_registry(cfg, RegionRegistry::builtin()?)
    }

    pub fn with_registry(cfg: Config, registry: RegionRegistry) -> Result<Self> {
        cfg.validate()
            .map_err(|e| IngestError::Config(format!("{e:#}")))?;
        let classifier = Classifier::from_config(&cfg)?;
        let page = PageSettings::from_config(&cfg);
        Ok(Self {
            cfg,
            registry,
            classifier,
            page,
        })
    }

    pub fn extractor(&self) -> FieldExtractor<'_> {
        FieldExtractor::new(&self.registry, &self.cfg)
    }
}
