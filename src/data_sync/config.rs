use crate::logic::types::RouterConfig;
use crate::utils::config_loader::{LoadConfigError, SectionLoader, SectionLoaderSync, load_from_file, load_from_file_sync};
use alloy_primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct RouterConfigRoot {
    pub router: RouterConfigSection,
}

/// `[router]` section. Every key is optional and falls back to [`RouterConfig::default`].
#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfigSection {
    pub max_in_ratio: Option<Decimal>,
    pub max_out_ratio: Option<Decimal>,
    pub solver_max_iterations: Option<usize>,
    pub solver_tolerance: Option<Decimal>,
    pub wrapped_native: Option<Address>,
    pub default_max_pools: Option<usize>,
}

impl RouterConfigSection {
    pub fn with_default_max_pools(&self, default_max_pools: usize) -> Self {
        Self { default_max_pools: Some(default_max_pools), ..self.clone() }
    }

    pub fn into_config(self) -> RouterConfig {
        let defaults = RouterConfig::default();
        RouterConfig {
            max_in_ratio: self.max_in_ratio.unwrap_or(defaults.max_in_ratio),
            max_out_ratio: self.max_out_ratio.unwrap_or(defaults.max_out_ratio),
            solver_max_iterations: self.solver_max_iterations.unwrap_or(defaults.solver_max_iterations),
            solver_tolerance: self.solver_tolerance.unwrap_or(defaults.solver_tolerance),
            wrapped_native: self.wrapped_native.unwrap_or(defaults.wrapped_native),
            default_max_pools: self.default_max_pools.unwrap_or(defaults.default_max_pools),
        }
    }
}

#[async_trait]
impl SectionLoader for RouterConfigSection {
    type SectionType = RouterConfigSection;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file(file_name).await?;
        Ok(root.router)
    }
}

impl SectionLoaderSync for RouterConfigSection {
    type SectionType = RouterConfigSection;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: RouterConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.router)
    }
}
