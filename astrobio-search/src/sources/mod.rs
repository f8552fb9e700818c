//! Search source implementations.
//!
//! [`csv`] provides the local dataset source; [`nasa`] provides the HTTP
//! clients for the NASA open-science APIs.

pub mod csv;
pub mod nasa;

pub use self::csv::{default_datasets, CsvSource, DatasetFile, DatasetLayout, DatasetStats, LOCAL_SOURCE_NAME};
pub use self::nasa::NasaApiSource;

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::config::SourceConfig;
use crate::source::Source;

/// Build one [`NasaApiSource`] per configuration, sharing `client`.
///
/// Disabled sources are still constructed; the fan-out skips them.
pub fn build_external_sources(
    configs: &[SourceConfig],
    search: &SearchConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn Source>> {
    configs
        .iter()
        .map(|config| {
            Arc::new(NasaApiSource::new(
                config.clone(),
                client.clone(),
                search.request_jitter_ms,
            )) as Arc<dyn Source>
        })
        .collect()
}
