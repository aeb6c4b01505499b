//! Runtime catalog lookup.

use crate::error::{ProviderError, Result};
use faaskit::Client;
use serde::Serialize;

/// One catalog entry, as shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeInfo {
    pub name: String,
    pub version: String,
    pub templates: Vec<String>,
    pub hardware: Vec<String>,
}

/// List runtimes, keeping only those that support `hardware` when given
pub fn list(client: &Client, hardware: Option<&str>) -> Result<Vec<RuntimeInfo>> {
    let runtimes = client
        .runtimes(hardware)
        .map_err(ProviderError::transport("list runtimes"))?;
    log::debug!("Catalog returned {} matching runtimes", runtimes.len());

    Ok(runtimes
        .into_iter()
        .map(|r| RuntimeInfo {
            name: r.name,
            version: r.version,
            templates: r.templates,
            hardware: r.hardware,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faaskit::{MockBackend, Verb};

    #[test]
    fn test_list_all() {
        let client = Client::with_backend(Box::new(MockBackend::with_runtimes()));
        let all = list(&client, None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].name, "python3.11");
        assert_eq!(all[0].templates, vec!["http", "flask", "fastapi"]);
    }

    #[test]
    fn test_filter_by_hardware() {
        let client = Client::with_backend(Box::new(MockBackend::with_runtimes()));
        let gpu = list(&client, Some("gpu")).unwrap();
        assert!(gpu.iter().all(|r| r.hardware.iter().any(|h| h == "gpu")));
        assert_eq!(gpu.len(), 2);

        let cpu: Vec<String> = list(&client, Some("cpu"))
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(cpu, vec!["python3.11", "node20", "pytorch2.1.2"]);
    }

    #[test]
    fn test_transport_error() {
        let mock = MockBackend::with_runtimes();
        mock.fail_next(
            Verb::ListRuntimes,
            faaskit::Error::http("list runtimes", 401, "unauthorized"),
        );
        let client = Client::with_backend(Box::new(mock));
        let err = list(&client, None).unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
    }
}
