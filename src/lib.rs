// Library for tests to access modules

pub mod checks;
pub mod cli;
pub mod config;
pub mod kube_repo;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod registry_repo;
pub mod release_repo;
pub mod routes;
pub mod version;
pub mod version_compare;
pub mod worker;
