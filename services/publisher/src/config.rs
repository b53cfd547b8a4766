//! Connection and transport settings, from flags or the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use geoserver_client::GeoServerConfig;
use publishing::TransportMode;

/// GeoServer connection.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Scheme and host, e.g. http://localhost
    #[arg(long, env = "GEOSERVER_HOST")]
    pub host: String,

    #[arg(long, env = "GEOSERVER_PORT")]
    pub port: u16,

    #[arg(long, env = "GEOSERVER_USER")]
    pub user: String,

    #[arg(long, env = "GEOSERVER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Workspace all resources are created in
    #[arg(long, env = "GEOSERVER_WORKSPACE")]
    pub workspace: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "GEOSERVER_TIMEOUT_SECS", default_value = "600")]
    pub timeout_secs: u64,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> GeoServerConfig {
        let mut config = GeoServerConfig::new(
            &self.host,
            self.port,
            &self.user,
            &self.password,
            &self.workspace,
        );
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }
}

/// Where exported files go.
#[derive(Args, Debug, Clone, Default)]
pub struct TransportArgs {
    /// Data directory as seen by GeoServer; selects the shared-path transport
    #[arg(long, env = "GEOSERVER_DATAPATH")]
    pub datapath: Option<String>,

    /// Local view of the data directory, or the parent of the staging directory
    #[arg(long, env = "OUTPUTFOLDER")]
    pub outputfolder: Option<PathBuf>,
}

impl TransportArgs {
    pub fn to_mode(&self) -> publishing::Result<TransportMode> {
        TransportMode::from_settings(self.datapath.as_deref(), self.outputfolder.as_deref())
    }
}
