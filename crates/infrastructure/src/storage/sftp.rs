use crate::storage::backend::{RemoteStorageParams, StorageBackend};
use async_trait::async_trait;
use russh::client::{Config, Handle, Handler};
use russh_sftp::client::SftpSession;
use std::sync::Arc;

const DEFAULT_SFTP_PORT: u16 = 22;
const CONNECT_TIMEOUT_SECS: u64 = 10;

struct AcceptAllHostKeys;

#[async_trait]
impl Handler for AcceptAllHostKeys {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Connects per-operation (no pool), uploads over SFTP, and tears the
/// session down again. Grounded on `SFTPDriver` in the original: connect
/// with `allow_agent=False, look_for_keys=False`, `chdir(root_path)` with a
/// fallback to the home directory if that fails, `/`-joined remote paths.
pub struct SftpBackend {
    session: SftpSession,
    _ssh: Handle<AcceptAllHostKeys>,
    root: String,
}

impl SftpBackend {
    pub async fn connect(params: &RemoteStorageParams) -> anyhow::Result<Self> {
        let port = if params.port == 0 {
            DEFAULT_SFTP_PORT
        } else {
            params.port
        };

        let config = Arc::new(Config {
            inactivity_timeout: Some(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS)),
            ..Default::default()
        });

        let mut ssh =
            russh::client::connect(config, (params.host.as_str(), port), AcceptAllHostKeys)
                .await?;

        let authenticated = ssh
            .authenticate_password(&params.user, &params.password)
            .await?;
        if !authenticated {
            anyhow::bail!("sftp authentication failed for {}@{}", params.user, params.host);
        }

        let channel = ssh.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let session = SftpSession::new(channel.into_stream()).await?;

        // chdir(root_path) with a fallback to the home directory, matching
        // the original: a misconfigured root_path shouldn't hard-fail the
        // upload when the account's home dir is a usable destination.
        let root = match session.canonicalize(params.root_path.clone()).await {
            Ok(resolved) => resolved,
            Err(_) => session
                .canonicalize(".".to_string())
                .await
                .unwrap_or_else(|_| "/".to_string()),
        };

        Ok(Self {
            session,
            _ssh: ssh,
            root,
        })
    }

    fn remote_path(&self, path: &str) -> String {
        format!("{}/{}", self.root.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for SftpBackend {
    async fn put(&mut self, path: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let remote = self.remote_path(path);
        if let Some(parent) = remote.rsplit_once('/').map(|(p, _)| p) {
            self.mkdirs_remote(parent).await?;
        }
        use tokio::io::AsyncWriteExt;
        let mut file = self.session.create(remote).await?;
        file.write_all(bytes).await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn mkdirs(&mut self, path: &str) -> anyhow::Result<()> {
        let remote = self.remote_path(path);
        self.mkdirs_remote(&remote).await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

impl SftpBackend {
    async fn mkdirs_remote(&mut self, remote: &str) -> anyhow::Result<()> {
        let mut built = String::new();
        for segment in remote.split('/').filter(|s| !s.is_empty()) {
            built.push('/');
            built.push_str(segment);
            if self.session.metadata(built.clone()).await.is_err() {
                let _ = self.session.create_dir(built.clone()).await;
            }
        }
        Ok(())
    }
}
