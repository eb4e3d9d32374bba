#![forbid(unsafe_code)]

use super::{
    DeliveryChannel,
    socket::{SocketEndpoint, wait_for_hangup},
};
use crate::Error;
use std::{
    fs,
    os::unix::fs::{FileTypeExt, PermissionsExt},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Who may become the consumer.
///
/// An empty allow-list admits any local peer; the socket file's mode is then
/// the only gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectPolicy {
    allowed_uids: Vec<u32>,
}

impl ConnectPolicy {
    pub fn new(mut allowed_uids: Vec<u32>) -> Self {
        allowed_uids.sort_unstable();
        allowed_uids.dedup();
        Self { allowed_uids }
    }

    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn authorize(&self, uid: u32) -> Result<(), Error> {
        if self.allowed_uids.is_empty() || self.allowed_uids.binary_search(&uid).is_ok() {
            Ok(())
        } else {
            Err(Error::ConnectionRejected { uid })
        }
    }
}

/// Accepts consumer connections on a Unix socket and installs each one as
/// the channel's endpoint.
#[derive(Debug)]
pub struct ChannelServer {
    listener: UnixListener,
    path: PathBuf,
    channel: Arc<DeliveryChannel>,
    policy: ConnectPolicy,
    send_timeout: Duration,
}

impl ChannelServer {
    /// Must be called from within a tokio runtime.
    pub fn bind(
        path: impl AsRef<Path>,
        channel: Arc<DeliveryChannel>,
        policy: ConnectPolicy,
        send_timeout: Duration,
    ) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        info!(path = %path.display(), "listening for consumer");

        Ok(Self {
            listener,
            path,
            channel,
            policy,
            send_timeout,
        })
    }

    pub fn from_config(config: &config::Channel, channel: Arc<DeliveryChannel>) -> Result<Self, Error> {
        Self::bind(
            &config.socket_path,
            channel,
            ConnectPolicy::new(config.allowed_uids.clone()),
            config.send_timeout,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept consumers until `cancel` fires, then drop the current consumer
    /// and remove the socket file.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), Error> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        if let Err(err) = self.admit(stream) {
                            warn!(%err, "consumer refused");
                        }
                    }
                    Err(err) => {
                        warn!(%err, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        self.channel.disconnect();
        if let Err(err) = fs::remove_file(&self.path) {
            debug!(%err, "socket file already gone");
        }
        info!("channel server stopped");
        Ok(())
    }

    fn admit(&self, stream: UnixStream) -> Result<(), Error> {
        let uid = stream.peer_cred()?.uid();
        self.policy.authorize(uid)?;

        let endpoint = SocketEndpoint::new(stream.into_std()?, self.send_timeout)?;
        let watch = endpoint.hangup_handle()?;
        let cookie = self.channel.connect(Arc::new(endpoint));
        debug!(%cookie, uid, "consumer admitted");

        let channel = Arc::clone(&self.channel);
        tokio::task::spawn_blocking(move || {
            wait_for_hangup(watch);
            if channel.release(cookie) {
                info!(%cookie, "consumer hung up");
            }
        });
        Ok(())
    }
}

fn remove_stale_socket(path: &Path) -> Result<(), Error> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!(path = %path.display(), "removing stale socket");
            fs::remove_file(path)?;
            Ok(())
        }
        // anything else at this path makes bind fail with a clear error
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_policy_admits_everyone() {
        let policy = ConnectPolicy::permissive();
        assert!(policy.authorize(0).is_ok());
        assert!(policy.authorize(65534).is_ok());
    }

    #[test]
    fn allow_list_rejects_strangers() {
        let policy = ConnectPolicy::new(vec![1000, 0, 1000]);
        assert!(policy.authorize(0).is_ok());
        assert!(policy.authorize(1000).is_ok());
        assert!(matches!(
            policy.authorize(1001),
            Err(Error::ConnectionRejected { uid: 1001 })
        ));
    }
}
