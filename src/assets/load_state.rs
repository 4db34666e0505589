use std::sync::mpsc::{Receiver, TryRecvError};

use anyhow::anyhow;

pub enum AssetLoadState<T> {
    Pending,
    Ready(T),
    Failed(anyhow::Error),
}

impl<T> AssetLoadState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetLoadState::Pending)
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            AssetLoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn label(&self) -> &'static str {
        match self {
            AssetLoadState::Pending => "pending",
            AssetLoadState::Ready(_) => "ready",
            AssetLoadState::Failed(_) => "failed",
        }
    }
}

/// Receiving end of one asset load.
///
/// `poll` never blocks. Dropping the handle (or calling `abandon`) discards a
/// result that arrives later.
pub struct AssetHandle<T> {
    name: String,
    receiver: Option<Receiver<anyhow::Result<T>>>,
    state: AssetLoadState<T>,
}

impl<T> AssetHandle<T> {
    pub fn pending(name: impl Into<String>, receiver: Receiver<anyhow::Result<T>>) -> Self {
        Self {
            name: name.into(),
            receiver: Some(receiver),
            state: AssetLoadState::Pending,
        }
    }

    /// A handle whose load already finished.
    #[cfg(test)]
    pub fn resolved(name: impl Into<String>, result: anyhow::Result<T>) -> Self {
        Self {
            name: name.into(),
            receiver: None,
            state: match result {
                Ok(value) => AssetLoadState::Ready(value),
                Err(error) => AssetLoadState::Failed(error),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &AssetLoadState<T> {
        &self.state
    }

    pub fn poll(&mut self) -> &AssetLoadState<T> {
        if let Some(receiver) = &self.receiver {
            match receiver.try_recv() {
                Ok(Ok(value)) => {
                    log::info!("Asset {} ready", self.name);
                    self.state = AssetLoadState::Ready(value);
                    self.receiver = None;
                }
                Ok(Err(error)) => {
                    log::error!("Asset {} failed: {:#}", self.name, error);
                    self.state = AssetLoadState::Failed(error);
                    self.receiver = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.state = AssetLoadState::Failed(anyhow!(
                        "Loader for {} exited without a result",
                        self.name
                    ));
                    self.receiver = None;
                }
            }
        }

        &self.state
    }

    /// Stops waiting for a pending load.
    pub fn abandon(&mut self) {
        if self.receiver.take().is_some() {
            log::debug!("Abandoned pending load of {}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn pending_until_result_arrives() {
        let (sender, receiver) = channel();
        let mut handle = AssetHandle::pending("name.gltf", receiver);

        assert!(handle.poll().is_pending());
        assert!(handle.poll().is_pending());

        sender.send(Ok(7)).unwrap();

        assert_eq!(handle.poll().as_ready(), Some(&7));
        assert_eq!(handle.state().label(), "ready");
    }

    #[test]
    fn error_result_fails_the_asset() {
        let (sender, receiver) = channel::<anyhow::Result<u32>>();
        let mut handle = AssetHandle::pending("cubeMap.jpg", receiver);

        sender.send(Err(anyhow!("bad jpeg"))).unwrap();

        match handle.poll() {
            AssetLoadState::Failed(error) => assert_eq!(error.to_string(), "bad jpeg"),
            other => panic!("expected failure, got {}", other.label()),
        }
    }

    #[test]
    fn vanished_loader_fails_the_asset() {
        let (sender, receiver) = channel::<anyhow::Result<u32>>();
        let mut handle = AssetHandle::pending("name.gltf", receiver);
        drop(sender);

        assert_eq!(handle.poll().label(), "failed");
    }

    #[test]
    fn abandoned_handle_stays_pending_and_drops_late_results() {
        let (sender, receiver) = channel();
        let mut handle = AssetHandle::pending("name.gltf", receiver);

        handle.abandon();

        assert!(sender.send(Ok(1)).is_err());
        assert!(handle.poll().is_pending());
    }

    #[test]
    fn resolved_handle_reports_result_immediately() {
        let mut ready = AssetHandle::resolved("a", Ok("model"));
        let mut failed = AssetHandle::<()>::resolved("b", Err(anyhow!("missing")));

        assert_eq!(ready.poll().as_ready(), Some(&"model"));
        assert_eq!(failed.poll().label(), "failed");
        assert_eq!(failed.name(), "b");
    }
}
