use std::sync::mpsc::channel;

use crate::assets::load_state::AssetHandle;

/// Runs `load` on the rayon pool and returns a handle to poll for its result.
///
/// If the handle is gone by the time the load finishes, the result is dropped.
pub fn spawn_load<T, F>(name: impl Into<String>, load: F) -> AssetHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let name = name.into();
    let (sender, receiver) = channel();

    let worker_name = name.clone();
    rayon::spawn(move || {
        log::debug!("Loading {}", worker_name);
        let result = load();

        if sender.send(result).is_err() {
            log::debug!("Discarding {}: nobody is waiting for it", worker_name);
        }
    });

    AssetHandle::pending(name, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::load_state::AssetLoadState;
    use std::{
        sync::{Arc, Barrier},
        time::{Duration, Instant},
    };

    fn poll_until_settled<T>(handle: &mut AssetHandle<T>) -> &AssetLoadState<T> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while handle.poll().is_pending() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.state()
    }

    #[test]
    fn load_result_arrives_off_thread() {
        let caller = std::thread::current().id();
        let mut handle = spawn_load("thread check", move || Ok(std::thread::current().id() != caller));

        assert_eq!(poll_until_settled(&mut handle).as_ready(), Some(&true));
    }

    #[test]
    fn poll_does_not_wait_for_slow_loads() {
        let gate = Arc::new(Barrier::new(2));
        let worker_gate = gate.clone();
        let mut handle = spawn_load("slow", move || {
            worker_gate.wait();
            Ok(())
        });

        assert!(handle.poll().is_pending());

        gate.wait();
        assert_eq!(poll_until_settled(&mut handle).label(), "ready");
    }

    #[test]
    fn failed_load_is_reported() {
        let mut handle = spawn_load::<(), _>("broken", || anyhow::bail!("corrupt file"));

        match poll_until_settled(&mut handle) {
            AssetLoadState::Failed(error) => assert!(error.to_string().contains("corrupt")),
            other => panic!("expected failure, got {}", other.label()),
        }
    }
}
