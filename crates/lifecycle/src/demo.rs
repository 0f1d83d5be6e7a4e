use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use lifecycle_core::{ActionError, LifecycleAware, Stage, StageMethods};
use log::info;

const DEMO_PORT: u16 = 8080;

/// Stand-in for a network service driven by the `run` command.
#[derive(Debug, Default)]
pub struct DemoService {
    port: AtomicU16,
    running: AtomicBool,
    announced: AtomicBool,
}

impl DemoService {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn configure(&self) -> Result<(), ActionError> {
        self.port.store(DEMO_PORT, Ordering::SeqCst);
        info!("demo-service: configured for port {}", DEMO_PORT);
        Ok(())
    }

    fn start(&self) -> Result<(), ActionError> {
        let port = self.port.load(Ordering::SeqCst);
        if port == 0 {
            return Err("demo-service started without a port".into());
        }
        self.running.store(true, Ordering::SeqCst);
        info!("demo-service: listening on port {}", port);
        Ok(())
    }

    fn announce(&self) -> Result<(), ActionError> {
        self.announced.store(true, Ordering::SeqCst);
        info!("demo-service: announced to discovery");
        Ok(())
    }

    fn unannounce(&self) -> Result<(), ActionError> {
        self.announced.store(false, Ordering::SeqCst);
        info!("demo-service: withdrawn from discovery");
        Ok(())
    }

    fn stop(&self) -> Result<(), ActionError> {
        if self.announced.load(Ordering::SeqCst) {
            log::warn!("demo-service: stopping while still announced");
        }
        self.running.store(false, Ordering::SeqCst);
        info!("demo-service: stopped");
        Ok(())
    }
}

impl LifecycleAware for DemoService {
    fn stage_methods() -> StageMethods<Self> {
        StageMethods::new()
            .on(Stage::CONFIGURE, "configure", DemoService::configure)
            .on(Stage::START, "start", DemoService::start)
            .on(Stage::ANNOUNCE, "announce", DemoService::announce)
            .on(Stage::UNANNOUNCE, "unannounce", DemoService::unannounce)
            .on(Stage::STOP, "stop", DemoService::stop)
    }
}
